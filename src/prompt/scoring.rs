use crate::prompt::common::SCORE_FORMAT_INSTRUCTIONS;
use crate::rss::truncate_chars;

const MAX_ABSTRACT_CHARS: usize = 800;

/// Generate a prompt asking the model to rate a paper's impact from 0 to 100.
pub fn impact_score_prompt(
    criteria: &str,
    title: &str,
    authors: &str,
    journal: &str,
    abstract_text: &str,
) -> String {
    format!(
        r#"{criteria}

Paper to evaluate:

Title: {title}

Authors: {authors}

Journal: {journal}

Abstract: {abstract_text}...

{format_instructions}
"#,
        criteria = criteria.trim(),
        title = title,
        authors = authors,
        journal = journal,
        abstract_text = truncate_chars(abstract_text, MAX_ABSTRACT_CHARS),
        format_instructions = SCORE_FORMAT_INSTRUCTIONS,
    )
}
