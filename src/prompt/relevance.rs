use crate::prompt::common::{ANSWER_YES_OR_NO, BIOMEDICAL_EXPERT};
use crate::rss::truncate_chars;

/// Generate a prompt asking whether a paper is about `topic`.
///
/// The paper text (title, then abstract when present) is cut to `max_chars`
/// characters. An empty abstract gives a title-only prompt.
pub fn relevance_prompt(title: &str, summary: &str, topic: &str, max_chars: usize) -> String {
    let paper = if summary.trim().is_empty() {
        format!("Title: {}", title.trim())
    } else {
        format!("Title: {}\n\nAbstract: {}", title.trim(), summary.trim())
    };

    format!(
        r#"{expert}
{answer}

Is the following paper related to {topic}?

Paper:
{paper}
"#,
        expert = BIOMEDICAL_EXPERT,
        answer = ANSWER_YES_OR_NO,
        topic = topic,
        paper = truncate_chars(&paper, max_chars),
    )
}
