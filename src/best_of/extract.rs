//! Pulls journal and abstract out of PubMed's description HTML.

use crate::rss::Entry;

const JOURNAL_MARKER: &str = "<b>Journal:</b>";
const ABSTRACT_MARKER: &str = "<b>Abstract:</b>";
const LINE_BREAK: &str = "<br/>";
const UNKNOWN: &str = "Unknown";

/// The fields the scoring prompt needs from one paper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperDetails {
    pub authors: String,
    pub journal: String,
    pub abstract_text: String,
}

impl PaperDetails {
    pub fn from_entry(entry: &Entry) -> Self {
        let authors = entry
            .authors
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(UNKNOWN)
            .to_string();

        Self {
            authors,
            journal: extract_journal(&entry.summary).unwrap_or_else(|| UNKNOWN.to_string()),
            abstract_text: extract_abstract(&entry.summary).unwrap_or_default(),
        }
    }
}

/// Text between the journal marker and the next line break.
pub fn extract_journal(description: &str) -> Option<String> {
    let start = description.find(JOURNAL_MARKER)? + JOURNAL_MARKER.len();
    let rest = &description[start..];
    let end = rest.find(LINE_BREAK).unwrap_or(rest.len());
    Some(rest[..end].trim().to_string())
}

/// Everything after the abstract marker and its optional line break.
pub fn extract_abstract(description: &str) -> Option<String> {
    let start = description.find(ABSTRACT_MARKER)? + ABSTRACT_MARKER.len();
    let rest = description[start..].trim_start();
    let rest = rest.strip_prefix(LINE_BREAK).unwrap_or(rest);
    Some(rest.trim().to_string())
}
