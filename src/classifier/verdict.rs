//! Turning a model answer into a relevance verdict.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ClassificationError;

static THINK_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid think-block regex"));

/// A classifier's decision for one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub relevant: bool,
    pub reason: Option<String>,
}

impl Verdict {
    pub fn relevant() -> Self {
        Verdict {
            relevant: true,
            reason: None,
        }
    }

    pub fn not_relevant() -> Self {
        Verdict {
            relevant: false,
            reason: None,
        }
    }
}

/// Parse a `YES`/`NO` answer. Anything after the token is kept as the reason.
pub fn parse_verdict(response: &str) -> Result<Verdict, ClassificationError> {
    let cleaned = THINK_BLOCK.replace_all(response, "");
    let cleaned = cleaned.trim();

    let (first, rest) = match cleaned.find(char::is_whitespace) {
        Some(idx) => cleaned.split_at(idx),
        None => (cleaned, ""),
    };
    let token: String = first
        .chars()
        .filter(|c| c.is_alphabetic())
        .collect::<String>()
        .to_uppercase();

    let relevant = match token.as_str() {
        "YES" => true,
        "NO" => false,
        _ => return Err(ClassificationError::Malformed(cleaned.to_string())),
    };

    let reason = rest
        .trim()
        .trim_start_matches(|c: char| c == '-' || c == ',' || c == ':' || c == '.' || c.is_whitespace())
        .trim();
    Ok(Verdict {
        relevant,
        reason: (!reason.is_empty()).then(|| reason.to_string()),
    })
}
