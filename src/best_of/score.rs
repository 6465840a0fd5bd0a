use serde::Deserialize;

use crate::error::ScoringError;

pub const MAX_SCORE: u8 = 100;

/// A model's judgement of one paper.
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    pub score: u8,
    pub reasoning: String,
}

#[derive(Deserialize)]
struct RawScore {
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Parse the `{"score", "reasoning"}` object a model returns, with or
/// without a markdown code fence around it.
pub fn parse_score(response: &str) -> Result<Score, ScoringError> {
    let raw: RawScore = serde_json::from_str(strip_code_fence(response))?;
    let score = raw.score.unwrap_or(0.0).round().clamp(0.0, MAX_SCORE as f64) as u8;
    let reasoning = raw
        .reasoning
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| "No reasoning provided".to_string());
    Ok(Score { score, reasoning })
}

fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.split("```").next().unwrap_or(inner);
    inner.strip_prefix("json").unwrap_or(inner).trim()
}
