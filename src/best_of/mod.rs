//! Weekly "best of" selection over a previously filtered feed.
//!
//! Every paper in the accepted feed is scored by the model for impact, the
//! top N are kept and written as their own RSS feed with the score and the
//! model's reasoning prepended to each description.

mod extract;
mod score;

pub use extract::{extract_abstract, extract_journal, PaperDetails};
pub use score::{parse_score, Score, MAX_SCORE};

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::classifier::DelayStrategy;
use crate::error::{BestOfError, ScoringError, WriteError};
use crate::llm::generate_llm_response;
use crate::prompt::impact_score_prompt;
use crate::rss::{parse_feed, render_feed, truncate_chars, write_atomically, ChannelInfo, Entry};
use crate::{LLMParams, TARGET_FEED_WRITE, TARGET_LLM_REQUEST};

pub const BEST_OF_FEED_FILE: &str = "best_of_feed.xml";
pub const DEFAULT_TOP_N: usize = 10;
pub const BEST_OF_TITLE: &str = "Best Of Week - Head & Neck Cancer";
const BEST_OF_LINK: &str = "https://pubmed.ncbi.nlm.nih.gov";

/// Rates a paper's impact from 0 to 100.
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(&self, entry: &Entry) -> Result<Score, ScoringError>;
}

pub struct LlmScorer {
    params: LLMParams,
    criteria: String,
}

impl LlmScorer {
    pub fn new(params: LLMParams, criteria: String) -> Self {
        Self { params, criteria }
    }
}

#[async_trait]
impl Scorer for LlmScorer {
    async fn score(&self, entry: &Entry) -> Result<Score, ScoringError> {
        let details = PaperDetails::from_entry(entry);
        let prompt = impact_score_prompt(
            &self.criteria,
            &entry.title,
            &details.authors,
            &details.journal,
            &details.abstract_text,
        );
        let response = generate_llm_response(&prompt, &self.params).await?;
        parse_score(&response)
    }
}

#[derive(Debug, Clone)]
pub struct ScoredPaper {
    pub entry: Entry,
    pub score: u8,
    pub reasoning: String,
}

/// Read the selection criteria; a missing or blank file is fatal.
pub async fn load_criteria(path: &Path) -> Result<String, BestOfError> {
    let criteria = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| BestOfError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let criteria = criteria.trim();
    if criteria.is_empty() {
        return Err(BestOfError::EmptyCriteria(path.to_path_buf()));
    }
    info!("Loaded selection criteria from {}", path.display());
    Ok(criteria.to_string())
}

/// Score every entry in order. A failed call scores 0 and keeps the error as
/// its reasoning.
pub async fn score_all(
    entries: Vec<Entry>,
    scorer: &dyn Scorer,
    delay: &dyn DelayStrategy,
) -> Vec<ScoredPaper> {
    let total = entries.len();
    let mut scored = Vec::with_capacity(total);

    for (index, entry) in entries.into_iter().enumerate() {
        info!(target: TARGET_LLM_REQUEST, "[{}/{}] Scoring: {}", index + 1, total, truncate_chars(&entry.title, 60));

        let (score, reasoning) = match scorer.score(&entry).await {
            Ok(result) => (result.score, result.reasoning),
            Err(err) => {
                warn!(target: TARGET_LLM_REQUEST, "  Error scoring {}: {}", entry.id, err);
                (0, format!("Error during scoring: {}", err))
            }
        };
        info!(target: TARGET_LLM_REQUEST, "  Score: {}/{}", score, MAX_SCORE);

        scored.push(ScoredPaper {
            entry,
            score,
            reasoning,
        });

        let pause = delay.delay(index);
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }

    scored
}

/// Highest score first; ties keep feed order.
pub fn rank(mut scored: Vec<ScoredPaper>, top_n: usize) -> Vec<ScoredPaper> {
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored.truncate(top_n);
    scored
}

pub fn badge(score: u8) -> &'static str {
    match score {
        90..=u8::MAX => "🔥 CRITICAL",
        80..=89 => "⭐ HIGH IMPACT",
        70..=79 => "✨ NOTABLE",
        _ => "📌 SELECTED",
    }
}

fn ranked_entry(rank: usize, paper: &ScoredPaper) -> Entry {
    let details = PaperDetails::from_entry(&paper.entry);
    Entry {
        title: format!("#{} [{}/{}] {}", rank, paper.score, MAX_SCORE, paper.entry.title),
        summary: format!(
            "<h3>{} - Score: {}/{}</h3><p><b>Why this matters:</b> {}</p><hr/>{}",
            badge(paper.score),
            paper.score,
            MAX_SCORE,
            paper.reasoning,
            paper.entry.summary
        ),
        authors: Some(details.authors),
        ..paper.entry.clone()
    }
}

/// Render the best-of feed. `built_at` becomes the channel's `lastBuildDate`.
pub fn render_best_of(ranked: &[ScoredPaper], built_at: DateTime<Utc>) -> Result<Vec<u8>, WriteError> {
    let channel = ChannelInfo {
        title: BEST_OF_TITLE.to_string(),
        link: BEST_OF_LINK.to_string(),
        description: format!(
            "Top {} most impactful head and neck cancer papers this week, selected by AI",
            ranked.len()
        ),
        last_build_date: Some(built_at.format("%a, %d %b %Y %H:%M:%S +0000").to_string()),
    };
    let entries: Vec<Entry> = ranked
        .iter()
        .enumerate()
        .map(|(i, paper)| ranked_entry(i + 1, paper))
        .collect();
    render_feed(&channel, &entries)
}

pub struct BestOfOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub top_n: usize,
}

/// Read the filtered feed, score, rank and write the best-of feed.
///
/// Returns `Ok(None)` without writing when the input feed has no items.
pub async fn select_best(
    options: &BestOfOptions,
    scorer: &dyn Scorer,
    delay: &dyn DelayStrategy,
    built_at: DateTime<Utc>,
) -> Result<Option<Vec<ScoredPaper>>, BestOfError> {
    info!("Reading filtered feed from {}", options.input.display());
    let body = tokio::fs::read_to_string(&options.input)
        .await
        .map_err(|source| BestOfError::Read {
            path: options.input.clone(),
            source,
        })?;
    let feed = parse_feed(&body).map_err(|source| BestOfError::Parse {
        path: options.input.clone(),
        source,
    })?;

    if feed.entries.is_empty() {
        warn!("No papers in {}; nothing to select from", options.input.display());
        return Ok(None);
    }
    info!("Found {} papers in filtered feed", feed.entries.len());

    let scored = score_all(feed.entries, scorer, delay).await;
    let best = rank(scored, options.top_n);
    let xml = render_best_of(&best, built_at)?;

    if let Some(parent) = options.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| WriteError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    write_atomically(&options.output, &xml).await?;
    info!(target: TARGET_FEED_WRITE, "Created best-of feed {} with {} papers", options.output.display(), best.len());

    Ok(Some(best))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::NoDelay;
    use crate::error::LlmError;
    use crate::rss::write_feeds;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::time::Duration;

    struct TableScorer(HashMap<&'static str, u8>);

    #[async_trait]
    impl Scorer for TableScorer {
        async fn score(&self, entry: &Entry) -> Result<Score, ScoringError> {
            match self.0.get(entry.id.as_str()) {
                Some(score) => Ok(Score {
                    score: *score,
                    reasoning: format!("reason for {}", entry.id),
                }),
                None => Err(LlmError::Timeout(Duration::from_secs(120)).into()),
            }
        }
    }

    fn entry(id: &str) -> Entry {
        Entry {
            id: id.to_string(),
            title: format!("Paper {}", id),
            link: format!("https://pubmed.ncbi.nlm.nih.gov/{}/", id),
            summary: format!("<b>Journal:</b> Head Neck<br/><b>Abstract:</b><br/>Abstract {}", id),
            published: "Mon, 13 Oct 2025 06:00:00 -0400".to_string(),
            authors: None,
        }
    }

    fn built_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 17, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_badges() {
        assert_eq!(badge(100), "🔥 CRITICAL");
        assert_eq!(badge(90), "🔥 CRITICAL");
        assert_eq!(badge(89), "⭐ HIGH IMPACT");
        assert_eq!(badge(70), "✨ NOTABLE");
        assert_eq!(badge(69), "📌 SELECTED");
        assert_eq!(badge(0), "📌 SELECTED");
    }

    #[tokio::test]
    async fn test_rank_is_stable_and_truncates() {
        let scorer = TableScorer(HashMap::from([("a", 70), ("b", 95), ("c", 70), ("d", 10)]));
        let entries = vec![entry("a"), entry("b"), entry("c"), entry("d"), entry("e")];
        let scored = score_all(entries, &scorer, &NoDelay).await;

        let failed = scored.iter().find(|p| p.entry.id == "e").unwrap();
        assert_eq!(failed.score, 0);
        assert!(failed.reasoning.starts_with("Error during scoring: "));

        let best = rank(scored, 3);
        let ids: Vec<_> = best.iter().map(|p| p.entry.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_render_best_of() {
        let ranked = vec![ScoredPaper {
            entry: entry("b"),
            score: 95,
            reasoning: "Practice changing.".to_string(),
        }];
        let parsed = parse_feed(&String::from_utf8(render_best_of(&ranked, built_at()).unwrap()).unwrap())
            .unwrap();

        assert_eq!(parsed.title.as_deref(), Some(BEST_OF_TITLE));
        assert_eq!(parsed.last_build_date.as_deref(), Some("Fri, 17 Oct 2025 12:00:00 +0000"));
        let item = &parsed.entries[0];
        assert_eq!(item.title, "#1 [95/100] Paper b");
        assert!(item.summary.starts_with(
            "<h3>🔥 CRITICAL - Score: 95/100</h3><p><b>Why this matters:</b> Practice changing.</p><hr/><b>Journal:</b>"
        ));
        assert_eq!(item.authors.as_deref(), Some("Unknown"));
        assert_eq!(item.link, "https://pubmed.ncbi.nlm.nih.gov/b/");
        assert_eq!(item.published, "Mon, 13 Oct 2025 06:00:00 -0400");
    }

    #[tokio::test]
    async fn test_select_best_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let channel = ChannelInfo {
            title: "Filtered".to_string(),
            link: "https://example.com".to_string(),
            description: String::new(),
            last_build_date: None,
        };
        let paths = write_feeds(dir.path(), &channel, &[entry("a"), entry("b")], &channel, &[])
            .await
            .unwrap();

        let options = BestOfOptions {
            input: paths.accepted,
            output: dir.path().join("best_of").join(BEST_OF_FEED_FILE),
            top_n: DEFAULT_TOP_N,
        };
        let scorer = TableScorer(HashMap::from([("a", 60), ("b", 81)]));
        let best = select_best(&options, &scorer, &NoDelay, built_at())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(best.len(), 2);

        let written = std::fs::read_to_string(&options.output).unwrap();
        assert!(written.find("#1 [81/100] Paper b").unwrap() < written.find("#2 [60/100] Paper a").unwrap());
    }

    #[tokio::test]
    async fn test_select_best_empty_input_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let channel = ChannelInfo {
            title: "Filtered".to_string(),
            link: "https://example.com".to_string(),
            description: String::new(),
            last_build_date: None,
        };
        let paths = write_feeds(dir.path(), &channel, &[], &channel, &[]).await.unwrap();
        let options = BestOfOptions {
            input: paths.accepted,
            output: dir.path().join(BEST_OF_FEED_FILE),
            top_n: DEFAULT_TOP_N,
        };

        let result = select_best(&options, &TableScorer(HashMap::new()), &NoDelay, built_at())
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(!options.output.exists());
    }

    #[tokio::test]
    async fn test_missing_inputs_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_criteria(&dir.path().join("missing.txt")).await,
            Err(BestOfError::Read { .. })
        ));

        let blank = dir.path().join("blank.txt");
        std::fs::write(&blank, "  \n").unwrap();
        assert!(matches!(load_criteria(&blank).await, Err(BestOfError::EmptyCriteria(_))));

        let options = BestOfOptions {
            input: dir.path().join("filtered_feed.xml"),
            output: dir.path().join(BEST_OF_FEED_FILE),
            top_n: DEFAULT_TOP_N,
        };
        let err = select_best(&options, &TableScorer(HashMap::new()), &NoDelay, built_at())
            .await
            .unwrap_err();
        assert!(matches!(err, BestOfError::Read { .. }));
    }
}
