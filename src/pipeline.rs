//! The run driver: fetch, classify, partition, write.

use std::fmt;
use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use crate::classifier::{classify_all, partition, ClassificationStats, Classifier, DelayStrategy};
use crate::error::RunError;
use crate::rss::{write_feeds, ChannelInfo, FeedSource, OutputPaths};

/// Stages of a single run. A run only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Fetching,
    Classifying,
    Writing,
    Done,
    Failed,
}

/// Options that shape a run's outputs.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub output_dir: PathBuf,
    pub accepted_title: String,
    pub accepted_description: String,
    pub rejected_title: String,
    pub rejected_description: String,
    /// Fail the run when more than this share of classifications fell back.
    pub max_fallback_ratio: Option<f64>,
}

impl RunOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            accepted_title: "Filtered PubMed – Head and Neck Cancer".to_string(),
            accepted_description: "Papers classified as related to head and neck cancer".to_string(),
            rejected_title: "Rejected PubMed Papers – Not Head and Neck Cancer".to_string(),
            rejected_description: "Papers rejected by the automated classifier".to_string(),
            max_fallback_ratio: None,
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub fetched: usize,
    pub stats: ClassificationStats,
    pub outputs: OutputPaths,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Accepted: {}, Rejected: {}, Failed: {}",
            self.stats.accepted, self.stats.rejected, self.stats.failed
        )
    }
}

struct Driver {
    state: RunState,
}

impl Driver {
    fn advance(&mut self, next: RunState) {
        debug!("Run state: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn fail<E: Into<RunError>>(&mut self, err: E) -> RunError {
        let err = err.into();
        error!("Run failed during {:?}: {}", self.state, err);
        self.advance(RunState::Failed);
        err
    }
}

/// Execute one complete run. Nothing is written unless fetching and
/// classification both complete.
pub async fn run(
    source: &dyn FeedSource,
    classifier: &dyn Classifier,
    delay: &dyn DelayStrategy,
    options: &RunOptions,
) -> Result<RunSummary, RunError> {
    let mut driver = Driver {
        state: RunState::Idle,
    };

    driver.advance(RunState::Fetching);
    let feed = source.fetch().await.map_err(|e| driver.fail(e))?;
    let fetched = feed.entries.len();
    info!("Found {} entries to process", fetched);

    driver.advance(RunState::Classifying);
    let (classified, stats) = classify_all(feed.entries, classifier, delay).await;

    if stats.failed > 0 && stats.failed == fetched {
        warn!("Every classification ({} of {}) fell back to not relevant; check the model credentials and endpoint", stats.failed, fetched);
    }
    if let Some(threshold) = options.max_fallback_ratio {
        let ratio = stats.failed as f64 / fetched as f64;
        if ratio > threshold {
            return Err(driver.fail(RunError::FallbackThreshold {
                failed: stats.failed,
                total: fetched,
                threshold,
            }));
        }
    }

    driver.advance(RunState::Writing);
    let (accepted, rejected) = partition(classified);
    let accepted_channel = ChannelInfo {
        title: options.accepted_title.clone(),
        link: source.url().to_string(),
        description: options.accepted_description.clone(),
        last_build_date: feed.last_build_date.clone(),
    };
    let rejected_channel = ChannelInfo {
        title: options.rejected_title.clone(),
        link: source.url().to_string(),
        description: options.rejected_description.clone(),
        last_build_date: feed.last_build_date,
    };
    let outputs = write_feeds(
        &options.output_dir,
        &accepted_channel,
        &accepted,
        &rejected_channel,
        &rejected,
    )
    .await
    .map_err(|e| driver.fail(e))?;

    driver.advance(RunState::Done);
    let summary = RunSummary {
        fetched,
        stats,
        outputs,
    };
    info!("RESULTS: {} (total processed: {})", summary, summary.fetched);
    Ok(summary)
}
