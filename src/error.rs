//! Error types for each stage of a run.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure to turn a response body into feed entries.
#[derive(Debug, Error)]
pub enum FeedParseError {
    #[error("malformed XML: {0}")]
    Xml(String),

    #[error("failed to parse Atom feed: {0}")]
    Atom(String),

    #[error("content is not an RSS or Atom feed (preview: {0})")]
    NotAFeed(String),
}

/// Fatal failure while fetching the source feed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} timed out after {secs} seconds")]
    Timeout { url: String, secs: u64 },

    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to parse feed: {0}")]
    Parse(#[from] FeedParseError),

    #[error("feed returned zero entries (feed title: {title}); check the User-Agent and feed URL")]
    NoEntries { title: String },
}

/// Failure of a single text-model call.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("model request failed: {0}")]
    Request(String),

    #[error("model request timed out after {0:?}")]
    Timeout(Duration),

    #[error("model returned an empty response")]
    EmptyResponse,
}

/// Per-item classification failure. Never escapes the classification loop.
#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("entry has an empty title")]
    EmptyTitle,

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("unrecognized model answer: {0:?}")]
    Malformed(String),
}

/// Failure to score one paper for the best-of selection.
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("invalid score JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Fatal failure while producing an output file.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize feed: {0}")]
    Serialize(String),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that terminate a run with a non-zero exit status.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("{failed} of {total} classifications fell back, above the allowed ratio {threshold}")]
    FallbackThreshold {
        failed: usize,
        total: usize,
        threshold: f64,
    },
}

/// Fatal failure of a best-of selection run.
#[derive(Debug, Error)]
pub enum BestOfError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("selection criteria file {0} is empty")]
    EmptyCriteria(PathBuf),

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: FeedParseError,
    },

    #[error(transparent)]
    Write(#[from] WriteError),
}
