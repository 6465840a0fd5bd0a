//! Fetching the source feed.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, info};

use super::client::{create_http_client, feed_request_headers};
use super::parser::parse_feed;
use super::types::ParsedFeed;
use crate::error::FetchError;
use crate::TARGET_WEB_REQUEST;

/// Where a run gets its entries from.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// URL reported as the `<link>` of the generated feeds.
    fn url(&self) -> &str;

    /// Fetch and parse the feed. Zero entries is an error, never an empty success.
    async fn fetch(&self) -> Result<ParsedFeed, FetchError>;
}

/// A feed fetched with a single HTTP GET.
pub struct HttpFeedSource {
    client: reqwest::Client,
    url: String,
    user_agent: String,
    timeout: Duration,
}

impl HttpFeedSource {
    pub fn new(url: &str, user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        Ok(Self {
            client: create_http_client(timeout)?,
            url: url.to_string(),
            user_agent: user_agent.to_string(),
            timeout,
        })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    fn url(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<ParsedFeed, FetchError> {
        info!(target: TARGET_WEB_REQUEST, "Fetching RSS feed from: {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .headers(feed_request_headers(&self.user_agent))
            .send()
            .await
            .map_err(|source| self.request_error(source))?;

        let status = response.status();
        if !status.is_success() {
            error!(target: TARGET_WEB_REQUEST, "Non-success status {} from {}", status, self.url);
            return Err(FetchError::Status {
                url: self.url.clone(),
                status,
            });
        }
        info!(target: TARGET_WEB_REQUEST, "Successfully fetched RSS feed (status code: {})", status);

        let body = response
            .text()
            .await
            .map_err(|source| self.request_error(source))?;
        debug!(target: TARGET_WEB_REQUEST, "Content length: {} characters", body.chars().count());

        into_entries(parse_feed(&body)?)
    }
}

impl HttpFeedSource {
    fn request_error(&self, source: reqwest::Error) -> FetchError {
        if source.is_timeout() {
            error!(target: TARGET_WEB_REQUEST, "Request to {} timed out", self.url);
            FetchError::Timeout {
                url: self.url.clone(),
                secs: self.timeout.as_secs(),
            }
        } else {
            error!(target: TARGET_WEB_REQUEST, "Request to {} failed: {}", self.url, source);
            FetchError::Request {
                url: self.url.clone(),
                source,
            }
        }
    }
}

/// Rejects a parsed feed with no entries; that usually means the source blocked us.
pub fn into_entries(feed: ParsedFeed) -> Result<ParsedFeed, FetchError> {
    if feed.entries.is_empty() {
        let title = feed.title.unwrap_or_else(|| "No title".to_string());
        error!(target: TARGET_WEB_REQUEST, "Feed returned zero entries (feed title: {})", title);
        return Err(FetchError::NoEntries { title });
    }
    debug!(target: TARGET_WEB_REQUEST, "Parsed feed with {} entries", feed.entries.len());
    Ok(feed)
}
