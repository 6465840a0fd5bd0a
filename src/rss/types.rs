//! Type definitions for the RSS module.

use tokio::time::Duration;

/// One paper record surfaced by the source feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    /// Feed GUID, or the link when the feed has none.
    pub id: String,
    pub title: String,
    pub link: String,
    /// Abstract / description, may be empty.
    pub summary: String,
    /// Publication timestamp exactly as the source feed wrote it.
    pub published: String,
    pub authors: Option<String>,
}

/// A fetched and parsed source feed.
#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    pub title: Option<String>,
    /// The source channel's `lastBuildDate`, carried into the output feeds.
    pub last_build_date: Option<String>,
    pub entries: Vec<Entry>,
}

/// Channel-level metadata for a generated feed.
#[derive(Debug, Clone)]
pub struct ChannelInfo {
    pub title: String,
    pub link: String,
    pub description: String,
    pub last_build_date: Option<String>,
}

pub const ACCEPTED_FEED_FILE: &str = "filtered_feed.xml";
pub const REJECTED_FEED_FILE: &str = "rejected_feed.xml";

pub const DEFAULT_FEED_URL: &str = "https://pubmed.ncbi.nlm.nih.gov/rss/search/1FKYAX__W2XmZZnH7wCJZ2gjg5p61zj0lAum4ErUZK11BzSsdZ/?limit=100";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; PubMedRSSBot/1.0; +https://pubmed.ncbi.nlm.nih.gov/)";
pub const ACCEPT_HEADER: &str = "application/rss+xml, application/xml, text/xml, */*";
pub const ACCEPT_LANGUAGE_HEADER: &str = "en-US,en;q=0.9";

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
