//! HTTP client creation and request headers for feed fetching.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{cookie::Jar, header};
use tracing::debug;

use super::types::{ACCEPT_HEADER, ACCEPT_LANGUAGE_HEADER};
use crate::error::FetchError;
use crate::TARGET_WEB_REQUEST;

/// Create the client used for the feed request.
pub fn create_http_client(request_timeout: Duration) -> Result<reqwest::Client, FetchError> {
    debug!(target: TARGET_WEB_REQUEST, "Creating HTTP client with {:?} timeout", request_timeout);

    let cookie_store = Jar::default();
    reqwest::Client::builder()
        .cookie_store(true)
        .cookie_provider(Arc::new(cookie_store))
        .gzip(true)
        .redirect(reqwest::redirect::Policy::default())
        .timeout(request_timeout)
        .build()
        .map_err(FetchError::Client)
}

/// Browser-like headers; PubMed rejects requests that look automated.
pub fn feed_request_headers(user_agent: &str) -> header::HeaderMap {
    let mut headers = header::HeaderMap::new();
    match header::HeaderValue::from_str(user_agent) {
        Ok(value) => {
            headers.insert(header::USER_AGENT, value);
        }
        Err(_) => {
            debug!(target: TARGET_WEB_REQUEST, "Ignoring invalid User-Agent header value: {:?}", user_agent);
        }
    }
    headers.insert(header::ACCEPT, header::HeaderValue::from_static(ACCEPT_HEADER));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        header::HeaderValue::from_static(ACCEPT_LANGUAGE_HEADER),
    );
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rss::DEFAULT_USER_AGENT;

    #[test]
    fn test_feed_request_headers() {
        let headers = feed_request_headers(DEFAULT_USER_AGENT);
        assert_eq!(headers[header::USER_AGENT], DEFAULT_USER_AGENT);
        assert_eq!(
            headers[header::ACCEPT],
            "application/rss+xml, application/xml, text/xml, */*"
        );
        assert_eq!(headers[header::ACCEPT_LANGUAGE], "en-US,en;q=0.9");
    }

    #[test]
    fn test_invalid_user_agent_is_dropped() {
        let headers = feed_request_headers("bad\nagent");
        assert!(headers.get(header::USER_AGENT).is_none());
        assert!(headers.get(header::ACCEPT).is_some());
    }
}
