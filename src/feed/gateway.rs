use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::storage::{Item, TrendingTopic};

/// Errors surfaced by the remote source.
///
/// The gateway never retries; whether and when to try again is decided by
/// the caller (the pagination state machine leaves `has_more` untouched so
/// the next `request_more` re-attempts the same page).
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Server answered with a non-2xx status
    #[error("Server error: status {0}")]
    Server(u16),
    /// Server answered 429 Too Many Requests
    #[error("Rate limited by remote source")]
    RateLimited,
    /// Response body was not the expected JSON shape
    #[error("Malformed response: {0}")]
    Decode(String),
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
}

impl FetchError {
    /// True when trying the same request again later can plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network(_) | FetchError::Timeout | FetchError::RateLimited => true,
            FetchError::Server(status) => *status >= 500,
            FetchError::Decode(_) | FetchError::ResponseTooLarge => false,
        }
    }
}

/// One page of items as returned by the remote source.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub items: Vec<Item>,
    /// Cursor the source suggests for the next request, if it reports one.
    #[serde(default)]
    pub next_page: Option<u32>,
    /// Whether the source claims more pages exist. Absent means "maybe".
    #[serde(default = "default_has_more")]
    pub has_more: bool,
}

fn default_has_more() -> bool {
    true
}

impl Page {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items,
            next_page: None,
            has_more: true,
        }
    }

    pub fn last(items: Vec<Item>) -> Self {
        Self {
            items,
            next_page: None,
            has_more: false,
        }
    }
}

/// Boundary to the remote paged source.
///
/// Implementations must be side-effect free with respect to controller state:
/// they only perform the call and report the outcome.
#[async_trait]
pub trait FetchGateway: Send + Sync {
    /// Fetch page `page` (1-based) of the feed.
    async fn fetch_page(&self, page: u32) -> Result<Page, FetchError>;

    /// Fetch the current trending topics.
    async fn fetch_trending(&self) -> Result<Vec<TrendingTopic>, FetchError>;
}
