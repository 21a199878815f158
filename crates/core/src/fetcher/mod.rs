//! Authenticated HTTP access to tracker pages.

mod http;

pub use http::HttpFetcher;

use async_trait::async_trait;
use thiserror::Error;

/// A fetched page, observed after redirects.
#[derive(Debug, Clone)]
pub struct Page {
    /// URL the request actually landed on. Trackers redirect expired
    /// sessions to their login portal, so callers inspect this.
    pub final_url: String,
    pub status: u16,
    /// Body decoded as UTF-8, lossily.
    pub body: String,
}

impl Page {
    pub fn new(final_url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            final_url: final_url.into(),
            status,
            body: body.into(),
        }
    }
}

/// Credential material attached to every tracker request.
#[derive(Debug, Clone)]
pub struct Session {
    pub cookie: String,
    pub user_agent: String,
}

impl Session {
    pub fn new(cookie: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            cookie: cookie.into(),
            user_agent: user_agent.into(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

impl FetchError {
    /// Transient failures are worth one more attempt; the rest are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Timeout | FetchError::ConnectionFailed(_))
    }
}

/// Fetches tracker pages with session headers applied.
///
/// The production implementation is [`HttpFetcher`]; tests swap in
/// `testing::MockFetcher`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET a page, following redirects.
    async fn get(&self, url: &str, session: &Session) -> Result<Page, FetchError>;

    /// POST a url-encoded form.
    async fn post_form(
        &self,
        url: &str,
        session: &Session,
        form: &[(String, String)],
    ) -> Result<Page, FetchError>;
}
