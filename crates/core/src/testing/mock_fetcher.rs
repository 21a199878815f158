//! Mock fetcher for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::fetcher::{FetchError, Fetcher, Page, Session};

/// A recorded request for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method, "GET" or "POST".
    pub method: String,
    /// The URL that was requested.
    pub url: String,
    /// Cookie header the request carried.
    pub cookie: String,
    /// Form body, present on POST.
    pub form: Option<Vec<(String, String)>>,
}

/// Mock implementation of the Fetcher trait.
///
/// Provides controllable behavior for testing:
/// - Serve configured pages per URL (unknown URLs get an empty 200)
/// - Track requests for assertions
/// - Simulate failures, per URL or once globally
///
/// # Example
///
/// ```rust,ignore
/// use peersift_core::testing::MockFetcher;
///
/// let fetcher = MockFetcher::new();
/// fetcher.set_body("https://example.org/details.php?id=1", "<h1>...</h1>").await;
///
/// let page = fetcher.get("https://example.org/details.php?id=1", &session).await?;
/// assert_eq!(fetcher.request_count().await, 1);
/// ```
pub struct MockFetcher {
    /// Configured pages keyed by URL.
    routes: Arc<RwLock<HashMap<String, Page>>>,
    /// Persistent per-URL failures.
    url_errors: Arc<RwLock<HashMap<String, FetchError>>>,
    /// If set, the next request will fail with this error.
    next_error: Arc<RwLock<Option<FetchError>>>,
    /// Recorded requests.
    requests: Arc<RwLock<Vec<RecordedRequest>>>,
}

impl std::fmt::Debug for MockFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockFetcher")
            .field("routes", &"<routes>")
            .field("url_errors", &"<url_errors>")
            .field("next_error", &"<next_error>")
            .field("requests", &"<requests>")
            .finish()
    }
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFetcher {
    /// Create a new mock fetcher with no configured routes.
    pub fn new() -> Self {
        Self {
            routes: Arc::new(RwLock::new(HashMap::new())),
            url_errors: Arc::new(RwLock::new(HashMap::new())),
            next_error: Arc::new(RwLock::new(None)),
            requests: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Serve a plain 200 page with the given body for a URL.
    pub async fn set_body(&self, url: &str, body: &str) {
        let page = Page::new(url, 200, body);
        self.routes.write().await.insert(url.to_string(), page);
    }

    /// Serve a fully specified page for a URL. Use this to simulate a
    /// redirect by giving the page a different `final_url`.
    pub async fn set_page(&self, url: &str, page: Page) {
        self.routes.write().await.insert(url.to_string(), page);
    }

    /// Fail every request for a URL with the given error.
    pub async fn set_error(&self, url: &str, error: FetchError) {
        self.url_errors.write().await.insert(url.to_string(), error);
    }

    /// Configure the next request to fail with the given error.
    pub async fn set_next_error(&self, error: FetchError) {
        *self.next_error.write().await = Some(error);
    }

    /// Get recorded requests.
    pub async fn recorded_requests(&self) -> Vec<RecordedRequest> {
        self.requests.read().await.clone()
    }

    /// Clear recorded requests.
    pub async fn clear_recorded(&self) {
        self.requests.write().await.clear();
    }

    /// Get the number of requests performed.
    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }

    async fn record(
        &self,
        method: &str,
        url: &str,
        session: &Session,
        form: Option<Vec<(String, String)>>,
    ) {
        self.requests.write().await.push(RecordedRequest {
            method: method.to_string(),
            url: url.to_string(),
            cookie: session.cookie.clone(),
            form,
        });
    }

    async fn respond(&self, url: &str) -> Result<Page, FetchError> {
        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }
        if let Some(err) = self.url_errors.read().await.get(url) {
            return Err(err.clone());
        }
        match self.routes.read().await.get(url) {
            Some(page) => Ok(page.clone()),
            None => Ok(Page::new(url, 200, "")),
        }
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn get(&self, url: &str, session: &Session) -> Result<Page, FetchError> {
        self.record("GET", url, session, None).await;
        self.respond(url).await
    }

    async fn post_form(
        &self,
        url: &str,
        session: &Session,
        form: &[(String, String)],
    ) -> Result<Page, FetchError> {
        self.record("POST", url, session, Some(form.to_vec())).await;
        self.respond(url).await
    }
}
