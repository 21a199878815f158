//! reqwest-backed fetcher with bounded retry.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{COOKIE, USER_AGENT};
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::FetchConfig;

use super::{FetchError, Fetcher, Page, Session};

/// Pause between retry attempts.
const RETRY_PAUSE: Duration = Duration::from_millis(300);

pub struct HttpFetcher {
    client: Client,
    retries: u32,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        // The cookie store keeps anything the tracker sets during the
        // warm-up request alive for the rest of the batch.
        let client = Client::builder()
            .timeout(Duration::from_secs(u64::from(config.timeout_secs)))
            .cookie_store(true)
            .build()
            .map_err(|e| FetchError::Http(e.to_string()))?;
        Ok(Self {
            client,
            retries: config.retries,
        })
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Page, FetchError> {
        let mut attempt = 0;
        loop {
            let Some(cloned) = request.try_clone() else {
                return Err(FetchError::Http("request body not replayable".into()));
            };
            match Self::send(cloned).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_transient() && attempt < self.retries => {
                    attempt += 1;
                    warn!(error = %e, attempt = attempt, "Transient fetch failure, retrying");
                    tokio::time::sleep(RETRY_PAUSE).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send(request: reqwest::RequestBuilder) -> Result<Page, FetchError> {
        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        let body = String::from_utf8_lossy(&bytes).into_owned();
        Ok(Page {
            final_url,
            status,
            body,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str, session: &Session) -> Result<Page, FetchError> {
        debug!(url = url, "GET");
        let request = self
            .client
            .get(url)
            .header(COOKIE, session.cookie.as_str())
            .header(USER_AGENT, session.user_agent.as_str());
        self.execute(request).await
    }

    async fn post_form(
        &self,
        url: &str,
        session: &Session,
        form: &[(String, String)],
    ) -> Result<Page, FetchError> {
        debug!(url = url, "POST");
        let request = self
            .client
            .post(url)
            .header(COOKIE, session.cookie.as_str())
            .header(USER_AGENT, session.user_agent.as_str())
            .form(&form);
        self.execute(request).await
    }
}

fn map_reqwest_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else if e.is_connect() {
        FetchError::ConnectionFailed(e.to_string())
    } else if e.is_builder() {
        FetchError::InvalidUrl(e.to_string())
    } else {
        FetchError::Http(e.to_string())
    }
}
