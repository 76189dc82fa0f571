//! Shared HTTP stack: client construction policy and page fetching.
//!
//! This module centralizes networking defaults so adapters and the
//! ingestion client stay consistent on timeout, user-agent, compression,
//! and cookie support, and so the API base URL and timeouts are explicit
//! configuration values rather than module-global state.

mod retry;

pub use retry::{FetchRetryPolicy, RetryDecision};

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use reqwest::cookie::Jar;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const READ_TIMEOUT_SECS: u64 = 30;

/// Browser-like user agent; the source sites serve bot-detected clients a
/// different (often empty) document.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Explicit HTTP client configuration shared across the pipeline.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub user_agent: String,
    /// Keep a cookie jar for sites that gate content behind session state.
    pub cookies: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cookies: true,
        }
    }
}

/// Builds an HTTP client using the shared project policy.
///
/// # Errors
///
/// Returns the underlying `reqwest` error when construction fails;
/// callers wrap it in their own error type.
pub fn build_http_client(options: &ClientOptions) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .connect_timeout(options.connect_timeout)
        .timeout(options.read_timeout)
        .user_agent(options.user_agent.clone())
        .gzip(true);

    if options.cookies {
        builder = builder.cookie_provider(Arc::new(Jar::default()));
    }

    builder.build()
}

/// A fetched page: the final URL after redirects plus the raw HTML.
///
/// Parsing into a DOM happens on demand inside synchronous scopes; the
/// parsed document is deliberately not stored here (it is not `Send`).
#[derive(Debug, Clone)]
pub struct Page {
    url: Url,
    html: String,
}

impl Page {
    #[must_use]
    pub fn new(url: Url, html: impl Into<String>) -> Self {
        Self {
            url,
            html: html.into(),
        }
    }

    /// The page URL after any redirects; base for relative-URL resolution.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub fn html(&self) -> &str {
        &self.html
    }

    /// Parses the HTML into a queryable document.
    #[must_use]
    pub fn document(&self) -> scraper::Html {
        scraper::Html::parse_document(&self.html)
    }
}

/// A transport or protocol failure while fetching page state.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to construct HTTP client: {source}")]
    ClientBuild { source: reqwest::Error },

    #[error("network error fetching {url}: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("HTTP {status} fetching {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("response body for {url} could not be read: {source}")]
    Body { url: String, source: reqwest::Error },
}

impl FetchError {
    /// Whether a retry could plausibly succeed (timeouts, connection
    /// faults, server-side errors, rate limiting).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ClientBuild { .. } => false,
            Self::Transport { source, .. } => source.is_timeout() || source.is_connect(),
            Self::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            Self::Body { .. } => true,
        }
    }
}

/// Fetches observable page state over HTTP, with the single shared
/// retry/backoff policy applied to transient extraction-time failures.
///
/// The default policy is a single attempt; submission to the ingestion API
/// never goes through this fetcher.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    policy: FetchRetryPolicy,
}

impl PageFetcher {
    /// Creates a fetcher with the given client options and retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] when client construction fails.
    pub fn new(options: &ClientOptions, policy: FetchRetryPolicy) -> Result<Self, FetchError> {
        let client =
            build_http_client(options).map_err(|source| FetchError::ClientBuild { source })?;
        Ok(Self { client, policy })
    }

    /// Fetches a page, following redirects; the returned [`Page`] carries
    /// the final URL as base for relative-link resolution.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the request fails after the policy's
    /// attempt budget, or on a non-success status.
    pub async fn fetch(&self, url: &Url) -> Result<Page, FetchError> {
        let mut attempt = 1;
        loop {
            match self.fetch_once(url).await {
                Ok(page) => return Ok(page),
                Err(error) => {
                    match self.policy.should_retry(error.is_transient(), attempt) {
                        RetryDecision::Retry { delay, attempt: next } => {
                            warn!(url = %url, %error, next_attempt = next, ?delay, "transient fetch failure; backing off");
                            tokio::time::sleep(delay).await;
                            attempt = next;
                        }
                        RetryDecision::DoNotRetry { reason } => {
                            debug!(url = %url, reason, "not retrying fetch");
                            return Err(error);
                        }
                    }
                }
            }
        }
    }

    /// Fetches a URL's body as text without wrapping it in a [`Page`].
    ///
    /// # Errors
    ///
    /// Same failure modes as [`PageFetcher::fetch`].
    pub async fn fetch_text(&self, url: &Url) -> Result<String, FetchError> {
        self.fetch(url).await.map(|page| page.html)
    }

    async fn fetch_once(&self, url: &Url) -> Result<Page, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let body = response.text().await.map_err(|source| FetchError::Body {
            url: url.to_string(),
            source,
        })?;

        Ok(Page::new(final_url, body))
    }
}
