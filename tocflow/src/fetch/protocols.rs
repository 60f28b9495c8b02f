//! The transport collaborator interface.
//!
//! The core never talks to the network directly: every request goes
//! through a [`Fetcher`], so tests and embedders can substitute their own.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::errors::FetchError;

/// Response of a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
    /// Response headers in arrival order. Names are lowercase and may repeat.
    pub headers: Vec<(String, String)>,
    /// Final URL after redirects.
    pub final_url: String,
    /// Time taken to fetch in milliseconds.
    pub duration_ms: u64,
}

impl FetchResponse {
    /// Creates a 200 response with a body.
    #[must_use]
    pub fn ok(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self::with_status(url, 200, body)
    }

    /// Creates a response with an explicit status.
    #[must_use]
    pub fn with_status(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: Vec::new(),
            final_url: url.into(),
            duration_ms: 0,
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into().to_ascii_lowercase(), value.into()));
        self
    }

    /// Whether the fetch was successful (2xx status).
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First value of a header, case-insensitive.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Every value of a header, case-insensitive.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// `Set-Cookie` header values.
    pub fn set_cookies(&self) -> impl Iterator<Item = &str> + '_ {
        self.header_values("set-cookie")
    }

    /// Whether the body is JSON according to the content type.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.header("content-type")
            .is_some_and(|ct| ct.contains("application/json") || ct.contains("+json"))
    }

    /// Turns a non-2xx status into a [`FetchError`] tagged with `url`.
    pub fn error_for_status(self, url: &str) -> Result<Self, FetchError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(FetchError::status(url, self.status))
        }
    }
}

/// Protocol for HTTP fetching.
///
/// Implementations report network failures and timeouts through
/// [`FetchError`]; an error status is still an `Ok` response. No retries
/// are expected here.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Issues a GET for `url` with the given headers.
    async fn fetch(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<FetchResponse, FetchError>;
}

/// Observability callbacks for fetch operations.
pub trait FetchObserver: Send + Sync {
    /// Called when a fetch starts.
    fn on_fetch_start(&self, url: &str, request_id: &str);

    /// Called when a fetch completes.
    fn on_fetch_complete(&self, url: &str, request_id: &str, duration_ms: u64, status: u16);

    /// Called when a fetch fails.
    fn on_fetch_error(&self, url: &str, request_id: &str, error: &str);
}

/// No-op implementation of [`FetchObserver`].
#[derive(Debug, Clone, Default)]
pub struct NoOpFetchObserver;

impl FetchObserver for NoOpFetchObserver {
    fn on_fetch_start(&self, _url: &str, _request_id: &str) {}
    fn on_fetch_complete(&self, _url: &str, _request_id: &str, _duration_ms: u64, _status: u16) {}
    fn on_fetch_error(&self, _url: &str, _request_id: &str, _error: &str) {}
}

/// Observer that logs through `tracing`.
#[derive(Debug, Clone, Default)]
pub struct LoggingFetchObserver;

impl FetchObserver for LoggingFetchObserver {
    fn on_fetch_start(&self, url: &str, request_id: &str) {
        tracing::debug!(url, request_id, "Fetch started");
    }

    fn on_fetch_complete(&self, url: &str, request_id: &str, duration_ms: u64, status: u16) {
        tracing::debug!(url, request_id, duration_ms, status, "Fetch completed");
    }

    fn on_fetch_error(&self, url: &str, request_id: &str, error: &str) {
        tracing::warn!(url, request_id, error, "Fetch failed");
    }
}
