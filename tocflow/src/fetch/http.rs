//! reqwest-backed [`Fetcher`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::protocols::{FetchObserver, FetchResponse, Fetcher, NoOpFetchObserver};
use crate::config::TocflowConfig;
use crate::errors::{FetchError, TocflowError, TocflowResult};
use crate::observability::SpanTimer;

/// Fetches over HTTP with a shared connection pool.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    observer: Arc<dyn FetchObserver>,
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher").finish_non_exhaustive()
    }
}

impl HttpFetcher {
    /// Builds a client with a request timeout and user agent.
    pub fn new(timeout: Duration, user_agent: &str) -> TocflowResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| TocflowError::Internal(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self::with_client(client))
    }

    /// Builds a client from the crate configuration.
    pub fn from_config(config: &TocflowConfig) -> TocflowResult<Self> {
        Self::new(config.request_timeout(), &config.user_agent)
    }

    /// Wraps an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            observer: Arc::new(NoOpFetchObserver),
        }
    }

    /// Sets the fetch observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn FetchObserver>) -> Self {
        self.observer = observer;
        self
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<FetchResponse, FetchError> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let timer = SpanTimer::start("fetch");
        self.observer.on_fetch_start(url, &request_id);

        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                let message = if err.is_timeout() {
                    "request timed out".to_string()
                } else {
                    err.to_string()
                };
                self.observer.on_fetch_error(url, &request_id, &message);
                return Err(FetchError::new(url, message));
            }
        };

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let response_headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response.text().await.map_err(|err| {
            let message = format!("failed to read body: {err}");
            self.observer.on_fetch_error(url, &request_id, &message);
            FetchError::new(url, message)
        })?;

        let duration_ms = timer.elapsed_ms();
        self.observer.on_fetch_complete(url, &request_id, duration_ms, status);

        Ok(FetchResponse {
            status,
            body,
            headers: response_headers,
            final_url,
            duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let fetcher = HttpFetcher::from_config(&TocflowConfig::default());
        assert!(fetcher.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_fetch_error() {
        let fetcher = HttpFetcher::new(Duration::from_millis(200), "tocflow-test").unwrap();
        let err = fetcher
            .fetch("http://127.0.0.1:9/unreachable", &HashMap::new())
            .await
            .unwrap_err();
        assert_eq!(err.url, "http://127.0.0.1:9/unreachable");
        assert!(err.status.is_none());
    }
}
