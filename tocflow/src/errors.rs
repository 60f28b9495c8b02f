//! Error types for tocflow.
//!
//! Individual strategy and provider failures never reach the caller as
//! errors: they are folded into [`StrategyMiss`](crate::core::StrategyMiss)
//! values at their own boundary. The types here cover the plumbing
//! underneath (fetching, session handshakes, configuration, persistence).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The main error type for tocflow operations.
#[derive(Debug, Error)]
pub enum TocflowError {
    /// A remote resource could not be reached or answered with an error status.
    #[error("{0}")]
    Fetch(#[from] FetchError),

    /// The session handshake failed.
    #[error("{0}")]
    Session(#[from] SessionError),

    /// An operation exceeded its time budget.
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        /// What was being waited on.
        operation: String,
        /// The budget that was exceeded.
        timeout_ms: u64,
    },

    /// Invalid or unrecognized configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TocflowError {
    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Returns true if this is a session handshake failure.
    #[must_use]
    pub fn is_session(&self) -> bool {
        matches!(self, Self::Session(_))
    }

    /// Returns true if this is a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<serde_json::Error> for TocflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Network failure, timeout or error status while fetching a URL.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("Fetch of {url} failed: {message}")]
pub struct FetchError {
    /// The URL that was attempted.
    pub url: String,
    /// What went wrong.
    pub message: String,
    /// HTTP status, when the server answered.
    pub status: Option<u16>,
}

impl FetchError {
    /// Creates a new fetch error for a URL.
    #[must_use]
    pub fn new(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Creates a fetch error for a non-success HTTP status.
    #[must_use]
    pub fn status(url: impl Into<String>, status: u16) -> Self {
        Self {
            url: url.into(),
            message: format!("HTTP {status}"),
            status: Some(status),
        }
    }

    /// Returns true if the server answered with an error status.
    #[must_use]
    pub fn is_http_status(&self) -> bool {
        self.status.is_some()
    }
}

/// Failure of the initial session handshake.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("Session handshake with {root_url} failed: {message}")]
pub struct SessionError {
    /// The root resource the handshake targeted.
    pub root_url: String,
    /// What went wrong.
    pub message: String,
}

impl SessionError {
    /// Creates a new session error.
    #[must_use]
    pub fn new(root_url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            root_url: root_url.into(),
            message: message.into(),
        }
    }
}

/// Result alias used across the crate.
pub type TocflowResult<T> = Result<T, TocflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display_includes_url() {
        let err = FetchError::new("https://example.com/a", "connection reset");
        assert_eq!(
            err.to_string(),
            "Fetch of https://example.com/a failed: connection reset"
        );
        assert!(!err.is_http_status());
    }

    #[test]
    fn test_fetch_error_status() {
        let err = FetchError::status("https://example.com/b", 403);
        assert_eq!(err.status, Some(403));
        assert_eq!(err.message, "HTTP 403");
        assert!(err.is_http_status());
    }

    #[test]
    fn test_session_error_converts() {
        let err: TocflowError = SessionError::new("https://example.com", "HTTP 500").into();
        assert!(err.is_session());
        assert!(err.to_string().contains("https://example.com"));
    }

    #[test]
    fn test_timeout_error() {
        let err = TocflowError::timeout("strategy dom_selector", 1500);
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "strategy dom_selector timed out after 1500ms");
    }

    #[test]
    fn test_serde_json_error_converts() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json");
        let err: TocflowError = parse.unwrap_err().into();
        assert!(matches!(err, TocflowError::Serialization(_)));
    }
}
