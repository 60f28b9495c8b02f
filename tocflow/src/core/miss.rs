//! Soft failures reported by strategies and providers.

use serde::{Deserialize, Serialize};

use crate::errors::{FetchError, SessionError, TocflowError};

/// Why a strategy produced no candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissKind {
    /// The source was reachable but held nothing usable.
    NoCandidate,
    /// Network failure or error status.
    Fetch,
    /// Session handshake failed.
    Session,
    /// The attempt exceeded its time budget.
    Timeout,
}

impl std::fmt::Display for MissKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoCandidate => write!(f, "no candidate"),
            Self::Fetch => write!(f, "fetch error"),
            Self::Session => write!(f, "session error"),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}

/// A strategy's "nothing found" answer, with the reason it was not found.
///
/// Extractors return this instead of propagating errors, so one failing
/// source never aborts the fallback sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyMiss {
    /// Failure class.
    pub kind: MissKind,
    /// Human readable detail.
    pub message: String,
}

impl StrategyMiss {
    /// Creates a miss of any kind.
    #[must_use]
    pub fn new(kind: MissKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Nothing usable at a reachable source.
    #[must_use]
    pub fn no_candidate(message: impl Into<String>) -> Self {
        Self {
            kind: MissKind::NoCandidate,
            message: message.into(),
        }
    }

    /// The attempt ran out of time.
    #[must_use]
    pub fn timeout(timeout_ms: u64) -> Self {
        Self {
            kind: MissKind::Timeout,
            message: format!("timed out after {timeout_ms}ms"),
        }
    }
}

impl std::fmt::Display for StrategyMiss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl From<FetchError> for StrategyMiss {
    fn from(err: FetchError) -> Self {
        Self {
            kind: MissKind::Fetch,
            message: err.to_string(),
        }
    }
}

impl From<SessionError> for StrategyMiss {
    fn from(err: SessionError) -> Self {
        Self {
            kind: MissKind::Session,
            message: err.to_string(),
        }
    }
}

impl From<TocflowError> for StrategyMiss {
    fn from(err: TocflowError) -> Self {
        let kind = match &err {
            TocflowError::Session(_) => MissKind::Session,
            TocflowError::Timeout { .. } => MissKind::Timeout,
            TocflowError::Fetch(_) | TocflowError::Io(_) => MissKind::Fetch,
            _ => MissKind::NoCandidate,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_from_errors() {
        let miss: StrategyMiss = FetchError::status("https://example.com", 404).into();
        assert_eq!(miss.kind, MissKind::Fetch);
        assert!(miss.message.contains("HTTP 404"));

        let miss: StrategyMiss = TocflowError::from(SessionError::new("https://example.com", "refused")).into();
        assert_eq!(miss.kind, MissKind::Session);

        let miss: StrategyMiss = TocflowError::timeout("fetch", 10).into();
        assert_eq!(miss.kind, MissKind::Timeout);
    }

    #[test]
    fn test_miss_display() {
        let miss = StrategyMiss::no_candidate("no toc container");
        assert_eq!(miss.to_string(), "no candidate: no toc container");
        assert_eq!(StrategyMiss::timeout(250).to_string(), "timeout: timed out after 250ms");
    }
}
