//! Scripted collaborators for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::core::{Candidate, MissKind, StrategyMiss, Target};
use crate::errors::FetchError;
use crate::fetch::{FetchResponse, Fetcher};
use crate::strategies::Extractor;
use crate::validation::ConfidenceModel;

#[derive(Debug, Clone)]
enum Reply {
    Respond(FetchResponse),
    Fail(String),
}

/// A request seen by [`ScriptedFetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// Requested URL.
    pub url: String,
    /// Headers sent with the request.
    pub headers: HashMap<String, String>,
}

/// A [`Fetcher`] that answers from a route table and records every request.
///
/// A pattern starting with `http` matches only that exact URL; any other
/// pattern matches URLs containing it. The first matching route wins and
/// unmatched URLs get an empty 404.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    routes: Vec<(String, Reply)>,
    delay: Option<Duration>,
    requests: Mutex<Vec<RecordedRequest>>,
}

fn route_matches(pattern: &str, url: &str) -> bool {
    if pattern.starts_with("http") {
        pattern == url
    } else {
        url.contains(pattern)
    }
}

impl ScriptedFetcher {
    /// Creates a fetcher with no routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers matching URLs with a response. The response's final URL is
    /// set to the requested URL.
    #[must_use]
    pub fn route(mut self, pattern: impl Into<String>, response: FetchResponse) -> Self {
        self.routes.push((pattern.into(), Reply::Respond(response)));
        self
    }

    /// Fails matching URLs with a transport error.
    #[must_use]
    pub fn route_error(mut self, pattern: impl Into<String>, message: impl Into<String>) -> Self {
        self.routes.push((pattern.into(), Reply::Fail(message.into())));
        self
    }

    /// Sleeps before every answer.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every request so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Requested URLs, in order.
    #[must_use]
    pub fn urls(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.url.clone()).collect()
    }

    /// Number of requests matching a route pattern.
    #[must_use]
    pub fn request_count(&self, pattern: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| route_matches(pattern, &r.url))
            .count()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str, headers: &HashMap<String, String>) -> Result<FetchResponse, FetchError> {
        self.requests.lock().push(RecordedRequest {
            url: url.to_string(),
            headers: headers.clone(),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self
            .routes
            .iter()
            .find(|(pattern, _)| route_matches(pattern, url))
            .map(|(_, reply)| reply.clone());

        match reply {
            Some(Reply::Respond(mut response)) => {
                response.final_url = url.to_string();
                Ok(response)
            }
            Some(Reply::Fail(message)) => Err(FetchError::new(url, message)),
            None => Ok(FetchResponse::with_status(url, 404, "")),
        }
    }
}

#[derive(Debug, Clone)]
enum Behavior {
    Returning(String),
    Missing(MissKind, String),
    Hanging,
}

/// An [`Extractor`] with canned behavior and a call counter.
#[derive(Debug)]
pub struct MockExtractor {
    name: String,
    behavior: Behavior,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockExtractor {
    fn with_behavior(name: impl Into<String>, behavior: Behavior) -> Self {
        Self {
            name: name.into(),
            behavior,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Always produces `text`.
    #[must_use]
    pub fn returning(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with_behavior(name, Behavior::Returning(text.into()))
    }

    /// Always finds nothing.
    #[must_use]
    pub fn missing(name: impl Into<String>) -> Self {
        Self::with_behavior(name, Behavior::Missing(MissKind::NoCandidate, "nothing here".to_string()))
    }

    /// Always misses with the given kind.
    #[must_use]
    pub fn failing(name: impl Into<String>, kind: MissKind, message: impl Into<String>) -> Self {
        Self::with_behavior(name, Behavior::Missing(kind, message.into()))
    }

    /// Never completes.
    #[must_use]
    pub fn hanging(name: impl Into<String>) -> Self {
        Self::with_behavior(name, Behavior::Hanging)
    }

    /// Sleeps before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of attempts so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Extractor for MockExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn attempt(&self, _target: &Target) -> Result<Candidate, StrategyMiss> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.behavior {
            Behavior::Returning(text) => Ok(Candidate::new(text.clone(), self.name.clone())),
            Behavior::Missing(kind, message) => Err(StrategyMiss::new(*kind, message.clone())),
            Behavior::Hanging => std::future::pending().await,
        }
    }
}

/// A [`ConfidenceModel`] that returns a fixed score per method.
#[derive(Debug, Clone, Default)]
pub struct FixedConfidence {
    scores: BTreeMap<String, f64>,
    fallback: f64,
}

impl FixedConfidence {
    /// Scores every method `fallback` unless overridden.
    #[must_use]
    pub fn new(fallback: f64) -> Self {
        Self {
            scores: BTreeMap::new(),
            fallback,
        }
    }

    /// Overrides the score of one method.
    #[must_use]
    pub fn with(mut self, method: impl Into<String>, score: f64) -> Self {
        self.scores.insert(method.into(), score);
        self
    }
}

impl ConfidenceModel for FixedConfidence {
    fn score(&self, _text: &str, method: &str) -> f64 {
        self.scores.get(method).copied().unwrap_or(self.fallback)
    }
}
