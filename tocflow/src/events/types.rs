//! Typed extraction events.

use serde::Serialize;

/// `extraction.started`
pub const EXTRACTION_STARTED: &str = "extraction.started";
/// `strategy.attempted`
pub const STRATEGY_ATTEMPTED: &str = "strategy.attempted";
/// `strategy.rejected`
pub const STRATEGY_REJECTED: &str = "strategy.rejected";
/// `extraction.early_exit`
pub const EXTRACTION_EARLY_EXIT: &str = "extraction.early_exit";
/// `extraction.completed`
pub const EXTRACTION_COMPLETED: &str = "extraction.completed";
/// `extraction.exhausted`
pub const EXTRACTION_EXHAUSTED: &str = "extraction.exhausted";
/// `aggregator.cache_hit`
pub const AGGREGATOR_CACHE_HIT: &str = "aggregator.cache_hit";
/// `aggregator.cache_miss`
pub const AGGREGATOR_CACHE_MISS: &str = "aggregator.cache_miss";
/// `aggregator.completed`
pub const AGGREGATOR_COMPLETED: &str = "aggregator.completed";

/// Something observable that happened during extraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExtractionEvent {
    /// An orchestrated run began.
    Started {
        /// Target label.
        target: String,
        /// Enabled strategies in order.
        strategies: Vec<String>,
    },
    /// A strategy returned (candidate or miss).
    Attempted {
        /// Strategy name.
        method: String,
        /// Outcome label.
        outcome: String,
        /// Confidence, when validated.
        #[serde(skip_serializing_if = "Option::is_none")]
        confidence: Option<f64>,
        /// Attempt duration.
        duration_ms: u64,
    },
    /// The validator rejected a candidate.
    Rejected {
        /// Strategy name.
        method: String,
        /// Rejection reason.
        reason: String,
    },
    /// A confident result stopped the run.
    EarlyExit {
        /// Strategy name.
        method: String,
        /// Confidence.
        confidence: f64,
        /// Strategies that were not tried.
        skipped: usize,
    },
    /// A run finished with a result.
    Completed {
        /// Winning method.
        method: String,
        /// Confidence.
        confidence: f64,
        /// Total run time.
        duration_ms: u64,
    },
    /// No strategy produced an accepted candidate.
    Exhausted {
        /// Target label.
        target: String,
        /// Attempts made.
        attempts: usize,
        /// Total run time.
        duration_ms: u64,
    },
    /// The aggregator answered from cache.
    CacheHit {
        /// Cache key.
        key: String,
    },
    /// The aggregator had to query providers.
    CacheMiss {
        /// Cache key.
        key: String,
        /// Providers queried.
        providers: usize,
    },
    /// A multi-source lookup settled.
    AggregatorCompleted {
        /// Cache key.
        key: String,
        /// Winning provider, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        winner: Option<String>,
        /// Results that passed validation and the length floor.
        accepted: usize,
        /// Total time.
        duration_ms: u64,
    },
}

impl ExtractionEvent {
    /// Dotted event type name.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Started { .. } => EXTRACTION_STARTED,
            Self::Attempted { .. } => STRATEGY_ATTEMPTED,
            Self::Rejected { .. } => STRATEGY_REJECTED,
            Self::EarlyExit { .. } => EXTRACTION_EARLY_EXIT,
            Self::Completed { .. } => EXTRACTION_COMPLETED,
            Self::Exhausted { .. } => EXTRACTION_EXHAUSTED,
            Self::CacheHit { .. } => AGGREGATOR_CACHE_HIT,
            Self::CacheMiss { .. } => AGGREGATOR_CACHE_MISS,
            Self::AggregatorCompleted { .. } => AGGREGATOR_COMPLETED,
        }
    }

    /// Event payload as JSON.
    #[must_use]
    pub fn payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
