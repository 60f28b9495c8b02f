//! Statistics records and derived views.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::Timestamp;

/// Confidence at or above which a result counts as high.
pub const HIGH_CONFIDENCE: f64 = 0.8;
/// Confidence at or above which a result counts as medium.
pub const MEDIUM_CONFIDENCE: f64 = 0.5;

/// Running statistics for one method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodStatistics {
    /// Attempts recorded.
    pub attempts: u64,
    /// Successful attempts recorded.
    pub successes: u64,
    /// Mean response time over all attempts.
    pub avg_response_time_ms: f64,
    /// Mean confidence over successful attempts.
    pub avg_confidence: f64,
    /// Time of the latest attempt.
    pub last_used_at: Option<Timestamp>,
}

impl MethodStatistics {
    /// Folds one outcome in with incremental means.
    pub fn record(&mut self, success: bool, confidence: f64, response_time_ms: u64, at: Timestamp) {
        self.attempts += 1;
        self.avg_response_time_ms += (response_time_ms as f64 - self.avg_response_time_ms) / self.attempts as f64;
        if success {
            self.successes += 1;
            self.avg_confidence += (confidence - self.avg_confidence) / self.successes as f64;
        }
        self.last_used_at = Some(at);
    }

    /// Successes over attempts, 0 when unused.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.successes as f64 / self.attempts as f64
        }
    }

    /// Ranking score used for recommendations.
    #[must_use]
    pub fn recommendation_score(&self) -> f64 {
        0.7 * self.success_rate() + 0.3 * self.avg_confidence
    }
}

/// One entry of the recent-results buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentResult {
    /// Method name.
    pub method: String,
    /// Whether it succeeded.
    pub success: bool,
    /// Reported confidence.
    pub confidence: f64,
    /// Response time.
    pub response_time_ms: u64,
    /// When it was recorded.
    pub recorded_at: Timestamp,
}

/// Counts of successful results per confidence band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceBuckets {
    /// Confidence at least 0.8.
    pub high: u64,
    /// Confidence in `[0.5, 0.8)`.
    pub medium: u64,
    /// Confidence below 0.5.
    pub low: u64,
}

impl ConfidenceBuckets {
    /// Counts one confidence value.
    pub fn add(&mut self, confidence: f64) {
        if confidence >= HIGH_CONFIDENCE {
            self.high += 1;
        } else if confidence >= MEDIUM_CONFIDENCE {
            self.medium += 1;
        } else {
            self.low += 1;
        }
    }

    /// Total counted.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.high + self.medium + self.low
    }
}

/// Read-only snapshot returned by `get_statistics`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    /// Every outcome recorded.
    pub total_attempts: u64,
    /// Successful outcomes recorded.
    pub total_successes: u64,
    /// `total_successes / total_attempts`.
    pub success_rate: f64,
    /// Mean response time over all outcomes.
    pub avg_response_time_ms: f64,
    /// Successful outcomes by confidence band.
    pub confidence_buckets: ConfidenceBuckets,
    /// Per-method statistics.
    pub methods: BTreeMap<String, MethodStatistics>,
    /// Most recent outcomes, oldest first.
    pub recent: Vec<RecentResult>,
    /// Recommended method, if any qualifies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_method: Option<String>,
    /// When the monitor was created or last reset.
    pub tracking_since: Timestamp,
}
