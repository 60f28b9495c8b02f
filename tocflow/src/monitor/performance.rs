//! The performance monitor.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use tracing::{debug, warn};

use super::stats::{ConfidenceBuckets, MethodStatistics, PerformanceMetrics, RecentResult};
use crate::config::TocflowConfig;
use crate::core::Timestamp;
use crate::errors::{TocflowError, TocflowResult};

/// Snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Default size of the recent-results buffer.
pub const DEFAULT_RECENT_CAPACITY: usize = 100;

/// Default minimum attempts before a method can be recommended.
pub const DEFAULT_MIN_ATTEMPTS: u64 = 3;

const LOW_SUCCESS_RATE: f64 = 0.5;
const FAILING_METHOD_RATE: f64 = 0.3;
const SLOW_METHOD_MS: f64 = 5_000.0;
const LOW_CONFIDENCE_SHARE: f64 = 0.3;

/// Full statistics state, as exported and imported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    /// Format version.
    pub version: u32,
    /// Every outcome recorded.
    pub total_attempts: u64,
    /// Successful outcomes recorded.
    pub total_successes: u64,
    /// Mean response time over all outcomes.
    pub avg_response_time_ms: f64,
    /// Successful outcomes by confidence band.
    pub confidence_buckets: ConfidenceBuckets,
    /// Per-method statistics.
    pub methods: BTreeMap<String, MethodStatistics>,
    /// Most recent outcomes, oldest first.
    pub recent: VecDeque<RecentResult>,
    /// When tracking started.
    pub tracking_since: Timestamp,
}

impl MonitorSnapshot {
    fn empty() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            total_attempts: 0,
            total_successes: 0,
            avg_response_time_ms: 0.0,
            confidence_buckets: ConfidenceBuckets::default(),
            methods: BTreeMap::new(),
            recent: VecDeque::new(),
            tracking_since: Utc::now(),
        }
    }

    /// Decodes and checks a JSON snapshot.
    pub fn from_bytes(bytes: &[u8]) -> TocflowResult<Self> {
        let snapshot: Self =
            serde_json::from_slice(bytes).map_err(|err| TocflowError::Serialization(err.to_string()))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(TocflowError::Serialization(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                snapshot.version
            )));
        }
        Ok(snapshot)
    }
}

/// Observes extraction outcomes and turns them into statistics and advice.
///
/// One instance is shared by every component that records into it; there
/// is no global monitor. Readers never block each other.
#[derive(Debug)]
pub struct PerformanceMonitor {
    state: RwLock<MonitorSnapshot>,
    capacity: usize,
    min_attempts: u64,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_RECENT_CAPACITY, DEFAULT_MIN_ATTEMPTS)
    }
}

impl PerformanceMonitor {
    /// Creates an empty monitor.
    #[must_use]
    pub fn new(recent_capacity: usize, min_attempts_for_recommendation: u64) -> Self {
        Self {
            state: RwLock::new(MonitorSnapshot::empty()),
            capacity: recent_capacity.max(1),
            min_attempts: min_attempts_for_recommendation,
        }
    }

    /// Creates an empty monitor sized from configuration.
    #[must_use]
    pub fn from_config(config: &TocflowConfig) -> Self {
        Self::new(config.recent_results_capacity, config.min_attempts_for_recommendation)
    }

    /// Size of the recent-results buffer.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records one outcome.
    pub fn record(&self, method: &str, success: bool, confidence: f64, response_time_ms: u64) {
        let now = Utc::now();
        let mut guard = self.state.write();
        let state = &mut *guard;

        state.total_attempts += 1;
        let n = state.total_attempts as f64;
        state.avg_response_time_ms += (response_time_ms as f64 - state.avg_response_time_ms) / n;
        if success {
            state.total_successes += 1;
            state.confidence_buckets.add(confidence);
        }

        state
            .methods
            .entry(method.to_string())
            .or_default()
            .record(success, confidence, response_time_ms, now);

        if state.recent.len() >= self.capacity {
            state.recent.pop_front();
        }
        state.recent.push_back(RecentResult {
            method: method.to_string(),
            success,
            confidence,
            response_time_ms,
            recorded_at: now,
        });
        debug!(method, success, confidence, response_time_ms, "Recorded outcome");
    }

    /// Total outcomes recorded.
    #[must_use]
    pub fn total_attempts(&self) -> u64 {
        self.state.read().total_attempts
    }

    /// Successful outcomes recorded.
    #[must_use]
    pub fn total_successes(&self) -> u64 {
        self.state.read().total_successes
    }

    /// Overall success rate, 0 with no data.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        let state = self.state.read();
        if state.total_attempts == 0 {
            0.0
        } else {
            state.total_successes as f64 / state.total_attempts as f64
        }
    }

    /// Mean response time over all outcomes.
    #[must_use]
    pub fn avg_response_time_ms(&self) -> f64 {
        self.state.read().avg_response_time_ms
    }

    /// Successful outcomes by confidence band.
    #[must_use]
    pub fn confidence_buckets(&self) -> ConfidenceBuckets {
        self.state.read().confidence_buckets
    }

    /// Statistics for one method.
    #[must_use]
    pub fn method_statistics(&self, method: &str) -> Option<MethodStatistics> {
        self.state.read().methods.get(method).cloned()
    }

    /// Recent outcomes, oldest first.
    #[must_use]
    pub fn recent_results(&self) -> Vec<RecentResult> {
        self.state.read().recent.iter().cloned().collect()
    }

    /// The method with the best `0.7 * success rate + 0.3 * avg confidence`
    /// among those with enough attempts. Ties go to the name sorting first.
    #[must_use]
    pub fn best_method(&self) -> Option<String> {
        Self::best_of(&self.state.read().methods, self.min_attempts)
    }

    fn best_of(methods: &BTreeMap<String, MethodStatistics>, min_attempts: u64) -> Option<String> {
        let mut best: Option<(&String, f64)> = None;
        for (name, stats) in methods.iter().filter(|(_, s)| s.attempts >= min_attempts) {
            let score = stats.recommendation_score();
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((name, score));
            }
        }
        best.map(|(name, _)| name.clone())
    }

    /// Read-only snapshot of every statistic.
    #[must_use]
    pub fn metrics(&self) -> PerformanceMetrics {
        let state = self.state.read();
        let success_rate = if state.total_attempts == 0 {
            0.0
        } else {
            state.total_successes as f64 / state.total_attempts as f64
        };
        PerformanceMetrics {
            total_attempts: state.total_attempts,
            total_successes: state.total_successes,
            success_rate,
            avg_response_time_ms: state.avg_response_time_ms,
            confidence_buckets: state.confidence_buckets,
            methods: state.methods.clone(),
            recent: state.recent.iter().cloned().collect(),
            best_method: Self::best_of(&state.methods, self.min_attempts),
            tracking_since: state.tracking_since,
        }
    }

    /// Operational advice derived from the statistics.
    #[must_use]
    pub fn recommendations(&self) -> Vec<String> {
        let metrics = self.metrics();
        if metrics.total_attempts == 0 {
            return vec!["No extraction data recorded yet".to_string()];
        }

        let mut advice = Vec::new();
        if metrics.total_attempts >= self.min_attempts && metrics.success_rate < LOW_SUCCESS_RATE {
            advice.push(format!(
                "Overall success rate is {:.0}%; check network access and site selectors",
                metrics.success_rate * 100.0
            ));
        }

        for (name, stats) in metrics.methods.iter().filter(|(_, s)| s.attempts >= self.min_attempts) {
            if stats.success_rate() < FAILING_METHOD_RATE {
                advice.push(format!(
                    "Method {name} succeeds only {:.0}% of the time; consider disabling it",
                    stats.success_rate() * 100.0
                ));
            }
            if stats.avg_response_time_ms > SLOW_METHOD_MS {
                advice.push(format!(
                    "Method {name} averages {:.0}ms; consider a shorter timeout or a lower priority",
                    stats.avg_response_time_ms
                ));
            }
        }

        if let Some(best) = &metrics.best_method {
            if let Some(stats) = metrics.methods.get(best) {
                advice.push(format!(
                    "Prefer {best} (success {:.0}%, avg confidence {:.2})",
                    stats.success_rate() * 100.0,
                    stats.avg_confidence
                ));
            }
        }

        let buckets = metrics.confidence_buckets;
        if buckets.total() > 0 {
            let low_share = buckets.low as f64 / buckets.total() as f64;
            if low_share > LOW_CONFIDENCE_SHARE {
                advice.push(format!(
                    "{:.0}% of successful results have low confidence; review validation thresholds",
                    low_share * 100.0
                ));
            }
        }

        if advice.is_empty() {
            advice.push("Extraction is performing normally".to_string());
        }
        advice
    }

    /// Clears every statistic and restarts tracking.
    pub fn reset(&self) {
        *self.state.write() = MonitorSnapshot::empty();
    }

    /// Copy of the full state.
    #[must_use]
    pub fn snapshot(&self) -> MonitorSnapshot {
        self.state.read().clone()
    }

    /// Serializes the full state to JSON bytes.
    pub fn export_snapshot(&self) -> TocflowResult<Vec<u8>> {
        serde_json::to_vec(&*self.state.read()).map_err(|err| TocflowError::Serialization(err.to_string()))
    }

    /// Replaces the state with a snapshot. Returns false, leaving the
    /// current state untouched, if the bytes are not a valid snapshot.
    pub fn import_snapshot(&self, bytes: &[u8]) -> bool {
        match MonitorSnapshot::from_bytes(bytes) {
            Ok(snapshot) => {
                self.restore(snapshot);
                true
            }
            Err(err) => {
                warn!(error = %err, "Ignoring invalid statistics snapshot");
                false
            }
        }
    }

    /// Replaces the state with a decoded snapshot. Recent results beyond
    /// this monitor's capacity are dropped oldest first.
    pub fn restore(&self, mut snapshot: MonitorSnapshot) {
        while snapshot.recent.len() > self.capacity {
            snapshot.recent.pop_front();
        }
        *self.state.write() = snapshot;
    }

    /// Snapshot as base64 text, for string-only settings stores.
    pub fn export_snapshot_base64(&self) -> TocflowResult<String> {
        Ok(STANDARD.encode(self.export_snapshot()?))
    }

    /// Imports a base64 snapshot.
    pub fn import_snapshot_base64(&self, encoded: &str) -> bool {
        match STANDARD.decode(encoded.trim()) {
            Ok(bytes) => self.import_snapshot(&bytes),
            Err(err) => {
                warn!(error = %err, "Ignoring snapshot with invalid base64");
                false
            }
        }
    }

    /// Writes the snapshot to a file.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> TocflowResult<()> {
        std::fs::write(path, self.export_snapshot()?)?;
        Ok(())
    }

    /// Loads a snapshot from a file.
    pub fn load_from_file(&self, path: impl AsRef<Path>) -> TocflowResult<()> {
        let bytes = std::fs::read(path)?;
        self.restore(MonitorSnapshot::from_bytes(&bytes)?);
        Ok(())
    }
}
