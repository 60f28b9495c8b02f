//! Empirical performance tracking.
//!
//! [`PerformanceMonitor`] is an explicit, shared object: components that
//! record into it receive an `Arc` at construction time.

mod performance;
mod stats;

pub use performance::{
    MonitorSnapshot, PerformanceMonitor, DEFAULT_MIN_ATTEMPTS, DEFAULT_RECENT_CAPACITY, SNAPSHOT_VERSION,
};
pub use stats::{
    ConfidenceBuckets, MethodStatistics, PerformanceMetrics, RecentResult, HIGH_CONFIDENCE, MEDIUM_CONFIDENCE,
};
