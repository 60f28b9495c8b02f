//! Multi-source aggregation with a TTL cache.
//!
//! [`MultiSourceAggregator`] fans a lookup out to every provider at once,
//! waits for all of them to settle, and caches the most confident result.

#[cfg(test)]
mod aggregator_tests;
mod cache;
mod multi_source;

pub use cache::{CacheEntry, CacheStats, Clock, ManualClock, SystemClock, TtlCache};
pub use multi_source::{MultiSourceAggregator, DEFAULT_MIN_CONTENT_LENGTH};
