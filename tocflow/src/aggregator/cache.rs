//! TTL cache for aggregated results.

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::core::Timestamp;

/// Source of the current time for expiry checks.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current time.
    fn now(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl ManualClock {
    /// Creates a clock stopped at `start`.
    #[must_use]
    pub fn new(start: Timestamp) -> Self {
        Self { now: Mutex::new(start) }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        let next = chrono::Duration::from_std(by)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta));
        if let Some(next) = next {
            *now = next;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}

/// A cached table of contents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntry {
    /// Normalized lookup key.
    pub key: String,
    /// Cached content.
    pub value: String,
    /// Provider that produced the content.
    pub source_method: String,
    /// Confidence the content had when it was cached.
    pub confidence: f64,
    /// When the entry was written.
    pub created_at: Timestamp,
    /// Lifetime of the entry.
    #[serde(with = "duration_secs")]
    pub ttl: Duration,
}

impl CacheEntry {
    /// Whether the entry has outlived its TTL at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        match (now - self.created_at).to_std() {
            Ok(age) => age > self.ttl,
            // Written "in the future" relative to now.
            Err(_) => false,
        }
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }
}

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that found nothing live.
    pub misses: u64,
    /// Entries currently stored, including expired ones not yet evicted.
    pub entries: usize,
    /// Entries dropped because they expired.
    pub evictions: u64,
}

/// Concurrent key-value cache whose entries expire after a fixed TTL.
///
/// Expired entries are evicted lazily on lookup. Writers to one key are
/// serialized by the underlying shard lock.
#[derive(Debug)]
pub struct TtlCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl TtlCache {
    /// Creates an empty cache using the wall clock.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            clock: Arc::new(SystemClock),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Uses a different clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Default lifetime of new entries.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the live entry for `key`.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let now = self.clock.now();
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired_at(now) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.clone());
            }
        }
        if self.entries.remove_if(key, |_, entry| entry.is_expired_at(now)).is_some() {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(key, "Evicted expired cache entry");
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Stores content under `key` with the default TTL.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>, source_method: impl Into<String>, confidence: f64) {
        self.insert_with_ttl(key, value, source_method, confidence, self.ttl);
    }

    /// Stores content under `key` with an explicit TTL.
    pub fn insert_with_ttl(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
        source_method: impl Into<String>,
        confidence: f64,
        ttl: Duration,
    ) {
        let key = key.into();
        let entry = CacheEntry {
            key: key.clone(),
            value: value.into(),
            source_method: source_method.into(),
            confidence,
            created_at: self.clock.now(),
            ttl,
        };
        self.entries.insert(key, entry);
    }

    /// Removes one entry. Returns whether it existed.
    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Removes every entry and resets the counters.
    pub fn clear(&self) {
        self.entries.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with_clock(ttl_secs: u64) -> (TtlCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let cache = TtlCache::new(Duration::from_secs(ttl_secs)).with_clock(Arc::clone(&clock) as Arc<dyn Clock>);
        (cache, clock)
    }

    #[test]
    fn test_get_within_ttl() {
        let (cache, clock) = cache_with_clock(60);
        cache.insert("k", "Chapter 1", "open_library", 0.8);
        clock.advance(Duration::from_secs(60));

        let entry = cache.get("k").unwrap();
        assert_eq!(entry.value, "Chapter 1");
        assert_eq!(entry.source_method, "open_library");
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let (cache, clock) = cache_with_clock(60);
        cache.insert("k", "Chapter 1", "open_library", 0.8);
        clock.advance(Duration::from_secs(61));

        assert!(cache.get("k").is_none());
        assert!(cache.is_empty());
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 0,
                misses: 1,
                entries: 0,
                evictions: 1
            }
        );
    }

    #[test]
    fn test_explicit_ttl_and_invalidate() {
        let (cache, clock) = cache_with_clock(3600);
        cache.insert_with_ttl("short", "a", "m", 0.5, Duration::from_secs(1));
        cache.insert("long", "b", "m", 0.5);
        clock.advance(Duration::from_secs(2));

        assert!(cache.get("short").is_none());
        assert!(cache.get("long").is_some());
        assert!(cache.invalidate("long"));
        assert!(!cache.invalidate("long"));
        assert!(cache.get("long").is_none());
    }

    #[test]
    fn test_clear_resets_counters() {
        let (cache, _) = cache_with_clock(60);
        cache.insert("k", "v", "m", 0.9);
        cache.get("k");
        cache.get("missing");
        cache.clear();
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn test_entry_expiry_boundary() {
        let now = Utc::now();
        let entry = CacheEntry {
            key: "k".into(),
            value: "v".into(),
            source_method: "m".into(),
            confidence: 1.0,
            created_at: now,
            ttl: Duration::from_secs(10),
        };
        assert!(!entry.is_expired_at(now + chrono::Duration::seconds(10)));
        assert!(entry.is_expired_at(now + chrono::Duration::seconds(11)));
        assert!(!entry.is_expired_at(now - chrono::Duration::seconds(5)));
    }
}
