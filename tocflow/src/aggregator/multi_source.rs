//! Concurrent fan-out across provider extractors.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::cache::{CacheStats, TtlCache};
use crate::config::TocflowConfig;
use crate::core::{
    clamp_confidence, methods, AttemptOutcome, AttemptRecord, ExtractionResult, StrategyMiss, Target,
};
use crate::events::{EventSink, ExtractionEvent, NoOpEventSink};
use crate::monitor::PerformanceMonitor;
use crate::observability::SpanTimer;
use crate::strategies::Extractor;
use crate::validation::{ConfidenceModel, ConfidenceScorer, Validator};

type SharedLookup = Shared<BoxFuture<'static, Option<ExtractionResult>>>;

/// Default minimum length of a provider result, in characters.
pub const DEFAULT_MIN_CONTENT_LENGTH: usize = 20;

struct Ranked {
    content: String,
    method: String,
    confidence: f64,
    attempt: usize,
}

/// Queries every provider in parallel and keeps the most confident answer.
///
/// Results are cached by the target's normalized key. Concurrent lookups
/// of the same key share one fan-out, which runs on its own task and
/// finishes even when every caller gives up. Cloning is cheap and clones
/// share the cache, monitor and in-flight table.
#[derive(Clone)]
pub struct MultiSourceAggregator {
    providers: Arc<Vec<Arc<dyn Extractor>>>,
    cache: Arc<TtlCache>,
    validator: Arc<Validator>,
    scorer: Arc<dyn ConfidenceModel>,
    provider_timeout: Duration,
    min_content_length: usize,
    monitor: Option<Arc<PerformanceMonitor>>,
    event_sink: Arc<dyn EventSink>,
    in_flight: Arc<DashMap<String, SharedLookup>>,
}

impl std::fmt::Debug for MultiSourceAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiSourceAggregator")
            .field("providers", &self.provider_names())
            .field("provider_timeout", &self.provider_timeout)
            .field("min_content_length", &self.min_content_length)
            .field("cache", &self.cache.stats())
            .finish_non_exhaustive()
    }
}

impl MultiSourceAggregator {
    /// Creates an aggregator over `providers`, in the order given.
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn Extractor>>, cache: Arc<TtlCache>) -> Self {
        Self {
            providers: Arc::new(providers),
            cache,
            validator: Arc::new(Validator::default()),
            scorer: Arc::new(ConfidenceScorer::default()),
            provider_timeout: Duration::from_secs(10),
            min_content_length: DEFAULT_MIN_CONTENT_LENGTH,
            monitor: None,
            event_sink: Arc::new(NoOpEventSink),
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Creates an aggregator with its own cache, sized from configuration.
    #[must_use]
    pub fn from_config(providers: Vec<Arc<dyn Extractor>>, config: &TocflowConfig) -> Self {
        Self::new(providers, Arc::new(TtlCache::new(config.cache_ttl())))
            .with_validator(Validator::new(config.validator.clone()))
            .with_scorer(Arc::new(ConfidenceScorer::new(config.scoring.clone())))
            .with_provider_timeout(config.provider_timeout())
            .with_min_content_length(config.min_content_length)
    }

    /// Shares an existing cache.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<TtlCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Replaces the validator.
    #[must_use]
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    /// Replaces the confidence model.
    #[must_use]
    pub fn with_scorer(mut self, scorer: Arc<dyn ConfidenceModel>) -> Self {
        self.scorer = scorer;
        self
    }

    /// Sets the per-provider timeout.
    #[must_use]
    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    /// Sets the length floor.
    #[must_use]
    pub fn with_min_content_length(mut self, chars: usize) -> Self {
        self.min_content_length = chars;
        self
    }

    /// Records provider outcomes and cache hits into `monitor`.
    #[must_use]
    pub fn with_monitor(mut self, monitor: Arc<PerformanceMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Provider names, in fan-out order.
    #[must_use]
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// The shared cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<TtlCache> {
        &self.cache
    }

    /// Cache counters.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drops every cached result.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Drops the cached result for one key.
    pub fn invalidate(&self, key: &str) -> bool {
        self.cache.invalidate(key)
    }

    /// Looks up a table of contents for `target`.
    ///
    /// Returns `None` when the target has nothing to key on or when no
    /// provider produced a result that passed the length floor and the
    /// validator. Provider failures never abort the others.
    pub async fn scrape(&self, target: &Target) -> Option<ExtractionResult> {
        let Some(key) = target.cache_key() else {
            warn!(target = %target.display_name(), "Target has no usable lookup key");
            return None;
        };

        let timer = SpanTimer::start("cache_lookup");
        if let Some(entry) = self.cache.get(&key) {
            let duration_ms = timer.finish();
            debug!(key = %key, origin = %entry.source_method, "Cache hit");
            self.event_sink.publish(&ExtractionEvent::CacheHit { key: key.clone() });
            if let Some(monitor) = &self.monitor {
                monitor.record(methods::CACHE, true, 1.0, duration_ms);
            }
            return Some(ExtractionResult::from_cache(entry.value, entry.source_method, duration_ms));
        }

        let lookup = match self.in_flight.entry(key.clone()) {
            Entry::Occupied(existing) => {
                debug!(key = %key, "Joining in-flight lookup");
                existing.get().clone()
            }
            Entry::Vacant(slot) => {
                let this = self.clone();
                let target = target.clone();
                let owned_key = key.clone();
                // Runs to completion even if every caller stops waiting, so
                // the result is cached and the in-flight entry always cleared.
                let handle = tokio::spawn(async move {
                    let result = this.fan_out(&owned_key, &target).await;
                    this.in_flight.remove(&owned_key);
                    result
                });
                let lookup = handle
                    .map(move |joined| {
                        joined.unwrap_or_else(|err| {
                            warn!(key = %key, error = %err, "Lookup task did not complete");
                            None
                        })
                    })
                    .boxed()
                    .shared();
                slot.insert(lookup.clone());
                lookup
            }
        };
        lookup.await
    }

    /// Number of lookups currently running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    async fn fan_out(&self, key: &str, target: &Target) -> Option<ExtractionResult> {
        let timer = SpanTimer::start("aggregate");
        self.event_sink.publish(&ExtractionEvent::CacheMiss {
            key: key.to_string(),
            providers: self.providers.len(),
        });
        debug!(key, providers = self.providers.len(), "Querying providers");

        let tasks: Vec<_> = self
            .providers
            .iter()
            .map(|provider| {
                let provider = Arc::clone(provider);
                let target = target.clone();
                let timeout = self.provider_timeout;
                tokio::spawn(async move {
                    let provider_timer = SpanTimer::start(provider.name().to_string());
                    let attempted = match tokio::time::timeout(timeout, provider.attempt(&target)).await {
                        Ok(attempted) => attempted,
                        Err(_) => Err(StrategyMiss::timeout(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX))),
                    };
                    (provider.name().to_string(), attempted, provider_timer.finish())
                })
            })
            .collect();

        let mut attempts = Vec::with_capacity(tasks.len());
        let mut ranked = Vec::new();
        for joined in join_all(tasks).await {
            let (method, attempted, duration_ms) = match joined {
                Ok(settled) => settled,
                Err(err) => {
                    warn!(error = %err, "Provider task did not complete");
                    continue;
                }
            };

            let text = match attempted {
                Ok(candidate) => candidate.into_text(),
                Err(miss) => {
                    warn!(method = %method, kind = %miss.kind, reason = %miss.message, duration_ms, "Provider missed");
                    self.record(&method, false, 0.0, duration_ms);
                    attempts.push(
                        AttemptRecord::new(&method, AttemptOutcome::Missed(miss.kind), duration_ms).with_detail(miss.message),
                    );
                    continue;
                }
            };

            let rejection = if text.trim().chars().count() < self.min_content_length {
                Some(format!("shorter than {} characters", self.min_content_length))
            } else {
                self.validator.check(&text).err().map(|reason| reason.to_string())
            };
            if let Some(reason) = rejection {
                debug!(method = %method, reason = %reason, "Provider result rejected");
                self.event_sink.publish(&ExtractionEvent::Rejected {
                    method: method.clone(),
                    reason: reason.clone(),
                });
                self.record(&method, false, 0.0, duration_ms);
                attempts.push(AttemptRecord::new(&method, AttemptOutcome::Rejected, duration_ms).with_detail(reason));
                continue;
            }

            let confidence = clamp_confidence(self.scorer.score(&text, &method));
            self.record(&method, true, confidence, duration_ms);
            attempts.push(AttemptRecord::new(&method, AttemptOutcome::NotBetter, duration_ms).with_confidence(confidence));
            ranked.push(Ranked {
                content: text,
                method,
                confidence,
                attempt: attempts.len() - 1,
            });
        }

        // Stable sort: equal confidences keep provider order.
        ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        let accepted = ranked.len();
        let duration_ms = timer.finish();

        let Some(winner) = ranked.into_iter().next() else {
            info!(key, duration_ms, "No provider produced a table of contents");
            self.event_sink.publish(&ExtractionEvent::AggregatorCompleted {
                key: key.to_string(),
                winner: None,
                accepted,
                duration_ms,
            });
            return None;
        };

        attempts[winner.attempt].outcome = AttemptOutcome::Accepted;
        self.cache.insert(key, winner.content.clone(), winner.method.clone(), winner.confidence);
        info!(key, method = %winner.method, confidence = winner.confidence, accepted, duration_ms, "Multi-source lookup completed");
        self.event_sink.publish(&ExtractionEvent::AggregatorCompleted {
            key: key.to_string(),
            winner: Some(winner.method.clone()),
            accepted,
            duration_ms,
        });
        Some(ExtractionResult::accepted(winner.content, winner.method, winner.confidence, duration_ms).with_attempts(attempts))
    }

    fn record(&self, method: &str, success: bool, confidence: f64, duration_ms: u64) {
        if let Some(monitor) = &self.monitor {
            monitor.record(method, success, confidence, duration_ms);
        }
    }
}
