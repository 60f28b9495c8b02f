//! The ordered-fallback driver.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::state::{OrchestratorState, RunTrace};
use crate::config::TocflowConfig;
use crate::core::{clamp_confidence, AttemptOutcome, AttemptRecord, Candidate, ExtractionResult, StrategyMiss, Target};
use crate::events::{EventSink, ExtractionEvent, NoOpEventSink};
use crate::observability::SpanTimer;
use crate::strategies::{Extractor, StrategyRegistry};
use crate::validation::{ConfidenceModel, ConfidenceScorer, Validator};

/// Default confidence at which a run stops early.
pub const DEFAULT_EARLY_EXIT_THRESHOLD: f64 = 0.8;

struct Best {
    content: String,
    method: String,
    confidence: f64,
}

/// Drives a [`StrategyRegistry`] against one target.
///
/// Strategies run one at a time in priority order, each under its own
/// timeout. A validated candidate scoring at least the early-exit
/// threshold ends the run; otherwise the highest-scoring validated
/// candidate wins, with earlier strategies winning ties.
pub struct ExtractionOrchestrator {
    registry: StrategyRegistry,
    validator: Validator,
    scorer: Arc<dyn ConfidenceModel>,
    event_sink: Arc<dyn EventSink>,
    early_exit_threshold: f64,
    attempt_timeout: Duration,
}

impl std::fmt::Debug for ExtractionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionOrchestrator")
            .field("strategies", &self.registry.names())
            .field("early_exit_threshold", &self.early_exit_threshold)
            .field("attempt_timeout", &self.attempt_timeout)
            .finish_non_exhaustive()
    }
}

impl ExtractionOrchestrator {
    /// Creates an orchestrator with default validation and scoring.
    #[must_use]
    pub fn new(registry: StrategyRegistry) -> Self {
        Self {
            registry,
            validator: Validator::default(),
            scorer: Arc::new(ConfidenceScorer::default()),
            event_sink: Arc::new(NoOpEventSink),
            early_exit_threshold: DEFAULT_EARLY_EXIT_THRESHOLD,
            attempt_timeout: Duration::from_secs(15),
        }
    }

    /// Creates an orchestrator with thresholds and timeouts from configuration.
    #[must_use]
    pub fn from_config(registry: StrategyRegistry, config: &TocflowConfig) -> Self {
        Self::new(registry)
            .with_validator(Validator::new(config.validator.clone()))
            .with_scorer(ConfidenceScorer::new(config.scoring.clone()))
            .with_early_exit_threshold(config.early_exit_threshold)
            .with_attempt_timeout(config.request_timeout())
    }

    /// Replaces the validator.
    #[must_use]
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Replaces the confidence model.
    #[must_use]
    pub fn with_scorer(mut self, scorer: impl ConfidenceModel + 'static) -> Self {
        self.scorer = Arc::new(scorer);
        self
    }

    /// Shares a confidence model.
    #[must_use]
    pub fn with_shared_scorer(mut self, scorer: Arc<dyn ConfidenceModel>) -> Self {
        self.scorer = scorer;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Sets the early-exit threshold.
    #[must_use]
    pub fn with_early_exit_threshold(mut self, threshold: f64) -> Self {
        self.early_exit_threshold = threshold;
        self
    }

    /// Sets the per-strategy timeout.
    #[must_use]
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// The strategies, in priority order.
    #[must_use]
    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Mutable access to the strategies, e.g. to toggle one.
    pub fn registry_mut(&mut self) -> &mut StrategyRegistry {
        &mut self.registry
    }

    /// Runs the fallback sequence and returns the single result.
    pub async fn extract(&self, target: &Target) -> ExtractionResult {
        self.extract_traced(target).await.0
    }

    /// Runs the fallback sequence and also returns the states visited.
    pub async fn extract_traced(&self, target: &Target) -> (ExtractionResult, RunTrace) {
        let timer = SpanTimer::start("extract");
        let label = target.display_name();
        let mut trace = RunTrace::new();
        let mut attempts: Vec<AttemptRecord> = Vec::new();
        let mut best: Option<Best> = None;

        let entries = self.registry.entries();
        self.event_sink.publish(&ExtractionEvent::Started {
            target: label.clone(),
            strategies: self.registry.enabled_names().into_iter().map(String::from).collect(),
        });
        debug!(target = %label, strategies = entries.len(), "Starting extraction");

        for (index, entry) in entries.iter().enumerate() {
            let method = entry.extractor.name().to_string();
            if !entry.enabled {
                attempts.push(AttemptRecord::new(method, AttemptOutcome::Disabled, 0));
                continue;
            }

            trace.push(OrchestratorState::Trying(index));
            let attempt_timer = SpanTimer::start(method.clone());
            let attempted = self.attempt_with_timeout(entry.extractor.as_ref(), target).await;
            let duration_ms = attempt_timer.finish();

            let candidate = match attempted {
                Ok(candidate) => candidate,
                Err(miss) => {
                    debug!(method = %method, kind = %miss.kind, reason = %miss.message, duration_ms, "Strategy missed");
                    let record = AttemptRecord::new(&method, AttemptOutcome::Missed(miss.kind), duration_ms)
                        .with_detail(miss.message);
                    self.publish_attempt(&record);
                    attempts.push(record);
                    trace.push(OrchestratorState::Rejected(index));
                    continue;
                }
            };

            if let Err(reason) = self.validator.check(candidate.text()) {
                debug!(method = %method, reason = %reason, duration_ms, "Candidate rejected");
                self.event_sink.publish(&ExtractionEvent::Rejected {
                    method: method.clone(),
                    reason: reason.to_string(),
                });
                let record = AttemptRecord::new(&method, AttemptOutcome::Rejected, duration_ms).with_detail(reason.to_string());
                self.publish_attempt(&record);
                attempts.push(record);
                trace.push(OrchestratorState::Rejected(index));
                continue;
            }

            let confidence = clamp_confidence(self.scorer.score(candidate.text(), &method));

            if confidence >= self.early_exit_threshold {
                let record =
                    AttemptRecord::new(&method, AttemptOutcome::Accepted, duration_ms).with_confidence(confidence);
                self.publish_attempt(&record);
                attempts.push(record);
                trace.push(OrchestratorState::Accepted(index));

                let skipped = entries[index + 1..].iter().filter(|e| e.enabled).count();
                self.event_sink.publish(&ExtractionEvent::EarlyExit {
                    method: method.clone(),
                    confidence,
                    skipped,
                });
                let result = self.finish(candidate.into_text(), method, confidence, attempts, timer);
                trace.push(OrchestratorState::Done);
                return (result, trace);
            }

            let improves = best.as_ref().map_or(true, |b| confidence > b.confidence);
            let outcome = if improves {
                AttemptOutcome::BestUpdated
            } else {
                AttemptOutcome::NotBetter
            };
            let record = AttemptRecord::new(&method, outcome, duration_ms).with_confidence(confidence);
            self.publish_attempt(&record);
            attempts.push(record);
            trace.push(OrchestratorState::BestUpdated(index));

            if improves {
                best = Some(Best {
                    content: candidate.into_text(),
                    method,
                    confidence,
                });
            }
        }

        trace.push(OrchestratorState::Exhausted);
        let result = match best {
            Some(best) => self.finish(best.content, best.method, best.confidence, attempts, timer),
            None => {
                let duration_ms = timer.finish();
                warn!(target = %label, attempts = attempts.len(), duration_ms, "All strategies exhausted");
                self.event_sink.publish(&ExtractionEvent::Exhausted {
                    target: label.clone(),
                    attempts: attempts.len(),
                    duration_ms,
                });
                ExtractionResult::all_failed(&label, attempts, duration_ms)
            }
        };
        trace.push(OrchestratorState::Done);
        (result, trace)
    }

    async fn attempt_with_timeout(
        &self,
        extractor: &dyn Extractor,
        target: &Target,
    ) -> Result<Candidate, StrategyMiss> {
        match tokio::time::timeout(self.attempt_timeout, extractor.attempt(target)).await {
            Ok(attempted) => attempted,
            Err(_) => {
                let timeout_ms = u64::try_from(self.attempt_timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(method = extractor.name(), timeout_ms, "Strategy timed out");
                Err(StrategyMiss::timeout(timeout_ms))
            }
        }
    }

    fn publish_attempt(&self, record: &AttemptRecord) {
        self.event_sink.publish(&ExtractionEvent::Attempted {
            method: record.method.clone(),
            outcome: record.outcome.to_string(),
            confidence: record.confidence,
            duration_ms: record.duration_ms,
        });
    }

    fn finish(
        &self,
        content: String,
        method: String,
        confidence: f64,
        attempts: Vec<AttemptRecord>,
        timer: SpanTimer,
    ) -> ExtractionResult {
        let duration_ms = timer.finish();
        info!(method = %method, confidence, duration_ms, "Extraction completed");
        self.event_sink.publish(&ExtractionEvent::Completed {
            method: method.clone(),
            confidence,
            duration_ms,
        });
        ExtractionResult::accepted(content, method, confidence, duration_ms).with_attempts(attempts)
    }
}
