//! The public facade.
//!
//! [`TocClient`] wires the fetcher, strategies, providers, cache, monitor
//! and event sink together and exposes the four entry points surrounding
//! code needs: single-source extraction, multi-source lookup, statistics
//! and statistics persistence.

use std::sync::Arc;
use tracing::debug;

use crate::aggregator::{CacheStats, MultiSourceAggregator, TtlCache};
use crate::config::TocflowConfig;
use crate::core::{AttemptOutcome, ExtractionResult, Target};
use crate::errors::TocflowResult;
use crate::events::{EventSink, NoOpEventSink};
use crate::fetch::Fetcher;
use crate::monitor::{PerformanceMetrics, PerformanceMonitor};
use crate::orchestrator::ExtractionOrchestrator;
use crate::providers::configured_providers;
use crate::session::SessionContext;
use crate::strategies::{Extractor, StrategyRegistry};

/// Table-of-contents client.
#[derive(Debug)]
pub struct TocClient {
    config: TocflowConfig,
    session: Arc<SessionContext>,
    orchestrator: ExtractionOrchestrator,
    aggregator: MultiSourceAggregator,
    monitor: Arc<PerformanceMonitor>,
}

impl TocClient {
    /// Starts building a client.
    #[must_use]
    pub fn builder() -> TocClientBuilder {
        TocClientBuilder::default()
    }

    /// Builds a client with default collaborators from `config`.
    pub fn from_config(config: TocflowConfig) -> TocflowResult<Self> {
        Self::builder().config(config).build()
    }

    /// Runs the ordered fallback sequence for `target` and records every
    /// invoked strategy into the monitor.
    pub async fn extract(&self, target: &Target) -> ExtractionResult {
        let result = self.orchestrator.extract(target).await;
        for attempt in result.attempts() {
            if attempt.outcome == AttemptOutcome::Disabled {
                continue;
            }
            self.monitor.record(
                &attempt.method,
                attempt.outcome.is_validated(),
                attempt.confidence.unwrap_or(0.0),
                attempt.duration_ms,
            );
        }
        result
    }

    /// Queries every provider in parallel for a free-form identifier
    /// (ISBN, catalog id or title).
    ///
    /// The built-in catalog APIs search by ISBN or title only. A bare
    /// catalog id needs a custom keyed endpoint whose template uses `{id}`.
    pub async fn scrape_multi_source(&self, identifier: &str) -> Option<ExtractionResult> {
        self.scrape_target(&Target::parse(identifier)).await
    }

    /// Queries every provider in parallel for a structured target.
    pub async fn scrape_target(&self, target: &Target) -> Option<ExtractionResult> {
        self.aggregator.scrape(target).await
    }

    /// Read-only statistics snapshot.
    #[must_use]
    pub fn get_statistics(&self) -> PerformanceMetrics {
        self.monitor.metrics()
    }

    /// Operational advice from the statistics.
    #[must_use]
    pub fn recommendations(&self) -> Vec<String> {
        self.monitor.recommendations()
    }

    /// Serializes the statistics for persistence.
    pub fn export_snapshot(&self) -> TocflowResult<Vec<u8>> {
        self.monitor.export_snapshot()
    }

    /// Restores persisted statistics. Returns false on invalid input.
    pub fn import_snapshot(&self, bytes: &[u8]) -> bool {
        self.monitor.import_snapshot(bytes)
    }

    /// Clears the statistics.
    pub fn reset_statistics(&self) {
        self.monitor.reset();
    }

    /// Turns one strategy on or off. Returns false for unknown names.
    pub fn set_strategy_enabled(&mut self, name: &str, enabled: bool) -> bool {
        self.orchestrator.registry_mut().set_enabled(name, enabled)
    }

    /// Forgets the site session so the next replay starts a new one.
    pub fn reset_session(&self) {
        self.session.reset();
    }

    /// Drops every cached multi-source result.
    pub fn clear_cache(&self) {
        self.aggregator.clear_cache();
    }

    /// Cache counters.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.aggregator.cache_stats()
    }

    /// The shared monitor.
    #[must_use]
    pub fn monitor(&self) -> &Arc<PerformanceMonitor> {
        &self.monitor
    }

    /// The effective configuration.
    #[must_use]
    pub fn config(&self) -> &TocflowConfig {
        &self.config
    }

    /// The single-source driver.
    #[must_use]
    pub fn orchestrator(&self) -> &ExtractionOrchestrator {
        &self.orchestrator
    }

    /// The multi-source driver.
    #[must_use]
    pub fn aggregator(&self) -> &MultiSourceAggregator {
        &self.aggregator
    }
}

/// Builder for [`TocClient`].
///
/// Anything not supplied is derived from the configuration: the standard
/// strategy registry, the configured providers, a fresh cache and monitor,
/// and, with the `http` feature, a reqwest-backed fetcher.
#[derive(Default)]
pub struct TocClientBuilder {
    config: TocflowConfig,
    fetcher: Option<Arc<dyn Fetcher>>,
    registry: Option<StrategyRegistry>,
    providers: Option<Vec<Arc<dyn Extractor>>>,
    cache: Option<Arc<TtlCache>>,
    monitor: Option<Arc<PerformanceMonitor>>,
    event_sink: Option<Arc<dyn EventSink>>,
}

impl TocClientBuilder {
    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: TocflowConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the fetcher used by strategies, providers and the session.
    #[must_use]
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Replaces the standard strategy registry.
    #[must_use]
    pub fn registry(mut self, registry: StrategyRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Replaces the configured providers.
    #[must_use]
    pub fn providers(mut self, providers: Vec<Arc<dyn Extractor>>) -> Self {
        self.providers = Some(providers);
        self
    }

    /// Shares a cache with other aggregators.
    #[must_use]
    pub fn cache(mut self, cache: Arc<TtlCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Shares a monitor with other components.
    #[must_use]
    pub fn monitor(mut self, monitor: Arc<PerformanceMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// Validates the configuration and assembles the client.
    pub fn build(self) -> TocflowResult<TocClient> {
        let config = self.config;
        config.validate()?;

        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => default_fetcher(&config)?,
        };
        let session = Arc::new(SessionContext::from_config(Arc::clone(&fetcher), &config));
        let registry = self
            .registry
            .unwrap_or_else(|| StrategyRegistry::standard(Arc::clone(&fetcher), Arc::clone(&session), &config));
        let providers = self
            .providers
            .unwrap_or_else(|| configured_providers(&fetcher, &config));
        let monitor = self
            .monitor
            .unwrap_or_else(|| Arc::new(PerformanceMonitor::from_config(&config)));
        let event_sink = self.event_sink.unwrap_or_else(|| Arc::new(NoOpEventSink));

        let orchestrator =
            ExtractionOrchestrator::from_config(registry, &config).with_event_sink(Arc::clone(&event_sink));
        let mut aggregator = MultiSourceAggregator::from_config(providers, &config)
            .with_monitor(Arc::clone(&monitor))
            .with_event_sink(event_sink);
        if let Some(cache) = self.cache {
            aggregator = aggregator.with_cache(cache);
        }

        debug!(
            strategies = ?orchestrator.registry().enabled_names(),
            providers = ?aggregator.provider_names(),
            "Client ready"
        );
        Ok(TocClient {
            config,
            session,
            orchestrator,
            aggregator,
            monitor,
        })
    }
}

#[cfg(feature = "http")]
fn default_fetcher(config: &TocflowConfig) -> TocflowResult<Arc<dyn Fetcher>> {
    let fetcher = crate::fetch::HttpFetcher::from_config(config)?
        .with_observer(Arc::new(crate::fetch::LoggingFetchObserver));
    Ok(Arc::new(fetcher))
}

#[cfg(not(feature = "http"))]
fn default_fetcher(_config: &TocflowConfig) -> TocflowResult<Arc<dyn Fetcher>> {
    Err(crate::errors::TocflowError::Config(
        "no fetcher supplied and the http feature is disabled".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::core::methods;
    use crate::events::{types, CollectingEventSink};
    use crate::fetch::FetchResponse;
    use crate::testing::{fixtures, ScriptedFetcher};
    use pretty_assertions::assert_eq;

    const SITE: &str = "https://books.example.com";

    fn scripted() -> Arc<ScriptedFetcher> {
        Arc::new(
            ScriptedFetcher::new()
                .route("/subject/1084336/", FetchResponse::ok("", fixtures::detail_page("1084336")))
                .route(
                    "/isbn/9781718503106.json",
                    FetchResponse::ok("", fixtures::open_library_edition().to_string()),
                ),
        )
    }

    fn client(fetcher: &Arc<ScriptedFetcher>) -> TocClient {
        TocClient::builder()
            .config(TocflowConfig::default().with_site(SiteConfig::new(SITE)))
            .fetcher(Arc::clone(fetcher) as Arc<dyn Fetcher>)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_extract_records_statistics() {
        let fetcher = scripted();
        let client = client(&fetcher);

        let result = client.extract(&Target::with_id("1084336")).await;
        assert_eq!(result.method(), methods::DOM_SELECTOR);

        let stats = client.get_statistics();
        assert_eq!(stats.total_attempts, 2);
        assert_eq!(stats.total_successes, 1);
        assert_eq!(stats.methods[methods::STRUCTURED_DATA].successes, 0);
        assert_eq!(stats.methods[methods::DOM_SELECTOR].successes, 1);
    }

    #[tokio::test]
    async fn test_disabled_strategies_are_not_recorded() {
        let fetcher = scripted();
        let mut client = client(&fetcher);
        assert!(client.set_strategy_enabled(methods::STRUCTURED_DATA, false));
        assert!(!client.set_strategy_enabled("nope", false));

        client.extract(&Target::with_id("1084336")).await;
        let stats = client.get_statistics();
        assert_eq!(stats.total_attempts, 1);
        assert!(!stats.methods.contains_key(methods::STRUCTURED_DATA));
    }

    #[tokio::test]
    async fn test_multi_source_lookup_is_cached() {
        let fetcher = scripted();
        let sink = Arc::new(CollectingEventSink::new());
        let client = TocClient::builder()
            .config(TocflowConfig::default().with_site(SiteConfig::new(SITE)))
            .fetcher(Arc::clone(&fetcher) as Arc<dyn Fetcher>)
            .event_sink(Arc::clone(&sink) as Arc<dyn EventSink>)
            .build()
            .unwrap();

        let first = client.scrape_multi_source("978-1-7185-0310-6").await.unwrap();
        assert_eq!(first.method(), methods::OPEN_LIBRARY);
        assert!(first.content().is_some_and(|c| c.contains("Getting Started")));

        let second = client.scrape_multi_source("9781718503106").await.unwrap();
        assert_eq!(second.method(), methods::CACHE);
        assert_eq!(second.origin_method(), Some(methods::OPEN_LIBRARY));
        assert_eq!(fetcher.request_count("/isbn/9781718503106.json"), 1);
        assert_eq!(client.cache_stats().hits, 1);
        assert_eq!(sink.events_of_type(types::AGGREGATOR_CACHE_HIT).len(), 1);

        client.clear_cache();
        assert_eq!(client.cache_stats().entries, 0);
    }

    #[tokio::test]
    async fn test_statistics_survive_restart() {
        let fetcher = scripted();
        let before = client(&fetcher);
        before.extract(&Target::with_id("1084336")).await;
        let bytes = before.export_snapshot().unwrap();

        let after = client(&fetcher);
        assert!(after.import_snapshot(&bytes));
        assert_eq!(after.get_statistics(), before.get_statistics());
        assert!(!after.import_snapshot(b"{}"));

        after.reset_statistics();
        assert_eq!(after.get_statistics().total_attempts, 0);
        assert_eq!(after.recommendations(), vec!["No extraction data recorded yet".to_string()]);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = TocflowConfig::default().with_early_exit_threshold(1.5);
        let built = TocClient::builder()
            .config(config)
            .fetcher(Arc::new(ScriptedFetcher::new()) as Arc<dyn Fetcher>)
            .build();
        assert!(built.is_err());
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_default_collaborators() {
        let client = TocClient::from_config(TocflowConfig::default().with_strategy_disabled(methods::TEXT_SCAN)).unwrap();
        assert_eq!(
            client.orchestrator().registry().enabled_names(),
            vec![
                methods::STRUCTURED_DATA,
                methods::DOM_SELECTOR,
                methods::URL_PATTERNS,
                methods::SESSION_REPLAY
            ]
        );
        assert_eq!(
            client.aggregator().provider_names(),
            vec![methods::OPEN_LIBRARY, methods::GOOGLE_BOOKS]
        );
    }

    #[test]
    fn test_shared_monitor() {
        let monitor = Arc::new(PerformanceMonitor::default());
        let client = TocClient::builder()
            .fetcher(Arc::new(ScriptedFetcher::new()) as Arc<dyn Fetcher>)
            .monitor(Arc::clone(&monitor))
            .build()
            .unwrap();
        monitor.record("external", true, 0.9, 10);
        assert_eq!(client.get_statistics().total_attempts, 1);
        assert!(Arc::ptr_eq(client.monitor(), &monitor));
    }
}
