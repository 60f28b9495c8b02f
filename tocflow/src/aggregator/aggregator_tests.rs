use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::core::{methods, AttemptOutcome, MissKind, Target};
use crate::events::{types, CollectingEventSink, EventSink};
use crate::monitor::PerformanceMonitor;
use crate::strategies::Extractor;
use crate::testing::{fixtures, FixedConfidence, MockExtractor};

fn as_providers(mocks: &[Arc<MockExtractor>]) -> Vec<Arc<dyn Extractor>> {
    mocks.iter().map(|m| Arc::clone(m) as Arc<dyn Extractor>).collect()
}

fn three_providers() -> [Arc<MockExtractor>; 3] {
    [
        Arc::new(MockExtractor::returning("low", fixtures::terse_toc())),
        Arc::new(MockExtractor::returning("mid", fixtures::verbose_toc())),
        Arc::new(MockExtractor::returning("high", fixtures::sample_toc())),
    ]
}

fn scorer() -> Arc<FixedConfidence> {
    Arc::new(FixedConfidence::new(0.0).with("low", 0.3).with("mid", 0.55).with("high", 0.8))
}

fn target() -> Target {
    Target::with_isbn("978-0-13-409266-9")
}

#[tokio::test]
async fn test_cache_round_trip_respects_ttl() {
    let mocks = three_providers();
    let clock = Arc::new(ManualClock::default());
    let cache = Arc::new(TtlCache::new(Duration::from_secs(60)).with_clock(Arc::clone(&clock) as Arc<dyn Clock>));
    let aggregator = MultiSourceAggregator::new(as_providers(&mocks), cache).with_scorer(scorer());
    let calls = || mocks.iter().map(|m| m.call_count()).collect::<Vec<_>>();

    let first = aggregator.scrape(&target()).await.unwrap();
    assert_eq!(calls(), vec![1, 1, 1]);
    assert_eq!(first.method(), "high");

    let second = aggregator.scrape(&target()).await.unwrap();
    assert_eq!(calls(), vec![1, 1, 1]);
    assert_eq!(second.method(), methods::CACHE);
    assert_eq!(second.origin_method(), Some("high"));
    assert_eq!(second.content(), first.content());
    assert!((second.confidence() - 1.0).abs() < f64::EPSILON);

    clock.advance(Duration::from_secs(61));
    let third = aggregator.scrape(&target()).await.unwrap();
    assert_eq!(calls(), vec![2, 2, 2]);
    assert_eq!(third.method(), "high");

    let stats = aggregator.cache_stats();
    assert_eq!((stats.hits, stats.evictions, stats.entries), (1, 1, 1));
}

#[tokio::test]
async fn test_most_confident_result_wins_and_is_cached() {
    let mocks = three_providers();
    let aggregator =
        MultiSourceAggregator::new(as_providers(&mocks), Arc::new(TtlCache::new(Duration::from_secs(60)))).with_scorer(scorer());

    let result = aggregator.scrape(&target()).await.unwrap();
    assert!((result.confidence() - 0.8).abs() < 1e-9);
    assert_eq!(result.content(), Some(fixtures::sample_toc()));

    let key = target().cache_key().unwrap();
    let cached = aggregator.cache().get(&key).unwrap();
    assert!((cached.confidence - 0.8).abs() < 1e-9);
    assert_eq!(cached.value, fixtures::sample_toc());
    assert_eq!(cached.source_method, "high");

    let outcomes: Vec<_> = result.attempts().iter().map(|a| (a.method.as_str(), a.outcome)).collect();
    assert_eq!(
        outcomes,
        vec![
            ("low", AttemptOutcome::NotBetter),
            ("mid", AttemptOutcome::NotBetter),
            ("high", AttemptOutcome::Accepted)
        ]
    );
}

#[tokio::test]
async fn test_tie_keeps_provider_order() {
    let mocks = [
        Arc::new(MockExtractor::returning("first", fixtures::sample_toc())),
        Arc::new(MockExtractor::returning("second", fixtures::verbose_toc())),
    ];
    let aggregator = MultiSourceAggregator::new(as_providers(&mocks), Arc::new(TtlCache::new(Duration::from_secs(60))))
        .with_scorer(Arc::new(FixedConfidence::new(0.7)));
    assert_eq!(aggregator.scrape(&target()).await.unwrap().method(), "first");
}

#[tokio::test(start_paused = true)]
async fn test_slow_provider_still_wins() {
    let mocks = [
        Arc::new(MockExtractor::returning("fast", fixtures::verbose_toc())),
        Arc::new(MockExtractor::returning("slow", fixtures::sample_toc()).with_delay(Duration::from_secs(2))),
    ];
    let aggregator = MultiSourceAggregator::new(as_providers(&mocks), Arc::new(TtlCache::new(Duration::from_secs(60))))
        .with_scorer(Arc::new(FixedConfidence::new(0.0).with("fast", 0.6).with("slow", 0.9)))
        .with_provider_timeout(Duration::from_secs(5));

    let result = aggregator.scrape(&target()).await.unwrap();
    assert_eq!(result.method(), "slow");
}

#[tokio::test(start_paused = true)]
async fn test_hung_provider_times_out_without_blocking_others() {
    let mocks = [
        Arc::new(MockExtractor::hanging("hung")),
        Arc::new(MockExtractor::returning("ok", fixtures::sample_toc())),
    ];
    let aggregator = MultiSourceAggregator::new(as_providers(&mocks), Arc::new(TtlCache::new(Duration::from_secs(60))))
        .with_provider_timeout(Duration::from_millis(300));

    let result = aggregator.scrape(&target()).await.unwrap();
    assert_eq!(result.method(), "ok");
    let hung = &result.attempts()[0];
    assert_eq!(hung.outcome, AttemptOutcome::Missed(MissKind::Timeout));
    assert_eq!(hung.detail.as_deref(), Some("timed out after 300ms"));
}

#[tokio::test]
async fn test_failures_and_short_results_are_discarded() {
    let mocks = [
        Arc::new(MockExtractor::failing("down", MissKind::Fetch, "HTTP 500")),
        Arc::new(MockExtractor::returning("short", "1. Intro")),
        Arc::new(MockExtractor::returning("noise", fixtures::navigation_noise())),
        Arc::new(MockExtractor::returning("good", fixtures::verbose_toc())),
    ];
    let aggregator =
        MultiSourceAggregator::new(as_providers(&mocks), Arc::new(TtlCache::new(Duration::from_secs(60)))).with_min_content_length(20);

    let result = aggregator.scrape(&target()).await.unwrap();
    assert_eq!(result.method(), "good");
    let outcomes: Vec<_> = result.attempts().iter().map(|a| a.outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            AttemptOutcome::Missed(MissKind::Fetch),
            AttemptOutcome::Rejected,
            AttemptOutcome::Rejected,
            AttemptOutcome::Accepted
        ]
    );
    assert_eq!(result.attempts()[1].detail.as_deref(), Some("shorter than 20 characters"));
}

#[tokio::test]
async fn test_no_acceptable_result_is_not_cached() {
    let mocks = [
        Arc::new(MockExtractor::missing("a")),
        Arc::new(MockExtractor::returning("b", fixtures::navigation_noise())),
    ];
    let sink = Arc::new(CollectingEventSink::new());
    let aggregator = MultiSourceAggregator::new(as_providers(&mocks), Arc::new(TtlCache::new(Duration::from_secs(60))))
        .with_event_sink(Arc::clone(&sink) as Arc<dyn EventSink>);

    assert!(aggregator.scrape(&target()).await.is_none());
    assert!(aggregator.scrape(&target()).await.is_none());
    assert_eq!(mocks[0].call_count(), 2);
    assert_eq!(aggregator.cache_stats().entries, 0);

    let completed = sink.events_of_type(types::AGGREGATOR_COMPLETED);
    assert_eq!(completed.len(), 2);
    assert!(completed[0].1.as_ref().is_some_and(|d| d.get("winner").is_none()));
}

#[tokio::test]
async fn test_target_without_key() {
    let mocks = three_providers();
    let aggregator = MultiSourceAggregator::new(as_providers(&mocks), Arc::new(TtlCache::new(Duration::from_secs(60))));
    assert!(aggregator.scrape(&Target::default()).await.is_none());
    assert_eq!(mocks[0].call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_lookups_share_one_fan_out() {
    let mocks = [
        Arc::new(MockExtractor::returning("a", fixtures::sample_toc()).with_delay(Duration::from_millis(50))),
        Arc::new(MockExtractor::returning("b", fixtures::verbose_toc()).with_delay(Duration::from_millis(80))),
    ];
    let aggregator = MultiSourceAggregator::new(as_providers(&mocks), Arc::new(TtlCache::new(Duration::from_secs(60))));

    let lookups: Vec<_> = (0..6)
        .map(|_| {
            let aggregator = aggregator.clone();
            tokio::spawn(async move { aggregator.scrape(&target()).await })
        })
        .collect();
    let results = futures::future::join_all(lookups).await;

    assert!(results.iter().all(|r| r.as_ref().is_ok_and(|r| r.is_some())));
    assert_eq!(mocks[0].call_count(), 1);
    assert_eq!(mocks[1].call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_lookup_still_completes_and_caches() {
    let slow = Arc::new(MockExtractor::returning("slow", fixtures::sample_toc()).with_delay(Duration::from_secs(2)));
    let aggregator = MultiSourceAggregator::new(
        as_providers(std::slice::from_ref(&slow)),
        Arc::new(TtlCache::new(Duration::from_secs(3600))),
    );

    let abandoned = tokio::time::timeout(Duration::from_millis(100), aggregator.scrape(&target())).await;
    assert!(abandoned.is_err());
    assert_eq!(aggregator.in_flight(), 1);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(aggregator.in_flight(), 0);
    assert_eq!(aggregator.cache().len(), 1);

    let again = aggregator.scrape(&target()).await.unwrap();
    assert_eq!(again.method(), methods::CACHE);
    assert_eq!(again.origin_method(), Some("slow"));
    assert_eq!(slow.call_count(), 1);
}

#[tokio::test]
async fn test_invalidate_and_clear() {
    let mocks = three_providers();
    let aggregator =
        MultiSourceAggregator::new(as_providers(&mocks), Arc::new(TtlCache::new(Duration::from_secs(60)))).with_scorer(scorer());
    let key = target().cache_key().unwrap();

    aggregator.scrape(&target()).await;
    assert!(aggregator.invalidate(&key));
    aggregator.scrape(&target()).await;
    assert_eq!(mocks[0].call_count(), 2);

    aggregator.clear_cache();
    assert_eq!(aggregator.cache_stats().entries, 0);
    aggregator.scrape(&target()).await;
    assert_eq!(mocks[0].call_count(), 3);
}

#[tokio::test]
async fn test_records_into_monitor_and_publishes_events() {
    let mocks = three_providers();
    let monitor = Arc::new(PerformanceMonitor::default());
    let sink = Arc::new(CollectingEventSink::new());
    let aggregator = MultiSourceAggregator::new(as_providers(&mocks), Arc::new(TtlCache::new(Duration::from_secs(60))))
        .with_scorer(scorer())
        .with_monitor(Arc::clone(&monitor))
        .with_event_sink(Arc::clone(&sink) as Arc<dyn EventSink>);

    aggregator.scrape(&target()).await;
    aggregator.scrape(&target()).await;

    assert_eq!(monitor.total_attempts(), 4);
    assert_eq!(monitor.method_statistics(methods::CACHE).map(|s| s.successes), Some(1));
    assert_eq!(monitor.method_statistics("mid").map(|s| s.attempts), Some(1));
    assert_eq!(
        sink.event_types(),
        vec![types::AGGREGATOR_CACHE_MISS, types::AGGREGATOR_COMPLETED, types::AGGREGATOR_CACHE_HIT]
    );
}
