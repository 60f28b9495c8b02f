//! Table of contents from a known container element.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::html::select_toc;
use super::page::PageLoader;
use super::Extractor;
use crate::core::{methods, Candidate, StrategyMiss, Target};
use crate::observability::SpanTimer;

/// Looks up the configured container selectors on the detail page.
#[derive(Debug, Clone)]
pub struct DomSelectorStrategy {
    loader: PageLoader,
}

impl DomSelectorStrategy {
    /// Creates the strategy.
    #[must_use]
    pub fn new(loader: PageLoader) -> Self {
        Self { loader }
    }
}

#[async_trait]
impl Extractor for DomSelectorStrategy {
    fn name(&self) -> &str {
        methods::DOM_SELECTOR
    }

    async fn attempt(&self, target: &Target) -> Result<Candidate, StrategyMiss> {
        let timer = SpanTimer::start(methods::DOM_SELECTOR);
        let location = self.loader.locate(target)?;
        let html = self.loader.load(&location.url).await?;
        let selectors = self.loader.site().selectors_for(location.id.as_deref());

        let hit = select_toc(&html, &selectors).ok_or_else(|| {
            StrategyMiss::no_candidate(format!("no container matched {} selectors", selectors.len()))
        })?;

        let elapsed_ms = timer.finish();
        debug!(url = %location.url, selector = %hit.selector, elapsed_ms, "Selector candidate");
        Ok(Candidate::new(hit.text, methods::DOM_SELECTOR)
            .with_metadata("url", json!(location.url))
            .with_metadata("selector", json!(hit.selector))
            .with_metadata("elapsed_ms", json!(elapsed_ms)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::core::MissKind;
    use crate::fetch::FetchResponse;
    use crate::testing::{fixtures, ScriptedFetcher};
    use std::sync::Arc;

    fn strategy(fetcher: ScriptedFetcher) -> DomSelectorStrategy {
        DomSelectorStrategy::new(PageLoader::new(
            Arc::new(fetcher),
            SiteConfig::new("https://books.example.com"),
            "ua",
        ))
    }

    #[tokio::test]
    async fn test_full_container_preferred() {
        let fetcher = ScriptedFetcher::new().route(
            "/subject/1084336/",
            FetchResponse::ok("", fixtures::detail_page("1084336")),
        );
        let candidate = strategy(fetcher).attempt(&Target::with_id("1084336")).await.unwrap();
        assert_eq!(candidate.metadata("selector"), Some(&json!("#dir_1084336_full")));
        assert_eq!(candidate.text(), fixtures::sample_toc());
    }

    #[tokio::test]
    async fn test_generic_selector_without_id() {
        let fetcher = ScriptedFetcher::new().route(
            "https://other.example.com/book/7",
            FetchResponse::ok("", "<ol class=\"toc\"><li>Chapter 1 Sand</li><li>Chapter 2 Spice</li></ol>"),
        );
        let target = Target::default().detail_url("https://other.example.com/book/7");
        let candidate = strategy(fetcher).attempt(&target).await.unwrap();
        assert_eq!(candidate.text(), "Chapter 1 Sand\nChapter 2 Spice");
    }

    #[tokio::test]
    async fn test_missing_container_and_fetch_failure() {
        let fetcher = ScriptedFetcher::new()
            .route("/subject/1/", FetchResponse::ok("", "<p>nothing</p>"))
            .route_error("/subject/2/", "timeout");
        let strategy = strategy(fetcher);

        assert_eq!(strategy.attempt(&Target::with_id("1")).await.unwrap_err().kind, MissKind::NoCandidate);
        assert_eq!(strategy.attempt(&Target::with_id("2")).await.unwrap_err().kind, MissKind::Fetch);
    }
}
