//! Selector lookup across several guessed URL layouts.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::html::select_toc;
use super::page::PageLoader;
use super::Extractor;
use crate::core::{methods, Candidate, StrategyMiss, Target};
use crate::observability::SpanTimer;

/// Tries each configured URL pattern in turn and runs the selector lookup
/// on every page that loads. Broader than [`DomSelectorStrategy`]
/// (it survives layout moves) but slower.
///
/// [`DomSelectorStrategy`]: super::DomSelectorStrategy
#[derive(Debug, Clone)]
pub struct UrlPatternsStrategy {
    loader: PageLoader,
}

impl UrlPatternsStrategy {
    /// Creates the strategy.
    #[must_use]
    pub fn new(loader: PageLoader) -> Self {
        Self { loader }
    }
}

#[async_trait]
impl Extractor for UrlPatternsStrategy {
    fn name(&self) -> &str {
        methods::URL_PATTERNS
    }

    async fn attempt(&self, target: &Target) -> Result<Candidate, StrategyMiss> {
        let timer = SpanTimer::start(methods::URL_PATTERNS);
        let id = self
            .loader
            .locate(target)?
            .id
            .ok_or_else(|| StrategyMiss::no_candidate("URL patterns need a catalog id"))?;

        let site = self.loader.site();
        let urls = site.pattern_urls(&id);
        let selectors = site.selectors_for(Some(&id));
        let mut last_miss = None;

        for url in &urls {
            let html = match self.loader.load(url).await {
                Ok(html) => html,
                Err(miss) => {
                    debug!(url = %url, reason = %miss, "URL pattern failed");
                    last_miss = Some(miss);
                    continue;
                }
            };
            if let Some(hit) = select_toc(&html, &selectors) {
                let elapsed_ms = timer.finish();
                debug!(url = %url, selector = %hit.selector, elapsed_ms, "URL pattern candidate");
                return Ok(Candidate::new(hit.text, methods::URL_PATTERNS)
                    .with_metadata("url", json!(url))
                    .with_metadata("selector", json!(hit.selector))
                    .with_metadata("elapsed_ms", json!(elapsed_ms)));
            }
        }

        Err(match last_miss {
            Some(miss) if urls.len() == 1 => miss,
            _ => StrategyMiss::no_candidate(format!("no container at {} URL patterns", urls.len())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::core::MissKind;
    use crate::fetch::FetchResponse;
    use crate::testing::ScriptedFetcher;
    use std::sync::Arc;

    fn site() -> SiteConfig {
        let mut site = SiteConfig::new("https://books.example.com");
        site.url_patterns = vec![
            "{base}/subject/{id}/".to_string(),
            "{base}/subject/{id}/?tab=toc".to_string(),
            "https://m.example.com/book/subject/{id}/".to_string(),
        ];
        site
    }

    #[tokio::test]
    async fn test_falls_through_to_later_pattern() {
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .route("https://books.example.com/subject/5/", FetchResponse::ok("", "<p>no toc</p>"))
                .route_error("https://books.example.com/subject/5/?tab=toc", "reset")
                .route(
                    "https://m.example.com/book/subject/5/",
                    FetchResponse::ok("", "<div id=\"toc\">1. A<br>2. B</div>"),
                ),
        );
        let strategy = UrlPatternsStrategy::new(PageLoader::new(fetcher.clone(), site(), "ua"));

        let candidate = strategy.attempt(&Target::with_id("5")).await.unwrap();
        assert_eq!(candidate.text(), "1. A\n2. B");
        assert_eq!(candidate.metadata("url"), Some(&json!("https://m.example.com/book/subject/5/")));
        assert_eq!(fetcher.urls().len(), 3);
    }

    #[tokio::test]
    async fn test_all_patterns_fail() {
        let strategy = UrlPatternsStrategy::new(PageLoader::new(Arc::new(ScriptedFetcher::new()), site(), "ua"));
        let miss = strategy.attempt(&Target::with_id("5")).await.unwrap_err();
        assert_eq!(miss.kind, MissKind::NoCandidate);
        assert!(miss.message.contains("3 URL patterns"));
    }
}
