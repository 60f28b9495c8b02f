//! Plain (session-less) page loading for the detail-page strategies.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{SiteConfig, TocflowConfig};
use crate::core::{StrategyMiss, Target};
use crate::fetch::Fetcher;
use crate::session::first_detail_id;

/// Where a target's detail page lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailLocation {
    /// Detail page URL.
    pub url: String,
    /// Catalog id, when known or derivable from the URL.
    pub id: Option<String>,
}

/// Fetches site pages with the configured user agent.
#[derive(Clone)]
pub struct PageLoader {
    fetcher: Arc<dyn Fetcher>,
    site: SiteConfig,
    user_agent: String,
}

impl std::fmt::Debug for PageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageLoader")
            .field("site", &self.site.base_url)
            .finish_non_exhaustive()
    }
}

impl PageLoader {
    /// Creates a loader.
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetcher>, site: SiteConfig, user_agent: impl Into<String>) -> Self {
        Self {
            fetcher,
            site,
            user_agent: user_agent.into(),
        }
    }

    /// Creates a loader from the crate configuration.
    #[must_use]
    pub fn from_config(fetcher: Arc<dyn Fetcher>, config: &TocflowConfig) -> Self {
        Self::new(fetcher, config.site.clone(), config.user_agent.clone())
    }

    /// The site being loaded from.
    #[must_use]
    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    /// Resolves the detail page of a target: an explicit URL wins, then
    /// the catalog id.
    pub fn locate(&self, target: &Target) -> Result<DetailLocation, StrategyMiss> {
        let id = target
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(String::from);

        if let Some(url) = target.detail_url.clone() {
            let id = id.or_else(|| first_detail_id(&url));
            return Ok(DetailLocation { url, id });
        }
        match id {
            Some(id) => Ok(DetailLocation {
                url: self.site.detail_url(&id),
                id: Some(id),
            }),
            None => Err(StrategyMiss::no_candidate("target has no catalog id or detail URL")),
        }
    }

    /// GETs a page and returns its body. Error statuses are misses.
    pub async fn load(&self, url: &str) -> Result<String, StrategyMiss> {
        let mut headers = HashMap::new();
        headers.insert("User-Agent".to_string(), self.user_agent.clone());
        let response = self.fetcher.fetch(url, &headers).await?;
        Ok(response.error_for_status(url)?.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MissKind;
    use crate::fetch::FetchResponse;
    use crate::testing::ScriptedFetcher;

    fn loader(fetcher: ScriptedFetcher) -> PageLoader {
        PageLoader::new(Arc::new(fetcher), SiteConfig::new("https://books.example.com"), "ua")
    }

    #[test]
    fn test_locate() {
        let loader = loader(ScriptedFetcher::new());

        let by_id = loader.locate(&Target::with_id("12")).unwrap();
        assert_eq!(by_id.url, "https://books.example.com/subject/12/");
        assert_eq!(by_id.id.as_deref(), Some("12"));

        let by_url = loader
            .locate(&Target::default().detail_url("https://m.example.com/book/subject/99/"))
            .unwrap();
        assert_eq!(by_url.id.as_deref(), Some("99"));

        let miss = loader.locate(&Target::with_title("Dune")).unwrap_err();
        assert_eq!(miss.kind, MissKind::NoCandidate);
    }

    #[tokio::test]
    async fn test_load_maps_failures_to_misses() {
        let fetcher = ScriptedFetcher::new()
            .route("/ok", FetchResponse::ok("", "body"))
            .route("/gone", FetchResponse::with_status("", 404, ""))
            .route_error("/down", "connection refused");
        let loader = loader(fetcher);

        assert_eq!(loader.load("https://books.example.com/ok").await.unwrap(), "body");
        assert_eq!(loader.load("https://books.example.com/gone").await.unwrap_err().kind, MissKind::Fetch);
        assert_eq!(loader.load("https://books.example.com/down").await.unwrap_err().kind, MissKind::Fetch);
    }
}
