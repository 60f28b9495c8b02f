//! Open Library edition records.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use super::json::{encode, fetch_json, json_headers, toc_text};
use super::unsearchable;
use crate::config::TocflowConfig;
use crate::core::{methods, Candidate, StrategyMiss, Target};
use crate::fetch::Fetcher;
use crate::observability::SpanTimer;
use crate::strategies::{find_toc, Extractor};

/// Reads `table_of_contents` from an Open Library edition, found by ISBN
/// or, failing that, by a title search.
#[derive(Clone)]
pub struct OpenLibraryProvider {
    fetcher: Arc<dyn Fetcher>,
    base_url: String,
    user_agent: String,
}

impl std::fmt::Debug for OpenLibraryProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenLibraryProvider")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenLibraryProvider {
    /// Creates a provider against an API base URL.
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetcher>, base_url: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_agent: user_agent.into(),
        }
    }

    /// Creates a provider from the crate configuration.
    #[must_use]
    pub fn from_config(fetcher: Arc<dyn Fetcher>, config: &TocflowConfig) -> Self {
        Self::new(fetcher, config.providers.open_library_base_url.clone(), config.user_agent.clone())
    }

    async fn edition_url(&self, target: &Target) -> Result<String, StrategyMiss> {
        if let Some(isbn) = target.normalized_isbn() {
            return Ok(format!("{}/isbn/{isbn}.json", self.base_url));
        }
        let title = target
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| unsearchable(methods::OPEN_LIBRARY, target))?;

        let mut url = format!("{}/search.json?title={}&limit=5", self.base_url, encode(title));
        if let Some(author) = target.author.as_deref() {
            url.push_str(&format!("&author={}", encode(author)));
        }
        let results = fetch_json(self.fetcher.as_ref(), &url, &json_headers(&self.user_agent)).await?;
        let edition = first_edition_key(&results)
            .ok_or_else(|| StrategyMiss::no_candidate(format!("no editions found for {title}")))?;
        Ok(format!("{}/books/{edition}.json", self.base_url))
    }
}

fn first_edition_key(results: &Value) -> Option<String> {
    results.get("docs")?.as_array()?.iter().find_map(|doc| {
        doc.get("cover_edition_key")
            .and_then(Value::as_str)
            .or_else(|| doc.get("edition_key")?.get(0)?.as_str())
            .map(String::from)
    })
}

#[async_trait]
impl Extractor for OpenLibraryProvider {
    fn name(&self) -> &str {
        methods::OPEN_LIBRARY
    }

    async fn attempt(&self, target: &Target) -> Result<Candidate, StrategyMiss> {
        let timer = SpanTimer::start(methods::OPEN_LIBRARY);
        let url = self.edition_url(target).await?;
        let edition = fetch_json(self.fetcher.as_ref(), &url, &json_headers(&self.user_agent)).await?;

        let text = find_toc(&edition)
            .and_then(|(_, value)| toc_text(value))
            .ok_or_else(|| StrategyMiss::no_candidate("edition has no table_of_contents"))?;

        let elapsed_ms = timer.finish();
        debug!(url = %url, elapsed_ms, "Open Library candidate");
        let mut candidate = Candidate::new(text, methods::OPEN_LIBRARY)
            .with_metadata("url", json!(url))
            .with_metadata("elapsed_ms", json!(elapsed_ms));
        if let Some(key) = edition.get("key") {
            candidate = candidate.with_metadata("edition", key.clone());
        }
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MissKind;
    use crate::fetch::FetchResponse;
    use crate::testing::{fixtures, ScriptedFetcher};
    use crate::validation::Validator;
    use pretty_assertions::assert_eq;

    const BASE: &str = "https://openlibrary.example.org";

    fn provider(fetcher: ScriptedFetcher) -> OpenLibraryProvider {
        OpenLibraryProvider::new(Arc::new(fetcher), BASE, "ua")
    }

    #[tokio::test]
    async fn test_lookup_by_isbn() {
        let fetcher = ScriptedFetcher::new().route(
            format!("{BASE}/isbn/9781718503106.json"),
            FetchResponse::ok("", fixtures::open_library_edition().to_string()),
        );
        let candidate = provider(fetcher)
            .attempt(&Target::with_isbn("978-1-7185-0310-6"))
            .await
            .unwrap();

        assert_eq!(
            candidate.text(),
            "Preface ... ix\n1. Getting Started ... 1\n2. Programming a Guessing Game ... 13\n3. Common Programming Concepts ... 31\n4. Understanding Ownership ... 59\nIndex ... 521"
        );
        assert!(Validator::default().validate(candidate.text()));
        assert_eq!(candidate.metadata("edition"), Some(&json!("/books/OL26491053M")));
    }

    #[tokio::test]
    async fn test_lookup_by_title_search() {
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .route(
                    "/search.json",
                    FetchResponse::ok("", json!({"docs": [{"title": "x"}, {"edition_key": ["OL1M", "OL2M"]}]}).to_string()),
                )
                .route(
                    format!("{BASE}/books/OL1M.json"),
                    FetchResponse::ok("", fixtures::open_library_edition().to_string()),
                ),
        );
        let provider = OpenLibraryProvider::new(fetcher.clone(), BASE, "ua");
        let target = Target::with_title("The Rust Programming Language").author("Klabnik");
        assert!(provider.attempt(&target).await.is_ok());

        let urls = fetcher.urls();
        assert!(urls[0].contains("title=The+Rust+Programming+Language"));
        assert!(urls[0].contains("author=Klabnik"));
        assert_eq!(urls[1], format!("{BASE}/books/OL1M.json"));
    }

    #[tokio::test]
    async fn test_misses() {
        let fetcher = ScriptedFetcher::new()
            .route(format!("{BASE}/isbn/0000000000.json"), FetchResponse::ok("", r#"{"title": "no toc"}"#))
            .route(format!("{BASE}/isbn/1111111111.json"), FetchResponse::ok("", "<html>"));
        let provider = provider(fetcher);

        let miss = provider.attempt(&Target::with_isbn("0000000000")).await.unwrap_err();
        assert_eq!(miss.kind, MissKind::NoCandidate);
        let miss = provider.attempt(&Target::with_isbn("1111111111")).await.unwrap_err();
        assert!(miss.message.contains("invalid JSON"));
        let miss = provider.attempt(&Target::with_isbn("2222222222")).await.unwrap_err();
        assert_eq!(miss.kind, MissKind::Fetch);
        let miss = provider.attempt(&Target::with_id("42")).await.unwrap_err();
        assert_eq!(miss.kind, MissKind::NoCandidate);
        assert!(miss.message.contains("catalog id 42"), "{}", miss.message);
        assert!(miss.message.contains("{id}"), "{}", miss.message);
        let miss = provider.attempt(&Target::default()).await.unwrap_err();
        assert_eq!(miss.message, "target has no ISBN or title");
    }
}
