//! Google Books volumes API.

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
use crate::strategies::{find_toc, longest_toc_block, Extractor};
use crate::validation::{normalize, RuleEngine};

/// Mines Google Books volume records for a table of contents.
///
/// The API has no contents field, so each volume's description is scanned
/// for its longest block of TOC-like lines.
#[derive(Clone)]
pub struct GoogleBooksProvider {
    fetcher: Arc<dyn Fetcher>,
    base_url: String,
    api_key: Option<String>,
    user_agent: String,
    engine: Arc<RuleEngine>,
}

impl std::fmt::Debug for GoogleBooksProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleBooksProvider")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl GoogleBooksProvider {
    /// Creates a provider against an API base URL.
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetcher>, base_url: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            user_agent: user_agent.into(),
            engine: RuleEngine::shared(),
        }
    }

    /// Creates a provider from the crate configuration.
    #[must_use]
    pub fn from_config(fetcher: Arc<dyn Fetcher>, config: &TocflowConfig) -> Self {
        let provider = Self::new(fetcher, config.providers.google_books_base_url.clone(), config.user_agent.clone());
        match &config.providers.google_books_api_key {
            Some(key) => provider.with_api_key(key.clone()),
            None => provider,
        }
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    fn volumes_url(&self, target: &Target) -> Option<String> {
        let query = if let Some(isbn) = target.normalized_isbn() {
            format!("isbn:{isbn}")
        } else {
            let title = target.title.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
            match target.author.as_deref() {
                Some(author) => format!("intitle:{title} inauthor:{author}"),
                None => format!("intitle:{title}"),
            }
        };
        let mut url = format!("{}/volumes?q={}&maxResults=5", self.base_url, encode(&query));
        if let Some(key) = &self.api_key {
            url.push_str(&format!("&key={}", encode(key)));
        }
        Some(url)
    }

    fn toc_from_volume(&self, volume: &Value) -> Option<String> {
        let info = volume.get("volumeInfo")?;
        if let Some(text) = find_toc(info).and_then(|(_, value)| toc_text(value)) {
            return Some(text);
        }
        let description = normalize(info.get("description")?.as_str()?);
        longest_toc_block(&self.engine, &description, 3)
    }
}

#[async_trait]
impl Extractor for GoogleBooksProvider {
    fn name(&self) -> &str {
        methods::GOOGLE_BOOKS
    }

    async fn attempt(&self, target: &Target) -> Result<Candidate, StrategyMiss> {
        let timer = SpanTimer::start(methods::GOOGLE_BOOKS);
        let url = self
            .volumes_url(target)
            .ok_or_else(|| unsearchable(methods::GOOGLE_BOOKS, target))?;
        let volumes = fetch_json(self.fetcher.as_ref(), &url, &json_headers(&self.user_agent)).await?;

        let items = volumes
            .get("items")
            .and_then(Value::as_array)
            .filter(|items| !items.is_empty())
            .ok_or_else(|| StrategyMiss::no_candidate("no volumes matched"))?;

        let (volume_id, text) = items
            .iter()
            .find_map(|volume| {
                let text = self.toc_from_volume(volume)?;
                Some((volume.get("id").cloned().unwrap_or(Value::Null), text))
            })
            .ok_or_else(|| StrategyMiss::no_candidate(format!("no contents in {} volume descriptions", items.len())))?;

        let elapsed_ms = timer.finish();
        debug!(volume = %volume_id, elapsed_ms, "Google Books candidate");
        Ok(Candidate::new(text, methods::GOOGLE_BOOKS)
            .with_metadata("volume", volume_id)
            .with_metadata("elapsed_ms", json!(elapsed_ms)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MissKind;
    use crate::fetch::FetchResponse;
    use crate::testing::ScriptedFetcher;
    use pretty_assertions::assert_eq;

    const BASE: &str = "https://books.googleapis.example.com/books/v1";

    fn volumes() -> Value {
        json!({
            "totalItems": 2,
            "items": [
                {"id": "plain", "volumeInfo": {"title": "Dune", "description": "A desert planet and its spice."}},
                {"id": "vol2", "volumeInfo": {
                    "title": "Dune",
                    "description": "<p>The classic novel.</p><p>Contents:<br>Book One Dune<br>Book Two Muad'Dib<br>Book Three The Prophet<br>Appendix I: The Ecology of Dune</p>"
                }}
            ]
        })
    }

    #[tokio::test]
    async fn test_description_mined_for_contents() {
        let fetcher = Arc::new(ScriptedFetcher::new().route("/volumes", FetchResponse::ok("", volumes().to_string())));
        let provider = GoogleBooksProvider::new(fetcher.clone(), BASE, "ua").with_api_key("k3y");

        let candidate = provider.attempt(&Target::with_isbn("9780441013593")).await.unwrap();
        assert_eq!(
            candidate.text(),
            "Book One Dune\nBook Two Muad'Dib\nBook Three The Prophet\nAppendix I: The Ecology of Dune"
        );
        assert_eq!(candidate.metadata("volume"), Some(&json!("vol2")));

        let url = &fetcher.urls()[0];
        assert!(url.contains("q=isbn%3A9780441013593"), "{url}");
        assert!(url.ends_with("&key=k3y"), "{url}");
    }

    #[tokio::test]
    async fn test_title_query_and_empty_results() {
        let fetcher = Arc::new(ScriptedFetcher::new().route("/volumes", FetchResponse::ok("", r#"{"totalItems": 0}"#)));
        let provider = GoogleBooksProvider::new(fetcher.clone(), BASE, "ua");

        let miss = provider
            .attempt(&Target::with_title("Dune").author("Herbert"))
            .await
            .unwrap_err();
        assert_eq!(miss.kind, MissKind::NoCandidate);
        assert_eq!(miss.message, "no volumes matched");
        assert!(fetcher.urls()[0].contains("q=intitle%3ADune+inauthor%3AHerbert"));
        assert!(!fetcher.urls()[0].contains("key="));
    }

    #[tokio::test]
    async fn test_catalog_id_alone_is_not_queried() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let provider = GoogleBooksProvider::new(fetcher.clone(), BASE, "ua");

        let miss = provider.attempt(&Target::parse("1084336")).await.unwrap_err();
        assert_eq!(miss.kind, MissKind::NoCandidate);
        assert_eq!(
            miss.message,
            "google_books cannot resolve catalog id 1084336; it needs an ISBN or title, or a keyed endpoint using {id}"
        );
        assert!(fetcher.urls().is_empty());
    }

    #[test]
    fn test_api_key_redacted_in_debug() {
        let provider = GoogleBooksProvider::new(Arc::new(ScriptedFetcher::new()), BASE, "ua").with_api_key("secret");
        assert!(!format!("{provider:?}").contains("secret"));
    }
}
