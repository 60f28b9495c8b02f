//! Generic API-key JSON endpoints described entirely by configuration.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use super::json::{encode, fetch_json, json_headers, toc_text, walk};
use crate::config::KeyedEndpointConfig;
use crate::core::{Candidate, StrategyMiss, Target};
use crate::fetch::Fetcher;
use crate::observability::SpanTimer;
use crate::strategies::{find_toc, Extractor};

/// A provider built from a [`KeyedEndpointConfig`].
///
/// The URL template may use `{isbn}`, `{id}`, `{title}` and `{query}`
/// (the first of ISBN, id and title the target has). The contents are read
/// from `toc_path` when set, otherwise through the field-alias table.
#[derive(Clone)]
pub struct KeyedJsonProvider {
    fetcher: Arc<dyn Fetcher>,
    endpoint: KeyedEndpointConfig,
    user_agent: String,
}

impl std::fmt::Debug for KeyedJsonProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedJsonProvider")
            .field("name", &self.endpoint.name)
            .field("url_template", &self.endpoint.url_template)
            .finish_non_exhaustive()
    }
}

impl KeyedJsonProvider {
    /// Creates a provider for one endpoint.
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetcher>, endpoint: KeyedEndpointConfig, user_agent: impl Into<String>) -> Self {
        Self {
            fetcher,
            endpoint,
            user_agent: user_agent.into(),
        }
    }

    /// Expands the URL template for a target.
    pub fn url_for(&self, target: &Target) -> Result<String, StrategyMiss> {
        let isbn = target.normalized_isbn();
        let id = target.id.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let title = target.title.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let query = isbn.as_deref().or(id).or(title);

        let mut url = self.endpoint.url_template.clone();
        for (placeholder, value) in [("{isbn}", isbn.as_deref()), ("{id}", id), ("{title}", title), ("{query}", query)] {
            if !url.contains(placeholder) {
                continue;
            }
            let value = value.ok_or_else(|| {
                StrategyMiss::no_candidate(format!("target has no value for {placeholder}"))
            })?;
            url = url.replace(placeholder, &encode(value));
        }
        Ok(url)
    }
}

#[async_trait]
impl Extractor for KeyedJsonProvider {
    fn name(&self) -> &str {
        &self.endpoint.name
    }

    async fn attempt(&self, target: &Target) -> Result<Candidate, StrategyMiss> {
        let timer = SpanTimer::start(self.endpoint.name.clone());
        let url = self.url_for(target)?;

        let mut headers = json_headers(&self.user_agent);
        if let Some(key) = &self.endpoint.api_key {
            headers.insert(self.endpoint.api_key_header.clone(), key.clone());
        }
        let document = fetch_json(self.fetcher.as_ref(), &url, &headers).await?;

        let value = if self.endpoint.toc_path.is_empty() {
            find_toc(&document).map(|(_, value)| value)
        } else {
            walk(&document, &self.endpoint.toc_path)
        };
        let text = value
            .and_then(toc_text)
            .ok_or_else(|| StrategyMiss::no_candidate(format!("no contents in {} response", self.endpoint.name)))?;

        let elapsed_ms = timer.finish();
        debug!(provider = %self.endpoint.name, url = %url, elapsed_ms, "Keyed endpoint candidate");
        Ok(Candidate::new(text, self.endpoint.name.clone())
            .with_metadata("url", json!(url))
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

    fn endpoint(template: &str, path: &[&str]) -> KeyedEndpointConfig {
        KeyedEndpointConfig {
            name: "catalog".to_string(),
            url_template: template.to_string(),
            api_key: Some("abc".to_string()),
            api_key_header: "X-Api-Key".to_string(),
            toc_path: path.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_url_template() {
        let provider = KeyedJsonProvider::new(
            Arc::new(ScriptedFetcher::new()),
            endpoint("https://api.example.com/books?q={query}&t={title}", &[]),
            "ua",
        );
        assert_eq!(
            provider.url_for(&Target::with_title("Dune Messiah").isbn("0-441-17271-7")).unwrap(),
            "https://api.example.com/books?q=0441172717&t=Dune+Messiah"
        );
        let miss = provider.url_for(&Target::with_isbn("0441172717")).unwrap_err();
        assert!(miss.message.contains("{title}"));
    }

    #[tokio::test]
    async fn test_path_lookup_and_key_header() {
        let body = json!({"result": {"book": {"outline": ["Part 1 Dune", "Part 2 Muad'Dib", "Part 3 The Prophet"]}}});
        let fetcher = Arc::new(ScriptedFetcher::new().route("api.example.com", FetchResponse::ok("", body.to_string())));
        let provider = KeyedJsonProvider::new(
            fetcher.clone(),
            endpoint("https://api.example.com/v1/{isbn}", &["result", "book", "outline"]),
            "ua",
        );

        let candidate = provider.attempt(&Target::with_isbn("9780441172719")).await.unwrap();
        assert_eq!(candidate.source_method(), "catalog");
        assert_eq!(candidate.text(), "Part 1 Dune\nPart 2 Muad'Dib\nPart 3 The Prophet");

        let request = &fetcher.requests()[0];
        assert_eq!(request.url, "https://api.example.com/v1/9780441172719");
        assert_eq!(request.headers.get("X-Api-Key").map(String::as_str), Some("abc"));
    }

    #[tokio::test]
    async fn test_alias_lookup_without_path() {
        let body = json!({"data": {"contents": "1. One\n2. Two\n3. Three"}});
        let fetcher = Arc::new(ScriptedFetcher::new().route("api.example.com", FetchResponse::ok("", body.to_string())));
        let provider = KeyedJsonProvider::new(fetcher, endpoint("https://api.example.com/{id}", &[]), "ua");

        let candidate = provider.attempt(&Target::with_id("7")).await.unwrap();
        assert_eq!(candidate.text(), "1. One\n2. Two\n3. Three");

        let miss = KeyedJsonProvider::new(
            Arc::new(ScriptedFetcher::new().route("api.example.com", FetchResponse::ok("", "{}"))),
            endpoint("https://api.example.com/{id}", &[]),
            "ua",
        )
        .attempt(&Target::with_id("7"))
        .await
        .unwrap_err();
        assert_eq!(miss.kind, MissKind::NoCandidate);
    }
}
