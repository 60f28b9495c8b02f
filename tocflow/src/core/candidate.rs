//! Unvalidated text produced by one strategy attempt.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unvalidated table-of-contents text produced by one extraction attempt.
///
/// A candidate is built once by the strategy that found it and is read-only
/// afterwards; the orchestrator discards it after validation and scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    text: String,
    source_method: String,
    #[serde(default)]
    raw_metadata: HashMap<String, serde_json::Value>,
}

impl Candidate {
    /// Creates a new candidate.
    #[must_use]
    pub fn new(text: impl Into<String>, source_method: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_method: source_method.into(),
            raw_metadata: HashMap::new(),
        }
    }

    /// Attaches a metadata entry while building the candidate.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.raw_metadata.insert(key.into(), value);
        self
    }

    /// The candidate text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Name of the strategy or provider that produced the text.
    #[must_use]
    pub fn source_method(&self) -> &str {
        &self.source_method
    }

    /// Strategy-specific details (source URL, selector, JSON field...).
    #[must_use]
    pub fn raw_metadata(&self) -> &HashMap<String, serde_json::Value> {
        &self.raw_metadata
    }

    /// Looks up a single metadata entry.
    #[must_use]
    pub fn metadata(&self, key: &str) -> Option<&serde_json::Value> {
        self.raw_metadata.get(key)
    }

    /// Consumes the candidate and returns its text.
    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_accessors() {
        let candidate = Candidate::new("Chapter 1\nChapter 2", "dom_selector")
            .with_metadata("selector", serde_json::json!("#toc"));

        assert_eq!(candidate.text(), "Chapter 1\nChapter 2");
        assert_eq!(candidate.source_method(), "dom_selector");
        assert_eq!(candidate.metadata("selector"), Some(&serde_json::json!("#toc")));
        assert!(candidate.metadata("missing").is_none());
        assert_eq!(candidate.into_text(), "Chapter 1\nChapter 2");
    }
}
