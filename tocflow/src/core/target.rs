//! The thing being looked up.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// An ambiguous external identifier for a book: catalog id, ISBN, title,
/// or any combination of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Catalog id on the primary site (e.g. a subject id).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// ISBN-10 or ISBN-13, with or without separators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    /// Book title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Author, used only to disambiguate searches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Known detail page URL, bypassing URL construction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_url: Option<String>,
}

impl Target {
    /// Creates a target from a catalog id.
    #[must_use]
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Creates a target from a title.
    #[must_use]
    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// Creates a target from an ISBN.
    #[must_use]
    pub fn with_isbn(isbn: impl Into<String>) -> Self {
        Self {
            isbn: Some(isbn.into()),
            ..Default::default()
        }
    }

    /// Guesses the kind of a free-form identifier: all digits (after
    /// stripping separators) of length 10 or 13 is an ISBN, any other
    /// digit string is a catalog id, everything else is a title.
    #[must_use]
    pub fn parse(identifier: &str) -> Self {
        let trimmed = identifier.trim();
        let compact: String = trimmed.chars().filter(|c| *c != '-' && *c != ' ').collect();
        let digits_only = !compact.is_empty()
            && compact
                .chars()
                .enumerate()
                .all(|(i, c)| c.is_ascii_digit() || (i == compact.len() - 1 && c.eq_ignore_ascii_case(&'x')));

        if digits_only && (compact.len() == 10 || compact.len() == 13) {
            Self::with_isbn(compact)
        } else if digits_only && !compact.ends_with(['x', 'X']) {
            Self::with_id(compact)
        } else {
            Self::with_title(trimmed)
        }
    }

    /// Sets the catalog id.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the ISBN.
    #[must_use]
    pub fn isbn(mut self, isbn: impl Into<String>) -> Self {
        self.isbn = Some(isbn.into());
        self
    }

    /// Sets the title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the author.
    #[must_use]
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Sets a known detail page URL.
    #[must_use]
    pub fn detail_url(mut self, url: impl Into<String>) -> Self {
        self.detail_url = Some(url.into());
        self
    }

    /// The ISBN with separators removed.
    #[must_use]
    pub fn normalized_isbn(&self) -> Option<String> {
        self.isbn.as_ref().and_then(|isbn| {
            let compact: String = isbn
                .chars()
                .filter(char::is_ascii_alphanumeric)
                .map(|c| c.to_ascii_uppercase())
                .collect();
            (!compact.is_empty()).then_some(compact)
        })
    }

    /// The title lowercased with punctuation dropped and whitespace collapsed.
    #[must_use]
    pub fn normalized_title(&self) -> Option<String> {
        self.title.as_deref().map(normalize_title).filter(|t| !t.is_empty())
    }

    /// Stable lookup key: prefers the catalog id, then the ISBN, then the
    /// normalized title.
    #[must_use]
    pub fn lookup_key(&self) -> Option<String> {
        if let Some(id) = self.id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
            return Some(format!("id:{id}"));
        }
        if let Some(isbn) = self.normalized_isbn() {
            return Some(format!("isbn:{isbn}"));
        }
        self.normalized_title().map(|t| format!("title:{t}"))
    }

    /// Hashed cache key derived from [`Self::lookup_key`].
    #[must_use]
    pub fn cache_key(&self) -> Option<String> {
        self.lookup_key().map(|key| {
            let mut hasher = Sha256::new();
            hasher.update(key.as_bytes());
            let digest = hasher.finalize();
            format!("toc:{}", hex::encode(&digest[..16]))
        })
    }

    /// Human readable label for logs and failure messages.
    #[must_use]
    pub fn display_name(&self) -> String {
        match (&self.title, &self.id, &self.isbn) {
            (Some(title), _, _) => format!("\"{title}\""),
            (None, Some(id), _) => format!("#{id}"),
            (None, None, Some(isbn)) => format!("ISBN {isbn}"),
            (None, None, None) => self
                .detail_url
                .clone()
                .unwrap_or_else(|| "<empty target>".to_string()),
        }
    }
}

fn normalize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
