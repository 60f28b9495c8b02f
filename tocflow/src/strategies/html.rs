//! HTML helpers shared by the page-based strategies.
//!
//! `scraper::Html` is not `Send`, so every helper parses, extracts owned
//! data and drops the document before returning. Callers can hold the
//! results across `.await` points.

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::OnceLock;

use crate::validation::normalize;

/// A table-of-contents container found by selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorHit {
    /// Selector that matched.
    pub selector: String,
    /// Normalized container text.
    pub text: String,
}

/// Tries selectors in order and returns the first container with text.
/// Selectors that fail to parse are skipped.
#[must_use]
pub fn select_toc(html: &str, selectors: &[String]) -> Option<SelectorHit> {
    let document = Html::parse_document(html);
    selectors.iter().find_map(|raw| {
        let selector = Selector::parse(raw)
            .map_err(|e| tracing::debug!(selector = %raw, error = %e, "Skipping invalid selector"))
            .ok()?;
        document.select(&selector).find_map(|element| {
            let text = normalize(&element.inner_html());
            (!text.is_empty()).then(|| SelectorHit {
                selector: raw.clone(),
                text,
            })
        })
    })
}

/// Parsed `application/ld+json` blocks. Invalid JSON is skipped.
#[must_use]
pub fn json_ld_blocks(html: &str) -> Vec<Value> {
    script_json(html, r#"script[type="application/ld+json"]"#)
}

/// Page-state JSON: `__NEXT_DATA__`, `application/json` scripts and
/// `window.__NAME__ = {...}` assignments.
#[must_use]
pub fn embedded_json_blocks(html: &str) -> Vec<Value> {
    let mut blocks = script_json(html, r#"script#__NEXT_DATA__, script[type="application/json"]"#);

    static ASSIGN: OnceLock<Option<Regex>> = OnceLock::new();
    if let Some(re) = ASSIGN
        .get_or_init(|| Regex::new(r"window\.__[A-Za-z0-9_]+__\s*=\s*").ok())
        .as_ref()
    {
        for found in re.find_iter(html) {
            let rest = &html[found.end()..];
            if let Some(Ok(value)) = serde_json::Deserializer::from_str(rest)
                .into_iter::<Value>()
                .next()
            {
                blocks.push(value);
            }
        }
    }
    blocks
}

fn script_json(html: &str, selector: &str) -> Vec<Value> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };
    Html::parse_document(html)
        .select(&selector)
        .filter_map(|script| {
            let raw: String = script.text().collect();
            serde_json::from_str(raw.trim()).ok()
        })
        .collect()
}

/// Visible body text, one line per block element.
#[must_use]
pub fn visible_text(html: &str) -> String {
    static HIDDEN: OnceLock<Option<Regex>> = OnceLock::new();
    let body = body_html(html);
    let shown = match HIDDEN
        .get_or_init(|| {
            Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<noscript\b.*?</noscript\s*>|<template\b.*?</template\s*>").ok()
        })
        .as_ref()
    {
        Some(re) => re.replace_all(&body, "\n").into_owned(),
        None => body,
    };
    normalize(&shown)
}

fn body_html(html: &str) -> String {
    let document = Html::parse_document(html);
    Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next().map(|body| body.inner_html()))
        .unwrap_or_else(|| html.to_string())
}
