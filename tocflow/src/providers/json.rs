//! Shared plumbing for JSON API providers.

use serde_json::Value;
use std::collections::HashMap;

use crate::core::StrategyMiss;
use crate::fetch::Fetcher;
use crate::strategies::value_to_lines;
use crate::validation::normalize;

/// Percent-encodes a query component.
pub(crate) fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Default request headers for JSON APIs.
pub(crate) fn json_headers(user_agent: &str) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    headers.insert("User-Agent".to_string(), user_agent.to_string());
    headers.insert("Accept".to_string(), "application/json".to_string());
    headers
}

/// GETs a URL and parses the body as JSON. Transport failures, error
/// statuses and malformed bodies all come back as misses.
pub(crate) async fn fetch_json(
    fetcher: &dyn Fetcher,
    url: &str,
    headers: &HashMap<String, String>,
) -> Result<Value, StrategyMiss> {
    let response = fetcher.fetch(url, headers).await?.error_for_status(url)?;
    serde_json::from_str(&response.body)
        .map_err(|err| StrategyMiss::no_candidate(format!("invalid JSON from {url}: {err}")))
}

/// Flattens a table-of-contents value into normalized text.
pub(crate) fn toc_text(value: &Value) -> Option<String> {
    let text = normalize(&value_to_lines(value).join("\n"));
    (!text.is_empty()).then_some(text)
}

/// Follows a path of object keys and array indexes.
pub(crate) fn walk<'a>(value: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, segment| match current {
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => current.get(segment.as_str()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_walk() {
        let doc = json!({"data": {"books": [{"toc": "1. A"}]}});
        let path: Vec<String> = ["data", "books", "0", "toc"].iter().map(|s| s.to_string()).collect();
        assert_eq!(walk(&doc, &path), Some(&json!("1. A")));
        assert_eq!(walk(&doc, &["data".to_string(), "nope".to_string()]), None);
        assert_eq!(walk(&doc, &[]), Some(&doc));
    }

    #[test]
    fn test_toc_text_normalizes() {
        let value = json!(["<b>1. Intro</b>", "  2.   Body  ", ""]);
        assert_eq!(toc_text(&value).as_deref(), Some("1. Intro\n2. Body"));
        assert_eq!(toc_text(&json!([])), None);
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode("深入 理解&"), "%E6%B7%B1%E5%85%A5+%E7%90%86%E8%A7%A3%26");
    }
}
