//! Declarative field-alias table for untyped JSON.
//!
//! Sources disagree on what to call the table of contents and its entries.
//! Instead of probing field names ad hoc, every parser goes through the
//! ordered alias lists here.

use serde_json::Value;

/// Keys that may hold a whole table of contents.
pub const TOC_FIELD_ALIASES: &[&str] = &[
    "tableOfContents",
    "table_of_contents",
    "toc",
    "contents",
    "catalog",
    "directory",
    "dir",
    "chapters",
    "目录",
];

/// Keys naming an entry's ordinal label (`1.`, `Chapter 3`).
pub const ENTRY_LABEL_ALIASES: &[&str] = &["label", "number", "ordinal", "num"];

/// Keys naming an entry's title.
pub const ENTRY_TITLE_ALIASES: &[&str] = &["title", "name", "text", "headline", "heading", "chapter"];

/// Keys naming an entry's page number.
pub const ENTRY_PAGE_ALIASES: &[&str] = &["pagenum", "page", "pageNumber", "page_number", "pageStart"];

/// Keys naming an entry's nesting depth.
pub const ENTRY_LEVEL_ALIASES: &[&str] = &["level", "depth", "indent"];

/// Keys holding nested entries.
pub const ENTRY_CHILDREN_ALIASES: &[&str] = &["children", "sections", "subsections", "items", "entries"];

const MAX_DEPTH: usize = 8;

/// First alias present on an object with a non-null, non-empty value.
#[must_use]
pub fn lookup_alias<'a>(value: &'a Value, aliases: &[&'static str]) -> Option<(&'static str, &'a Value)> {
    let object = value.as_object()?;
    aliases.iter().find_map(|alias| {
        object
            .get(*alias)
            .filter(|v| !is_blank(v))
            .map(|v| (*alias, v))
    })
}

/// Searches a document for a table-of-contents field, breadth first, so a
/// top-level field beats one nested inside related items.
#[must_use]
pub fn find_toc(value: &Value) -> Option<(&'static str, &Value)> {
    let mut level = vec![value];
    for _ in 0..MAX_DEPTH {
        if level.is_empty() {
            break;
        }
        if let Some(hit) = level.iter().find_map(|v| lookup_alias(*v, TOC_FIELD_ALIASES)) {
            return Some(hit);
        }
        level = level
            .into_iter()
            .flat_map(|v| match v {
                Value::Object(map) => map.values().collect::<Vec<_>>(),
                Value::Array(items) => items.iter().collect(),
                _ => Vec::new(),
            })
            .collect();
    }
    None
}

/// Flattens a table-of-contents value into lines.
///
/// Strings are split on newlines; arrays are walked entry by entry;
/// entry objects become `label title ... page`, followed by their children.
#[must_use]
pub fn value_to_lines(value: &Value) -> Vec<String> {
    let mut lines = Vec::new();
    collect_lines(value, 0, &mut lines);
    lines
}

fn collect_lines(value: &Value, depth: usize, lines: &mut Vec<String>) {
    if depth > MAX_DEPTH {
        return;
    }
    match value {
        Value::String(text) => lines.extend(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from),
        ),
        Value::Array(items) => {
            for item in items {
                collect_lines(item, depth + 1, lines);
            }
        }
        Value::Object(_) => {
            if let Some(line) = entry_line(value) {
                lines.push(line);
            }
            if let Some((_, children)) = lookup_alias(value, ENTRY_CHILDREN_ALIASES) {
                collect_lines(children, depth + 1, lines);
            }
        }
        _ => {}
    }
}

fn entry_line(entry: &Value) -> Option<String> {
    let label = lookup_alias(entry, ENTRY_LABEL_ALIASES).and_then(|(_, v)| scalar_text(v));
    let title = lookup_alias(entry, ENTRY_TITLE_ALIASES).and_then(|(_, v)| scalar_text(v));
    let page = lookup_alias(entry, ENTRY_PAGE_ALIASES).and_then(|(_, v)| scalar_text(v));

    let head = match (label, title) {
        (Some(label), Some(title)) if title.starts_with(&label) => title,
        (Some(label), Some(title)) => format!("{label} {title}"),
        (Some(only), None) | (None, Some(only)) => only,
        (None, None) => return None,
    };
    Some(match page {
        Some(page) => format!("{head} ... {page}"),
        None => head,
    })
}

/// Nesting depth of an entry, when declared.
#[must_use]
pub fn entry_level(entry: &Value) -> Option<u64> {
    lookup_alias(entry, ENTRY_LEVEL_ALIASES).and_then(|(_, v)| {
        v.as_u64()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
    })
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
