//! Text cleanup as an ordered list of pure passes.
//!
//! Every pass is a plain `fn(&str) -> String` so each one can be tested on
//! its own and the pipeline can be recomposed per source.

use regex::Regex;
use std::sync::OnceLock;

/// A single normalization step.
pub type NormalizationPass = fn(&str) -> String;

/// The default cleanup pipeline, applied in order.
pub const DEFAULT_PASSES: &[(&str, NormalizationPass)] = &[
    ("block_tags_to_newlines", block_tags_to_newlines),
    ("strip_tags", strip_tags),
    ("decode_entities", decode_entities),
    ("normalize_whitespace", normalize_whitespace),
    ("drop_toggle_markers", drop_toggle_markers),
    ("strip_bullets", strip_bullets),
    ("drop_blank_lines", drop_blank_lines),
];

/// Runs the default pipeline.
#[must_use]
pub fn normalize(text: &str) -> String {
    normalize_with(text, DEFAULT_PASSES)
}

/// Runs a custom pipeline.
#[must_use]
pub fn normalize_with(text: &str, passes: &[(&str, NormalizationPass)]) -> String {
    passes
        .iter()
        .fold(text.to_string(), |acc, (_, pass)| pass(&acc))
}

fn cached(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

/// Turns `<br>` and closing block tags into line breaks.
#[must_use]
pub fn block_tags_to_newlines(text: &str) -> String {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    match cached(&RE, r"(?i)<br\s*/?>|</(?:p|div|li|dd|dt|h[1-6]|tr|section)\s*>|<(?:p|div|li|dd|dt|tr)(?:\s[^>]*)?>") {
        Some(re) => re.replace_all(text, "\n").into_owned(),
        None => text.to_string(),
    }
}

/// Removes any remaining markup tags.
#[must_use]
pub fn strip_tags(text: &str) -> String {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    match cached(&RE, r"<[^>]*>") {
        Some(re) => re.replace_all(text, "").into_owned(),
        None => text.to_string(),
    }
}

/// Decodes the HTML entities that show up in scraped text.
#[must_use]
pub fn decode_entities(text: &str) -> String {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = cached(&RE, r"&(?:#(\d{1,7})|#[xX]([0-9a-fA-F]{1,6})|([a-zA-Z]{2,8}));") else {
        return text.to_string();
    };
    re.replace_all(text, |caps: &regex::Captures<'_>| {
        let decoded = if let Some(dec) = caps.get(1) {
            dec.as_str().parse::<u32>().ok().and_then(char::from_u32)
        } else if let Some(hex) = caps.get(2) {
            u32::from_str_radix(hex.as_str(), 16).ok().and_then(char::from_u32)
        } else {
            caps.get(3).and_then(|name| match name.as_str() {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                "middot" => Some('·'),
                "hellip" => Some('…'),
                "mdash" => Some('—'),
                "ndash" => Some('–'),
                _ => None,
            })
        };
        decoded.map_or_else(|| caps[0].to_string(), String::from)
    })
    .into_owned()
}

/// Collapses runs of whitespace (including full-width and no-break
/// spaces) inside each line and trims the line ends.
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .lines()
        .map(|line| {
            line.split(|c: char| c.is_whitespace() || c == '\u{3000}' || c == '\u{a0}')
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drops expand/collapse toggles and decorative separators.
#[must_use]
pub fn drop_toggle_markers(text: &str) -> String {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    match cached(
        &RE,
        r"(?i)[(（]\s*(?:展开全部|收起|更多)\s*[)）]|(?:·\s*){3,}|\.\.\.\s*\(?(?:show )?more\)?|\(?show (?:more|less)\)?",
    ) {
        Some(re) => re.replace_all(text, "").into_owned(),
        None => text.to_string(),
    }
}

/// Removes leading list bullets while keeping numbering intact.
#[must_use]
pub fn strip_bullets(text: &str) -> String {
    const BULLETS: &[char] = &['•', '·', '●', '○', '◆', '◇', '■', '□', '▪', '►', '▸', '*', '-', '–'];
    text.lines()
        .map(|line| {
            let trimmed = line.trim_start();
            match trimmed.strip_prefix(BULLETS) {
                Some(rest) if rest.starts_with(' ') => rest.trim_start().to_string(),
                _ => line.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Removes empty lines and trims the whole text.
#[must_use]
pub fn drop_blank_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
