//! Method names reported in results and tracked by the performance monitor.

/// Embedded JSON-LD / page-state JSON on the detail page.
pub const STRUCTURED_DATA: &str = "structured_data";
/// CSS selector lookup of the table-of-contents container.
pub const DOM_SELECTOR: &str = "dom_selector";
/// Selector lookup across several guessed URL layouts.
pub const URL_PATTERNS: &str = "url_patterns";
/// Home, search and detail hops through an established session.
pub const SESSION_REPLAY: &str = "session_replay";
/// Longest block of structural lines in the visible page text.
pub const TEXT_SCAN: &str = "text_scan";

/// Open Library JSON API.
pub const OPEN_LIBRARY: &str = "open_library";
/// Google Books volumes API.
pub const GOOGLE_BOOKS: &str = "google_books";

/// Result served from the aggregator cache.
pub const CACHE: &str = "cache";
/// Terminal result when no strategy produced an accepted candidate.
pub const ALL_FAILED: &str = "all_failed";
