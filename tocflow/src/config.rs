//! Recognized configuration options.
//!
//! Every field has a serde default, so a partial JSON document (or none at
//! all) yields a usable configuration. Unknown keys are rejected.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::core::methods;
use crate::errors::{TocflowError, TocflowResult};
use crate::validation::{ScoringConfig, ValidatorConfig};

/// Environment variable overriding the per-request timeout (seconds).
pub const ENV_REQUEST_TIMEOUT: &str = "TOCFLOW_REQUEST_TIMEOUT";
/// Environment variable overriding the cache TTL (seconds).
pub const ENV_CACHE_TTL: &str = "TOCFLOW_CACHE_TTL";
/// Environment variable overriding the early-exit threshold.
pub const ENV_EARLY_EXIT: &str = "TOCFLOW_EARLY_EXIT";
/// Environment variable holding the Google Books API key.
pub const ENV_GOOGLE_BOOKS_API_KEY: &str = "TOCFLOW_GOOGLE_BOOKS_API_KEY";
/// Environment variable listing strategies to disable, comma separated.
pub const ENV_DISABLED_STRATEGIES: &str = "TOCFLOW_DISABLED_STRATEGIES";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TocflowConfig {
    /// Timeout for one strategy attempt, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: f64,
    /// Timeout for one aggregator provider, in seconds.
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_seconds: f64,
    /// Lifetime of aggregator cache entries, in seconds.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
    /// Confidence at which the orchestrator stops trying strategies.
    #[serde(default = "default_early_exit")]
    pub early_exit_threshold: f64,
    /// Minimum content length for aggregator results.
    #[serde(default = "default_min_content_length")]
    pub min_content_length: usize,
    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Primary catalog site.
    #[serde(default)]
    pub site: SiteConfig,
    /// Strategy enable flags.
    #[serde(default)]
    pub strategies: StrategyToggles,
    /// Aggregator providers.
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Size of the monitor's recent-results buffer.
    #[serde(default = "default_recent_capacity")]
    pub recent_results_capacity: usize,
    /// Attempts a method needs before it can be recommended.
    #[serde(default = "default_min_attempts")]
    pub min_attempts_for_recommendation: u64,
    /// Validator thresholds.
    #[serde(default)]
    pub validator: ValidatorConfig,
    /// Scorer constants.
    #[serde(default)]
    pub scoring: ScoringConfig,
}

fn default_request_timeout() -> f64 {
    15.0
}

fn default_provider_timeout() -> f64 {
    10.0
}

fn default_cache_ttl() -> u64 {
    7 * 24 * 60 * 60
}

fn default_early_exit() -> f64 {
    0.8
}

fn default_min_content_length() -> usize {
    20
}

fn default_user_agent() -> String {
    format!(
        "tocflow/{} (table-of-contents lookup; +https://github.com/tocflow/tocflow)",
        env!("CARGO_PKG_VERSION")
    )
}

fn default_recent_capacity() -> usize {
    100
}

fn default_min_attempts() -> u64 {
    3
}

impl Default for TocflowConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: default_request_timeout(),
            provider_timeout_seconds: default_provider_timeout(),
            cache_ttl_seconds: default_cache_ttl(),
            early_exit_threshold: default_early_exit(),
            min_content_length: default_min_content_length(),
            user_agent: default_user_agent(),
            site: SiteConfig::default(),
            strategies: StrategyToggles::default(),
            providers: ProvidersConfig::default(),
            recent_results_capacity: default_recent_capacity(),
            min_attempts_for_recommendation: default_min_attempts(),
            validator: ValidatorConfig::default(),
            scoring: ScoringConfig::default(),
        }
    }
}

impl TocflowConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON document and validates it.
    pub fn from_json_str(json: &str) -> TocflowResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| TocflowError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON file and validates it.
    pub fn from_file(path: impl AsRef<Path>) -> TocflowResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> TocflowResult<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Applies the recognized `TOCFLOW_*` environment variables.
    pub fn apply_env_overrides(&mut self) -> TocflowResult<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides from an arbitrary lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> TocflowResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_REQUEST_TIMEOUT) {
            self.request_timeout_seconds = parse_env(ENV_REQUEST_TIMEOUT, &value)?;
        }
        if let Some(value) = lookup(ENV_CACHE_TTL) {
            self.cache_ttl_seconds = parse_env(ENV_CACHE_TTL, &value)?;
        }
        if let Some(value) = lookup(ENV_EARLY_EXIT) {
            self.early_exit_threshold = parse_env(ENV_EARLY_EXIT, &value)?;
        }
        if let Some(value) = lookup(ENV_GOOGLE_BOOKS_API_KEY) {
            let key = value.trim();
            self.providers.google_books_api_key = (!key.is_empty()).then(|| key.to_string());
        }
        if let Some(value) = lookup(ENV_DISABLED_STRATEGIES) {
            for name in value.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                if !self.strategies.set_enabled(name, false) {
                    return Err(TocflowError::Config(format!(
                        "{ENV_DISABLED_STRATEGIES}: unknown strategy '{name}'"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Rejects values no component can work with.
    pub fn validate(&self) -> TocflowResult<()> {
        check_timeout("request_timeout_seconds", self.request_timeout_seconds)?;
        check_timeout("provider_timeout_seconds", self.provider_timeout_seconds)?;
        if !(0.0..=1.0).contains(&self.early_exit_threshold) {
            return Err(TocflowError::Config(format!(
                "early_exit_threshold must be in [0, 1], got {}",
                self.early_exit_threshold
            )));
        }
        if self.cache_ttl_seconds == 0 {
            return Err(TocflowError::Config("cache_ttl_seconds must be positive".into()));
        }
        if self.recent_results_capacity == 0 {
            return Err(TocflowError::Config("recent_results_capacity must be positive".into()));
        }
        if self.validator.min_length > self.validator.max_length {
            return Err(TocflowError::Config(
                "validator.min_length exceeds validator.max_length".into(),
            ));
        }
        url::Url::parse(&self.site.base_url)
            .map_err(|e| TocflowError::Config(format!("site.base_url: {e}")))?;
        for endpoint in &self.providers.custom {
            if endpoint.name.trim().is_empty() {
                return Err(TocflowError::Config("providers.custom: empty name".into()));
            }
            if endpoint.toc_path.is_empty() {
                return Err(TocflowError::Config(format!(
                    "providers.custom.{}: toc_path is empty",
                    endpoint.name
                )));
            }
        }
        Ok(())
    }

    /// Per-attempt timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        seconds_to_duration(self.request_timeout_seconds)
    }

    /// Per-provider timeout.
    #[must_use]
    pub fn provider_timeout(&self) -> Duration {
        seconds_to_duration(self.provider_timeout_seconds)
    }

    /// Cache entry lifetime.
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, seconds: f64) -> Self {
        self.request_timeout_seconds = seconds;
        self
    }

    /// Sets the per-provider timeout.
    #[must_use]
    pub fn with_provider_timeout(mut self, seconds: f64) -> Self {
        self.provider_timeout_seconds = seconds;
        self
    }

    /// Sets the cache TTL.
    #[must_use]
    pub fn with_cache_ttl(mut self, seconds: u64) -> Self {
        self.cache_ttl_seconds = seconds;
        self
    }

    /// Sets the early-exit threshold.
    #[must_use]
    pub fn with_early_exit_threshold(mut self, threshold: f64) -> Self {
        self.early_exit_threshold = threshold;
        self
    }

    /// Sets the primary site.
    #[must_use]
    pub fn with_site(mut self, site: SiteConfig) -> Self {
        self.site = site;
        self
    }

    /// Disables one strategy by name.
    #[must_use]
    pub fn with_strategy_disabled(mut self, name: &str) -> Self {
        self.strategies.set_enabled(name, false);
        self
    }

    /// Sets the provider configuration.
    #[must_use]
    pub fn with_providers(mut self, providers: ProvidersConfig) -> Self {
        self.providers = providers;
        self
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> TocflowResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| TocflowError::Config(format!("{name}: {e}")))
}

/// Saturates values a `Duration` cannot hold: too large becomes
/// `Duration::MAX`, negative or NaN becomes zero.
fn seconds_to_duration(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds).unwrap_or(if seconds > 0.0 { Duration::MAX } else { Duration::ZERO })
}

fn check_timeout(name: &str, seconds: f64) -> TocflowResult<()> {
    if seconds > 0.0 && Duration::try_from_secs_f64(seconds).is_ok() {
        Ok(())
    } else {
        Err(TocflowError::Config(format!(
            "{name} must be a positive number of seconds, got {seconds}"
        )))
    }
}

/// The primary catalog site reached through the session layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Site root, also used for the session handshake.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Search path; `{query}` is replaced by the encoded title.
    #[serde(default = "default_search_path")]
    pub search_path: String,
    /// Detail path; `{id}` is replaced by the catalog id.
    #[serde(default = "default_detail_path")]
    pub detail_path: String,
    /// URL templates tried in turn by the URL pattern strategy.
    /// `{base}` and `{id}` are substituted.
    #[serde(default = "default_url_patterns")]
    pub url_patterns: Vec<String>,
    /// CSS selectors for the table-of-contents container, in priority
    /// order. `{id}` is substituted with the catalog id.
    #[serde(default = "default_toc_selectors")]
    pub toc_selectors: Vec<String>,
    /// Fixed delay between navigation hops.
    #[serde(default)]
    pub hop_delay_ms: u64,
    /// Random extra delay between navigation hops.
    #[serde(default)]
    pub hop_jitter_ms: u64,
}

fn default_base_url() -> String {
    "https://book.douban.com".to_string()
}

fn default_search_path() -> String {
    "/subject_search?search_text={query}".to_string()
}

fn default_detail_path() -> String {
    "/subject/{id}/".to_string()
}

fn default_url_patterns() -> Vec<String> {
    vec![
        "{base}/subject/{id}/".to_string(),
        "{base}/subject/{id}/?tab=toc".to_string(),
        "https://m.douban.com/book/subject/{id}/".to_string(),
    ]
}

fn default_toc_selectors() -> Vec<String> {
    [
        "#dir_{id}_full",
        "#dir_{id}_short",
        "[itemprop=\"tableOfContents\"]",
        ".toc",
        "#toc",
        "#table-of-contents",
        ".book-toc",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            search_path: default_search_path(),
            detail_path: default_detail_path(),
            url_patterns: default_url_patterns(),
            toc_selectors: default_toc_selectors(),
            hop_delay_ms: 0,
            hop_jitter_ms: 0,
        }
    }
}

impl SiteConfig {
    /// Creates a site rooted at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Root URL without a trailing slash.
    #[must_use]
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Home page URL used for the handshake.
    #[must_use]
    pub fn home_url(&self) -> String {
        format!("{}/", self.base())
    }

    /// Search URL for a title.
    #[must_use]
    pub fn search_url(&self, title: &str) -> String {
        let query: String = url::form_urlencoded::byte_serialize(title.as_bytes()).collect();
        format!("{}{}", self.base(), self.search_path.replace("{query}", &query))
    }

    /// Detail page URL for a catalog id.
    #[must_use]
    pub fn detail_url(&self, id: &str) -> String {
        format!("{}{}", self.base(), self.detail_path.replace("{id}", id))
    }

    /// Candidate URLs for the URL pattern strategy.
    #[must_use]
    pub fn pattern_urls(&self, id: &str) -> Vec<String> {
        self.url_patterns
            .iter()
            .map(|template| template.replace("{base}", self.base()).replace("{id}", id))
            .collect()
    }

    /// Selectors with `{id}` substituted. Id-specific selectors are
    /// dropped when the id is unknown.
    #[must_use]
    pub fn selectors_for(&self, id: Option<&str>) -> Vec<String> {
        self.toc_selectors
            .iter()
            .filter_map(|selector| match id {
                Some(id) => Some(selector.replace("{id}", id)),
                None => (!selector.contains("{id}")).then(|| selector.clone()),
            })
            .collect()
    }

    /// Sets the hop delays.
    #[must_use]
    pub fn with_hop_delay(mut self, delay_ms: u64, jitter_ms: u64) -> Self {
        self.hop_delay_ms = delay_ms;
        self.hop_jitter_ms = jitter_ms;
        self
    }
}

/// Per-strategy enable flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[allow(clippy::struct_excessive_bools)]
pub struct StrategyToggles {
    /// Embedded structured metadata.
    #[serde(default = "enabled")]
    pub structured_data: bool,
    /// CSS selector lookup.
    #[serde(default = "enabled")]
    pub dom_selector: bool,
    /// Guessed URL patterns.
    #[serde(default = "enabled")]
    pub url_patterns: bool,
    /// Multi-hop session replay.
    #[serde(default = "enabled")]
    pub session_replay: bool,
    /// Visible text scan.
    #[serde(default = "enabled")]
    pub text_scan: bool,
}

fn enabled() -> bool {
    true
}

impl Default for StrategyToggles {
    fn default() -> Self {
        Self {
            structured_data: true,
            dom_selector: true,
            url_patterns: true,
            session_replay: true,
            text_scan: true,
        }
    }
}

impl StrategyToggles {
    /// Whether a strategy is enabled. Unknown names are enabled.
    #[must_use]
    pub fn is_enabled(&self, name: &str) -> bool {
        match name {
            methods::STRUCTURED_DATA => self.structured_data,
            methods::DOM_SELECTOR => self.dom_selector,
            methods::URL_PATTERNS => self.url_patterns,
            methods::SESSION_REPLAY => self.session_replay,
            methods::TEXT_SCAN => self.text_scan,
            _ => true,
        }
    }

    /// Sets a flag by name. Returns false for unknown names.
    pub fn set_enabled(&mut self, name: &str, value: bool) -> bool {
        let flag = match name {
            methods::STRUCTURED_DATA => &mut self.structured_data,
            methods::DOM_SELECTOR => &mut self.dom_selector,
            methods::URL_PATTERNS => &mut self.url_patterns,
            methods::SESSION_REPLAY => &mut self.session_replay,
            methods::TEXT_SCAN => &mut self.text_scan,
            _ => return false,
        };
        *flag = value;
        true
    }
}

/// Aggregator provider configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvidersConfig {
    /// Enable Open Library.
    #[serde(default = "enabled")]
    pub open_library: bool,
    /// Open Library root.
    #[serde(default = "default_open_library_url")]
    pub open_library_base_url: String,
    /// Enable Google Books.
    #[serde(default = "enabled")]
    pub google_books: bool,
    /// Google Books API root.
    #[serde(default = "default_google_books_url")]
    pub google_books_base_url: String,
    /// Optional Google Books API key.
    #[serde(default)]
    pub google_books_api_key: Option<String>,
    /// Additional keyed JSON endpoints.
    #[serde(default)]
    pub custom: Vec<KeyedEndpointConfig>,
}

fn default_open_library_url() -> String {
    "https://openlibrary.org".to_string()
}

fn default_google_books_url() -> String {
    "https://www.googleapis.com/books/v1".to_string()
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            open_library: true,
            open_library_base_url: default_open_library_url(),
            google_books: true,
            google_books_base_url: default_google_books_url(),
            google_books_api_key: None,
            custom: Vec::new(),
        }
    }
}

/// A generic JSON endpoint queried with an API key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyedEndpointConfig {
    /// Method name reported in results.
    pub name: String,
    /// URL template with `{isbn}`, `{title}` or `{id}` placeholders.
    pub url_template: String,
    /// API key, sent in `api_key_header`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Header carrying the API key.
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,
    /// Object keys leading to the table of contents.
    pub toc_path: Vec<String>,
}

fn default_api_key_header() -> String {
    "X-Api-Key".to_string()
}
