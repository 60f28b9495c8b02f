//! Extraction strategies and their priority order.
//!
//! Each strategy implements [`Extractor`]: it either returns a
//! [`Candidate`] or a [`StrategyMiss`] explaining why not. Nothing escapes
//! as an error. The [`StrategyRegistry`] fixes the order they are tried in:
//! cheap, structured sources first, broad scraping last.

mod aliases;
mod dom_selector;
mod html;
mod page;
mod session_replay;
mod structured_data;
mod text_scan;
mod url_patterns;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{StrategyToggles, TocflowConfig};
use crate::core::{Candidate, StrategyMiss, Target};
use crate::fetch::Fetcher;
use crate::session::SessionContext;

pub use aliases::{
    entry_level, find_toc, lookup_alias, value_to_lines, ENTRY_CHILDREN_ALIASES, ENTRY_LABEL_ALIASES,
    ENTRY_LEVEL_ALIASES, ENTRY_PAGE_ALIASES, ENTRY_TITLE_ALIASES, TOC_FIELD_ALIASES,
};
pub use dom_selector::DomSelectorStrategy;
pub use html::{embedded_json_blocks, json_ld_blocks, select_toc, visible_text, SelectorHit};
pub use page::{DetailLocation, PageLoader};
pub use session_replay::SessionReplayStrategy;
pub use structured_data::StructuredDataStrategy;
pub use text_scan::{longest_toc_block, TextScanStrategy};
pub use url_patterns::UrlPatternsStrategy;

/// One self-contained way of recovering a table of contents.
#[async_trait]
pub trait Extractor: Send + Sync + std::fmt::Debug {
    /// Method name reported in results.
    fn name(&self) -> &str;

    /// Tries to produce a candidate for `target`.
    async fn attempt(&self, target: &Target) -> Result<Candidate, StrategyMiss>;
}

/// A registered strategy and whether it may run.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    /// The strategy.
    pub extractor: Arc<dyn Extractor>,
    /// Disabled strategies are recorded but never invoked.
    pub enabled: bool,
}

/// Priority-ordered list of strategies.
///
/// The order is policy: moving a strategy changes both average latency
/// and success rate.
#[derive(Debug, Clone, Default)]
pub struct StrategyRegistry {
    entries: Vec<RegistryEntry>,
}

impl StrategyRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The canonical order: `structured_data`, `dom_selector`,
    /// `url_patterns`, `session_replay`, `text_scan`, with the
    /// configuration's enable flags applied.
    #[must_use]
    pub fn standard(
        fetcher: Arc<dyn Fetcher>,
        session: Arc<SessionContext>,
        config: &TocflowConfig,
    ) -> Self {
        let loader = PageLoader::from_config(fetcher, config);
        let mut registry = Self::new()
            .with(StructuredDataStrategy::new(loader.clone()))
            .with(DomSelectorStrategy::new(loader.clone()))
            .with(UrlPatternsStrategy::new(loader.clone()))
            .with(SessionReplayStrategy::new(session))
            .with(TextScanStrategy::new(loader));
        registry.apply_toggles(&config.strategies);
        registry
    }

    /// Appends a strategy at the lowest priority.
    #[must_use]
    pub fn with(mut self, extractor: impl Extractor + 'static) -> Self {
        self.register(Arc::new(extractor));
        self
    }

    /// Appends a shared strategy at the lowest priority.
    pub fn register(&mut self, extractor: Arc<dyn Extractor>) {
        self.entries.push(RegistryEntry {
            extractor,
            enabled: true,
        });
    }

    /// Enables or disables a strategy by name. Returns false if unknown.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        let mut found = false;
        for entry in self.entries.iter_mut().filter(|e| e.extractor.name() == name) {
            entry.enabled = enabled;
            found = true;
        }
        found
    }

    /// Applies configuration enable flags.
    pub fn apply_toggles(&mut self, toggles: &StrategyToggles) {
        for entry in &mut self.entries {
            entry.enabled = toggles.is_enabled(entry.extractor.name());
        }
    }

    /// All entries in priority order.
    #[must_use]
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    /// Names of all strategies in priority order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.extractor.name()).collect()
    }

    /// Names of enabled strategies in priority order.
    #[must_use]
    pub fn enabled_names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.enabled)
            .map(|e| e.extractor.name())
            .collect()
    }

    /// Number of registered strategies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no strategies are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::methods;
    use crate::testing::{MockExtractor, ScriptedFetcher};

    #[test]
    fn test_standard_order() {
        let fetcher: Arc<dyn Fetcher> = Arc::new(ScriptedFetcher::new());
        let config = TocflowConfig::default();
        let session = Arc::new(SessionContext::from_config(Arc::clone(&fetcher), &config));
        let registry = StrategyRegistry::standard(fetcher, session, &config);

        assert_eq!(
            registry.names(),
            vec![
                methods::STRUCTURED_DATA,
                methods::DOM_SELECTOR,
                methods::URL_PATTERNS,
                methods::SESSION_REPLAY,
                methods::TEXT_SCAN
            ]
        );
        assert_eq!(registry.enabled_names().len(), 5);
    }

    #[test]
    fn test_toggles_disable_strategies() {
        let fetcher: Arc<dyn Fetcher> = Arc::new(ScriptedFetcher::new());
        let config = TocflowConfig::default()
            .with_strategy_disabled(methods::SESSION_REPLAY)
            .with_strategy_disabled(methods::TEXT_SCAN);
        let session = Arc::new(SessionContext::from_config(Arc::clone(&fetcher), &config));
        let registry = StrategyRegistry::standard(fetcher, session, &config);

        assert_eq!(registry.len(), 5);
        assert_eq!(
            registry.enabled_names(),
            vec![methods::STRUCTURED_DATA, methods::DOM_SELECTOR, methods::URL_PATTERNS]
        );
    }

    #[test]
    fn test_set_enabled() {
        let mut registry = StrategyRegistry::new()
            .with(MockExtractor::missing("a"))
            .with(MockExtractor::missing("b"));
        assert!(registry.set_enabled("a", false));
        assert!(!registry.set_enabled("zzz", false));
        assert_eq!(registry.enabled_names(), vec!["b"]);
    }
}
