//! External catalog APIs queried by the multi-source aggregator.
//!
//! Providers implement the same [`Extractor`] trait as the scraping
//! strategies, so their output goes through the same validator and
//! scorer.

mod google_books;
mod json;
mod keyed_json;
mod open_library;

use std::sync::Arc;

use crate::config::TocflowConfig;
use crate::core::{StrategyMiss, Target};
use crate::fetch::Fetcher;
use crate::strategies::Extractor;

pub use google_books::GoogleBooksProvider;
pub use keyed_json::KeyedJsonProvider;
pub use open_library::OpenLibraryProvider;

/// Every provider the configuration enables: Open Library, Google Books,
/// then custom endpoints in declaration order.
#[must_use]
pub fn configured_providers(fetcher: &Arc<dyn Fetcher>, config: &TocflowConfig) -> Vec<Arc<dyn Extractor>> {
    let mut providers: Vec<Arc<dyn Extractor>> = Vec::new();
    if config.providers.open_library {
        providers.push(Arc::new(OpenLibraryProvider::from_config(Arc::clone(fetcher), config)));
    }
    if config.providers.google_books {
        providers.push(Arc::new(GoogleBooksProvider::from_config(Arc::clone(fetcher), config)));
    }
    for endpoint in &config.providers.custom {
        providers.push(Arc::new(KeyedJsonProvider::new(
            Arc::clone(fetcher),
            endpoint.clone(),
            config.user_agent.clone(),
        )));
    }
    providers
}

/// Miss for a target the search APIs cannot query.
///
/// Catalog ids belong to the primary site, so only a
/// [`KeyedJsonProvider`] whose template uses `{id}` can resolve them.
fn unsearchable(provider: &str, target: &Target) -> StrategyMiss {
    match target.id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => StrategyMiss::no_candidate(format!(
            "{provider} cannot resolve catalog id {id}; it needs an ISBN or title, or a keyed endpoint using {{id}}"
        )),
        None => StrategyMiss::no_candidate("target has no ISBN or title"),
    }
}
