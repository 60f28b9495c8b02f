//! # Tocflow
//!
//! Table-of-contents extraction for book catalog pages and book APIs.
//!
//! Tocflow recovers a book's table of contents with:
//!
//! - **Ordered fallback**: cheap strategies first, stopping early once a
//!   candidate is confident enough
//! - **Validation and scoring**: one data-driven rule table decides what
//!   looks like a table of contents and how far to trust it
//! - **Multi-source aggregation**: JSON providers queried in parallel,
//!   with a TTL cache and in-flight coalescing
//! - **Performance tracking**: per-method statistics, recommendations
//!   and a persistable snapshot
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tocflow::prelude::*;
//!
//! let client = TocClient::from_config(TocflowConfig::from_env()?)?;
//!
//! let result = client.extract(&Target::with_id("1084336")).await;
//! println!("{}", result.user_message());
//!
//! if let Some(found) = client.scrape_multi_source("978-1-7185-0310-6").await {
//!     println!("{}", found.content().unwrap_or_default());
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::cast_precision_loss
)]

pub mod aggregator;
pub mod client;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod fetch;
pub mod monitor;
pub mod observability;
pub mod orchestrator;
pub mod providers;
pub mod session;
pub mod strategies;
pub mod testing;
pub mod validation;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::aggregator::{CacheStats, MultiSourceAggregator, TtlCache};
    pub use crate::client::{TocClient, TocClientBuilder};
    pub use crate::config::{SiteConfig, TocflowConfig};
    pub use crate::core::{AttemptOutcome, AttemptRecord, Candidate, ExtractionResult, StrategyMiss, Target};
    pub use crate::errors::{TocflowError, TocflowResult};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::fetch::{FetchResponse, Fetcher};
    pub use crate::monitor::{PerformanceMetrics, PerformanceMonitor};
    pub use crate::orchestrator::ExtractionOrchestrator;
    pub use crate::strategies::{Extractor, StrategyRegistry};
    pub use crate::validation::{ConfidenceScorer, Validator};
}
