//! Core domain model types for tocflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - The lookup target (title, ISBN or catalog id)
//! - Candidates produced by extraction strategies
//! - The extraction result and its per-attempt trace
//! - Well-known method names

mod candidate;
pub mod methods;
mod miss;
mod result;
#[cfg(test)]
mod result_tests;
mod target;

pub use candidate::Candidate;
pub use miss::{MissKind, StrategyMiss};
pub(crate) use result::clamp_confidence;
pub use result::{AttemptOutcome, AttemptRecord, ExtractionResult};
pub use target::Target;

/// UTC timestamp used across the crate.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
