//! Single-source extraction with ordered fallback.
//!
//! [`ExtractionOrchestrator`] walks the strategy registry sequentially.
//! A later, more expensive strategy only runs after the cheaper ones have
//! failed to produce a confident result.

mod runner;
mod state;

pub use runner::{ExtractionOrchestrator, DEFAULT_EARLY_EXIT_THRESHOLD};
pub use state::{OrchestratorState, RunTrace};
