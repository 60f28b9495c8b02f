//! Deciding whether text is a table of contents and how far to trust it.
//!
//! - [`rules`]: the shared structural rule table and engine
//! - [`normalize`]: pure cleanup passes applied to scraped text
//! - [`Validator`]: accept or reject
//! - [`ConfidenceScorer`]: rank on a common `[0, 1]` scale

pub mod normalize;
pub mod rules;
mod scorer;
mod validator;

pub use normalize::{normalize, normalize_with, NormalizationPass, DEFAULT_PASSES};
pub use rules::{Rule, RuleCategory, RuleEngine, RuleHit, RuleMatches, DEFAULT_RULES};
pub use scorer::{ConfidenceModel, ConfidenceScorer, ScoringConfig};
pub use validator::{RejectReason, ValidationReport, Validator, ValidatorConfig};
