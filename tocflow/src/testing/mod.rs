//! Test doubles and fixtures.
//!
//! - [`ScriptedFetcher`]: route-table transport that records requests
//! - [`MockExtractor`]: canned strategy or provider with a call counter
//! - [`FixedConfidence`]: per-method confidence stub
//! - [`fixtures`]: sample tables of contents and pages

pub mod fixtures;
mod mocks;

pub use mocks::{FixedConfidence, MockExtractor, RecordedRequest, ScriptedFetcher};
