//! Confidence scoring on a common scale across methods.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::rules::{RuleCategory, RuleEngine};
use crate::core::{clamp_confidence, methods};

/// Anything that can rank candidate text.
pub trait ConfidenceModel: Send + Sync + std::fmt::Debug {
    /// Scores a text produced by `method`. The result is in `[0, 1]`.
    fn score(&self, text: &str, method: &str) -> f64;
}

/// Every constant the scorer uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringConfig {
    /// Starting score.
    #[serde(default = "default_base")]
    pub base: f64,
    /// `(min_lines, bonus)` buckets; the largest bucket reached applies.
    #[serde(default = "default_line_buckets")]
    pub line_buckets: Vec<(usize, f64)>,
    /// Added per distinct pattern class matched.
    #[serde(default = "default_pattern_increment")]
    pub pattern_increment: f64,
    /// Pattern classes that earn the increment.
    #[serde(default = "default_pattern_classes")]
    pub pattern_classes: Vec<RuleCategory>,
    /// Reliability weight per method name.
    #[serde(default = "default_method_weights")]
    pub method_weights: BTreeMap<String, f64>,
    /// Weight for methods missing from the table.
    #[serde(default)]
    pub default_method_weight: f64,
    /// Character window considered well formed.
    #[serde(default = "default_well_formed")]
    pub well_formed_chars: (usize, usize),
    /// Bonus inside the well-formed window.
    #[serde(default = "default_well_formed_bonus")]
    pub well_formed_bonus: f64,
    /// Content shorter than this is penalized.
    #[serde(default = "default_short_chars")]
    pub short_chars: usize,
    /// Penalty for short content.
    #[serde(default = "default_short_penalty")]
    pub short_penalty: f64,
}

fn default_base() -> f64 {
    0.45
}

fn default_line_buckets() -> Vec<(usize, f64)> {
    vec![(15, 0.20), (10, 0.15), (6, 0.10), (3, 0.05)]
}

fn default_pattern_increment() -> f64 {
    0.05
}

fn default_pattern_classes() -> Vec<RuleCategory> {
    vec![
        RuleCategory::NumberedSection,
        RuleCategory::ChapterWord,
        RuleCategory::LetteredSection,
        RuleCategory::PageTrailer,
        RuleCategory::FrontBackMatter,
    ]
}

fn default_method_weights() -> BTreeMap<String, f64> {
    [
        (methods::STRUCTURED_DATA, 0.15),
        (methods::OPEN_LIBRARY, 0.15),
        (methods::DOM_SELECTOR, 0.10),
        (methods::URL_PATTERNS, 0.05),
        (methods::SESSION_REPLAY, 0.05),
        (methods::GOOGLE_BOOKS, -0.05),
        (methods::TEXT_SCAN, -0.10),
    ]
    .into_iter()
    .map(|(name, weight)| (name.to_string(), weight))
    .collect()
}

fn default_well_formed() -> (usize, usize) {
    (100, 3_000)
}

fn default_well_formed_bonus() -> f64 {
    0.05
}

fn default_short_chars() -> usize {
    50
}

fn default_short_penalty() -> f64 {
    0.10
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base: default_base(),
            line_buckets: default_line_buckets(),
            pattern_increment: default_pattern_increment(),
            pattern_classes: default_pattern_classes(),
            method_weights: default_method_weights(),
            default_method_weight: 0.0,
            well_formed_chars: default_well_formed(),
            well_formed_bonus: default_well_formed_bonus(),
            short_chars: default_short_chars(),
            short_penalty: default_short_penalty(),
        }
    }
}

impl ScoringConfig {
    /// Sets the weight of one method.
    #[must_use]
    pub fn with_method_weight(mut self, method: impl Into<String>, weight: f64) -> Self {
        self.method_weights.insert(method.into(), weight);
        self
    }

    /// Weight of a method, falling back to the default weight.
    #[must_use]
    pub fn method_weight(&self, method: &str) -> f64 {
        self.method_weights
            .get(method)
            .copied()
            .unwrap_or(self.default_method_weight)
    }

    /// Bonus for a number of non-empty lines.
    #[must_use]
    pub fn line_bonus(&self, lines: usize) -> f64 {
        self.line_buckets
            .iter()
            .filter(|(min, _)| lines >= *min)
            .map(|(_, bonus)| *bonus)
            .fold(0.0, f64::max)
    }

    /// Adjustment for a content length in characters.
    #[must_use]
    pub fn length_adjustment(&self, chars: usize) -> f64 {
        let (low, high) = self.well_formed_chars;
        if chars < self.short_chars {
            -self.short_penalty
        } else if (low..=high).contains(&chars) {
            self.well_formed_bonus
        } else {
            0.0
        }
    }
}

/// The default confidence model.
#[derive(Debug, Clone)]
pub struct ConfidenceScorer {
    config: ScoringConfig,
    engine: Arc<RuleEngine>,
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

impl ConfidenceScorer {
    /// Creates a scorer over the default rule table.
    #[must_use]
    pub fn new(config: ScoringConfig) -> Self {
        Self::with_engine(config, RuleEngine::shared())
    }

    /// Creates a scorer over a custom rule engine.
    #[must_use]
    pub fn with_engine(config: ScoringConfig, engine: Arc<RuleEngine>) -> Self {
        Self { config, engine }
    }

    /// Gets the configuration.
    #[must_use]
    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Scores a text produced by `method`.
    #[must_use]
    pub fn score(&self, text: &str, method: &str) -> f64 {
        let trimmed = text.trim();
        let lines = trimmed.lines().filter(|line| !line.trim().is_empty()).count();
        let matches = self.engine.evaluate(trimmed);
        let classes = self
            .config
            .pattern_classes
            .iter()
            .filter(|class| matches.has_category(**class))
            .count();

        let raw = self.config.base
            + self.config.line_bonus(lines)
            + self.config.pattern_increment * classes as f64
            + self.config.method_weight(method)
            + self.config.length_adjustment(trimmed.chars().count());

        let score = clamp_confidence(raw);
        tracing::trace!(method, lines, classes, score, "Scored candidate");
        score
    }
}

impl ConfidenceModel for ConfidenceScorer {
    fn score(&self, text: &str, method: &str) -> f64 {
        Self::score(self, text, method)
    }
}
