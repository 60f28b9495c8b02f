//! Structural validation of candidate text.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::rules::RuleEngine;

/// Thresholds for the validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidatorConfig {
    /// Minimum text length in characters.
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    /// Maximum text length in characters.
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    /// Minimum number of non-trivial lines.
    #[serde(default = "default_min_lines")]
    pub min_lines: usize,
    /// Characters a line needs to count as non-trivial.
    #[serde(default = "default_min_line_chars")]
    pub min_line_chars: usize,
    /// Lower bound of the plausible average line length.
    #[serde(default = "default_min_avg_line")]
    pub min_avg_line_length: f64,
    /// Upper bound of the plausible average line length.
    #[serde(default = "default_max_avg_line")]
    pub max_avg_line_length: f64,
    /// Distinct strong rule categories that waive the line-length band.
    #[serde(default = "default_diversity_waiver")]
    pub diversity_waiver: usize,
}

fn default_min_length() -> usize {
    20
}

fn default_max_length() -> usize {
    8_000
}

fn default_min_lines() -> usize {
    3
}

fn default_min_line_chars() -> usize {
    2
}

fn default_min_avg_line() -> f64 {
    10.0
}

fn default_max_avg_line() -> f64 {
    60.0
}

fn default_diversity_waiver() -> usize {
    2
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            min_length: default_min_length(),
            max_length: default_max_length(),
            min_lines: default_min_lines(),
            min_line_chars: default_min_line_chars(),
            min_avg_line_length: default_min_avg_line(),
            max_avg_line_length: default_max_avg_line(),
            diversity_waiver: default_diversity_waiver(),
        }
    }
}

/// Why the validator rejected a text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum RejectReason {
    /// Shorter than the minimum length.
    TooShort {
        /// Text length in characters.
        length: usize,
        /// Configured minimum.
        min: usize,
    },
    /// Longer than the maximum length.
    TooLong {
        /// Text length in characters.
        length: usize,
        /// Configured maximum.
        max: usize,
    },
    /// A blacklist rule matched.
    Blacklisted {
        /// Name of the matching rule.
        rule: String,
    },
    /// Not enough non-trivial lines.
    TooFewLines {
        /// Lines counted.
        lines: usize,
        /// Configured minimum.
        min: usize,
    },
    /// No strong structural marker anywhere.
    NoStructure,
    /// Average line length outside the band and too little pattern diversity.
    LineLengthOutOfBand {
        /// Measured average.
        average: f64,
    },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooShort { length, min } => write!(f, "too short ({length} < {min} chars)"),
            Self::TooLong { length, max } => write!(f, "too long ({length} > {max} chars)"),
            Self::Blacklisted { rule } => write!(f, "blacklisted ({rule})"),
            Self::TooFewLines { lines, min } => write!(f, "too few lines ({lines} < {min})"),
            Self::NoStructure => write!(f, "no structural markers"),
            Self::LineLengthOutOfBand { average } => {
                write!(f, "implausible line length (avg {average:.1} chars)")
            }
        }
    }
}

/// Measurements of an accepted text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    /// Non-trivial lines.
    pub line_count: usize,
    /// Average characters per non-trivial line.
    pub avg_line_length: f64,
    /// Distinct strong rule categories that matched.
    pub distinct_strong: usize,
    /// Whether pattern diversity waived the line-length band.
    pub band_waived: bool,
}

/// Accepts or rejects candidate text.
///
/// Checks run in a fixed order: length bounds, blacklist, line count,
/// structural markers, then the line-length band. A blacklist hit rejects
/// even when strong structural patterns are also present.
#[derive(Debug, Clone)]
pub struct Validator {
    config: ValidatorConfig,
    engine: Arc<RuleEngine>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidatorConfig::default())
    }
}

impl Validator {
    /// Creates a validator over the default rule table.
    #[must_use]
    pub fn new(config: ValidatorConfig) -> Self {
        Self::with_engine(config, RuleEngine::shared())
    }

    /// Creates a validator over a custom rule engine.
    #[must_use]
    pub fn with_engine(config: ValidatorConfig, engine: Arc<RuleEngine>) -> Self {
        Self { config, engine }
    }

    /// Gets the configuration.
    #[must_use]
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Returns true if the text looks like a table of contents.
    #[must_use]
    pub fn validate(&self, text: &str) -> bool {
        self.check(text).is_ok()
    }

    /// Validates and explains the verdict.
    pub fn check(&self, text: &str) -> Result<ValidationReport, RejectReason> {
        let trimmed = text.trim();
        let length = trimmed.chars().count();

        if length < self.config.min_length {
            return Err(RejectReason::TooShort {
                length,
                min: self.config.min_length,
            });
        }
        if length > self.config.max_length {
            return Err(RejectReason::TooLong {
                length,
                max: self.config.max_length,
            });
        }

        let matches = self.engine.evaluate(trimmed);
        if let Some(hit) = matches.blacklist_hit() {
            return Err(RejectReason::Blacklisted {
                rule: hit.name.to_string(),
            });
        }

        let line_lengths: Vec<usize> = trimmed
            .lines()
            .map(|line| line.trim().chars().count())
            .filter(|len| *len >= self.config.min_line_chars)
            .collect();

        if line_lengths.len() < self.config.min_lines {
            return Err(RejectReason::TooFewLines {
                lines: line_lengths.len(),
                min: self.config.min_lines,
            });
        }

        let distinct_strong = matches.distinct_strong();
        if distinct_strong == 0 {
            return Err(RejectReason::NoStructure);
        }

        let avg_line_length = line_lengths.iter().sum::<usize>() as f64 / line_lengths.len() as f64;
        let in_band = (self.config.min_avg_line_length..=self.config.max_avg_line_length)
            .contains(&avg_line_length);
        let band_waived = distinct_strong >= self.config.diversity_waiver;

        if !in_band && !band_waived {
            return Err(RejectReason::LineLengthOutOfBand {
                average: avg_line_length,
            });
        }

        Ok(ValidationReport {
            line_count: line_lengths.len(),
            avg_line_length,
            distinct_strong,
            band_waived: band_waived && !in_band,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[test]
    fn test_accepts_sample_toc() {
        let validator = Validator::default();
        assert!(validator.validate(fixtures::sample_toc()));
        assert!(validator.validate(fixtures::verbose_toc()));
    }

    #[test]
    fn test_rejects_too_short_even_with_structure() {
        let validator = Validator::default();
        assert_eq!(
            validator.check("1. A\n2. B\n3. C"),
            Err(RejectReason::TooShort { length: 14, min: 20 })
        );
    }

    #[test]
    fn test_rejects_too_long_even_with_structure() {
        let validator = Validator::default();
        let text = "Chapter 1 An Overly Long Table Of Contents Line\n".repeat(200);
        assert!(matches!(validator.check(&text), Err(RejectReason::TooLong { max: 8000, .. })));
    }

    #[test]
    fn test_blacklist_takes_precedence() {
        let validator = Validator::default();
        let text = "Preface\nChapter 1 The Beginning of Things\nChapter 2 The Middle of Things\n喜欢读\"这本书\"的人也喜欢";
        assert_eq!(
            validator.check(text),
            Err(RejectReason::Blacklisted {
                rule: "promotional_list".to_string()
            })
        );
    }

    #[test]
    fn test_rejects_navigation_noise() {
        let validator = Validator::default();
        assert!(!validator.validate(fixtures::navigation_noise()));
    }

    #[test]
    fn test_rejects_too_few_lines() {
        let validator = Validator::default();
        let result = validator.check("Chapter 1 A rather long single line of text");
        assert_eq!(result, Err(RejectReason::TooFewLines { lines: 1, min: 3 }));
    }

    #[test]
    fn test_rejects_prose_without_structure() {
        let validator = Validator::default();
        let text = "This book is a delight.\nIt covers many topics in depth.\nReaders will enjoy it thoroughly.";
        assert_eq!(validator.check(text), Err(RejectReason::NoStructure));
    }

    #[test]
    fn test_terse_toc_needs_pattern_diversity() {
        let validator = Validator::default();

        // Average line length 6 with a single pattern family.
        let terse = "第一章 总论\n第二章 方法\n第三章 实践\n第四章 展望";
        assert!(matches!(
            validator.check(terse),
            Err(RejectReason::LineLengthOutOfBand { .. })
        ));

        // Same shape with front matter added: two strong patterns waive the band.
        let diverse = "前言\n第一章 总论\n第二章 方法\n第三章 实践\n后记";
        let report = validator.check(diverse);
        assert!(report.as_ref().is_ok_and(|r| r.band_waived), "{report:?}");

        // English and CJK chapter words are one kind of marker.
        let bilingual = "第一章 总论\nChapter 1\n第二章 方法\nChapter 2";
        assert!(matches!(
            validator.check(bilingual),
            Err(RejectReason::LineLengthOutOfBand { .. })
        ));
        let front_matter_only = "Preface\n序言\nIntroduction\n引言\nIndex";
        assert!(matches!(
            validator.check(front_matter_only),
            Err(RejectReason::LineLengthOutOfBand { .. })
        ));
    }

    #[test]
    fn test_report_measurements() {
        let validator = Validator::default();
        let text = "Chapter 1 Getting Started\nChapter 2 Common Concepts\nChapter 3 Ownership Rules";
        let report = validator.check(text).unwrap_or_else(|e| panic!("rejected: {e}"));
        assert_eq!(report.line_count, 3);
        assert_eq!(report.distinct_strong, 1);
        assert!(!report.band_waived);
        assert!((report.avg_line_length - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_trivial_lines_not_counted() {
        let validator = Validator::default();
        let text = "Chapter 1 Getting Started\n-\n.\nChapter 2 Common Concepts";
        assert_eq!(validator.check(text), Err(RejectReason::TooFewLines { lines: 2, min: 3 }));
    }
}
