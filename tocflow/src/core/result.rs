//! The sole return value of an extraction call.

use serde::Serialize;

use super::methods;
use super::miss::MissKind;

/// What happened to one strategy during an orchestrated run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "kind")]
pub enum AttemptOutcome {
    /// Validated and confident enough to stop the run.
    Accepted,
    /// Validated and became the best result so far.
    BestUpdated,
    /// Validated but did not beat the best result so far.
    NotBetter,
    /// Produced text the validator rejected.
    Rejected,
    /// Produced no candidate.
    Missed(MissKind),
    /// Switched off by configuration; never invoked.
    Disabled,
}

impl AttemptOutcome {
    /// Returns true if the attempt produced a validated candidate.
    #[must_use]
    pub fn is_validated(&self) -> bool {
        matches!(self, Self::Accepted | Self::BestUpdated | Self::NotBetter)
    }
}

impl std::fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accepted => write!(f, "accepted"),
            Self::BestUpdated => write!(f, "best so far"),
            Self::NotBetter => write!(f, "lower confidence than best"),
            Self::Rejected => write!(f, "validation reject"),
            Self::Missed(kind) => write!(f, "{kind}"),
            Self::Disabled => write!(f, "disabled"),
        }
    }
}

/// Diagnostic record of one strategy attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptRecord {
    /// Strategy or provider name.
    pub method: String,
    /// What happened.
    pub outcome: AttemptOutcome,
    /// Confidence, when the candidate passed validation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Time spent in the attempt.
    pub duration_ms: u64,
    /// Rejection or failure detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AttemptRecord {
    /// Creates a new attempt record.
    #[must_use]
    pub fn new(method: impl Into<String>, outcome: AttemptOutcome, duration_ms: u64) -> Self {
        Self {
            method: method.into(),
            outcome,
            confidence: None,
            duration_ms,
            detail: None,
        }
    }

    /// Sets the confidence.
    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Sets the detail.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// One-line reason, e.g. `dom_selector: validation reject (too few lines)`.
    #[must_use]
    pub fn reason(&self) -> String {
        match &self.detail {
            Some(detail) => format!("{}: {} ({})", self.method, self.outcome, detail),
            None => format!("{}: {}", self.method, self.outcome),
        }
    }
}

/// Outcome of an extraction call.
///
/// A successful result always carries non-empty content that passed the
/// validator; a failed one carries an error explaining what was tried.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    method: String,
    confidence: f64,
    response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    origin_method: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    attempts: Vec<AttemptRecord>,
}

impl ExtractionResult {
    /// Creates a successful result. Confidence is clamped to `[0, 1]`.
    ///
    /// Callers must only pass text that the validator accepted; empty
    /// content degrades to a failure so the success invariant holds.
    #[must_use]
    pub(crate) fn accepted(
        content: impl Into<String>,
        method: impl Into<String>,
        confidence: f64,
        response_time_ms: u64,
    ) -> Self {
        let content = content.into();
        let method = method.into();
        if content.trim().is_empty() {
            return Self::failed(method, "accepted candidate was empty", response_time_ms);
        }
        Self {
            success: true,
            content: Some(content),
            method,
            confidence: clamp_confidence(confidence),
            response_time_ms,
            error: None,
            origin_method: None,
            attempts: Vec::new(),
        }
    }

    /// Creates a result served from the cache, at maximum confidence.
    #[must_use]
    pub(crate) fn from_cache(
        content: impl Into<String>,
        origin_method: impl Into<String>,
        response_time_ms: u64,
    ) -> Self {
        let mut result = Self::accepted(content, methods::CACHE, 1.0, response_time_ms);
        result.origin_method = Some(origin_method.into());
        result
    }

    /// Creates a failed result.
    #[must_use]
    pub fn failed(method: impl Into<String>, error: impl Into<String>, response_time_ms: u64) -> Self {
        Self {
            success: false,
            content: None,
            method: method.into(),
            confidence: 0.0,
            response_time_ms,
            error: Some(error.into()),
            origin_method: None,
            attempts: Vec::new(),
        }
    }

    /// Terminal result when every strategy missed or was rejected.
    ///
    /// The error reads "could not find X, here is what was tried and why".
    #[must_use]
    pub fn all_failed(target_label: &str, attempts: Vec<AttemptRecord>, response_time_ms: u64) -> Self {
        let tried = if attempts.is_empty() {
            "no strategies were enabled".to_string()
        } else {
            attempts
                .iter()
                .map(AttemptRecord::reason)
                .collect::<Vec<_>>()
                .join("; ")
        };
        let mut result = Self::failed(
            methods::ALL_FAILED,
            format!("Could not find a table of contents for {target_label}. Tried: {tried}"),
            response_time_ms,
        );
        result.attempts = attempts;
        result
    }

    /// Attaches the per-attempt trace.
    #[must_use]
    pub(crate) fn with_attempts(mut self, attempts: Vec<AttemptRecord>) -> Self {
        self.attempts = attempts;
        self
    }

    /// Overrides the response time.
    #[must_use]
    pub(crate) fn with_response_time_ms(mut self, response_time_ms: u64) -> Self {
        self.response_time_ms = response_time_ms;
        self
    }

    /// Whether a table of contents was found.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// The table of contents, when found.
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// Method that produced the result.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Trust in the result, in `[0, 1]`.
    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Wall-clock time spent producing the result.
    #[must_use]
    pub fn response_time_ms(&self) -> u64 {
        self.response_time_ms
    }

    /// Failure description.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// For cached results, the method that originally produced the content.
    #[must_use]
    pub fn origin_method(&self) -> Option<&str> {
        self.origin_method.as_deref()
    }

    /// Per-strategy trace of the run.
    #[must_use]
    pub fn attempts(&self) -> &[AttemptRecord] {
        &self.attempts
    }

    /// Message suitable for showing to an end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        if self.success {
            format!(
                "Found a table of contents via {} (confidence {:.0}%)",
                self.origin_method.as_deref().unwrap_or(&self.method),
                self.confidence * 100.0
            )
        } else {
            self.error
                .clone()
                .unwrap_or_else(|| "Could not find a table of contents".to_string())
        }
    }
}

/// Clamps a confidence to `[0, 1]`, mapping NaN to 0.
#[must_use]
pub(crate) fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
