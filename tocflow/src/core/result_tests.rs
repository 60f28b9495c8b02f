//! Tests for ExtractionResult and attempt records.

#[cfg(test)]
mod tests {
    use crate::core::result::clamp_confidence;
    use crate::core::{methods, AttemptOutcome, AttemptRecord, ExtractionResult, MissKind};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_accepted_clamps_confidence() {
        let result = ExtractionResult::accepted("1. Intro\n2. Body\n3. End", "dom_selector", 1.7, 12);
        assert!(result.is_success());
        assert_eq!(result.confidence(), 1.0);
        assert_eq!(result.method(), "dom_selector");
        assert_eq!(result.response_time_ms(), 12);
        assert!(result.error().is_none());

        let result = ExtractionResult::accepted("x", "dom_selector", -0.3, 0);
        assert_eq!(result.confidence(), 0.0);
    }

    #[test]
    fn test_accepted_empty_content_is_failure() {
        let result = ExtractionResult::accepted("   \n ", "text_scan", 0.9, 5);
        assert!(!result.is_success());
        assert!(result.content().is_none());
        assert_eq!(result.confidence(), 0.0);
    }

    #[test]
    fn test_from_cache_has_max_confidence() {
        let result = ExtractionResult::from_cache("Chapter 1\nChapter 2\nChapter 3", "open_library", 0);
        assert!(result.is_success());
        assert_eq!(result.method(), methods::CACHE);
        assert_eq!(result.origin_method(), Some("open_library"));
        assert_eq!(result.confidence(), 1.0);
        assert!(result.user_message().contains("open_library"));
    }

    #[test]
    fn test_all_failed_lists_reasons_in_order() {
        let attempts = vec![
            AttemptRecord::new("structured_data", AttemptOutcome::Missed(MissKind::NoCandidate), 3)
                .with_detail("no JSON-LD"),
            AttemptRecord::new("dom_selector", AttemptOutcome::Rejected, 4)
                .with_detail("too few lines"),
            AttemptRecord::new("text_scan", AttemptOutcome::Disabled, 0),
        ];

        let result = ExtractionResult::all_failed("\"Dune\"", attempts, 7);

        assert!(!result.is_success());
        assert_eq!(result.method(), methods::ALL_FAILED);
        assert_eq!(result.attempts().len(), 3);
        assert_eq!(
            result.error(),
            Some(
                "Could not find a table of contents for \"Dune\". Tried: \
                 structured_data: no candidate (no JSON-LD); \
                 dom_selector: validation reject (too few lines); \
                 text_scan: disabled"
            )
        );
        assert_eq!(result.user_message(), result.error().unwrap_or_default());
    }

    #[test]
    fn test_all_failed_without_strategies() {
        let result = ExtractionResult::all_failed("#1", Vec::new(), 0);
        assert!(result.error().is_some_and(|e| e.ends_with("no strategies were enabled")));
    }

    #[test]
    fn test_attempt_outcome_validated() {
        assert!(AttemptOutcome::Accepted.is_validated());
        assert!(AttemptOutcome::NotBetter.is_validated());
        assert!(!AttemptOutcome::Rejected.is_validated());
        assert!(!AttemptOutcome::Missed(MissKind::Timeout).is_validated());
    }

    #[test]
    fn test_clamp_confidence_nan() {
        assert_eq!(clamp_confidence(f64::NAN), 0.0);
        assert_eq!(clamp_confidence(0.42), 0.42);
    }

    #[test]
    fn test_result_serializes_without_empty_fields() {
        let result = ExtractionResult::accepted("a\nb\nc", "dom_selector", 0.5, 1);
        let json = serde_json::to_value(&result).unwrap_or_default();
        assert_eq!(json["success"], serde_json::json!(true));
        assert!(json.get("error").is_none());
        assert!(json.get("attempts").is_none());
    }
}
