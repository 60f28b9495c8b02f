//! Span timing for extraction runs.

use tokio::time::Instant;

/// Simple span timing helper.
///
/// Uses the tokio clock, so paused-time tests see deterministic durations.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    name: String,
}

impl SpanTimer {
    /// Starts a new span timer.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Returns the elapsed time in whole milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Returns the span name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finishes the span, logs it, and returns the duration.
    #[must_use]
    pub fn finish(self) -> u64 {
        let duration_ms = self.elapsed_ms();
        tracing::trace!(span_name = %self.name, duration_ms, "Span finished");
        duration_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_span_timer() {
        let timer = SpanTimer::start("test_span");
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(timer.name(), "test_span");
        assert_eq!(timer.finish(), 250);
    }
}
