//! Global `tracing` subscriber bootstrap.

use tracing_subscriber::{fmt, EnvFilter};

use crate::errors::{TocflowError, TocflowResult};

/// Output format of [`init_tracing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TracingFormat {
    /// Human readable, multi-line.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Installs a global fmt subscriber.
///
/// `RUST_LOG` overrides `default_filter` when set. Fails if a global
/// subscriber is already installed.
pub fn init_tracing(format: TracingFormat, default_filter: &str) -> TocflowResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| TocflowError::Config(format!("invalid tracing filter: {e}")))?;

    let builder = fmt().with_env_filter(filter).with_target(true);
    let result = match format {
        TracingFormat::Pretty => builder.pretty().try_init(),
        TracingFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| TocflowError::Internal(format!("tracing already initialized: {e}")))
}
