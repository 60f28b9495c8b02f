//! Observability utilities.

mod subscriber;
mod timing;

pub use subscriber::{init_tracing, TracingFormat};
pub use timing::SpanTimer;
