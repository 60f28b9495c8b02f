//! Extraction event publishing.

mod sink;
pub mod types;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
pub use types::ExtractionEvent;
