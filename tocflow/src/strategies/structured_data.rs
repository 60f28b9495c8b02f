//! Table of contents from machine-readable data embedded in the page.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::aliases::{find_toc, value_to_lines};
use super::html::{embedded_json_blocks, json_ld_blocks};
use super::page::PageLoader;
use super::Extractor;
use crate::core::{methods, Candidate, StrategyMiss, Target};
use crate::observability::SpanTimer;

/// Reads JSON-LD and page-state JSON on the detail page and looks the
/// table of contents up through the field-alias table.
#[derive(Debug, Clone)]
pub struct StructuredDataStrategy {
    loader: PageLoader,
}

impl StructuredDataStrategy {
    /// Creates the strategy.
    #[must_use]
    pub fn new(loader: PageLoader) -> Self {
        Self { loader }
    }
}

/// Finds a table of contents in a page's structured data.
///
/// JSON-LD is searched before page-state JSON.
#[must_use]
pub(crate) fn toc_from_structured_data(html: &str) -> Option<(&'static str, &'static str, String)> {
    let sources = [("json_ld", json_ld_blocks(html)), ("embedded_json", embedded_json_blocks(html))];
    sources.iter().find_map(|(source, blocks)| {
        blocks.iter().find_map(|block| {
            let (field, value) = find_toc(block)?;
            let lines = value_to_lines(value);
            (!lines.is_empty()).then(|| (*source, field, lines.join("\n")))
        })
    })
}

#[async_trait]
impl Extractor for StructuredDataStrategy {
    fn name(&self) -> &str {
        methods::STRUCTURED_DATA
    }

    async fn attempt(&self, target: &Target) -> Result<Candidate, StrategyMiss> {
        let timer = SpanTimer::start(methods::STRUCTURED_DATA);
        let location = self.loader.locate(target)?;
        let html = self.loader.load(&location.url).await?;

        let Some((source, field, text)) = toc_from_structured_data(&html) else {
            debug!(url = %location.url, "No table of contents in structured data");
            return Err(StrategyMiss::no_candidate("no table-of-contents field in structured data"));
        };

        let elapsed_ms = timer.finish();
        debug!(url = %location.url, source, field, elapsed_ms, "Structured data candidate");
        Ok(Candidate::new(text, methods::STRUCTURED_DATA)
            .with_metadata("url", json!(location.url))
            .with_metadata("source", json!(source))
            .with_metadata("field", json!(field))
            .with_metadata("elapsed_ms", json!(elapsed_ms)))
    }
}
