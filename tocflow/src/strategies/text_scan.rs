//! Last resort: find the table of contents in the page's visible text.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use super::html::visible_text;
use super::page::PageLoader;
use super::Extractor;
use crate::core::{methods, Candidate, StrategyMiss, Target};
use crate::observability::SpanTimer;
use crate::validation::RuleEngine;

const MAX_TOC_LINE_CHARS: usize = 120;
const MAX_FILLER_LINE_CHARS: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Toc,
    Filler,
    Break,
}

fn classify(engine: &RuleEngine, line: &str) -> LineKind {
    let chars = line.chars().count();
    match engine.line_weight(line) {
        Some(weight) if weight > 0.0 && chars <= MAX_TOC_LINE_CHARS => LineKind::Toc,
        Some(_) if chars <= MAX_FILLER_LINE_CHARS => LineKind::Filler,
        _ => LineKind::Break,
    }
}

/// The longest run of TOC-like lines in `text`.
///
/// A run tolerates single short unmarked lines between marked ones (sub
/// headings without numbers) and ends at a blacklisted or long line.
/// Returns `None` unless the best run has at least `min_lines` marked lines.
#[must_use]
pub fn longest_toc_block(engine: &RuleEngine, text: &str, min_lines: usize) -> Option<String> {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    // (start, end inclusive, marked lines)
    let mut best: Option<(usize, usize, usize)> = None;
    let mut current: Option<(usize, usize, usize)> = None;
    let mut in_gap = false;

    let mut close = |current: &mut Option<(usize, usize, usize)>| {
        if let Some(run) = current.take() {
            if best.map_or(true, |b| run.2 > b.2) {
                best = Some(run);
            }
        }
    };

    for (i, line) in lines.iter().enumerate() {
        match classify(engine, line) {
            LineKind::Toc => {
                let run = current.get_or_insert((i, i, 0));
                run.1 = i;
                run.2 += 1;
                in_gap = false;
            }
            LineKind::Filler if current.is_some() && !in_gap => in_gap = true,
            _ => {
                close(&mut current);
                in_gap = false;
            }
        }
    }
    close(&mut current);

    best.filter(|(_, _, marked)| *marked >= min_lines)
        .map(|(start, end, _)| lines[start..=end].join("\n"))
}

/// Scans the detail page's visible text for the longest TOC-like block.
#[derive(Debug, Clone)]
pub struct TextScanStrategy {
    loader: PageLoader,
    engine: Arc<RuleEngine>,
    min_lines: usize,
}

impl TextScanStrategy {
    /// Creates the strategy over the default rule table.
    #[must_use]
    pub fn new(loader: PageLoader) -> Self {
        Self {
            loader,
            engine: RuleEngine::shared(),
            min_lines: 3,
        }
    }

    /// Sets the minimum number of marked lines in a block.
    #[must_use]
    pub fn with_min_lines(mut self, min_lines: usize) -> Self {
        self.min_lines = min_lines;
        self
    }
}

#[async_trait]
impl Extractor for TextScanStrategy {
    fn name(&self) -> &str {
        methods::TEXT_SCAN
    }

    async fn attempt(&self, target: &Target) -> Result<Candidate, StrategyMiss> {
        let timer = SpanTimer::start(methods::TEXT_SCAN);
        let location = self.loader.locate(target)?;
        let html = self.loader.load(&location.url).await?;
        let text = visible_text(&html);

        let block = longest_toc_block(&self.engine, &text, self.min_lines)
            .ok_or_else(|| StrategyMiss::no_candidate("no block of TOC-like lines in page text"))?;

        let elapsed_ms = timer.finish();
        debug!(url = %location.url, lines = block.lines().count(), elapsed_ms, "Text scan candidate");
        Ok(Candidate::new(block, methods::TEXT_SCAN)
            .with_metadata("url", json!(location.url))
            .with_metadata("elapsed_ms", json!(elapsed_ms)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::fetch::FetchResponse;
    use crate::testing::ScriptedFetcher;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_longest_block_with_gaps() {
        let text = "Dune\nBy Frank Herbert\n1. Intro\n\nPart One\nChapter 1 Sand\nThe desert\nChapter 2 Spice\nChapter 3 Worms\n相关推荐\n1. Other book\n2. Another";
        let engine = RuleEngine::shared();
        assert_eq!(
            longest_toc_block(&engine, text, 3).as_deref(),
            Some("1. Intro\nPart One\nChapter 1 Sand\nThe desert\nChapter 2 Spice\nChapter 3 Worms")
        );
    }

    #[test]
    fn test_two_fillers_end_a_block() {
        let text = "1. A thing\n2. B thing\nplain\nplain again\n1. C\n2. D\n3. E";
        let engine = RuleEngine::shared();
        assert_eq!(longest_toc_block(&engine, text, 3).as_deref(), Some("1. C\n2. D\n3. E"));
        assert_eq!(longest_toc_block(&engine, "1. A\nplain\nplain", 3), None);
    }

    #[tokio::test]
    async fn test_scan_detail_page() {
        let page = "<html><body><h1>Dune</h1><p>A novel.</p><ul><li>Chapter 1 Sand</li><li>Chapter 2 Spice</li><li>Chapter 3 Worms</li></ul><footer>© 2024 Example</footer></body></html>";
        let fetcher = ScriptedFetcher::new().route("/subject/3/", FetchResponse::ok("", page));
        let strategy = TextScanStrategy::new(PageLoader::new(
            Arc::new(fetcher),
            SiteConfig::new("https://books.example.com"),
            "ua",
        ));
        let candidate = strategy.attempt(&Target::with_id("3")).await.unwrap();
        assert_eq!(candidate.text(), "Chapter 1 Sand\nChapter 2 Spice\nChapter 3 Worms");
    }
}
