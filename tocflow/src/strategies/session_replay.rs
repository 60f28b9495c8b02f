//! Selector lookup on a detail page reached through a replayed visit.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use super::html::select_toc;
use super::Extractor;
use crate::core::{methods, Candidate, StrategyMiss, Target};
use crate::observability::SpanTimer;
use crate::session::SessionContext;

/// Walks home, search and detail through a [`SessionContext`] so gated
/// detail pages see cookies and a referrer chain, then runs the selector
/// lookup. Works from a title alone.
#[derive(Debug, Clone)]
pub struct SessionReplayStrategy {
    session: Arc<SessionContext>,
}

impl SessionReplayStrategy {
    /// Creates the strategy over a shared session.
    #[must_use]
    pub fn new(session: Arc<SessionContext>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Extractor for SessionReplayStrategy {
    fn name(&self) -> &str {
        methods::SESSION_REPLAY
    }

    async fn attempt(&self, target: &Target) -> Result<Candidate, StrategyMiss> {
        let timer = SpanTimer::start(methods::SESSION_REPLAY);
        let page = self.session.navigate_to_detail(target).await?;
        let selectors = self.session.site().selectors_for(Some(&page.id));

        let hit = select_toc(&page.response.body, &selectors).ok_or_else(|| {
            StrategyMiss::no_candidate(format!("no container on {}", page.url))
        })?;

        let elapsed_ms = timer.finish();
        debug!(url = %page.url, selector = %hit.selector, elapsed_ms, "Session replay candidate");
        Ok(Candidate::new(hit.text, methods::SESSION_REPLAY)
            .with_metadata("url", json!(page.url))
            .with_metadata("id", json!(page.id))
            .with_metadata("selector", json!(hit.selector))
            .with_metadata("elapsed_ms", json!(elapsed_ms)))
    }
}
