//! Stateful navigation through a site that expects a believable visit.

use parking_lot::Mutex;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::cookies::CookieJar;
use crate::config::{SiteConfig, TocflowConfig};
use crate::core::Target;
use crate::errors::{FetchError, SessionError, TocflowError, TocflowResult};
use crate::fetch::{FetchResponse, Fetcher};

/// Cookies plus whether the handshake has happened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Accumulated cookies.
    pub cookies: CookieJar,
    /// Whether the handshake succeeded.
    pub established: bool,
}

/// The detail page reached by [`SessionContext::navigate_to_detail`].
#[derive(Debug, Clone)]
pub struct DetailPage {
    /// Catalog id, given or resolved from search results.
    pub id: String,
    /// URL requested for the detail hop.
    pub url: String,
    /// The detail page response.
    pub response: FetchResponse,
}

/// Cookie jar, header builder and multi-hop replay for one logical session.
///
/// Concurrent callers share the jar; the handshake is serialized so two
/// callers never establish the session twice.
pub struct SessionContext {
    fetcher: Arc<dyn Fetcher>,
    site: SiteConfig,
    user_agent: String,
    state: Mutex<SessionState>,
    handshake: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("site", &self.site.base_url)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl SessionContext {
    /// Creates a session for a site.
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetcher>, site: SiteConfig, user_agent: impl Into<String>) -> Self {
        Self {
            fetcher,
            site,
            user_agent: user_agent.into(),
            state: Mutex::new(SessionState::default()),
            handshake: tokio::sync::Mutex::new(()),
        }
    }

    /// Creates a session from the crate configuration.
    #[must_use]
    pub fn from_config(fetcher: Arc<dyn Fetcher>, config: &TocflowConfig) -> Self {
        Self::new(fetcher, config.site.clone(), config.user_agent.clone())
    }

    /// The site this session navigates.
    #[must_use]
    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    /// Whether the handshake has succeeded.
    #[must_use]
    pub fn is_established(&self) -> bool {
        self.state.lock().established
    }

    /// Copy of the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.lock().clone()
    }

    /// Clears cookies and the established flag.
    pub fn reset(&self) {
        *self.state.lock() = SessionState::default();
        debug!(site = %self.site.base_url, "Session reset");
    }

    /// Requests the site root to collect baseline cookies.
    ///
    /// A no-op when already established.
    pub async fn establish_session(&self) -> Result<(), SessionError> {
        if self.is_established() {
            return Ok(());
        }
        let _guard = self.handshake.lock().await;
        if self.is_established() {
            return Ok(());
        }

        let root = self.site.home_url();
        let headers = self.build_headers(None);
        let response = self.fetcher.fetch(&root, &headers).await.map_err(|err| {
            warn!(url = %root, error = %err.message, "Session handshake failed");
            SessionError::new(&root, err.message)
        })?;

        if !response.is_success() {
            warn!(url = %root, status = response.status, "Session handshake rejected");
            return Err(SessionError::new(&root, format!("HTTP {}", response.status)));
        }

        let mut state = self.state.lock();
        let merged = state.cookies.merge_response(&response);
        state.established = true;
        info!(url = %root, cookies = merged, "Session established");
        Ok(())
    }

    /// Issues a request carrying the session's cookies, user agent and an
    /// optional referrer, establishing the session first if needed.
    ///
    /// Handshake failure surfaces as [`TocflowError::Session`]; failure of
    /// this request as [`TocflowError::Fetch`] tagged with `url`.
    pub async fn authenticated_request(
        &self,
        url: &str,
        referrer: Option<&str>,
    ) -> TocflowResult<FetchResponse> {
        self.establish_session().await?;

        let headers = self.build_headers(referrer);
        let response = self.fetcher.fetch(url, &headers).await.map_err(|err| {
            TocflowError::Fetch(FetchError {
                url: url.to_string(),
                ..err
            })
        })?;

        let merged = self.state.lock().cookies.merge_response(&response);
        debug!(url, status = response.status, cookies = merged, "Authenticated request");
        response.error_for_status(url).map_err(Into::into)
    }

    /// Replays home, search, detail so the detail page sees a referrer
    /// chain. The search hop is skipped when the id is known and there is
    /// no title; when the id is unknown it is taken from the first detail
    /// link on the search results.
    pub async fn navigate_to_detail(&self, target: &Target) -> TocflowResult<DetailPage> {
        let home = self.site.home_url();
        if self.is_established() {
            self.authenticated_request(&home, None).await?;
        } else {
            self.establish_session().await?;
        }

        let mut referrer = home;
        let mut id = target.id.clone().filter(|id| !id.trim().is_empty());

        if let Some(title) = target.title.as_deref().filter(|t| !t.trim().is_empty()) {
            self.pause().await;
            let search_url = self.site.search_url(title);
            let results = self.authenticated_request(&search_url, Some(&referrer)).await?;
            if id.is_none() {
                id = first_detail_id(&results.body);
                if id.is_none() {
                    return Err(FetchError::new(&search_url, "no detail link in search results").into());
                }
            }
            referrer = search_url;
        }

        let Some(id) = id else {
            return Err(TocflowError::Internal(
                "navigation needs a catalog id or a title".to_string(),
            ));
        };

        self.pause().await;
        let url = target
            .detail_url
            .clone()
            .unwrap_or_else(|| self.site.detail_url(&id));
        let response = self.authenticated_request(&url, Some(&referrer)).await?;
        Ok(DetailPage { id, url, response })
    }

    fn build_headers(&self, referrer: Option<&str>) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("User-Agent".to_string(), self.user_agent.clone());
        headers.insert(
            "Accept".to_string(),
            "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8".to_string(),
        );
        if let Some(cookie) = self.state.lock().cookies.header_value() {
            headers.insert("Cookie".to_string(), cookie);
        }
        if let Some(referrer) = referrer {
            headers.insert("Referer".to_string(), referrer.to_string());
        }
        headers
    }

    async fn pause(&self) {
        let jitter = self.site.hop_jitter_ms;
        let delay = self.site.hop_delay_ms
            + if jitter > 0 {
                rand::thread_rng().gen_range(0..=jitter)
            } else {
                0
            };
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }
}

/// First `/subject/{id}/` link in a page.
#[must_use]
pub fn first_detail_id(html: &str) -> Option<String> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/subject/(\d+)/").ok())
        .as_ref()?
        .captures(html)
        .map(|caps| caps[1].to_string())
}
