//! Static HTTP renderer.
//!
//! Fetches pages with a plain GET and never executes JavaScript. Useful for
//! server-rendered documentation and for running without a WebDriver.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CACHE_CONTROL;
use tokio::sync::Mutex;
use tracing::{debug, instrument};
use url::Url;

use docsweep_shared::{DocsweepError, Result, SessionId, Viewport};

use crate::render::{CacheMode, RenderOptions, RenderedPage, Renderer};

/// User-Agent string for page requests.
const USER_AGENT: &str = concat!("docsweep/", env!("CARGO_PKG_VERSION"));

/// Renders pages by downloading their HTML.
pub struct HttpRenderer {
    client: Client,
    /// Open sessions and the last document each one loaded.
    sessions: Mutex<HashMap<SessionId, Option<String>>>,
}

impl HttpRenderer {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(timeout)
            .build()
            .map_err(|e| DocsweepError::Render(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            sessions: Mutex::new(HashMap::new()),
        })
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn open_session(&self, _viewport: Viewport) -> Result<SessionId> {
        let id = SessionId::new();
        self.sessions.lock().await.insert(id.clone(), None);
        debug!(session = %id, "opened http session");
        Ok(id)
    }

    async fn close_session(&self, session: &SessionId) -> Result<()> {
        self.sessions.lock().await.remove(session);
        debug!(%session, "closed http session");
        Ok(())
    }

    #[instrument(skip_all, fields(%url, session = %options.session))]
    async fn render(&self, url: &Url, options: &RenderOptions) -> Result<RenderedPage> {
        if !self.sessions.lock().await.contains_key(&options.session) {
            return Err(DocsweepError::Render(format!(
                "unknown session {}",
                options.session
            )));
        }
        if !options.scripts.is_empty() {
            debug!(
                count = options.scripts.len(),
                "http renderer ignores injected scripts"
            );
        }

        let mut request = self.client.get(url.as_str());
        if options.cache_mode == CacheMode::Bypass {
            request = request.header(CACHE_CONTROL, "no-cache");
        }

        let response = request
            .send()
            .await
            .map_err(|e| DocsweepError::Render(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DocsweepError::Render(format!("{url}: HTTP {status}")));
        }

        let final_url = response.url().clone();
        let html = response
            .text()
            .await
            .map_err(|e| DocsweepError::Render(format!("{url}: body read failed: {e}")))?;
        debug!(bytes = html.len(), "fetched page");

        if let Some(slot) = self.sessions.lock().await.get_mut(&options.session) {
            *slot = Some(html.clone());
        }

        Ok(RenderedPage {
            url: final_url,
            html,
        })
    }

    async fn page_source(&self, session: &SessionId) -> Result<String> {
        match self.sessions.lock().await.get(session) {
            Some(Some(html)) => Ok(html.clone()),
            Some(None) => Err(DocsweepError::Render(format!(
                "session {session} has not loaded a page"
            ))),
            None => Err(DocsweepError::Render(format!("unknown session {session}"))),
        }
    }

    async fn execute_in_page(
        &self,
        _session: &SessionId,
        _script: &str,
    ) -> Result<serde_json::Value> {
        Err(DocsweepError::Render(
            "http renderer cannot execute scripts".into(),
        ))
    }
}
