//! Headless-browser renderer over WebDriver (chromedriver by default).
//!
//! Each session owns its own WebDriver client, and therefore its own browser
//! profile, so cookies and caches never leak between sessions.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder};
use serde_json::{Map, Value, json};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use url::Url;

use docsweep_shared::{BrowserConfig, DocsweepError, Result, SessionId, Viewport};

use crate::render::{CacheMode, RenderOptions, RenderedPage, Renderer};

/// Resolves to `true` once every image on the page has finished loading.
const IMAGES_COMPLETE_JS: &str = "return Array.from(document.images).every(img => img.complete);";

const IMAGE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Renders pages in a real browser, executing their JavaScript.
pub struct WebDriverRenderer {
    webdriver_url: String,
    headless: bool,
    image_wait_timeout: Duration,
    sessions: Mutex<HashMap<SessionId, Client>>,
}

impl WebDriverRenderer {
    pub fn new(config: &BrowserConfig) -> Self {
        Self {
            webdriver_url: config.webdriver_url.clone(),
            headless: config.headless,
            image_wait_timeout: Duration::from_millis(config.image_wait_timeout_ms),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn capabilities(&self, viewport: Viewport) -> Map<String, Value> {
        let mut args = vec![
            json!(format!("--window-size={},{}", viewport.width, viewport.height)),
            json!("--disable-dev-shm-usage"),
        ];
        if self.headless {
            args.push(json!("--headless=new"));
            args.push(json!("--disable-gpu"));
        }

        let mut caps = Map::new();
        caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
        caps
    }

    async fn client(&self, session: &SessionId) -> Result<Client> {
        self.sessions
            .lock()
            .await
            .get(session)
            .cloned()
            .ok_or_else(|| DocsweepError::Render(format!("unknown session {session}")))
    }

    async fn wait_for_images(&self, client: &Client) {
        let deadline = Instant::now() + self.image_wait_timeout;
        loop {
            match client.execute(IMAGES_COMPLETE_JS, vec![]).await {
                Ok(Value::Bool(true)) => return,
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "image readiness check failed");
                    return;
                }
            }
            if Instant::now() >= deadline {
                warn!(
                    timeout_ms = self.image_wait_timeout.as_millis() as u64,
                    "images still loading, continuing"
                );
                return;
            }
            tokio::time::sleep(IMAGE_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl Renderer for WebDriverRenderer {
    fn name(&self) -> &'static str {
        "webdriver"
    }

    #[instrument(skip(self), fields(webdriver = %self.webdriver_url))]
    async fn open_session(&self, viewport: Viewport) -> Result<SessionId> {
        let client = ClientBuilder::native()
            .capabilities(self.capabilities(viewport))
            .connect(&self.webdriver_url)
            .await
            .map_err(|e| {
                DocsweepError::Render(format!(
                    "failed to connect to WebDriver at {}: {e}",
                    self.webdriver_url
                ))
            })?;

        client
            .set_window_size(viewport.width, viewport.height)
            .await
            .map_err(|e| DocsweepError::Render(format!("failed to size window: {e}")))?;

        let id = SessionId::new();
        self.sessions.lock().await.insert(id.clone(), client);
        debug!(session = %id, "opened browser session");
        Ok(id)
    }

    async fn close_session(&self, session: &SessionId) -> Result<()> {
        let Some(client) = self.sessions.lock().await.remove(session) else {
            return Ok(());
        };
        client
            .close()
            .await
            .map_err(|e| DocsweepError::Render(format!("failed to close session {session}: {e}")))?;
        debug!(%session, "closed browser session");
        Ok(())
    }

    #[instrument(skip_all, fields(%url, session = %options.session))]
    async fn render(&self, url: &Url, options: &RenderOptions) -> Result<RenderedPage> {
        let client = self.client(&options.session).await?;

        if options.cache_mode == CacheMode::Bypass {
            // Fresh profiles start with an empty HTTP cache; nothing else to do.
            debug!("cache bypass requested");
        }

        client
            .goto(url.as_str())
            .await
            .map_err(|e| DocsweepError::Render(format!("{url}: navigation failed: {e}")))?;

        if options.wait_for_images {
            self.wait_for_images(&client).await;
        }

        for script in &options.scripts {
            if let Err(e) = client.execute(script, vec![]).await {
                warn!(error = %e, "injected script failed");
            }
        }

        let final_url = client.current_url().await.unwrap_or_else(|e| {
            debug!(error = %e, "current_url unavailable, using requested url");
            url.clone()
        });
        let html = client
            .source()
            .await
            .map_err(|e| DocsweepError::Render(format!("{url}: reading page source failed: {e}")))?;
        debug!(bytes = html.len(), "rendered page");

        Ok(RenderedPage {
            url: final_url,
            html,
        })
    }

    async fn page_source(&self, session: &SessionId) -> Result<String> {
        self.client(session)
            .await?
            .source()
            .await
            .map_err(|e| DocsweepError::Render(format!("reading page source failed: {e}")))
    }

    async fn execute_in_page(&self, session: &SessionId, script: &str) -> Result<Value> {
        self.client(session)
            .await?
            .execute(script, vec![])
            .await
            .map_err(|e| DocsweepError::Render(format!("script execution failed: {e}")))
    }
}
