//! The rendering collaborator seam.
//!
//! Everything that needs a page loaded (menu discovery, batch fetching) goes
//! through [`Renderer`], so a headless browser and a plain HTTP client are
//! interchangeable, and tests can script a fake.

use async_trait::async_trait;
use url::Url;

use docsweep_shared::{Result, SessionId, Viewport};

/// Whether the renderer may serve a cached copy of the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheMode {
    #[default]
    Enabled,
    /// Always go to the network.
    Bypass,
}

/// Per-request rendering options.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Session the page is loaded into; its context (cookies, window) is reused.
    pub session: SessionId,
    /// Scripts run in the page after load, in order. Their results are discarded.
    pub scripts: Vec<String>,
    /// Wait until every `<img>` reports completion (bounded by the renderer).
    pub wait_for_images: bool,
    pub cache_mode: CacheMode,
}

impl RenderOptions {
    pub fn new(session: SessionId) -> Self {
        Self {
            session,
            scripts: Vec::new(),
            wait_for_images: false,
            cache_mode: CacheMode::default(),
        }
    }

    pub fn wait_for_images(mut self, wait: bool) -> Self {
        self.wait_for_images = wait;
        self
    }

    pub fn cache_mode(mut self, mode: CacheMode) -> Self {
        self.cache_mode = mode;
        self
    }

    pub fn script(mut self, script: impl Into<String>) -> Self {
        self.scripts.push(script.into());
        self
    }
}

/// A page after rendering.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Final URL after redirects.
    pub url: Url,
    /// Serialized DOM.
    pub html: String,
}

/// A page-rendering backend.
///
/// Implementations must be usable from several tasks at once; session state
/// lives behind interior mutability.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Open a fresh browsing context sized to `viewport`.
    async fn open_session(&self, viewport: Viewport) -> Result<SessionId>;

    /// Release a session. Closing an unknown session is not an error.
    async fn close_session(&self, session: &SessionId) -> Result<()>;

    /// Load `url` into the session named by `options`.
    async fn render(&self, url: &Url, options: &RenderOptions) -> Result<RenderedPage>;

    /// Current serialized DOM of the session's page.
    async fn page_source(&self, session: &SessionId) -> Result<String>;

    /// Run `script` as a function body in the session's page and return its
    /// JSON-encoded result.
    async fn execute_in_page(
        &self,
        session: &SessionId,
        script: &str,
    ) -> Result<serde_json::Value>;
}
