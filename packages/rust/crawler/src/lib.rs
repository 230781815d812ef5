//! Page rendering and batch fetching.
//!
//! This crate provides:
//! - [`Renderer`]: the rendering collaborator trait, with [`WebDriverRenderer`]
//!   (headless browser) and [`HttpRenderer`] (static GET) implementations
//! - [`BatchFetcher`]: sequential, session-scoped fetch of many pages into Markdown

pub mod batch;
pub mod http;
pub mod render;
pub mod webdriver;

pub use batch::{BatchFetcher, FetchProgress, SilentFetchProgress};
pub use http::HttpRenderer;
pub use render::{CacheMode, RenderOptions, RenderedPage, Renderer};
pub use webdriver::WebDriverRenderer;

use std::time::Duration;

use docsweep_shared::{BrowserConfig, RendererKind, Result};

/// Build the renderer selected by `config`.
pub fn build_renderer(config: &BrowserConfig) -> Result<Box<dyn Renderer>> {
    Ok(match config.renderer {
        RendererKind::Webdriver => Box::new(WebDriverRenderer::new(config)),
        RendererKind::Http => Box::new(HttpRenderer::new(Duration::from_secs(
            config.request_timeout_secs,
        ))?),
    })
}
