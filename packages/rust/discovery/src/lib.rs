//! Navigation-menu discovery.
//!
//! Renders a documentation site's seed page, expands its collapsible menus
//! in place, and collects the navigation links that live under the seed URL.
//! The result is the page list a batch fetch works from.

mod expand;
mod links;

use std::time::Duration;

use tracing::{error, info, instrument, warn};
use url::Url;

use docsweep_crawler::{CacheMode, RenderOptions, Renderer};
use docsweep_shared::{DiscoveredLink, DocsweepError, MenuConfig, Result, SessionId};

pub use expand::{ExpansionReport, build_expand_script, expand_menus};
pub use links::LinkExtractor;

/// Finds the navigation links of a documentation site.
pub struct MenuDiscoverer<'r> {
    renderer: &'r dyn Renderer,
    config: MenuConfig,
}

impl<'r> MenuDiscoverer<'r> {
    pub fn new(renderer: &'r dyn Renderer, config: MenuConfig) -> Self {
        Self { renderer, config }
    }

    /// Absolute menu URLs under `seed_url`, unique and sorted.
    ///
    /// Never fails: any error is logged and yields an empty list.
    pub async fn discover(&self, seed_url: &str) -> Vec<String> {
        self.discover_links(seed_url)
            .await
            .into_iter()
            .map(|link| link.url)
            .collect()
    }

    /// Like [`discover`](Self::discover), keeping each link's label.
    #[instrument(skip(self), fields(renderer = self.renderer.name()))]
    pub async fn discover_links(&self, seed_url: &str) -> Vec<DiscoveredLink> {
        match self.try_discover(seed_url).await {
            Ok(links) => {
                info!(count = links.len(), "menu links discovered");
                links
            }
            Err(e) => {
                error!(error = %e, "menu discovery failed");
                Vec::new()
            }
        }
    }

    async fn try_discover(&self, seed_url: &str) -> Result<Vec<DiscoveredLink>> {
        let seed = Url::parse(seed_url)
            .map_err(|e| DocsweepError::validation(format!("invalid seed url '{seed_url}': {e}")))?;
        let extractor = LinkExtractor::new(&self.config.selectors, self.config.strip_fragments)?;

        let session = self.renderer.open_session(self.config.viewport).await?;
        let html = self.expanded_html(&seed, &session).await;
        if let Err(e) = self.renderer.close_session(&session).await {
            warn!(%session, error = %e, "failed to close renderer session");
        }

        Ok(extractor.extract(&html?, &seed))
    }

    /// Render the seed, expand its menus, and return the resulting DOM.
    ///
    /// The first expansion pass is injected into the render itself; the
    /// remaining passes run until the menus stop changing.
    async fn expanded_html(&self, seed: &Url, session: &SessionId) -> Result<String> {
        let options = RenderOptions::new(session.clone())
            .wait_for_images(true)
            .cache_mode(CacheMode::Bypass)
            .script(build_expand_script(&self.config.expansion_rules)?);
        let page = self.renderer.render(seed, &options).await?;

        let report = expand_menus(
            self.renderer,
            session,
            &self.config.expansion_rules,
            Duration::from_millis(self.config.settle_ms),
            self.config.max_passes,
        )
        .await;

        match report {
            Ok(report) => {
                info!(
                    expanded = report.expanded,
                    passes = report.passes,
                    "menus expanded"
                );
                match self.renderer.page_source(session).await {
                    Ok(html) => Ok(html),
                    Err(e) => {
                        warn!(error = %e, "could not re-read DOM after expansion");
                        Ok(page.html)
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "menu expansion failed, using the page as rendered");
                Ok(page.html)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use docsweep_crawler::RenderedPage;
    use docsweep_shared::Viewport;
    use serde_json::{Value, json};

    use super::*;

    const COLLAPSED: &str = r#"<html><body>
        <nav class="sidebar">
            <a href="/docs/intro">Intro</a>
            <button aria-expanded="false">API</button>
        </nav>
        <a href="/docs/footer-link">Not navigation</a>
    </body></html>"#;

    const EXPANDED: &str = r#"<html><body>
        <nav class="sidebar">
            <a href="/docs/intro">Intro</a>
            <button aria-expanded="true">API</button>
            <ul><li><a href="/docs/api/client">Client</a></li><li><a href="/docs/api/server">Server</a></li></ul>
            <a href="https://github.com/example/repo">GitHub</a>
            <a href="/docs/intro">Intro again</a>
        </nav>
    </body></html>"#;

    /// A page whose menu opens after one expansion pass.
    struct FakeBrowser {
        fail_render: bool,
        scripts_supported: bool,
        passes: Mutex<Vec<Value>>,
        opened: AtomicUsize,
        closed: AtomicUsize,
        render_options: Mutex<Option<RenderOptions>>,
    }

    impl FakeBrowser {
        fn new() -> Self {
            Self {
                fail_render: false,
                scripts_supported: true,
                passes: Mutex::new(vec![json!(0), json!(1)]),
                opened: AtomicUsize::new(0),
                closed: AtomicUsize::new(0),
                render_options: Mutex::new(None),
            }
        }

        fn expanded(&self) -> bool {
            self.passes.lock().unwrap().len() < 2
        }
    }

    #[async_trait]
    impl Renderer for FakeBrowser {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn open_session(&self, _viewport: Viewport) -> Result<SessionId> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(SessionId::new())
        }

        async fn close_session(&self, _session: &SessionId) -> Result<()> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn render(&self, url: &Url, options: &RenderOptions) -> Result<RenderedPage> {
            *self.render_options.lock().unwrap() = Some(options.clone());
            if self.fail_render {
                return Err(DocsweepError::Render(format!("{url}: net::ERR_NAME_NOT_RESOLVED")));
            }
            Ok(RenderedPage {
                url: url.clone(),
                html: COLLAPSED.to_string(),
            })
        }

        async fn page_source(&self, _session: &SessionId) -> Result<String> {
            Ok(if self.expanded() { EXPANDED } else { COLLAPSED }.to_string())
        }

        async fn execute_in_page(&self, _session: &SessionId, _script: &str) -> Result<Value> {
            if !self.scripts_supported {
                return Err(DocsweepError::Render("cannot execute scripts".into()));
            }
            // Values are popped from the back: first pass 1, then 0.
            Ok(self.passes.lock().unwrap().pop().unwrap_or(json!(0)))
        }
    }

    fn quick_config() -> MenuConfig {
        MenuConfig {
            settle_ms: 0,
            ..MenuConfig::default()
        }
    }

    #[tokio::test]
    async fn discovers_links_revealed_by_expansion() {
        let browser = FakeBrowser::new();
        let discoverer = MenuDiscoverer::new(&browser, quick_config());

        let links = discoverer.discover("https://docs.example.com/docs/").await;

        assert_eq!(
            links,
            vec![
                "https://docs.example.com/docs/api/client",
                "https://docs.example.com/docs/api/server",
                "https://docs.example.com/docs/intro",
            ]
        );
        assert_eq!(browser.opened.load(Ordering::SeqCst), 1);
        assert_eq!(browser.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn seed_render_waits_and_bypasses_cache() {
        let browser = FakeBrowser::new();
        MenuDiscoverer::new(&browser, quick_config())
            .discover("https://docs.example.com/docs/")
            .await;

        let opts = browser.render_options.lock().unwrap().clone().unwrap();
        assert!(opts.wait_for_images);
        assert_eq!(opts.cache_mode, CacheMode::Bypass);
    }

    #[tokio::test]
    async fn seed_render_injects_expansion_pass() {
        let browser = FakeBrowser::new();
        let config = quick_config();
        let expected = build_expand_script(&config.expansion_rules).unwrap();
        MenuDiscoverer::new(&browser, config)
            .discover("https://docs.example.com/docs/")
            .await;

        let opts = browser.render_options.lock().unwrap().clone().unwrap();
        assert_eq!(opts.scripts, vec![expected]);
    }

    #[tokio::test]
    async fn labels_come_from_first_anchor() {
        let browser = FakeBrowser::new();
        let links = MenuDiscoverer::new(&browser, quick_config())
            .discover_links("https://docs.example.com/docs/")
            .await;
        let intro = links.iter().find(|l| l.url.ends_with("/intro")).unwrap();
        assert_eq!(intro.text, "Intro");
    }

    #[tokio::test]
    async fn render_failure_yields_empty_and_closes_session() {
        let browser = FakeBrowser {
            fail_render: true,
            ..FakeBrowser::new()
        };
        let links = MenuDiscoverer::new(&browser, quick_config())
            .discover("https://docs.example.com/docs/")
            .await;
        assert!(links.is_empty());
        assert_eq!(browser.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expansion_failure_falls_back_to_rendered_dom() {
        let browser = FakeBrowser {
            scripts_supported: false,
            ..FakeBrowser::new()
        };
        let links = MenuDiscoverer::new(&browser, quick_config())
            .discover("https://docs.example.com/docs/")
            .await;
        assert_eq!(links, vec!["https://docs.example.com/docs/intro"]);
    }

    #[tokio::test]
    async fn invalid_selector_yields_empty_without_session() {
        let browser = FakeBrowser::new();
        let config = MenuConfig {
            selectors: vec!["nav a".into(), "a[[".into()],
            ..quick_config()
        };
        let links = MenuDiscoverer::new(&browser, config)
            .discover("https://docs.example.com/docs/")
            .await;
        assert!(links.is_empty());
        assert_eq!(browser.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_seed_yields_empty() {
        let browser = FakeBrowser::new();
        let links = MenuDiscoverer::new(&browser, quick_config())
            .discover("not a url")
            .await;
        assert!(links.is_empty());
    }
}
