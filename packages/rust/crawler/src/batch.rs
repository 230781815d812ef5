//! Sequential multi-page fetcher.
//!
//! Renders a list of URLs one at a time inside a single renderer session,
//! turns each page into Markdown, and records a [`FetchResult`] per URL. A
//! failing page never aborts the batch.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use docsweep_markdown::{MarkdownPolicy, generate_markdown};
use docsweep_shared::{DocsweepError, FetchConfig, FetchResult, Result, SessionId, Viewport};

use crate::render::{CacheMode, RenderOptions, Renderer};

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Per-page progress callback for batch fetches.
pub trait FetchProgress: Send + Sync {
    /// Called before page `index` (1-based) of `total` is rendered.
    fn page_started(&self, url: &str, index: usize, total: usize);
    /// Called once page `index` has a result.
    fn page_finished(&self, result: &FetchResult, index: usize, total: usize);
}

/// No-op fetch progress.
pub struct SilentFetchProgress;

impl FetchProgress for SilentFetchProgress {
    fn page_started(&self, _url: &str, _index: usize, _total: usize) {}
    fn page_finished(&self, _result: &FetchResult, _index: usize, _total: usize) {}
}

// ---------------------------------------------------------------------------
// BatchFetcher
// ---------------------------------------------------------------------------

/// Fetches pages in input order through one reused renderer session.
pub struct BatchFetcher<'r> {
    renderer: &'r dyn Renderer,
    policy: MarkdownPolicy,
    viewport: Viewport,
}

impl<'r> BatchFetcher<'r> {
    pub fn new(renderer: &'r dyn Renderer, config: &FetchConfig) -> Self {
        Self {
            renderer,
            policy: MarkdownPolicy::from(config),
            viewport: config.viewport,
        }
    }

    /// Fetch every URL, returning exactly one result per input, in order.
    ///
    /// The session is closed after the loop whatever the per-page outcomes.
    #[instrument(skip_all, fields(renderer = self.renderer.name(), total = urls.len()))]
    pub async fn crawl(&self, urls: &[String], progress: &dyn FetchProgress) -> Vec<FetchResult> {
        let total = urls.len();
        if total == 0 {
            return Vec::new();
        }

        let session = match self.renderer.open_session(self.viewport).await {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "could not open renderer session");
                let message = e.to_string();
                return urls
                    .iter()
                    .map(|url| FetchResult::failed(url.as_str(), message.as_str()))
                    .collect();
            }
        };

        let mut results = Vec::with_capacity(total);
        for (i, url) in urls.iter().enumerate() {
            let index = i + 1;
            progress.page_started(url, index, total);

            let fetched = AssertUnwindSafe(self.fetch_one(url, &session))
                .catch_unwind()
                .await;
            let result = match fetched {
                Ok(Ok(markdown)) => FetchResult::succeeded(url.as_str(), markdown),
                Ok(Err(e)) => FetchResult::failed(url.as_str(), e.to_string()),
                Err(panic) => FetchResult::failed(
                    url.as_str(),
                    format!("page processing panicked: {}", panic_message(panic.as_ref())),
                ),
            };

            let percent = index * 100 / total;
            if result.success {
                info!(%url, index, total, percent, chars = result.content_length, "page fetched");
            } else {
                warn!(%url, index, total, percent, error = result.error.as_deref().unwrap_or_default(), "page failed");
            }

            progress.page_finished(&result, index, total);
            results.push(result);
        }

        if let Err(e) = self.renderer.close_session(&session).await {
            warn!(%session, error = %e, "failed to close renderer session");
        }

        let succeeded = results.iter().filter(|r| r.success).count();
        info!("successfully crawled {succeeded}/{total}");
        results
    }

    async fn fetch_one(&self, url: &str, session: &SessionId) -> Result<String> {
        let parsed = Url::parse(url)
            .map_err(|e| DocsweepError::validation(format!("invalid url '{url}': {e}")))?;

        let options = RenderOptions::new(session.clone()).cache_mode(CacheMode::Bypass);
        let page = self.renderer.render(&parsed, &options).await?;
        debug!(%url, html_len = page.html.len(), "rendered");

        generate_markdown(&page.html, &self.policy, Some(&page.url))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::render::RenderedPage;

    /// Serves canned HTML per URL; URLs without an entry fail to render.
    #[derive(Default)]
    struct ScriptedRenderer {
        pages: HashMap<String, String>,
        refuse_sessions: bool,
        panic_on: Option<String>,
        opened: AtomicUsize,
        closed: AtomicUsize,
        rendered: Mutex<Vec<(String, CacheMode)>>,
    }

    impl ScriptedRenderer {
        fn with_pages(pages: Vec<(&str, String)>) -> Self {
            Self {
                pages: pages
                    .into_iter()
                    .map(|(u, h)| (u.to_string(), h))
                    .collect(),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl Renderer for ScriptedRenderer {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn open_session(&self, _viewport: Viewport) -> Result<SessionId> {
            if self.refuse_sessions {
                return Err(DocsweepError::Render("browser unavailable".into()));
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(SessionId::new())
        }

        async fn close_session(&self, _session: &SessionId) -> Result<()> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn render(&self, url: &Url, options: &RenderOptions) -> Result<RenderedPage> {
            self.rendered
                .lock()
                .unwrap()
                .push((url.to_string(), options.cache_mode));
            if self.panic_on.as_deref() == Some(url.as_str()) {
                panic!("renderer crashed on {url}");
            }
            match self.pages.get(url.as_str()) {
                Some(html) => Ok(RenderedPage {
                    url: url.clone(),
                    html: html.clone(),
                }),
                None => Err(DocsweepError::Render(format!("{url}: HTTP 500"))),
            }
        }

        async fn page_source(&self, _session: &SessionId) -> Result<String> {
            Err(DocsweepError::Render("not used".into()))
        }

        async fn execute_in_page(
            &self,
            _session: &SessionId,
            _script: &str,
        ) -> Result<serde_json::Value> {
            Err(DocsweepError::Render("not used".into()))
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        events: Mutex<Vec<String>>,
    }

    impl FetchProgress for RecordingProgress {
        fn page_started(&self, url: &str, index: usize, total: usize) {
            self.events
                .lock()
                .unwrap()
                .push(format!("start {index}/{total} {url}"));
        }

        fn page_finished(&self, result: &FetchResult, index: usize, total: usize) {
            self.events
                .lock()
                .unwrap()
                .push(format!("done {index}/{total} {}", result.success));
        }
    }

    fn page(title: &str) -> String {
        format!(
            "<html><body><main><h1>{title}</h1><p>Body text for the {title} page.</p></main></body></html>"
        )
    }

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn panicking_page_is_isolated() {
        let renderer = ScriptedRenderer {
            panic_on: Some("https://docs.example.com/2".into()),
            ..ScriptedRenderer::with_pages(vec![
                ("https://docs.example.com/1", page("One")),
                ("https://docs.example.com/3", page("Three")),
            ])
        };
        let fetcher = BatchFetcher::new(&renderer, &FetchConfig::default());
        let input = urls(&[
            "https://docs.example.com/1",
            "https://docs.example.com/2",
            "https://docs.example.com/3",
        ]);

        let results = fetcher.crawl(&input, &SilentFetchProgress).await;

        assert_eq!(results.len(), 3);
        assert!(results[0].success);
        assert!(!results[1].success);
        let error = results[1].error.as_deref().unwrap();
        assert!(error.contains("panicked"), "{error}");
        assert!(error.contains("renderer crashed on https://docs.example.com/2"), "{error}");
        assert!(results[2].success);
        assert_eq!(renderer.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_page_is_isolated() {
        let renderer = ScriptedRenderer::with_pages(vec![
            ("https://docs.example.com/1", page("One")),
            ("https://docs.example.com/3", page("Three")),
        ]);
        let fetcher = BatchFetcher::new(&renderer, &FetchConfig::default());
        let input = urls(&[
            "https://docs.example.com/1",
            "https://docs.example.com/2",
            "https://docs.example.com/3",
        ]);

        let results = fetcher.crawl(&input, &SilentFetchProgress).await;

        assert_eq!(results.len(), 3);
        for (r, u) in results.iter().zip(&input) {
            assert_eq!(&r.url, u);
        }
        assert!(results[0].success);
        assert!(results[0].markdown.contains("# One"));
        assert!(!results[1].success);
        assert_eq!(results[1].content_length, 0);
        assert!(results[1].error.as_deref().unwrap().contains("HTTP 500"));
        assert!(results[2].success);
        assert!(results[2].markdown.contains("# Three"));

        assert_eq!(renderer.opened.load(Ordering::SeqCst), 1);
        assert_eq!(renderer.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn renders_bypass_cache_in_order() {
        let renderer = ScriptedRenderer::with_pages(vec![
            ("https://x.dev/b", page("B")),
            ("https://x.dev/a", page("A")),
        ]);
        let fetcher = BatchFetcher::new(&renderer, &FetchConfig::default());
        fetcher
            .crawl(&urls(&["https://x.dev/b", "https://x.dev/a"]), &SilentFetchProgress)
            .await;

        let rendered = renderer.rendered.lock().unwrap().clone();
        assert_eq!(
            rendered,
            vec![
                ("https://x.dev/b".to_string(), CacheMode::Bypass),
                ("https://x.dev/a".to_string(), CacheMode::Bypass),
            ]
        );
    }

    #[tokio::test]
    async fn invalid_url_fails_without_render() {
        let renderer = ScriptedRenderer::with_pages(vec![("https://x.dev/ok", page("Ok"))]);
        let fetcher = BatchFetcher::new(&renderer, &FetchConfig::default());

        let results = fetcher
            .crawl(&urls(&["not a url", "https://x.dev/ok"]), &SilentFetchProgress)
            .await;

        assert!(!results[0].success);
        assert!(results[0].error.as_deref().unwrap().contains("invalid url"));
        assert!(results[1].success);
        assert_eq!(renderer.rendered.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn session_failure_fails_every_url() {
        let renderer = ScriptedRenderer {
            refuse_sessions: true,
            ..ScriptedRenderer::default()
        };
        let fetcher = BatchFetcher::new(&renderer, &FetchConfig::default());

        let results = fetcher
            .crawl(&urls(&["https://x.dev/1", "https://x.dev/2"]), &SilentFetchProgress)
            .await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !r.success));
        assert!(
            results
                .iter()
                .all(|r| r.error.as_deref().unwrap().contains("browser unavailable"))
        );
        assert_eq!(renderer.closed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_batch_opens_nothing() {
        let renderer = ScriptedRenderer::default();
        let fetcher = BatchFetcher::new(&renderer, &FetchConfig::default());
        assert!(fetcher.crawl(&[], &SilentFetchProgress).await.is_empty());
        assert_eq!(renderer.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn progress_sees_every_page() {
        let renderer = ScriptedRenderer::with_pages(vec![("https://x.dev/ok", page("Ok"))]);
        let fetcher = BatchFetcher::new(&renderer, &FetchConfig::default());
        let progress = RecordingProgress::default();

        fetcher
            .crawl(&urls(&["https://x.dev/ok", "https://x.dev/gone"]), &progress)
            .await;

        assert_eq!(
            *progress.events.lock().unwrap(),
            vec![
                "start 1/2 https://x.dev/ok",
                "done 1/2 true",
                "start 2/2 https://x.dev/gone",
                "done 2/2 false",
            ]
        );
    }

    #[tokio::test]
    async fn content_length_counts_characters() {
        let renderer = ScriptedRenderer::with_pages(vec![("https://x.dev/c", page("Café"))]);
        let fetcher = BatchFetcher::new(&renderer, &FetchConfig::default());

        let results = fetcher.crawl(&urls(&["https://x.dev/c"]), &SilentFetchProgress).await;
        let r = &results[0];
        assert!(r.success);
        assert_eq!(r.content_length, r.markdown.chars().count());
        assert!(r.content_length < r.markdown.len());
    }
}
