//! Orchestration of the menu, fetch, and crawl runs.
//!
//! Each entry point wires a [`Renderer`] through discovery and/or batch
//! fetching and hands the results to the [`ResultWriter`].

use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use docsweep_artifacts::ResultWriter;
use docsweep_crawler::{BatchFetcher, FetchProgress, Renderer};
use docsweep_discovery::MenuDiscoverer;
use docsweep_markdown::ContentNormalizer;
use docsweep_shared::{
    AppConfig, DocsweepError, FetchResult, MenuLinksFile, Result, filename_prefix,
};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of a menu discovery run.
#[derive(Debug, Clone)]
pub struct MenuOutcome {
    /// Discovered URLs, sorted.
    pub links: Vec<String>,
    /// Saved menu-links JSON, if anything was found and written.
    pub file: Option<PathBuf>,
}

/// Result of a batch fetch run.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// One result per requested URL, in request order.
    pub results: Vec<FetchResult>,
    /// Saved Markdown digest, if written.
    pub file: Option<PathBuf>,
    /// Number of successful results.
    pub succeeded: usize,
}

/// Result of a discover-then-fetch run.
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub menu: MenuOutcome,
    /// `None` when discovery found nothing to fetch.
    pub fetch: Option<FetchOutcome>,
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before a page is fetched.
    fn page_started(&self, url: &str, current: usize, total: usize);
    /// Called after a page is fetched, successfully or not.
    fn page_finished(&self, url: &str, success: bool, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, summary: &str);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn page_started(&self, _url: &str, _current: usize, _total: usize) {}
    fn page_finished(&self, _url: &str, _success: bool, _current: usize, _total: usize) {}
    fn done(&self, _summary: &str) {}
}

/// Adapts a `ProgressReporter` to the `FetchProgress` interface.
struct PipelineFetchProgress<'a> {
    inner: &'a dyn ProgressReporter,
}

impl FetchProgress for PipelineFetchProgress<'_> {
    fn page_started(&self, url: &str, index: usize, total: usize) {
        self.inner.page_started(url, index, total);
    }

    fn page_finished(&self, result: &FetchResult, index: usize, total: usize) {
        self.inner
            .page_finished(&result.url, result.success, index, total);
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Discover the seed's menu links and save them as JSON.
///
/// An empty discovery writes no file.
#[instrument(skip(renderer, config, progress))]
pub async fn discover_menu(
    renderer: &dyn Renderer,
    seed_url: &str,
    config: &AppConfig,
    progress: &dyn ProgressReporter,
) -> Result<MenuOutcome> {
    let writer = result_writer(config)?;

    progress.phase("Discovering menu links");
    let links = MenuDiscoverer::new(renderer, config.menu.clone())
        .discover(seed_url)
        .await;

    let file = if links.is_empty() {
        warn!("no menu links found, nothing saved");
        None
    } else {
        writer.write_links(seed_url, &links)
    };

    progress.done(&format!("found {} menu links", links.len()));
    Ok(MenuOutcome { links, file })
}

/// Fetch `urls` in order and save the normalized Markdown digest.
#[instrument(skip(renderer, urls, config, progress), fields(total = urls.len()))]
pub async fn fetch_pages(
    renderer: &dyn Renderer,
    urls: &[String],
    prefix: &str,
    config: &AppConfig,
    progress: &dyn ProgressReporter,
) -> Result<FetchOutcome> {
    let writer = result_writer(config)?;

    progress.phase(&format!("Fetching {} pages", urls.len()));
    let fetch_progress = PipelineFetchProgress { inner: progress };
    let results = BatchFetcher::new(renderer, &config.fetch)
        .crawl(urls, &fetch_progress)
        .await;

    let succeeded = results.iter().filter(|r| r.success).count();
    let file = writer.write_markdown(&results, prefix);

    progress.done(&format!("successfully crawled {succeeded}/{}", results.len()));
    Ok(FetchOutcome {
        results,
        file,
        succeeded,
    })
}

/// Discover the seed's menu, then fetch every discovered page.
///
/// The Markdown digest is named after the seed URL.
#[instrument(skip(renderer, config, progress))]
pub async fn crawl_site(
    renderer: &dyn Renderer,
    seed_url: &str,
    config: &AppConfig,
    progress: &dyn ProgressReporter,
) -> Result<CrawlOutcome> {
    let menu = discover_menu(renderer, seed_url, config, progress).await?;
    if menu.links.is_empty() {
        return Ok(CrawlOutcome { menu, fetch: None });
    }

    let prefix = filename_prefix(seed_url);
    let fetch = fetch_pages(renderer, &menu.links, &prefix, config, progress).await?;
    info!(
        discovered = menu.links.len(),
        succeeded = fetch.succeeded,
        "crawl complete"
    );
    Ok(CrawlOutcome {
        menu,
        fetch: Some(fetch),
    })
}

/// Load a menu-links JSON file written by [`discover_menu`].
pub fn read_links_file(path: &Path) -> Result<MenuLinksFile> {
    let content = std::fs::read_to_string(path).map_err(|e| DocsweepError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| {
        DocsweepError::Serialization(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Choose the digest file prefix: the explicit one, else the links file's
/// seed, else the first URL.
pub fn digest_prefix(explicit: Option<&str>, start_url: Option<&str>, urls: &[String]) -> String {
    match (explicit, start_url, urls.first()) {
        (Some(prefix), _, _) => prefix.to_string(),
        (None, Some(seed), _) => filename_prefix(seed),
        (None, None, Some(first)) => filename_prefix(first),
        (None, None, None) => docsweep_shared::FALLBACK_PREFIX.to_string(),
    }
}

fn result_writer(config: &AppConfig) -> Result<ResultWriter> {
    let normalizer = ContentNormalizer::new(&config.normalize.truncation_patterns)?;
    Ok(ResultWriter::new(&config.output.dir, normalizer))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use docsweep_crawler::{RenderOptions, RenderedPage};
    use docsweep_shared::{SessionId, Viewport};
    use serde_json::{Value, json};
    use url::Url;

    use super::*;

    /// A small documentation site with a static sidebar.
    struct FakeSite {
        pages: HashMap<String, String>,
        last: Mutex<Option<String>>,
    }

    impl FakeSite {
        fn new() -> Self {
            let index = r#"<html><body>
                <nav class="sidebar">
                    <a href="/docs/start">Start</a>
                    <a href="/docs/broken">Broken</a>
                    <a href="https://elsewhere.dev/">Elsewhere</a>
                </nav>
                <main><h1>Docs</h1><p>Welcome.</p></main>
            </body></html>"#;
            let start = r#"<html><body><main>
                <h1>Getting Started</h1>
                <p>Install the tool and run it against your docs.</p>
                <h2>Was this page helpful?</h2>
                <p>Yes No</p>
            </main></body></html>"#;

            let pages = [
                ("https://docs.example.com/docs/", index),
                ("https://docs.example.com/docs/start", start),
            ]
            .into_iter()
            .map(|(u, h)| (u.to_string(), h.to_string()))
            .collect();

            Self {
                pages,
                last: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl Renderer for FakeSite {
        fn name(&self) -> &'static str {
            "fake-site"
        }

        async fn open_session(&self, _viewport: Viewport) -> Result<SessionId> {
            Ok(SessionId::new())
        }

        async fn close_session(&self, _session: &SessionId) -> Result<()> {
            Ok(())
        }

        async fn render(&self, url: &Url, _options: &RenderOptions) -> Result<RenderedPage> {
            let html = self
                .pages
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| DocsweepError::Render(format!("{url}: HTTP 404")))?;
            *self.last.lock().unwrap() = Some(html.clone());
            Ok(RenderedPage {
                url: url.clone(),
                html,
            })
        }

        async fn page_source(&self, _session: &SessionId) -> Result<String> {
            self.last
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| DocsweepError::Render("nothing loaded".into()))
        }

        async fn execute_in_page(&self, _session: &SessionId, _script: &str) -> Result<Value> {
            Ok(json!(0))
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        phases: Mutex<Vec<String>>,
        finished: Mutex<Vec<(String, bool)>>,
        done: Mutex<Vec<String>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn phase(&self, name: &str) {
            self.phases.lock().unwrap().push(name.to_string());
        }
        fn page_started(&self, _url: &str, _current: usize, _total: usize) {}
        fn page_finished(&self, url: &str, success: bool, _current: usize, _total: usize) {
            self.finished.lock().unwrap().push((url.to_string(), success));
        }
        fn done(&self, summary: &str) {
            self.done.lock().unwrap().push(summary.to_string());
        }
    }

    fn test_config() -> (AppConfig, PathBuf) {
        let dir = std::env::temp_dir().join(format!("docsweep-pipeline-test-{}", uuid::Uuid::now_v7()));
        let mut config = AppConfig::default();
        config.output.dir = dir.clone();
        config.menu.settle_ms = 0;
        (config, dir)
    }

    #[tokio::test]
    async fn crawl_site_discovers_fetches_and_writes() {
        let (config, dir) = test_config();
        let site = FakeSite::new();
        let progress = RecordingProgress::default();

        let outcome = crawl_site(&site, "https://docs.example.com/docs/", &config, &progress)
            .await
            .unwrap();

        assert_eq!(
            outcome.menu.links,
            vec![
                "https://docs.example.com/docs/broken",
                "https://docs.example.com/docs/start",
            ]
        );
        let links_file = outcome.menu.file.unwrap();
        assert!(links_file.starts_with(&dir));
        assert_eq!(read_links_file(&links_file).unwrap().total_links_found, 2);

        let fetch = outcome.fetch.unwrap();
        assert_eq!(fetch.results.len(), 2);
        assert_eq!(fetch.succeeded, 1);
        assert!(!fetch.results[0].success);

        let digest_path = fetch.file.unwrap();
        let name = digest_path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("example_docs_docs_"), "{name}");
        let digest = std::fs::read_to_string(&digest_path).unwrap();
        assert!(digest.starts_with("# Getting Started\n\n## Source\nhttps://docs.example.com/docs/start\n\n"));
        assert!(digest.contains("Install the tool"));
        assert!(!digest.contains("helpful"));
        assert!(digest.ends_with("\n\n---\n\n"));

        assert_eq!(
            *progress.finished.lock().unwrap(),
            vec![
                ("https://docs.example.com/docs/broken".to_string(), false),
                ("https://docs.example.com/docs/start".to_string(), true),
            ]
        );
        assert_eq!(
            progress.done.lock().unwrap().last().map(String::as_str),
            Some("successfully crawled 1/2")
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn empty_discovery_skips_fetch_and_files() {
        let (config, dir) = test_config();
        let site = FakeSite::new();

        let outcome = crawl_site(&site, "https://docs.example.com/missing/", &config, &SilentProgress)
            .await
            .unwrap();

        assert!(outcome.menu.links.is_empty());
        assert!(outcome.menu.file.is_none());
        assert!(outcome.fetch.is_none());
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn bad_truncation_pattern_is_config_error() {
        let (mut config, _dir) = test_config();
        config.normalize.truncation_patterns = vec!["(".into()];
        let err = fetch_pages(&FakeSite::new(), &[], "p", &config, &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, DocsweepError::Config { .. }));
    }

    #[test]
    fn read_links_file_roundtrip_and_errors() {
        let dir = std::env::temp_dir().join(format!("docsweep-links-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();

        let good = dir.join("links.json");
        std::fs::write(
            &good,
            r#"{"start_url":"https://x.dev/","total_links_found":1,"menu_links":["https://x.dev/a"]}"#,
        )
        .unwrap();
        assert_eq!(read_links_file(&good).unwrap().menu_links, vec!["https://x.dev/a"]);

        let bad = dir.join("bad.json");
        std::fs::write(&bad, "not json").unwrap();
        assert!(matches!(
            read_links_file(&bad).unwrap_err(),
            DocsweepError::Serialization(_)
        ));
        assert!(matches!(
            read_links_file(&dir.join("missing.json")).unwrap_err(),
            DocsweepError::Io { .. }
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn digest_prefix_precedence() {
        let urls = vec!["https://api.example.org/v2".to_string()];
        assert_eq!(digest_prefix(Some("mine"), Some("https://x.dev/"), &urls), "mine");
        assert_eq!(digest_prefix(None, Some("https://docs.example.com/a"), &urls), "example_docs_a");
        assert_eq!(digest_prefix(None, None, &urls), "example_api_v2");
        assert_eq!(digest_prefix(None, None, &[]), "default");
    }
}
