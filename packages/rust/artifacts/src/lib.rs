//! Output files for discovery and fetch runs.
//!
//! [`ResultWriter`] produces two kinds of file in one output directory:
//! ```text
//! <output_dir>/
//! ├── <prefix>_menu_links_<YYYYMMDD_HHMMSS>.json   (discovered links)
//! └── <prefix>_<YYYYMMDD_HHMMSS>.md                (normalized page digest)
//! ```
//! Prefixes come from [`filename_prefix`]. Writes go through a temp file and
//! a rename so a crashed run never leaves a half-written output.

use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{error, info, instrument};

use docsweep_markdown::ContentNormalizer;
use docsweep_shared::{DocsweepError, FetchResult, MenuLinksFile, Result, filename_prefix};

/// Separator placed after every page in the Markdown digest.
pub const PAGE_SEPARATOR: &str = "\n\n---\n\n";

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Writes run results under a fixed output directory.
#[derive(Debug, Clone)]
pub struct ResultWriter {
    output_dir: PathBuf,
    normalizer: ContentNormalizer,
}

impl ResultWriter {
    pub fn new(output_dir: impl Into<PathBuf>, normalizer: ContentNormalizer) -> Self {
        Self {
            output_dir: output_dir.into(),
            normalizer,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Save discovered links as pretty JSON. Returns the file path, or `None`
    /// after logging if the file could not be written.
    #[instrument(skip(self, links), fields(count = links.len()))]
    pub fn write_links(&self, seed_url: &str, links: &[String]) -> Option<PathBuf> {
        let name = format!("{}_menu_links_{}.json", filename_prefix(seed_url), timestamp());
        let doc = MenuLinksFile::new(seed_url, links.to_vec());

        let written = serde_json::to_string_pretty(&doc)
            .map_err(|e| DocsweepError::Serialization(format!("menu links: {e}")))
            .and_then(|json| self.write_file(&name, &json));
        report(written)
    }

    /// Save every successful result, normalized, as one Markdown file.
    ///
    /// Failed results are skipped; if none succeeded the file is empty.
    #[instrument(skip(self, results), fields(count = results.len()))]
    pub fn write_markdown(&self, results: &[FetchResult], prefix: &str) -> Option<PathBuf> {
        let name = format!("{prefix}_{}.md", timestamp());
        report(self.write_file(&name, &self.digest(results)))
    }

    /// The Markdown digest for `results`, without touching the filesystem.
    pub fn digest(&self, results: &[FetchResult]) -> String {
        results
            .iter()
            .filter(|r| r.success)
            .map(|r| self.normalizer.normalize(&r.markdown, &r.url) + PAGE_SEPARATOR)
            .collect()
    }

    fn write_file(&self, name: &str, content: &str) -> Result<PathBuf> {
        let dir = &self.output_dir;
        std::fs::create_dir_all(dir).map_err(|e| DocsweepError::io(dir, e))?;

        let target = dir.join(name);
        let temp = dir.join(format!(".{name}.tmp"));
        std::fs::write(&temp, content).map_err(|e| DocsweepError::io(&temp, e))?;
        std::fs::rename(&temp, &target).map_err(|e| DocsweepError::io(&target, e))?;
        Ok(target)
    }
}

fn timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

fn report(written: Result<PathBuf>) -> Option<PathBuf> {
    match written {
        Ok(path) => {
            info!(path = %path.display(), "saved");
            Some(path)
        }
        Err(e) => {
            error!(error = %e, "failed to save output");
            None
        }
    }
}
