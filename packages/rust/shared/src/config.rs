//! Application configuration for docsweep.
//!
//! User config lives at `~/.docsweep/docsweep.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DocsweepError, Result};
use crate::types::{ExpansionRule, Viewport};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docsweep.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docsweep";

// ---------------------------------------------------------------------------
// Config structs (matching docsweep.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Output location.
    #[serde(default)]
    pub output: OutputConfig,

    /// Which renderer to use and how to reach it.
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Menu discovery settings.
    #[serde(default)]
    pub menu: MenuConfig,

    /// Batch fetch settings.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Content normalization settings.
    #[serde(default)]
    pub normalize: NormalizeConfig,
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving JSON and Markdown outputs. Created on demand.
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("scraped_docs")
}

/// Renderer backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// Headless browser driven over WebDriver; executes JavaScript.
    #[default]
    Webdriver,
    /// Plain HTTP fetch; no script execution.
    Http,
}

impl std::str::FromStr for RendererKind {
    type Err = DocsweepError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "webdriver" => Ok(Self::Webdriver),
            "http" => Ok(Self::Http),
            other => Err(DocsweepError::config(format!(
                "unknown renderer '{other}': expected 'webdriver' or 'http'"
            ))),
        }
    }
}

/// `[browser]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default)]
    pub renderer: RendererKind,

    /// WebDriver endpoint (chromedriver default port).
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    #[serde(default = "default_true")]
    pub headless: bool,

    /// Upper bound when waiting for lazily loaded images.
    #[serde(default = "default_image_wait_timeout_ms")]
    pub image_wait_timeout_ms: u64,

    /// HTTP request timeout for the static renderer.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            renderer: RendererKind::default(),
            webdriver_url: default_webdriver_url(),
            headless: true,
            image_wait_timeout_ms: default_image_wait_timeout_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".into()
}
fn default_true() -> bool {
    true
}
fn default_image_wait_timeout_ms() -> u64 {
    10_000
}
fn default_request_timeout_secs() -> u64 {
    30
}

/// `[menu]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuConfig {
    /// Anchor selectors whose matches are unioned.
    #[serde(default = "default_menu_selectors")]
    pub selectors: Vec<String>,

    /// Pause between expansion passes.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Hard stop for pages that never reach a fixed point.
    #[serde(default = "default_max_passes")]
    pub max_passes: u32,

    /// Drop `#fragment` parts before deduplication.
    #[serde(default)]
    pub strip_fragments: bool,

    /// Collapsed-widget patterns and the actions that open them.
    #[serde(default = "default_expansion_rules")]
    pub expansion_rules: Vec<ExpansionRule>,

    #[serde(default = "default_menu_viewport")]
    pub viewport: Viewport,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            selectors: default_menu_selectors(),
            settle_ms: default_settle_ms(),
            max_passes: default_max_passes(),
            strip_fragments: false,
            expansion_rules: default_expansion_rules(),
            viewport: default_menu_viewport(),
        }
    }
}

fn default_menu_selectors() -> Vec<String> {
    [
        "nav a",
        "[role='navigation'] a",
        ".sidebar a",
        "[class*='nav'] a",
        "[class*='menu'] a",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_expansion_rules() -> Vec<ExpansionRule> {
    [
        r#"button[aria-expanded="false"]"#,
        ".expandable:not(.expanded)",
        r#"[class*="collapse"]:not(.show)"#,
        ".closed",
        r#"[class*="menu-item-has-children"]:not(.expanded)"#,
    ]
    .into_iter()
    .map(ExpansionRule::standard)
    .collect()
}

fn default_settle_ms() -> u64 {
    100
}
fn default_max_passes() -> u32 {
    50
}
fn default_menu_viewport() -> Viewport {
    Viewport {
        width: 1920,
        height: 1080,
    }
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Blocks scoring below this are pruned before Markdown conversion.
    #[serde(default = "default_prune_threshold")]
    pub prune_threshold: f64,

    /// Blocks with fewer words are pruned; 0 disables the check.
    #[serde(default)]
    pub min_word_threshold: usize,

    #[serde(default = "default_fetch_viewport")]
    pub viewport: Viewport,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            prune_threshold: default_prune_threshold(),
            min_word_threshold: 0,
            viewport: default_fetch_viewport(),
        }
    }
}

fn default_prune_threshold() -> f64 {
    0.48
}
fn default_fetch_viewport() -> Viewport {
    Viewport {
        width: 800,
        height: 600,
    }
}

/// `[normalize]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeConfig {
    /// Regexes marking the end of substantive content, tried in order.
    /// Matched multi-line and case-insensitive.
    #[serde(default = "default_truncation_patterns")]
    pub truncation_patterns: Vec<String>,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            truncation_patterns: default_truncation_patterns(),
        }
    }
}

/// The "Was this page helpful?" family, heading form before plain form.
pub fn default_truncation_patterns() -> Vec<String> {
    [
        r"^#+\s*Was this page helpful\?.*$",
        r"^Was this page helpful\?.*$",
        r"^#+\s*Was this helpful\?.*$",
        r"^Was this helpful\?.*$",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docsweep/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DocsweepError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docsweep/docsweep.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocsweepError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        DocsweepError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DocsweepError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| DocsweepError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocsweepError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
