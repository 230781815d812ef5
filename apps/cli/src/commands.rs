//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use docsweep_core::{
    CrawlOutcome, FetchOutcome, MenuOutcome, ProgressReporter, crawl_site, digest_prefix,
    discover_menu, fetch_pages, read_links_file,
};
use docsweep_crawler::build_renderer;
use docsweep_shared::{AppConfig, RendererKind, init_config, load_config, load_config_from};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// docsweep: turn a documentation site into one Markdown file.
#[derive(Parser)]
#[command(
    name = "docsweep",
    version,
    about = "Discover a documentation site's menu links and fetch every page as cleaned Markdown.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.docsweep/docsweep.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output directory (overrides [output] dir).
    #[arg(short, long, global = true)]
    pub out: Option<PathBuf>,

    /// Renderer backend: webdriver or http (overrides [browser] renderer).
    #[arg(long, global = true)]
    pub renderer: Option<RendererKind>,

    /// WebDriver endpoint (overrides [browser] webdriver_url).
    #[arg(long, env = "DOCSWEEP_WEBDRIVER_URL", global = true)]
    pub webdriver_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Discover menu links on a seed page and save them as JSON.
    Menu {
        /// Seed URL; only links under it are kept.
        seed: String,
    },

    /// Fetch pages and save them as one normalized Markdown file.
    Fetch {
        /// URLs to fetch, in order.
        urls: Vec<String>,

        /// Menu-links JSON from `docsweep menu`; its links are fetched first.
        #[arg(long)]
        links_file: Option<PathBuf>,

        /// Output file prefix (defaults to one derived from the URLs).
        #[arg(long)]
        prefix: Option<String>,
    },

    /// Discover menu links, then fetch every discovered page.
    Crawl {
        /// Seed URL.
        seed: String,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docsweep=info",
        1 => "docsweep=debug",
        _ => "docsweep=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let show_progress = matches!(cli.log_format, LogFormat::Text);
    match cli.command {
        Command::Config { ref action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&resolve_config(&cli)?),
        },
        Command::Menu { ref seed } => cmd_menu(&resolve_config(&cli)?, seed, show_progress).await,
        Command::Fetch {
            ref urls,
            ref links_file,
            ref prefix,
        } => {
            cmd_fetch(
                &resolve_config(&cli)?,
                urls,
                links_file.as_ref(),
                prefix.as_deref(),
                show_progress,
            )
            .await
        }
        Command::Crawl { ref seed } => {
            cmd_crawl(&resolve_config(&cli)?, seed, show_progress).await
        }
    }
}

/// Load the config file and apply command-line overrides.
fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    if let Some(out) = &cli.out {
        config.output.dir = out.clone();
    }
    if let Some(renderer) = cli.renderer {
        config.browser.renderer = renderer;
    }
    if let Some(url) = &cli.webdriver_url {
        config.browser.webdriver_url = url.clone();
    }
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_menu(config: &AppConfig, seed: &str, show_progress: bool) -> Result<()> {
    let renderer = build_renderer(&config.browser)?;
    info!(seed, renderer = renderer.name(), "discovering menu links");

    let reporter = CliProgress::new(show_progress);
    let outcome = discover_menu(renderer.as_ref(), seed, config, &reporter).await?;
    print_menu(&outcome);
    Ok(())
}

async fn cmd_fetch(
    config: &AppConfig,
    urls: &[String],
    links_file: Option<&PathBuf>,
    prefix: Option<&str>,
    show_progress: bool,
) -> Result<()> {
    let mut all_urls = Vec::new();
    let mut start_url = None;
    if let Some(path) = links_file {
        let file = read_links_file(path)?;
        info!(path = %path.display(), links = file.menu_links.len(), "loaded links file");
        all_urls.extend(file.menu_links);
        start_url = Some(file.start_url);
    }
    all_urls.extend(urls.iter().cloned());

    if all_urls.is_empty() {
        return Err(eyre!("nothing to fetch: pass URLs or --links-file"));
    }

    let prefix = digest_prefix(prefix, start_url.as_deref(), &all_urls);
    let renderer = build_renderer(&config.browser)?;
    info!(count = all_urls.len(), %prefix, renderer = renderer.name(), "fetching pages");

    let reporter = CliProgress::new(show_progress);
    let outcome = fetch_pages(renderer.as_ref(), &all_urls, &prefix, config, &reporter).await?;
    print_fetch(&outcome);
    Ok(())
}

async fn cmd_crawl(config: &AppConfig, seed: &str, show_progress: bool) -> Result<()> {
    let renderer = build_renderer(&config.browser)?;
    info!(seed, renderer = renderer.name(), "crawling site");

    let reporter = CliProgress::new(show_progress);
    let CrawlOutcome { menu, fetch } = crawl_site(renderer.as_ref(), seed, config, &reporter).await?;
    print_menu(&menu);
    if let Some(fetch) = fetch {
        print_fetch(&fetch);
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

fn print_menu(outcome: &MenuOutcome) {
    println!();
    println!("  Menu links: {}", outcome.links.len());
    if let Some(path) = &outcome.file {
        println!("  Saved:      {}", path.display());
    }
    println!();
}

fn print_fetch(outcome: &FetchOutcome) {
    println!();
    println!(
        "  Fetched: {}/{} pages",
        outcome.succeeded,
        outcome.results.len()
    );
    for failed in outcome.results.iter().filter(|r| !r.success) {
        println!(
            "  Failed:  {} ({})",
            failed.url,
            failed.error.as_deref().unwrap_or("unknown error")
        );
    }
    match &outcome.file {
        Some(path) => println!("  Saved:   {}", path.display()),
        None => println!("  Saved:   nothing (write failed)"),
    }
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new(visible: bool) -> Self {
        if !visible {
            return Self {
                spinner: ProgressBar::hidden(),
            };
        }
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn page_started(&self, url: &str, current: usize, total: usize) {
        let percent = current * 100 / total.max(1);
        self.spinner
            .set_message(format!("Fetching [{current}/{total}] {percent}% {url}"));
    }

    fn page_finished(&self, url: &str, success: bool, current: usize, total: usize) {
        let mark = if success { "✓" } else { "✗" };
        self.spinner
            .println(format!("  {mark} [{current}/{total}] {url}"));
    }

    fn done(&self, summary: &str) {
        self.spinner.set_message(summary.to_string());
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        self.spinner.finish_and_clear();
    }
}
