//! docsweep CLI: documentation-site menu discovery and Markdown capture.
//!
//! Finds a site's navigation links (expanding collapsed menus in a real
//! browser), fetches every page, and writes one normalized Markdown digest.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    if let Err(report) = commands::run(cli).await {
        tracing::error!("{report:#}");
    }
    Ok(())
}
