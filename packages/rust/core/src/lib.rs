//! Run orchestration for docsweep.
//!
//! Ties menu discovery, batch fetching, and result writing into the three
//! entry points the CLI exposes: [`discover_menu`], [`fetch_pages`], and
//! [`crawl_site`].

pub mod pipeline;

pub use pipeline::{
    CrawlOutcome, FetchOutcome, MenuOutcome, ProgressReporter, SilentProgress, crawl_site,
    digest_prefix, discover_menu, fetch_pages, read_links_file,
};
