//! Shared types, error model, and configuration for docsweep.
//!
//! This crate is the foundation depended on by all other docsweep crates.
//! It provides:
//! - [`DocsweepError`]: the unified error type
//! - Domain types ([`FetchResult`], [`DiscoveredLink`], [`MenuLinksFile`], [`SessionId`])
//! - Configuration ([`AppConfig`], config loading)
//! - [`filename_prefix`]: URL-derived output naming

pub mod config;
pub mod error;
pub mod naming;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BrowserConfig, FetchConfig, MenuConfig, NormalizeConfig, OutputConfig,
    RendererKind, config_dir, config_file_path, default_truncation_patterns, init_config,
    load_config, load_config_from,
};
pub use error::{DocsweepError, Result};
pub use naming::{FALLBACK_PREFIX, filename_prefix};
pub use types::{
    DiscoveredLink, ExpandAction, ExpansionRule, FetchResult, MenuLinksFile, SessionId, Viewport,
};
