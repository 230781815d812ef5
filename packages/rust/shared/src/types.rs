//! Core domain types shared by the discovery, crawl, and output stages.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// Opaque handle for one reused browser/network context (UUID v7).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new time-sortable session identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// DiscoveredLink
// ---------------------------------------------------------------------------

/// A navigation link found on the seed page.
///
/// Identity is the absolute URL; the label is informational only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLink {
    /// Absolute URL, resolved against the seed.
    pub url: String,
    /// Trimmed anchor text.
    pub text: String,
}

// ---------------------------------------------------------------------------
// FetchResult
// ---------------------------------------------------------------------------

/// Outcome of fetching one URL in a batch. Exactly one per requested URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResult {
    /// The URL as requested.
    pub url: String,
    /// Whether rendering and Markdown generation succeeded.
    pub success: bool,
    /// Raw (pre-normalization) Markdown body; empty on failure.
    pub markdown: String,
    /// Length of `markdown` in characters; 0 on failure.
    pub content_length: usize,
    /// Failure description, set only when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FetchResult {
    /// Build a successful result from generated Markdown.
    pub fn succeeded(url: impl Into<String>, markdown: String) -> Self {
        Self {
            url: url.into(),
            success: true,
            content_length: markdown.chars().count(),
            markdown,
            error: None,
        }
    }

    /// Build a failed result carrying `error`.
    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            success: false,
            markdown: String::new(),
            content_length: 0,
            error: Some(error.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// MenuLinksFile
// ---------------------------------------------------------------------------

/// The menu-links JSON document written after discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuLinksFile {
    pub start_url: String,
    pub total_links_found: usize,
    pub menu_links: Vec<String>,
}

impl MenuLinksFile {
    pub fn new(start_url: impl Into<String>, menu_links: Vec<String>) -> Self {
        Self {
            start_url: start_url.into(),
            total_links_found: menu_links.len(),
            menu_links,
        }
    }
}

// ---------------------------------------------------------------------------
// Menu expansion rules
// ---------------------------------------------------------------------------

/// A single DOM mutation applied to an expandable element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExpandAction {
    /// Invoke the element's default activation.
    Click,
    /// Set an attribute to a fixed value.
    SetAttribute { name: String, value: String },
    /// Add CSS classes.
    AddClass { classes: Vec<String> },
    /// Remove CSS classes.
    RemoveClass { classes: Vec<String> },
}

/// A selector identifying collapsed widgets and the actions that open them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionRule {
    pub selector: String,
    pub actions: Vec<ExpandAction>,
}

impl ExpansionRule {
    /// A rule using the standard "open this widget" action set.
    pub fn standard(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            actions: vec![
                ExpandAction::Click,
                ExpandAction::SetAttribute {
                    name: "aria-expanded".into(),
                    value: "true".into(),
                },
                ExpandAction::AddClass {
                    classes: vec!["expanded".into(), "show".into()],
                },
                ExpandAction::RemoveClass {
                    classes: vec!["collapsed".into(), "closed".into()],
                },
            ],
        }
    }
}

/// Browser window size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}
