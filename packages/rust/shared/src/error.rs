//! Error types for docsweep.
//!
//! Library crates use [`DocsweepError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all docsweep operations.
#[derive(Debug, thiserror::Error)]
pub enum DocsweepError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The renderer could not fetch, render, or script a page.
    #[error("render error: {0}")]
    Render(String),

    /// Structured data from a rendered page was malformed or absent.
    #[error("extraction error: {message}")]
    Extraction { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON encoding/decoding error for output documents.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Data validation error (bad URL, invalid input, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// HTML-to-Markdown conversion error.
    #[error("conversion error: {0}")]
    Conversion(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocsweepError>;

impl DocsweepError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an extraction error from any displayable message.
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = DocsweepError::config("unknown renderer 'lynx'");
        assert_eq!(err.to_string(), "config error: unknown renderer 'lynx'");

        let err = DocsweepError::Render("https://x/y: HTTP 404 Not Found".into());
        assert!(err.to_string().starts_with("render error:"));

        let err = DocsweepError::extraction("expansion pass returned \"oops\"");
        assert!(err.to_string().contains("expansion pass"));
    }

    #[test]
    fn io_error_keeps_path() {
        let err = DocsweepError::io(
            "/tmp/out",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/tmp/out"));
    }
}
