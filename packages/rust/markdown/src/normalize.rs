//! Trims a rendered Markdown document down to its substantive body.
//!
//! The body is anchored at the first top-level heading, cut at the first
//! "Was this page helpful?" style marker, and annotated with a `## Source`
//! block naming the page it came from.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use docsweep_shared::{DocsweepError, Result, default_truncation_patterns};

/// Heading emitted when a document has no top-level heading.
pub const NO_TITLE_HEADING: &str = "# No Title Found";

/// First top-level heading (`# ` followed by at least one character).
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^# .+$").expect("title regex"));

/// Normalizes raw page Markdown for the concatenated digest.
#[derive(Debug, Clone)]
pub struct ContentNormalizer {
    truncation_patterns: Vec<Regex>,
}

impl ContentNormalizer {
    /// Build a normalizer from truncation patterns, tried in the given order.
    ///
    /// Patterns are compiled multi-line and case-insensitive.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let truncation_patterns = patterns
            .iter()
            .map(|p| {
                RegexBuilder::new(p.as_ref())
                    .multi_line(true)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        DocsweepError::config(format!(
                            "invalid truncation pattern '{}': {e}",
                            p.as_ref()
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            truncation_patterns,
        })
    }

    /// Produce the annotated body for `markdown` fetched from `source_url`.
    ///
    /// The output always starts with one heading line followed by a blank
    /// line, `## Source` and the URL.
    pub fn normalize(&self, markdown: &str, source_url: &str) -> String {
        let Some(title) = TITLE_RE.find(markdown) else {
            tracing::debug!(source_url, "no top-level heading, using fallback title");
            return format!("{NO_TITLE_HEADING}\n\n## Source\n{source_url}\n\n{markdown}");
        };

        let mut body = &markdown[title.start()..];

        // First pattern (in priority order) that matches anywhere wins.
        for pattern in &self.truncation_patterns {
            if let Some(marker) = pattern.find(body) {
                tracing::trace!(source_url, pattern = pattern.as_str(), "truncating at marker");
                body = body[..marker.start()].trim();
                break;
            }
        }

        let (title_line, rest) = body.split_once('\n').unwrap_or((body, ""));
        format!("{title_line}\n\n## Source\n{source_url}\n\n{rest}")
    }
}

impl Default for ContentNormalizer {
    fn default() -> Self {
        Self::new(&default_truncation_patterns()).expect("default truncation patterns compile")
    }
}
