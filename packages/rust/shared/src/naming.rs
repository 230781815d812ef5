//! Output file naming derived from URLs.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Prefix returned when a URL cannot be turned into a name.
pub const FALLBACK_PREFIX: &str = "default";

/// Host labels that carry no information in a file name.
const IGNORED_HOST_LABELS: &[&str] = &["com", "org", "net", "www"];

static NON_ALNUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]+").expect("non-alnum regex"));

/// Derive a filesystem-safe prefix from a URL.
///
/// Host labels are reversed (`docs.example.com` → `example`, `docs`) with
/// `www` and common TLDs dropped, then non-empty path segments follow:
/// `https://docs.example.com/a/b` → `example_docs_a_b`.
///
/// Never fails: anything unusable yields [`FALLBACK_PREFIX`].
pub fn filename_prefix(url: &str) -> String {
    let parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(e) => {
            tracing::debug!(url, error = %e, "cannot derive filename prefix");
            return FALLBACK_PREFIX.to_string();
        }
    };
    let Some(host) = parsed.host_str() else {
        return FALLBACK_PREFIX.to_string();
    };

    let host_parts = host
        .split('.')
        .rev()
        .filter(|label| !IGNORED_HOST_LABELS.contains(label));
    let path_parts = parsed.path().split('/').filter(|s| !s.is_empty());

    let cleaned: Vec<String> = host_parts
        .chain(path_parts)
        .map(|part| {
            NON_ALNUM_RE
                .replace_all(&part.to_lowercase(), "_")
                .trim_matches('_')
                .to_string()
        })
        .filter(|part| !part.is_empty())
        .collect();

    if cleaned.is_empty() {
        FALLBACK_PREFIX.to_string()
    } else {
        cleaned.join("_")
    }
}
