//! Tidy-up passes applied to freshly converted Markdown.
//!
//! Every pass is a plain `&str -> String` function; [`run_pipeline`] threads
//! the document through them in order.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use url::Url;

static BLANK_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{4,}").expect("blank-run regex"));

static FENCE_LANG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^```(?:language-|lang-|highlight-|hljs-)(\w+)").expect("fence regex")
});

/// Layout wrappers that sometimes leak through conversion untouched.
static WRAPPER_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"</?(?:div|span|section|article|main|figure|figcaption|details|summary|button)(?:\s[^>]*)?>",
    )
    .expect("wrapper tag regex")
});

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(!?)\[([^\]]*)\]\(([^)\s]+)\)").expect("link regex"));

/// Marker text standing in for the `index`-th table during conversion.
pub(crate) fn table_placeholder(index: usize) -> String {
    format!("docsweeptable{index}placeholder")
}

/// Run every cleanup pass over `md`, putting `tables` back at their
/// placeholders.
pub(crate) fn run_pipeline(md: &str, tables: &[String], base_url: Option<&Url>) -> String {
    let md = collapse_blank_lines(md);
    let md = fence_languages(&md);
    let md = strip_wrapper_tags(&md);
    let md = restore_tables(&md, tables);
    let md = absolutize_links(&md, base_url);
    let md = trim_line_ends(&md);
    single_trailing_newline(&md)
}

/// Runs of three or more blank lines become two.
fn collapse_blank_lines(md: &str) -> String {
    BLANK_RUN_RE.replace_all(md, "\n\n\n").into_owned()
}

/// `language-js` style class names on fences become bare info strings.
fn fence_languages(md: &str) -> String {
    FENCE_LANG_RE.replace_all(md, "```$1").into_owned()
}

/// Drop wrapper tags outside fenced code, keeping their text.
fn strip_wrapper_tags(md: &str) -> String {
    let mut in_fence = false;
    md.lines()
        .map(|line| {
            if line.trim_start().starts_with("```") {
                in_fence = !in_fence;
                return line.to_string();
            }
            if in_fence {
                line.to_string()
            } else {
                WRAPPER_TAG_RE.replace_all(line, "").into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn restore_tables(md: &str, tables: &[String]) -> String {
    tables
        .iter()
        .enumerate()
        .fold(md.to_string(), |md, (index, table)| {
            md.replacen(&table_placeholder(index), table.trim_end(), 1)
        })
}

/// Resolve relative link targets against the page URL. Images, anchors and
/// already-absolute targets are left alone.
fn absolutize_links(md: &str, base_url: Option<&Url>) -> String {
    let Some(base) = base_url else {
        return md.to_string();
    };

    LINK_RE
        .replace_all(md, |caps: &Captures<'_>| {
            let (bang, text, href) = (&caps[1], &caps[2], &caps[3]);
            if !bang.is_empty() || href.starts_with('#') || Url::parse(href).is_ok() {
                return caps[0].to_string();
            }
            match base.join(href) {
                Ok(resolved) => format!("[{text}]({resolved})"),
                Err(_) => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn trim_line_ends(md: &str) -> String {
    md.lines().map(str::trim_end).collect::<Vec<_>>().join("\n")
}

fn single_trailing_newline(md: &str) -> String {
    format!("{}\n", md.trim_end_matches('\n'))
}
