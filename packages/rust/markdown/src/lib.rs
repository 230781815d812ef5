//! HTML-to-Markdown generation and content normalization.
//!
//! Rendered pages pass through a relevance-pruning filter, are converted to
//! Markdown with the `htmd` crate, and get a light cleanup pass. The
//! [`ContentNormalizer`] later trims each page to its titled body for the
//! concatenated digest.

mod cleanup;
mod normalize;
mod prune;

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use docsweep_shared::{DocsweepError, FetchConfig, Result};

pub use normalize::{ContentNormalizer, NO_TITLE_HEADING};
pub use prune::PruningFilter;

/// Tags `htmd` should drop without descending into them.
const SKIPPED_TAGS: &[&str] = &["script", "style", "nav", "iframe", "noscript", "svg"];

static BODY_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("body selector"));
static TABLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("table selector"));
static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("tr selector"));
static HEADER_CELL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("th").expect("th selector"));
static DATA_CELL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("td selector"));

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// How rendered HTML becomes Markdown.
#[derive(Debug, Clone, Default)]
pub struct MarkdownPolicy {
    /// Content filter applied before conversion; `None` converts the whole body.
    pub filter: Option<PruningFilter>,
}

impl MarkdownPolicy {
    /// Policy with the relevance-pruning filter enabled.
    pub fn pruning(threshold: f64, min_word_threshold: usize) -> Self {
        Self {
            filter: Some(PruningFilter::new(threshold, min_word_threshold)),
        }
    }
}

impl From<&FetchConfig> for MarkdownPolicy {
    fn from(config: &FetchConfig) -> Self {
        Self::pruning(config.prune_threshold, config.min_word_threshold)
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Generate Markdown for a rendered page.
///
/// Relative links are resolved against `base_url` when one is given.
#[instrument(skip(html, policy), fields(html_len = html.len()))]
pub fn generate_markdown(
    html: &str,
    policy: &MarkdownPolicy,
    base_url: Option<&Url>,
) -> Result<String> {
    let content_html = match &policy.filter {
        Some(filter) => filter.filter(html),
        None => body_html(html),
    };
    let (content_html, tables) = extract_tables(&content_html);

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(SKIPPED_TAGS.to_vec())
        .build();
    let raw = converter
        .convert(&content_html)
        .map_err(|e| DocsweepError::Conversion(format!("htmd conversion failed: {e}")))?;

    let markdown = cleanup::run_pipeline(&raw, &tables, base_url);
    debug!(raw_len = raw.len(), final_len = markdown.len(), "markdown generated");
    Ok(markdown)
}

/// Inner HTML of `<body>`, or the input unchanged if it has none.
fn body_html(html: &str) -> String {
    Html::parse_document(html)
        .select(&BODY_SEL)
        .next()
        .map(|body| body.inner_html())
        .unwrap_or_else(|| html.to_string())
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// Swap each `<table>` for a placeholder paragraph and return the pipe
/// tables in placeholder order; `htmd` 0.1 has no table support.
///
/// The tables go back in after conversion so `htmd` never reflows or
/// re-escapes them. The input must be scraper-serialized HTML so outer HTML
/// matches verbatim.
fn extract_tables(html: &str) -> (String, Vec<String>) {
    let doc = Html::parse_fragment(html);
    let mut out = html.to_string();
    let mut tables = Vec::new();
    for table in doc.select(&TABLE_SEL) {
        let outer = table.html();
        if !out.contains(&outer) {
            // Nested inside a table that was already replaced.
            continue;
        }
        let markdown = pipe_table(table);
        let replacement = if markdown.is_empty() {
            String::new()
        } else {
            let placeholder = format!("<p>{}</p>", cleanup::table_placeholder(tables.len()));
            tables.push(markdown);
            placeholder
        };
        out = out.replacen(&outer, &replacement, 1);
    }
    (out, tables)
}

fn pipe_table(table: ElementRef<'_>) -> String {
    let cell_text = |cell: ElementRef<'_>| {
        cell.text()
            .flat_map(str::split_whitespace)
            .collect::<Vec<_>>()
            .join(" ")
            .replace('|', "\\|")
    };

    let mut header: Option<Vec<String>> = None;
    let mut rows: Vec<Vec<String>> = Vec::new();
    for tr in table.select(&ROW_SEL) {
        let heads: Vec<String> = tr.select(&HEADER_CELL_SEL).map(cell_text).collect();
        if !heads.is_empty() && header.is_none() {
            header = Some(heads);
            continue;
        }
        let cells: Vec<String> = tr.select(&DATA_CELL_SEL).map(cell_text).collect();
        if !cells.is_empty() {
            rows.push(cells);
        }
    }

    // Without <th> the first data row doubles as the header.
    let header = match header {
        Some(h) => h,
        None if !rows.is_empty() => rows.remove(0),
        None => return String::new(),
    };
    let width = rows.iter().map(Vec::len).chain([header.len()]).max().unwrap_or(0);

    let render_row = |cells: &[String]| {
        let mut padded = cells.to_vec();
        padded.resize(width, String::new());
        format!("| {} |\n", padded.join(" | "))
    };

    let mut md = render_row(&header);
    md.push_str(&render_row(&vec!["---".to_string(); width]));
    for row in &rows {
        md.push_str(&render_row(row));
    }
    md
}
