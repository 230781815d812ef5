//! Relevance-pruning content filter.
//!
//! Walks the `<body>` of a rendered page and removes elements whose composite
//! relevance score falls below a fixed threshold. The score blends text
//! density, link density, tag weight, class/id hints, and text length, so
//! link farms (menus, footers, breadcrumbs) fall away while prose survives.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// Tags removed outright, before any scoring.
const EXCLUDED_TAGS: &[&str] = &[
    "nav", "header", "footer", "aside", "script", "style", "form", "iframe", "noscript", "svg",
];

/// Elements kept whole: never scored, never descended into.
///
/// Highlighted code spreads whitespace over its own spans and tables may
/// have empty cells, so scoring their children would corrupt them.
const PRESERVED_TAGS: &[&str] = &["br", "hr", "img", "pre", "code", "table"];

// Metric weights; they sum to 1.0.
const W_TEXT_DENSITY: f64 = 0.4;
const W_LINK_DENSITY: f64 = 0.2;
const W_TAG: f64 = 0.2;
const W_CLASS_ID: f64 = 0.1;
const W_TEXT_LENGTH: f64 = 0.1;

static BODY_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("body selector"));

static NEGATIVE_HINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)nav|footer|header|sidebar|ads|comment|promo|advert|social|share")
        .expect("negative hint regex")
});

/// Prunes low-relevance blocks from rendered HTML.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PruningFilter {
    /// Elements scoring strictly below this are removed.
    pub threshold: f64,
    /// Elements with fewer words are removed; 0 disables the check.
    pub min_word_threshold: usize,
}

impl PruningFilter {
    pub fn new(threshold: f64, min_word_threshold: usize) -> Self {
        Self {
            threshold,
            min_word_threshold,
        }
    }

    /// Return the inner HTML of `<body>` with low-relevance elements removed.
    pub fn filter(&self, html: &str) -> String {
        let mut doc = Html::parse_document(html);

        let mut excluded = Vec::new();
        if let Some(body) = doc.select(&BODY_SEL).next() {
            excluded.extend(
                body.descendants()
                    .filter_map(ElementRef::wrap)
                    .filter(|el| EXCLUDED_TAGS.contains(&el.value().name()))
                    .map(|el| el.id()),
            );
        }
        for id in excluded {
            if let Some(mut node) = doc.tree.get_mut(id) {
                node.detach();
            }
        }

        let mut pruned = Vec::new();
        if let Some(body) = doc.select(&BODY_SEL).next() {
            for child in body.children().filter_map(ElementRef::wrap) {
                self.prune(child, &mut |el| pruned.push(el.id()));
            }
        }
        tracing::trace!(removed = pruned.len(), "pruned low-relevance blocks");
        for id in pruned {
            if let Some(mut node) = doc.tree.get_mut(id) {
                node.detach();
            }
        }

        doc.select(&BODY_SEL)
            .next()
            .map(|body| body.inner_html())
            .unwrap_or_default()
    }

    fn prune<F>(&self, el: ElementRef<'_>, remove: &mut F)
    where
        F: FnMut(ElementRef<'_>),
    {
        if PRESERVED_TAGS.contains(&el.value().name()) {
            return;
        }
        if self.score(el) < self.threshold {
            remove(el);
            return;
        }
        for child in el.children().filter_map(ElementRef::wrap) {
            self.prune(child, remove);
        }
    }

    /// Composite relevance score for a single element.
    pub(crate) fn score(&self, el: ElementRef<'_>) -> f64 {
        let text: String = el.text().map(str::trim).collect();
        let text_len = text.chars().count();

        if self.min_word_threshold > 0 {
            let words = el.text().flat_map(str::split_whitespace).count();
            if words < self.min_word_threshold {
                return -1.0;
            }
        }

        let tag_len = el.inner_html().chars().count();
        let link_text_len: usize = el
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|child| child.value().name() == "a")
            .map(|a| a.text().map(str::trim).collect::<String>().chars().count())
            .sum();

        let text_density = if tag_len > 0 {
            text_len as f64 / tag_len as f64
        } else {
            0.0
        };
        let link_score = if text_len > 0 {
            1.0 - (link_text_len as f64 / text_len as f64).min(1.0)
        } else {
            0.0
        };

        W_TEXT_DENSITY * text_density
            + W_LINK_DENSITY * link_score
            + W_TAG * tag_weight(el.value().name())
            + W_CLASS_ID * class_id_weight(el)
            + W_TEXT_LENGTH * ((text_len + 1) as f64).ln()
    }
}

fn tag_weight(name: &str) -> f64 {
    match name {
        "article" => 1.5,
        "h1" => 1.2,
        "h2" => 1.1,
        "p" | "section" | "h3" => 1.0,
        "h4" => 0.9,
        "h5" => 0.8,
        "h6" => 0.7,
        "span" => 0.3,
        _ => 0.5,
    }
}

fn class_id_weight(el: ElementRef<'_>) -> f64 {
    let mut weight = 0.0;
    if let Some(class) = el.value().attr("class") {
        if NEGATIVE_HINT_RE.is_match(class) {
            weight -= 0.5;
        }
    }
    if let Some(id) = el.value().attr("id") {
        if NEGATIVE_HINT_RE.is_match(id) {
            weight -= 0.5;
        }
    }
    weight
}
