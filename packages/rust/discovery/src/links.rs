//! Navigation-link extraction from a rendered DOM.

use std::collections::BTreeMap;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use docsweep_shared::{DiscoveredLink, DocsweepError, Result};

/// Pulls same-prefix navigation links out of page HTML.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    selectors: Vec<Selector>,
    strip_fragments: bool,
}

impl LinkExtractor {
    /// Compile the anchor selectors; any invalid selector is an extraction error.
    pub fn new<S: AsRef<str>>(selectors: &[S], strip_fragments: bool) -> Result<Self> {
        let selectors = selectors
            .iter()
            .map(|s| {
                Selector::parse(s.as_ref()).map_err(|e| {
                    DocsweepError::extraction(format!("invalid selector '{}': {e}", s.as_ref()))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            selectors,
            strip_fragments,
        })
    }

    /// Links under `seed`, unique by URL (first label wins), sorted by URL.
    ///
    /// An anchor matched by several selectors is considered once. Hrefs are
    /// resolved against the seed and kept only when the absolute URL starts
    /// with the seed URL string.
    pub fn extract(&self, html: &str, seed: &Url) -> Vec<DiscoveredLink> {
        let doc = Html::parse_document(html);
        let prefix = seed.as_str();
        let mut found: BTreeMap<String, String> = BTreeMap::new();

        let anchors = doc
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| self.selectors.iter().any(|sel| sel.matches(el)));

        for anchor in anchors {
            let Some(href) = anchor.value().attr("href").map(str::trim) else {
                continue;
            };
            if href.is_empty() {
                continue;
            }
            let Ok(mut url) = seed.join(href) else {
                tracing::trace!(href, "unresolvable href");
                continue;
            };
            if self.strip_fragments {
                url.set_fragment(None);
            }

            let url = String::from(url);
            if !url.starts_with(prefix) {
                continue;
            }
            found.entry(url).or_insert_with(|| {
                anchor
                    .text()
                    .collect::<String>()
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
            });
        }

        found
            .into_iter()
            .map(|(url, text)| DiscoveredLink { url, text })
            .collect()
    }
}
