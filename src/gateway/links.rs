//! HTML link extraction
//!
//! This module parses HTML content to extract candidate links, with their
//! anchor text and `rel`/`title` attributes, for link classification.

use crate::gateway::LinkExtractor;
use crate::model::Link;
use crate::url::normalize;
use crate::{GatewayError, GatewayResult};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Scraper-based link extractor
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links (same page anchors)
/// - Non-HTTP(S) URLs after resolution
///
/// Links are deduplicated by normalized URL, keeping the first occurrence.
#[derive(Debug, Clone, Default)]
pub struct HtmlLinkExtractor;

impl HtmlLinkExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl LinkExtractor for HtmlLinkExtractor {
    fn extract_links(&self, html: &str, base_url: &Url) -> GatewayResult<Vec<Link>> {
        if html.trim().is_empty() {
            return Err(GatewayError::InvalidInput(format!(
                "empty HTML for {}",
                base_url
            )));
        }

        let document = Html::parse_document(html);
        let selector = Selector::parse("a[href]")
            .map_err(|e| GatewayError::InvalidInput(format!("bad selector: {:?}", e)))?;

        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for element in document.select(&selector) {
            // Skip if it has the download attribute
            if element.value().attr("download").is_some() {
                continue;
            }

            let Some(href) = element.value().attr("href") else {
                continue;
            };

            let Some(absolute_url) = resolve_link(href, base_url) else {
                continue;
            };

            let key = match normalize(absolute_url.as_str()) {
                Ok(normalized) => normalized,
                Err(_) => continue,
            };
            if !seen.insert(key) {
                continue;
            }

            links.push(to_link(element, absolute_url));
        }

        tracing::trace!(base_url = %base_url, count = links.len(), "Extracted links");
        Ok(links)
    }
}

fn to_link(element: ElementRef<'_>, url: Url) -> Link {
    let text = element
        .text()
        .flat_map(|t| t.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ");

    let attr = |name: &str| {
        element
            .value()
            .attr(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    Link {
        url,
        text,
        rel: attr("rel"),
        title: attr("title"),
    }
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded.
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url)
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" =>
        {
            Some(absolute_url)
        }
        _ => None,
    }
}
