//! Link extraction from fetched content
//!
//! Extraction only collects raw `href` values. Exclusion, normalization and
//! the allow/deny filter are applied afterwards by the crawl loop, so an
//! extractor does not need to know anything about URLs.

use crate::url::CanonicalUrl;
use scraper::{Html, Selector};
use std::collections::HashSet;
use thiserror::Error;

/// Selector for anchors carrying an `href`
const ANCHOR_SELECTOR: &str = "a[href]";

/// Errors raised while extracting links
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Malformed content from {url}: {message}")]
    Malformed { url: String, message: String },

    #[error("Invalid selector {selector}: {message}")]
    Selector { selector: String, message: String },
}

/// Pulls the raw `href` strings out of a page's content
///
/// Implementations run on the blocking pool, so they may be CPU heavy.
pub trait LinkExtractor: Send + Sync {
    /// Returns the distinct raw hrefs found in `content`
    ///
    /// An error marks the page as failed to parse; none of its links are
    /// followed.
    fn extract_links(
        &self,
        source: &CanonicalUrl,
        content: &str,
    ) -> Result<HashSet<String>, ExtractError>;
}

/// Extracts hrefs from `<a href="...">` elements
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - Empty or whitespace-only hrefs
///
/// **Note:** `rel="nofollow"` links ARE followed
///
/// # Example
///
/// ```
/// use href_harvest::crawler::{HtmlLinkExtractor, LinkExtractor};
/// use href_harvest::url::normalize_seed;
///
/// let source = normalize_seed("https://example.com/").unwrap();
/// let html = r#"<html><body><a href="/page">Link</a></body></html>"#;
/// let links = HtmlLinkExtractor.extract_links(&source, html).unwrap();
/// assert!(links.contains("/page"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlLinkExtractor;

impl LinkExtractor for HtmlLinkExtractor {
    fn extract_links(
        &self,
        _source: &CanonicalUrl,
        content: &str,
    ) -> Result<HashSet<String>, ExtractError> {
        let selector = Selector::parse(ANCHOR_SELECTOR).map_err(|e| ExtractError::Selector {
            selector: ANCHOR_SELECTOR.to_string(),
            message: format!("{:?}", e),
        })?;

        let document = Html::parse_document(content);
        let mut links = HashSet::new();

        for element in document.select(&selector) {
            // Skip if it has the download attribute
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                let href = href.trim();
                if !href.is_empty() {
                    links.insert(href.to_string());
                }
            }
        }

        Ok(links)
    }
}
