use crate::url::CanonicalUrl;
use regex::Regex;

/// Hrefs shorter than this are never normalized
pub const MIN_HREF_LEN: usize = 2;

/// Script-scheme markers; any href containing one is dropped
const SCRIPT_MARKERS: &[&str] = &["javascript:", "vbscript:"];

/// Schemes the crawler can fetch
const WEB_SCHEMES: &[&str] = &["http", "https"];

/// File extensions that never lead to crawlable markup
const EXCLUDED_EXTENSIONS: &[&str] = &[
    "css", "js", "json", "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "bmp", "pdf", "zip",
    "gz", "tar", "rar", "7z", "exe", "dmg", "mp3", "mp4", "m4a", "avi", "mov", "webm", "woff",
    "woff2", "ttf", "eot",
];

/// Decides which hrefs are admitted for fetching
///
/// Evaluation order:
/// 1. The fixed exclusion list (script markers, non-web schemes, fragment-only
///    anchors, asset extensions) rejects without touching the patterns
/// 2. A matching deny pattern rejects
/// 3. A matching allow pattern accepts
/// 4. Everything else is rejected, so a filter without an allow pattern
///    admits nothing
///
/// A pattern only counts as matching when the match is non-empty.
#[derive(Debug, Clone, Default)]
pub struct HrefFilter {
    allow: Option<Regex>,
    deny: Option<Regex>,
}

impl HrefFilter {
    /// Creates a filter from optional allow and deny patterns
    pub fn new(allow: Option<Regex>, deny: Option<Regex>) -> Self {
        Self { allow, deny }
    }

    /// Returns true if an allow pattern is configured
    pub fn has_allow_pattern(&self) -> bool {
        self.allow.is_some()
    }

    /// Checks a raw href against the exclusion list, before normalization
    ///
    /// # Examples
    ///
    /// ```
    /// use href_harvest::url::HrefFilter;
    ///
    /// assert!(HrefFilter::is_excluded("javascript:void(0)"));
    /// assert!(HrefFilter::is_excluded("#top"));
    /// assert!(HrefFilter::is_excluded("mailto:someone@example.com"));
    /// assert!(HrefFilter::is_excluded("/logo.png"));
    /// assert!(!HrefFilter::is_excluded("/about"));
    /// ```
    pub fn is_excluded(raw: &str) -> bool {
        let href = raw.trim();

        if href.len() < MIN_HREF_LEN || href.starts_with('#') {
            return true;
        }

        let lower = href.to_ascii_lowercase();
        if SCRIPT_MARKERS.iter().any(|marker| lower.contains(marker)) {
            return true;
        }

        if let Some(scheme) = scheme_of(&lower) {
            if !WEB_SCHEMES.contains(&scheme) {
                return true;
            }
        }

        has_excluded_extension(strip_query_and_fragment(&lower))
    }

    /// Decides whether a canonical URL may be fetched
    pub fn is_allowed(&self, url: &CanonicalUrl) -> bool {
        if has_excluded_extension(&url.as_url().path().to_ascii_lowercase()) {
            return false;
        }

        if let Some(deny) = &self.deny {
            if matches_nonempty(deny, url.as_str()) {
                return false;
            }
        }

        match &self.allow {
            Some(allow) => matches_nonempty(allow, url.as_str()),
            None => false,
        }
    }
}

/// Returns the scheme of an href if it starts with one (`scheme:`)
fn scheme_of(href: &str) -> Option<&str> {
    let (scheme, _) = href.split_once(':')?;
    let mut chars = scheme.chars();
    let first = chars.next()?;

    if first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    {
        Some(scheme)
    } else {
        None
    }
}

fn strip_query_and_fragment(href: &str) -> &str {
    let end = href.find(['?', '#']).unwrap_or(href.len());
    &href[..end]
}

fn has_excluded_extension(path: &str) -> bool {
    let last_segment = path.rsplit('/').next().unwrap_or(path);

    match last_segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => EXCLUDED_EXTENSIONS.contains(&ext),
        _ => false,
    }
}

fn matches_nonempty(pattern: &Regex, candidate: &str) -> bool {
    pattern
        .find(candidate)
        .is_some_and(|m| !m.as_str().is_empty())
}
