//! URL handling module for Href-Harvest
//!
//! This module provides href normalization, the admission filter, and the
//! dedup ledger capability used by the crawler.

mod filter;
mod ledger;
mod normalize;

use std::fmt;
use url::Url;

// Re-export main types and functions
pub use filter::{HrefFilter, MIN_HREF_LEN};
pub use ledger::{DownloadLedger, MemoryLedger};
pub use normalize::{normalize, normalize_seed};

/// An absolute http(s) URL produced by the normalizer
///
/// This is the sole identity used for dedup, filtering and fetching. It can
/// only be built through [`normalize`] or [`normalize_seed`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalUrl(Url);

impl CanonicalUrl {
    pub(crate) fn from_url(url: Url) -> Self {
        Self(url)
    }

    /// Returns the URL as a string slice
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the underlying parsed URL
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Returns the lowercase host of this URL
    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for CanonicalUrl {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<CanonicalUrl> for String {
    fn from(url: CanonicalUrl) -> Self {
        url.0.into()
    }
}
