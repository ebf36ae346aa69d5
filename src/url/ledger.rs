use crate::url::CanonicalUrl;
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Dedup capability supplied by the caller
///
/// The crawler queries `already_downloaded` before dispatching a fetch and
/// calls `mark_downloaded` exactly once for every URL it dispatches, whatever
/// the outcome of the fetch. Both calls come from the crawler's dispatch loop,
/// one at a time, but implementations must still be `Send + Sync` because the
/// ledger is shared with the caller.
pub trait DownloadLedger: Send + Sync {
    /// Returns true if the URL was already processed, in this run or an earlier one
    fn already_downloaded(&self, url: &CanonicalUrl) -> bool;

    /// Records that the URL reached the fetch stage
    fn mark_downloaded(&self, url: &CanonicalUrl);
}

/// In-memory ledger backed by a set of URL strings
///
/// It can be pre-seeded with URLs downloaded by an earlier run.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    downloaded: Mutex<HashSet<String>>,
}

impl MemoryLedger {
    /// Creates an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ledger that already knows the given URLs
    pub fn with_downloaded<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            downloaded: Mutex::new(urls.into_iter().map(Into::into).collect()),
        }
    }

    /// Returns true if the ledger holds the given URL string
    pub fn contains(&self, url: &str) -> bool {
        self.lock().contains(url)
    }

    /// Number of URLs recorded
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.downloaded.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DownloadLedger for MemoryLedger {
    fn already_downloaded(&self, url: &CanonicalUrl) -> bool {
        self.contains(url.as_str())
    }

    fn mark_downloaded(&self, url: &CanonicalUrl) {
        self.lock().insert(url.as_str().to_string());
    }
}
