//! Href lifecycle definitions for tracking crawl progress
//!
//! Every href the crawler sees moves through these states, from discovery
//! in a parsed page (or the seed) to exactly one terminal state.

use std::fmt;

/// Represents the current state of an href in the crawl process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HrefState {
    // ===== Active States =====
    /// Href was found in a page (or is the seed) and awaits admission
    Discovered,

    /// Href passed the filter and sits in the fetch queue
    Queued,

    /// Fetch attempts are in progress
    Fetching,

    /// Fetch returned 200; content is buffered
    Fetched,

    /// Content sits in the parse queue
    QueuedForParse,

    // ===== Terminal Success States =====
    /// Page was parsed, its children enqueued and the page emitted
    Parsed,

    // ===== Terminal Skip States =====
    /// Href was rejected by the exclusion list or the allow/deny patterns
    FilteredOut,

    /// Href was already downloaded, in this run or an earlier one
    Duplicate,

    /// Server answered 404
    Skipped,

    // ===== Terminal Error States =====
    /// Fetch failed permanently or ran out of attempts
    FetchFailed,

    /// Link extraction or href resolution failed; the page was discarded
    ParseFailed,
}

impl HrefState {
    /// Returns true if this represents an error state
    pub fn is_error(&self) -> bool {
        matches!(self, Self::FetchFailed | Self::ParseFailed)
    }

    /// Short machine-friendly name, used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Queued => "queued",
            Self::Fetching => "fetching",
            Self::Fetched => "fetched",
            Self::QueuedForParse => "queued_for_parse",
            Self::Parsed => "parsed",
            Self::FilteredOut => "filtered_out",
            Self::Duplicate => "duplicate",
            Self::Skipped => "skipped",
            Self::FetchFailed => "fetch_failed",
            Self::ParseFailed => "parse_failed",
        }
    }
}

impl fmt::Display for HrefState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
