//! Output module for crawl reports
//!
//! This module handles:
//! - Counting hrefs by lifecycle state while the crawl runs
//! - Recording per-URL failures, which never reach the page stream
//! - Rendering the final report

pub mod stats;

pub use stats::{print_report, CrawlReport, CrawlStats};

use crate::state::HrefState;

/// Error information for a failed href
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlFailure {
    /// The URL that failed
    pub url: String,

    /// The error state
    pub state: HrefState,

    /// Error message
    pub message: String,
}
