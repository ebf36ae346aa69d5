//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - Link extraction from fetched content
//! - Limiting concurrent fetches
//! - Outstanding-work tracking and termination
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod limiter;
mod parser;
mod retry;
mod work;

pub use coordinator::{CrawlHandle, Crawler, Page};
pub use fetcher::{
    build_http_client, FetchError, FetchResult, Fetcher, SkipReason, ACCEPT, ACCEPT_LANGUAGE,
    USER_AGENT,
};
pub use limiter::{ConcurrencyLimit, ConcurrencyLimiter, FetchSlot};
pub use parser::{ExtractError, HtmlLinkExtractor, LinkExtractor};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use work::{WorkPermit, WorkTracker};

use crate::config::CrawlSettings;
use crate::output::CrawlReport;
use crate::url::DownloadLedger;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Runs a complete crawl operation
///
/// This is the main entry point for a one-shot crawl. It will:
/// 1. Validate the settings and normalize the seed
/// 2. Build the HTTP client
/// 3. Fetch pages and follow admitted links
/// 4. Send every fetched page to `output`
///
/// # Arguments
///
/// * `settings` - The crawl settings
/// * `ledger` - Dedup capability shared with the caller
/// * `output` - Receives each fetched page
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl ran to completion
/// * `Err(HarvestError)` - Settings were invalid; nothing was fetched
///
/// This only returns once the crawl is over, and `output` is bounded: the
/// receiver must be drained concurrently (for example from a spawned task),
/// otherwise the crawl stalls as soon as the channel fills up. Use
/// [`Crawler::spawn`] to get a handle that owns the channel instead.
pub async fn crawl(
    settings: CrawlSettings,
    ledger: Arc<dyn DownloadLedger>,
    output: mpsc::Sender<Page>,
) -> crate::Result<CrawlReport> {
    let crawler = Crawler::new(settings, ledger)?;
    Ok(crawler.run(output).await)
}
