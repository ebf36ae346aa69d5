//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the dispatch loop that coordinates all aspects of
//! the crawling process, including:
//! - Admitting the seed and every discovered href
//! - Deduplicating against the in-run seen-set and the download ledger
//! - Spawning fetch and parse tasks
//! - Streaming fetched pages to the caller
//! - Detecting global termination

use crate::config::CrawlSettings;
use crate::crawler::fetcher::{build_http_client, FetchResult, Fetcher, SkipReason};
use crate::crawler::limiter::ConcurrencyLimiter;
use crate::crawler::parser::{ExtractError, HtmlLinkExtractor, LinkExtractor};
use crate::crawler::retry::Sleeper;
use crate::crawler::work::{WorkPermit, WorkTracker};
use crate::output::{CrawlReport, CrawlStats};
use crate::state::HrefState;
use crate::url::{normalize, CanonicalUrl, DownloadLedger, HrefFilter};
use crate::UrlError;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};

/// A fetched page as handed to the caller
#[derive(Debug, Clone)]
pub struct Page {
    /// Canonical URL the content was fetched from
    pub url: CanonicalUrl,

    /// Full response body
    pub content: String,
}

/// A URL admitted by the filter, waiting to be fetched
#[derive(Debug)]
struct FetchTask {
    url: CanonicalUrl,
    permit: WorkPermit,
}

/// Content of a 200 response, waiting to be parsed
#[derive(Debug)]
struct ParseTask {
    source: CanonicalUrl,
    content: String,
    permit: WorkPermit,
}

/// Why a fetched page produced no children
#[derive(Debug, Error)]
enum ParseFailure {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("Cannot resolve href '{href}': {source}")]
    Href {
        href: String,
        #[source]
        source: UrlError,
    },

    #[error("Link extraction task failed: {0}")]
    Join(#[from] JoinError),
}

/// Everything the spawned tasks of one crawl share
struct Shared {
    fetcher: Fetcher,
    extractor: Arc<dyn LinkExtractor>,
    filter: HrefFilter,
    stats: Arc<CrawlStats>,
    href_tx: mpsc::Sender<FetchTask>,
    parse_tx: mpsc::Sender<ParseTask>,
    output: mpsc::Sender<Page>,
}

/// Main crawler structure
///
/// One value per crawl: it is consumed by [`Crawler::run`] or
/// [`Crawler::spawn`].
///
/// # Example
///
/// ```no_run
/// use href_harvest::config::CrawlSettings;
/// use href_harvest::crawler::Crawler;
/// use href_harvest::url::MemoryLedger;
/// use regex::Regex;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let settings = CrawlSettings::new("https://example.com/")
///     .with_allow_pattern(Regex::new(r"^https://example\.com/")?);
/// let crawler = Crawler::new(settings, Arc::new(MemoryLedger::new()))?;
///
/// let mut handle = crawler.spawn();
/// while let Some(page) = handle.next_page().await {
///     println!("{} ({} bytes)", page.url, page.content.len());
/// }
/// let report = handle.finish().await?;
/// println!("{} pages", report.pages_emitted());
/// # Ok(())
/// # }
/// ```
pub struct Crawler {
    settings: CrawlSettings,
    seed: CanonicalUrl,
    filter: HrefFilter,
    fetcher: Fetcher,
    extractor: Arc<dyn LinkExtractor>,
    ledger: Arc<dyn DownloadLedger>,
}

impl Crawler {
    /// Creates a crawler, validating the settings eagerly
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to run
    /// * `Err(HarvestError)` - Invalid settings or HTTP client setup failure
    pub fn new(settings: CrawlSettings, ledger: Arc<dyn DownloadLedger>) -> crate::Result<Self> {
        settings.validate()?;
        let seed = settings.seed_url()?;
        let filter = settings.filter();

        let client = build_http_client(settings.request_timeout)?;
        let limiter = ConcurrencyLimiter::new(settings.max_concurrent_fetches);
        let fetcher = Fetcher::new(client, limiter, settings.retry);

        Ok(Self {
            settings,
            seed,
            filter,
            fetcher,
            extractor: Arc::new(HtmlLinkExtractor),
            ledger,
        })
    }

    /// Replaces the default HTML link extractor
    pub fn with_extractor(mut self, extractor: Arc<dyn LinkExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Replaces the sleeper used for retry backoff
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.fetcher = self.fetcher.with_sleeper(sleeper);
        self
    }

    /// The normalized seed URL
    pub fn seed(&self) -> &CanonicalUrl {
        &self.seed
    }

    /// Runs the crawl on a background task and streams pages back
    pub fn spawn(self) -> CrawlHandle {
        let (output, pages) = mpsc::channel(self.settings.output_capacity);
        let task = tokio::spawn(self.run(output));
        CrawlHandle { pages, task }
    }

    /// Runs the crawl to completion, sending every fetched page to `output`
    ///
    /// Returns once no fetch or parse task is outstanding. Per-URL failures
    /// never abort the crawl; they are logged and collected in the report.
    /// The receiving end of `output` must be drained while this runs.
    pub async fn run(self, output: mpsc::Sender<Page>) -> CrawlReport {
        let Crawler {
            settings,
            seed,
            filter,
            fetcher,
            extractor,
            ledger,
        } = self;

        tracing::info!("Starting crawl at {}", seed);

        let stats = Arc::new(CrawlStats::new());
        let (tracker, root) = WorkTracker::new();

        if !filter.is_allowed(&seed) {
            tracing::warn!(state = %HrefState::FilteredOut, "Seed {} rejected by the href filter", seed);
            stats.record(HrefState::FilteredOut);
            drop(root);
            return stats.snapshot();
        }

        let (href_tx, mut href_rx) = mpsc::channel(settings.queue_capacity);
        let (parse_tx, mut parse_rx) = mpsc::channel(settings.queue_capacity);

        let shared = Arc::new(Shared {
            fetcher,
            extractor,
            filter,
            stats: stats.clone(),
            href_tx,
            parse_tx,
            output,
        });

        let mut seen: HashSet<CanonicalUrl> = HashSet::new();
        let seed_task = FetchTask {
            url: seed,
            permit: root,
        };
        dispatch(&shared, ledger.as_ref(), &mut seen, seed_task);

        loop {
            tokio::select! {
                biased;

                Some(task) = parse_rx.recv() => {
                    tokio::spawn(parse_page(shared.clone(), task));
                }

                Some(task) = href_rx.recv() => {
                    dispatch(&shared, ledger.as_ref(), &mut seen, task);
                }

                _ = tracker.finished() => break,
            }
        }

        let report = stats.snapshot();
        tracing::info!(
            "Crawl completed: {} pages emitted, {} failures in {:?}",
            report.pages_emitted(),
            report.total_errors(),
            report.elapsed
        );
        report
    }
}

/// Handle to a crawl running on a background task
pub struct CrawlHandle {
    pages: mpsc::Receiver<Page>,
    task: JoinHandle<CrawlReport>,
}

impl CrawlHandle {
    /// Next fetched page; `None` once the crawl has finished
    pub async fn next_page(&mut self) -> Option<Page> {
        self.pages.recv().await
    }

    /// Waits for the crawl to finish and returns its report
    ///
    /// Pages not yet received are discarded.
    pub async fn finish(self) -> Result<CrawlReport, JoinError> {
        drop(self.pages);
        self.task.await
    }
}

/// Deduplicates an admitted URL and spawns its fetch
///
/// Runs only on the dispatch loop, so ledger calls are serialized.
fn dispatch(
    shared: &Arc<Shared>,
    ledger: &dyn DownloadLedger,
    seen: &mut HashSet<CanonicalUrl>,
    task: FetchTask,
) {
    if !seen.insert(task.url.clone()) || ledger.already_downloaded(&task.url) {
        tracing::debug!(state = %HrefState::Duplicate, "Skipping {}: already downloaded", task.url);
        shared.stats.record(HrefState::Duplicate);
        return;
    }

    ledger.mark_downloaded(&task.url);
    shared.stats.record(HrefState::Queued);
    tracing::trace!(state = %HrefState::Queued, "Dispatching {}", task.url);

    tokio::spawn(fetch_page(shared.clone(), task));
}

/// Fetches one URL and hands a successful body to the parse queue
async fn fetch_page(shared: Arc<Shared>, task: FetchTask) {
    let FetchTask { url, permit } = task;
    tracing::trace!(state = %HrefState::Fetching, "Fetching {}", url);

    match shared.fetcher.fetch(&url).await {
        FetchResult::Success(content) => {
            tracing::info!(state = %HrefState::Fetched, "Fetched {} ({} bytes)", url, content.len());
            let parse = ParseTask {
                source: url,
                content,
                permit,
            };
            tracing::trace!(state = %HrefState::QueuedForParse, "Queueing {} for parsing", parse.source);
            if let Err(e) = shared.parse_tx.send(parse).await {
                tracing::warn!("Parse queue closed, dropping {}", e.0.source);
            }
        }

        FetchResult::Skipped(SkipReason::NotFound) => {
            tracing::debug!(state = %HrefState::Skipped, "Skipping {}: not found", url);
            shared.stats.record(HrefState::Skipped);
            drop(permit);
        }

        FetchResult::Fatal(e) => {
            tracing::warn!(state = %HrefState::FetchFailed, "Failed to fetch {}: {}", url, e);
            shared
                .stats
                .record_failure(&url, HrefState::FetchFailed, e.to_string());
            drop(permit);
        }
    }
}

/// Extracts links from a fetched page, enqueues its children and emits it
///
/// Every child permit is minted before this task's own permit drops.
async fn parse_page(shared: Arc<Shared>, task: ParseTask) {
    let ParseTask {
        source,
        content,
        permit,
    } = task;

    let (content, children) = match resolve_children(&shared, &source, content).await {
        Ok(resolved) => resolved,
        Err(e) => {
            tracing::warn!(state = %HrefState::ParseFailed, "Failed to parse {}: {}", source, e);
            shared
                .stats
                .record_failure(&source, HrefState::ParseFailed, e.to_string());
            return;
        }
    };

    tracing::debug!("Found {} new links on {}", children.len(), source);

    for url in children {
        let child = FetchTask {
            url,
            permit: permit.child(),
        };
        if let Err(e) = shared.href_tx.send(child).await {
            tracing::warn!("Href queue closed, dropping {}", e.0.url);
        }
    }

    let page = Page {
        url: source,
        content,
    };
    if let Err(e) = shared.output.send(page).await {
        tracing::debug!("Output receiver dropped, discarding {}", e.0.url);
    }
    shared.stats.record(HrefState::Parsed);

    drop(shared);
    drop(permit);
}

/// Runs the extractor, then filters and normalizes every href
///
/// Fails as a whole on the first href that cannot be resolved, so a failed
/// page enqueues nothing. Returns the content buffer back for emission.
async fn resolve_children(
    shared: &Shared,
    source: &CanonicalUrl,
    content: String,
) -> Result<(String, Vec<CanonicalUrl>), ParseFailure> {
    let extractor = shared.extractor.clone();
    let base = source.clone();
    let (content, extracted) = tokio::task::spawn_blocking(move || {
        let links = extractor.extract_links(&base, &content);
        (content, links)
    })
    .await?;
    let hrefs = extracted?;

    let mut children = Vec::new();
    let mut filtered = 0;

    for href in hrefs {
        tracing::trace!(state = %HrefState::Discovered, "Found href '{}' on {}", href, source);
        if HrefFilter::is_excluded(&href) {
            filtered += 1;
            continue;
        }

        let url = normalize(&href, source).map_err(|e| ParseFailure::Href {
            href: href.clone(),
            source: e,
        })?;

        if shared.filter.is_allowed(&url) {
            children.push(url);
        } else {
            tracing::debug!(state = %HrefState::FilteredOut, "Filtered out {}", url);
            filtered += 1;
        }
    }

    shared.stats.add(HrefState::FilteredOut, filtered);
    Ok((content, children))
}
