//! Crawl statistics collected while a run is in progress
//!
//! This module provides the live counters the crawl tasks update and the
//! final report handed back to the caller.

use crate::output::CrawlFailure;
use crate::state::HrefState;
use crate::url::CanonicalUrl;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// States the crawler counts: every href that reached the fetch stage, plus
/// each terminal outcome
const COUNTED_STATES: [HrefState; 7] = [
    HrefState::Queued,
    HrefState::Parsed,
    HrefState::FilteredOut,
    HrefState::Duplicate,
    HrefState::Skipped,
    HrefState::FetchFailed,
    HrefState::ParseFailed,
];

/// Live counters shared by every task of one crawl
#[derive(Debug)]
pub struct CrawlStats {
    counts: HashMap<HrefState, AtomicU64>,
    failures: Mutex<Vec<CrawlFailure>>,
    started: Instant,
}

impl Default for CrawlStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CrawlStats {
    pub fn new() -> Self {
        Self {
            counts: COUNTED_STATES
                .iter()
                .map(|state| (*state, AtomicU64::new(0)))
                .collect(),
            failures: Mutex::new(Vec::new()),
            started: Instant::now(),
        }
    }

    /// Counts one href reaching `state`
    pub fn record(&self, state: HrefState) {
        self.add(state, 1);
    }

    /// Counts `n` hrefs reaching `state`
    pub fn add(&self, state: HrefState, n: u64) {
        if let Some(counter) = self.counts.get(&state) {
            counter.fetch_add(n, Ordering::Relaxed);
        }
    }

    /// Counts a failed href and keeps its error message
    pub fn record_failure(&self, url: &CanonicalUrl, state: HrefState, message: impl Into<String>) {
        self.record(state);
        let failure = CrawlFailure {
            url: url.to_string(),
            state,
            message: message.into(),
        };
        self.failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(failure);
    }

    /// Current count for a state
    pub fn count(&self, state: HrefState) -> u64 {
        self.counts
            .get(&state)
            .map(|counter| counter.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Freezes the counters into a report
    pub fn snapshot(&self) -> CrawlReport {
        let counts = self
            .counts
            .iter()
            .map(|(state, counter)| (*state, counter.load(Ordering::Relaxed)))
            .collect();
        let failures = self
            .failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        CrawlReport {
            counts,
            failures,
            elapsed: self.started.elapsed(),
        }
    }
}

/// Final statistics of a crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    /// Number of hrefs per counted state
    pub counts: BTreeMap<HrefState, u64>,

    /// Every fetch or parse failure, in the order they were recorded
    pub failures: Vec<CrawlFailure>,

    /// Wall time from crawl start to the report
    pub elapsed: Duration,
}

impl CrawlReport {
    /// Count for a state (0 if never reached)
    pub fn count(&self, state: HrefState) -> u64 {
        self.counts.get(&state).copied().unwrap_or(0)
    }

    /// URLs handed to the fetcher
    pub fn dispatched(&self) -> u64 {
        self.count(HrefState::Queued)
    }

    /// Pages parsed and emitted
    pub fn pages_emitted(&self) -> u64 {
        self.count(HrefState::Parsed)
    }

    /// Fetch and parse failures
    pub fn total_errors(&self) -> u64 {
        self.counts
            .iter()
            .filter(|(state, _)| state.is_error())
            .map(|(_, count)| count)
            .sum()
    }
}

/// Prints a report to stdout in a formatted manner
///
/// # Arguments
///
/// * `report` - The report to display
pub fn print_report(report: &CrawlReport) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  URLs fetched: {}", report.dispatched());
    println!("  Pages emitted: {}", report.pages_emitted());
    println!("  Errors: {}", report.total_errors());
    println!("  Elapsed: {:.2?}", report.elapsed);
    println!();

    println!("Hrefs by State:");
    // Sort states by count (descending)
    let mut state_counts: Vec<_> = report.counts.iter().filter(|(_, c)| **c > 0).collect();
    state_counts.sort_by(|a, b| b.1.cmp(a.1));

    for (state, count) in state_counts {
        println!("  {}: {}", state, count);
    }
    println!();

    if !report.failures.is_empty() {
        println!("Failures ({}):", report.failures.len());
        for failure in &report.failures {
            println!("  [{}] {}: {}", failure.state, failure.url, failure.message);
        }
        println!();
    }

    let dispatched = report.dispatched();
    let success_rate = if dispatched > 0 {
        (report.pages_emitted() as f64 / dispatched as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} fetched URLs emitted)",
        success_rate,
        report.pages_emitted(),
        dispatched
    );
}
