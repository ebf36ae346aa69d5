//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use async_trait::async_trait;
use href_harvest::config::{parse_config, CrawlSettings};
use href_harvest::crawler::{
    crawl, ConcurrencyLimit, Crawler, ExtractError, HtmlLinkExtractor, LinkExtractor, Page,
    RetryPolicy, Sleeper,
};
use href_harvest::output::CrawlReport;
use href_harvest::state::HrefState;
use href_harvest::url::{CanonicalUrl, DownloadLedger, MemoryLedger};
use href_harvest::HarvestError;
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Upper bound on any single crawl in these tests
const CRAWL_TIMEOUT: Duration = Duration::from_secs(20);

/// Creates settings that admit every URL on the mock server
fn test_settings(server: &MockServer, start: &str) -> CrawlSettings {
    let base = server.uri();
    CrawlSettings::new(format!("{}{}", base, start))
        .with_allow_pattern(Regex::new(&format!("^{}/", regex::escape(&base))).unwrap())
        .with_retry(RetryPolicy::new(3, Duration::from_millis(1)))
        .with_request_timeout(Duration::from_secs(5))
}

/// Serves `body` as HTML at `route`, expecting exactly `times` requests
async fn mount_page(server: &MockServer, route: &str, body: String, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(times)
        .mount(server)
        .await;
}

fn links(hrefs: &[&str]) -> String {
    let anchors: String = hrefs
        .iter()
        .map(|href| format!(r#"<a href="{}">link</a>"#, href))
        .collect();
    format!("<html><body>{}</body></html>", anchors)
}

/// Runs the crawl to completion, collecting every page
async fn crawl_all(crawler: Crawler) -> (Vec<Page>, CrawlReport) {
    let run = async {
        let mut handle = crawler.spawn();
        let mut pages = Vec::new();
        while let Some(page) = handle.next_page().await {
            pages.push(page);
        }
        let report = handle.finish().await.expect("crawl task panicked");
        (pages, report)
    };

    tokio::time::timeout(CRAWL_TIMEOUT, run)
        .await
        .expect("crawl should terminate")
}

fn page_urls(pages: &[Page]) -> HashSet<String> {
    pages.iter().map(|p| p.url.to_string()).collect()
}

/// Ledger that is slow to answer, widening the window between discovery and
/// dispatch
struct SlowLedger {
    inner: MemoryLedger,
    delay: Duration,
}

impl DownloadLedger for SlowLedger {
    fn already_downloaded(&self, url: &CanonicalUrl) -> bool {
        std::thread::sleep(self.delay);
        self.inner.already_downloaded(url)
    }

    fn mark_downloaded(&self, url: &CanonicalUrl) {
        self.inner.mark_downloaded(url)
    }
}

/// Extractor that stalls before handing back links, holding the parent page
/// open while its children are still undiscovered
struct SlowExtractor {
    delay: Duration,
}

impl LinkExtractor for SlowExtractor {
    fn extract_links(
        &self,
        source: &CanonicalUrl,
        content: &str,
    ) -> Result<HashSet<String>, ExtractError> {
        std::thread::sleep(self.delay);
        HtmlLinkExtractor.extract_links(source, content)
    }
}

#[derive(Default)]
struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

#[tokio::test]
async fn test_seed_without_links_emits_single_page() {
    let server = MockServer::start().await;
    let body = "<html><body><p>Nothing to follow</p></body></html>".to_string();
    mount_page(&server, "/", body.clone(), 1).await;

    let crawler = Crawler::new(test_settings(&server, "/"), Arc::new(MemoryLedger::new())).unwrap();
    let (pages, report) = crawl_all(crawler).await;

    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].url.to_string(), format!("{}/", server.uri()));
    assert_eq!(pages[0].content, body);
    assert_eq!(report.dispatched(), 1);
    assert_eq!(report.pages_emitted(), 1);
    assert!(report.failures.is_empty());
}

#[tokio::test]
async fn test_missing_seed_emits_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let crawler = Crawler::new(test_settings(&server, "/"), Arc::new(MemoryLedger::new())).unwrap();
    let (pages, report) = crawl_all(crawler).await;

    assert!(pages.is_empty());
    assert_eq!(report.count(HrefState::Skipped), 1);
    assert!(report.failures.is_empty());
}

#[tokio::test]
async fn test_full_crawl_follows_admitted_links() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        links(&[
            "/page1",
            "page2",
            "https://other.org/elsewhere",
            "/style.css",
            "#top",
            "mailto:someone@example.com",
        ]),
        1,
    )
    .await;
    mount_page(&server, "/page1", links(&["/"]), 1).await;
    mount_page(&server, "/page2", links(&[]), 1).await;

    let crawler = Crawler::new(test_settings(&server, "/"), Arc::new(MemoryLedger::new())).unwrap();
    let (pages, report) = crawl_all(crawler).await;

    let expected: HashSet<String> = [
        format!("{}/", base),
        format!("{}/page1", base),
        format!("{}/page2", base),
    ]
    .into_iter()
    .collect();
    assert_eq!(page_urls(&pages), expected);
    assert_eq!(report.count(HrefState::FilteredOut), 4);
    assert_eq!(report.count(HrefState::Duplicate), 1);
}

#[tokio::test]
async fn test_already_downloaded_urls_are_not_fetched() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", links(&["/old", "/new"]), 1).await;
    mount_page(&server, "/old", links(&[]), 0).await;
    mount_page(&server, "/new", links(&[]), 1).await;

    let ledger = Arc::new(MemoryLedger::with_downloaded([format!("{}/old", base)]));
    let crawler = Crawler::new(test_settings(&server, "/"), ledger.clone()).unwrap();
    let (pages, report) = crawl_all(crawler).await;

    assert_eq!(pages.len(), 2);
    assert!(!page_urls(&pages).contains(&format!("{}/old", base)));
    assert_eq!(report.count(HrefState::Duplicate), 1);
    assert!(ledger.contains(&format!("{}/", base)));
    assert!(ledger.contains(&format!("{}/new", base)));
    assert_eq!(ledger.len(), 3);
}

#[tokio::test]
async fn test_failed_fetches_are_still_marked_downloaded() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", links(&["/gone", "/broken"]), 1).await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let ledger = Arc::new(MemoryLedger::new());
    let crawler = Crawler::new(test_settings(&server, "/"), ledger.clone()).unwrap();
    let (pages, report) = crawl_all(crawler).await;

    assert_eq!(pages.len(), 1);
    assert_eq!(report.count(HrefState::Skipped), 1);
    assert_eq!(report.count(HrefState::FetchFailed), 1);
    assert!(ledger.contains(&format!("{}/gone", base)));
    assert!(ledger.contains(&format!("{}/broken", base)));
    assert_eq!(ledger.len(), 3);
}

#[tokio::test]
async fn test_cycle_is_fetched_once_per_url() {
    let server = MockServer::start().await;

    mount_page(&server, "/a", links(&["/b", "/a", "/a#again"]), 1).await;
    mount_page(&server, "/b", links(&["/a", "/b"]), 1).await;

    let crawler = Crawler::new(test_settings(&server, "/a"), Arc::new(MemoryLedger::new())).unwrap();
    let (pages, report) = crawl_all(crawler).await;

    assert_eq!(pages.len(), 2);
    assert_eq!(report.dispatched(), 2);
}

// A slow ledger stretches the gap between a page being parsed and its
// children being dispatched. The queue holds one href, so the dispatch loop
// regularly sees no queued work while children are still pending.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_slow_discovery_does_not_end_crawl_early() {
    let server = MockServer::start().await;

    let children: Vec<String> = (0..10).map(|i| format!("/c{}", i)).collect();
    let child_refs: Vec<&str> = children.iter().map(String::as_str).collect();
    mount_page(&server, "/", links(&child_refs), 1).await;

    for child in &children {
        let leaf = format!("{}/leaf", child);
        mount_page(&server, child, links(&[&leaf]), 1).await;
        Mock::given(method("GET"))
            .and(path(leaf.as_str()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(links(&[]))
                    .set_delay(Duration::from_millis(20)),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let ledger = Arc::new(SlowLedger {
        inner: MemoryLedger::new(),
        delay: Duration::from_millis(2),
    });
    let settings = test_settings(&server, "/").with_queue_capacity(1);
    let crawler = Crawler::new(settings, ledger).unwrap();
    let (pages, report) = crawl_all(crawler).await;

    assert_eq!(pages.len(), 21);
    assert_eq!(report.dispatched(), 21);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_slow_link_extraction_does_not_end_crawl_early() {
    let server = MockServer::start().await;
    let base = server.uri();

    // Every fetch finishes long before its links are known, so at times
    // nothing is in flight and nothing is queued.
    mount_page(&server, "/", links(&["/a", "/b"]), 1).await;
    mount_page(&server, "/a", links(&["/a/x", "/a/y"]), 1).await;
    mount_page(&server, "/b", links(&["/b/x"]), 1).await;
    mount_page(&server, "/a/x", links(&["/deep"]), 1).await;
    mount_page(&server, "/a/y", links(&[]), 1).await;
    mount_page(&server, "/b/x", links(&["/deep"]), 1).await;
    mount_page(&server, "/deep", links(&[]), 1).await;

    let crawler = Crawler::new(test_settings(&server, "/"), Arc::new(MemoryLedger::new()))
        .unwrap()
        .with_extractor(Arc::new(SlowExtractor {
            delay: Duration::from_millis(30),
        }));
    let (pages, report) = crawl_all(crawler).await;

    let expected: HashSet<String> = ["/", "/a", "/b", "/a/x", "/a/y", "/b/x", "/deep"]
        .iter()
        .map(|route| format!("{}{}", base, route))
        .collect();
    assert_eq!(page_urls(&pages), expected);
    assert_eq!(report.dispatched(), 7);
}

#[tokio::test]
async fn test_deny_pattern_wins_over_allow() {
    let server = MockServer::start().await;

    mount_page(&server, "/", links(&["/public", "/private/secret"]), 1).await;
    mount_page(&server, "/public", links(&[]), 1).await;
    mount_page(&server, "/private/secret", links(&[]), 0).await;

    let settings =
        test_settings(&server, "/").with_deny_pattern(Regex::new(r"/private/").unwrap());
    let crawler = Crawler::new(settings, Arc::new(MemoryLedger::new())).unwrap();
    let (pages, report) = crawl_all(crawler).await;

    assert_eq!(pages.len(), 2);
    assert_eq!(report.count(HrefState::FilteredOut), 1);
}

#[tokio::test]
async fn test_fatal_fetch_does_not_abort_crawl() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", links(&["/broken", "/ok"]), 1).await;
    mount_page(&server, "/ok", links(&[]), 1).await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let crawler = Crawler::new(test_settings(&server, "/"), Arc::new(MemoryLedger::new())).unwrap();
    let (pages, report) = crawl_all(crawler).await;

    assert_eq!(pages.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].url, format!("{}/broken", base));
    assert_eq!(report.failures[0].state, HrefState::FetchFailed);
    assert!(report.failures[0].message.contains("500"));
}

#[tokio::test]
async fn test_unavailable_page_retries_with_backoff() {
    let server = MockServer::start().await;

    mount_page(&server, "/", links(&["/busy"]), 1).await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let sleeper = Arc::new(RecordingSleeper::default());
    let crawler = Crawler::new(test_settings(&server, "/"), Arc::new(MemoryLedger::new()))
        .unwrap()
        .with_sleeper(sleeper.clone());
    let (pages, report) = crawl_all(crawler).await;

    assert_eq!(pages.len(), 1);
    assert_eq!(report.count(HrefState::FetchFailed), 1);
    assert!(report.failures[0].message.contains("3 attempts"));
    assert_eq!(
        *sleeper.delays.lock().unwrap(),
        vec![Duration::from_millis(2), Duration::from_millis(4)]
    );
}

#[tokio::test]
async fn test_unresolvable_href_fails_the_page() {
    let server = MockServer::start().await;

    mount_page(&server, "/", links(&["/child", "http://"]), 1).await;
    mount_page(&server, "/child", links(&[]), 0).await;

    let crawler = Crawler::new(test_settings(&server, "/"), Arc::new(MemoryLedger::new())).unwrap();
    let (pages, report) = crawl_all(crawler).await;

    assert!(pages.is_empty());
    assert_eq!(report.count(HrefState::ParseFailed), 1);
    assert_eq!(report.failures[0].state, HrefState::ParseFailed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_cap_serializes_fetches() {
    let server = MockServer::start().await;

    let children: Vec<String> = (0..6).map(|i| format!("/slow{}", i)).collect();
    let child_refs: Vec<&str> = children.iter().map(String::as_str).collect();
    mount_page(&server, "/", links(&child_refs), 1).await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(links(&[]))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(6)
        .mount(&server)
        .await;

    let settings =
        test_settings(&server, "/").with_max_concurrent_fetches(ConcurrencyLimit::bounded(2));
    let crawler = Crawler::new(settings, Arc::new(MemoryLedger::new())).unwrap();

    let start = Instant::now();
    let (pages, _) = crawl_all(crawler).await;

    assert_eq!(pages.len(), 7);
    // Six 100ms fetches, two at a time
    assert!(start.elapsed() >= Duration::from_millis(300));
}

#[tokio::test]
async fn test_missing_allow_pattern_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let settings = CrawlSettings::new(format!("{}/", server.uri()));
    let result = Crawler::new(settings, Arc::new(MemoryLedger::new()));

    assert!(matches!(result, Err(HarvestError::Config(_))));
}

#[tokio::test]
async fn test_crawl_from_toml_config() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", links(&["/next"]), 1).await;
    mount_page(&server, "/next", links(&[]), 1).await;

    let toml = format!(
        r#"
[crawler]
start-url = "{base}/"
allow-pattern = '^{pattern}/'
max-concurrent-fetches = 2

[fetch]
max-attempts = 2
backoff-unit-ms = 1
request-timeout-secs = 5
"#,
        base = base,
        pattern = regex::escape(&base)
    );
    let config = parse_config(&toml).unwrap();
    let settings = CrawlSettings::from_config(&config).unwrap();

    let (tx, mut rx) = mpsc::channel::<Page>(4);
    let collector = tokio::spawn(async move {
        let mut urls = Vec::new();
        while let Some(page) = rx.recv().await {
            urls.push(page.url.to_string());
        }
        urls
    });

    let report = tokio::time::timeout(
        CRAWL_TIMEOUT,
        crawl(settings, Arc::new(MemoryLedger::new()), tx),
    )
    .await
    .expect("crawl should terminate")
    .unwrap();
    let mut urls = collector.await.unwrap();
    urls.sort();

    assert_eq!(urls, vec![format!("{}/", base), format!("{}/next", base)]);
    assert_eq!(report.pages_emitted(), 2);
}
