//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the fixed identifying headers
//! - GET requests gated by the concurrency limiter
//! - Retry with exponential backoff for transient failures
//! - Error classification

use crate::crawler::limiter::ConcurrencyLimiter;
use crate::crawler::retry::{RetryPolicy, Sleeper, TokioSleeper};
use crate::url::CanonicalUrl;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{redirect::Policy, Client, StatusCode};
use std::error::Error as _;
use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// User agent sent with every request
pub const USER_AGENT: &str = "PostmanRuntime/7.29.3";

/// Accept header sent with every request
pub const ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

/// Accept-Language header sent with every request
pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";

/// Upper bound on the connect phase of a request
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Redirect hops followed before giving up
const MAX_REDIRECTS: usize = 10;

/// Error text fragments that mark a transient network failure
///
/// Only consulted when no cause in the chain carries an `io::ErrorKind`.
const TRANSIENT_MARKERS: &[&str] = &[
    "timed out",
    "connection reset",
    "connection refused",
    "connection closed before message completed",
    "unexpected eof",
];

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Server answered 200; the body is fully buffered
    Success(String),

    /// Not an error; the URL is dropped without content
    Skipped(SkipReason),

    /// The fetch failed for good
    Fatal(FetchError),
}

/// Why a fetch was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// HTTP 404
    NotFound,
}

/// Permanent fetch failures
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Gave up on {url} after {attempts} attempts: {last_error}")]
    AttemptsExhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },
}

/// Outcome of a single attempt
enum Attempt {
    Done(FetchResult),
    Retry(String),
}

/// Builds the HTTP client used for every fetch
///
/// The identifying headers are fixed: [`USER_AGENT`], browser-style
/// `Accept`/`Accept-Language` values and `Connection: keep-alive`.
///
/// # Example
///
/// ```
/// use href_harvest::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(request_timeout: Duration) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static(ACCEPT_LANGUAGE),
    );
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));

    Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .timeout(request_timeout)
        .connect_timeout(CONNECT_TIMEOUT.min(request_timeout))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches single URLs with retry, backoff and classification
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 200 | Success, body buffered |
/// | HTTP 404 | Immediate → Skipped |
/// | HTTP 503 | Retry with backoff |
/// | Timeout, reset, EOF, refused | Retry with backoff |
/// | Any other status | Immediate → Fatal |
/// | Any other error | Immediate → Fatal |
/// | Attempts exhausted | Fatal |
pub struct Fetcher {
    client: Client,
    limiter: ConcurrencyLimiter,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl Fetcher {
    /// Creates a fetcher sleeping on the tokio timer between attempts
    pub fn new(client: Client, limiter: ConcurrencyLimiter, retry: RetryPolicy) -> Self {
        Self {
            client,
            limiter,
            retry,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replaces the backoff sleeper
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// The limiter gating this fetcher's attempts
    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    /// Fetches a URL, retrying transient failures
    ///
    /// Each attempt holds one limiter slot for the request and body read only;
    /// the backoff sleep happens with no slot held.
    pub async fn fetch(&self, url: &CanonicalUrl) -> FetchResult {
        let mut last_error = String::new();

        for attempt in 0..self.retry.max_attempts() {
            if attempt > 0 {
                let delay = self.retry.delay_before(attempt);
                tracing::debug!(
                    "Retrying GET {} after {:?} (attempt {}/{})",
                    url,
                    delay,
                    attempt + 1,
                    self.retry.max_attempts()
                );
                self.sleeper.sleep(delay).await;
            }

            let outcome = {
                let _slot = self.limiter.acquire().await;
                tracing::trace!("GET {}", url);
                self.attempt(url).await
            };

            match outcome {
                Attempt::Done(result) => return result,
                Attempt::Retry(reason) => {
                    tracing::debug!("Failed to GET {}: {}", url, reason);
                    last_error = reason;
                }
            }
        }

        FetchResult::Fatal(FetchError::AttemptsExhausted {
            url: url.to_string(),
            attempts: self.retry.max_attempts(),
            last_error,
        })
    }

    /// Sends one request and reads its body
    async fn attempt(&self, url: &CanonicalUrl) -> Attempt {
        let response = match self.client.get(url.as_str()).send().await {
            Ok(response) => response,
            Err(e) => return classify_error(url, e),
        };

        match response.status() {
            StatusCode::OK => match response.text().await {
                Ok(body) => Attempt::Done(FetchResult::Success(body)),
                Err(e) => classify_error(url, e),
            },
            StatusCode::SERVICE_UNAVAILABLE => Attempt::Retry("HTTP 503".to_string()),
            StatusCode::NOT_FOUND => Attempt::Done(FetchResult::Skipped(SkipReason::NotFound)),
            status => Attempt::Done(FetchResult::Fatal(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            })),
        }
    }
}

/// Maps a client error to a retry or a fatal result
fn classify_error(url: &CanonicalUrl, error: reqwest::Error) -> Attempt {
    if is_transient(&error) {
        Attempt::Retry(error_chain(&error))
    } else {
        Attempt::Done(FetchResult::Fatal(FetchError::Request {
            url: url.to_string(),
            source: error,
        }))
    }
}

/// Returns true for timeouts, resets, EOFs and refused connections
///
/// Other connect-phase failures (DNS lookup, TLS handshake) are permanent.
fn is_transient(error: &reqwest::Error) -> bool {
    if error.is_timeout() {
        return true;
    }

    let mut source = error.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::ConnectionRefused
                    | ErrorKind::UnexpectedEof
                    | ErrorKind::BrokenPipe
                    | ErrorKind::TimedOut
            ) {
                return true;
            }
        }
        source = cause.source();
    }

    let text = error_chain(error).to_lowercase();
    TRANSIENT_MARKERS.iter().any(|marker| text.contains(marker))
}

/// Renders an error and all of its causes on one line
fn error_chain(error: &reqwest::Error) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
