use serde::Deserialize;

/// Default number of fetch attempts per URL, counting the first
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Default backoff time unit in milliseconds
pub const DEFAULT_BACKOFF_UNIT_MS: u64 = 1000;

/// Default per-request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default capacity of the href and parse queues
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Default capacity of the page output channel
pub const DEFAULT_OUTPUT_CAPACITY: usize = 64;

/// Main configuration structure for Href-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// Crawl admission and scheduling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// URL the crawl starts from
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Regex a canonical URL must match to be fetched
    #[serde(rename = "allow-pattern", default)]
    pub allow_pattern: Option<String>,

    /// Regex that rejects a canonical URL even if it is allowed
    #[serde(rename = "deny-pattern", default)]
    pub deny_pattern: Option<String>,

    /// Maximum number of simultaneous outbound fetches (absent = unbounded)
    #[serde(rename = "max-concurrent-fetches", default)]
    pub max_concurrent_fetches: Option<u32>,

    /// Capacity of the internal href and parse queues
    #[serde(rename = "queue-capacity", default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Capacity of the page output channel
    #[serde(rename = "output-capacity", default = "default_output_capacity")]
    pub output_capacity: usize,
}

/// HTTP fetch and retry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Attempts per URL, counting the first
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff time unit; the delay before attempt k is unit * 2^k
    #[serde(rename = "backoff-unit-ms", default = "default_backoff_unit_ms")]
    pub backoff_unit_ms: u64,

    /// Timeout for a single request, including the body read
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_unit_ms: DEFAULT_BACKOFF_UNIT_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_output_capacity() -> usize {
    DEFAULT_OUTPUT_CAPACITY
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_backoff_unit_ms() -> u64 {
    DEFAULT_BACKOFF_UNIT_MS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}
