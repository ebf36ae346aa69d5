use crate::config::types::{
    Config, DEFAULT_OUTPUT_CAPACITY, DEFAULT_QUEUE_CAPACITY, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use crate::config::validation::{compile_pattern, validate, validate_start_url};
use crate::crawler::{ConcurrencyLimit, RetryPolicy};
use crate::url::{normalize_seed, CanonicalUrl, HrefFilter};
use crate::{ConfigError, ConfigResult};
use regex::Regex;
use std::time::Duration;

/// Immutable settings for a single crawl run
///
/// Built either from a loaded [`Config`] or directly in code. Nothing here
/// changes once the crawler has been constructed.
///
/// # Example
///
/// ```
/// use href_harvest::config::CrawlSettings;
/// use href_harvest::crawler::ConcurrencyLimit;
/// use regex::Regex;
///
/// let settings = CrawlSettings::new("https://example.com/")
///     .with_allow_pattern(Regex::new(r"^https://example\.com/").unwrap())
///     .with_max_concurrent_fetches(ConcurrencyLimit::bounded(4));
///
/// assert!(settings.seed_url().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Seed href, normalized at construction of the crawler
    pub start_url: String,

    /// Canonical URLs must match this to be fetched
    pub allow_pattern: Option<Regex>,

    /// Canonical URLs matching this are never fetched
    pub deny_pattern: Option<Regex>,

    /// Cap on simultaneous outbound fetch attempts
    pub max_concurrent_fetches: ConcurrencyLimit,

    /// Attempt cap and backoff unit
    pub retry: RetryPolicy,

    /// Timeout for one request including its body
    pub request_timeout: Duration,

    /// Capacity of the href and parse queues
    pub queue_capacity: usize,

    /// Capacity of the page output channel
    pub output_capacity: usize,
}

impl CrawlSettings {
    /// Creates settings with defaults and no allow pattern
    ///
    /// An allow pattern must be added before the crawler will accept the
    /// settings.
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            start_url: start_url.into(),
            allow_pattern: None,
            deny_pattern: None,
            max_concurrent_fetches: ConcurrencyLimit::Unbounded,
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            output_capacity: DEFAULT_OUTPUT_CAPACITY,
        }
    }

    pub fn with_allow_pattern(mut self, pattern: Regex) -> Self {
        self.allow_pattern = Some(pattern);
        self
    }

    pub fn with_deny_pattern(mut self, pattern: Regex) -> Self {
        self.deny_pattern = Some(pattern);
        self
    }

    pub fn with_max_concurrent_fetches(mut self, limit: ConcurrencyLimit) -> Self {
        self.max_concurrent_fetches = limit;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_output_capacity(mut self, capacity: usize) -> Self {
        self.output_capacity = capacity;
        self
    }

    /// Builds settings from a configuration file, compiling its patterns
    pub fn from_config(config: &Config) -> ConfigResult<Self> {
        validate(config)?;

        let crawler = &config.crawler;
        let allow_pattern = crawler
            .allow_pattern
            .as_deref()
            .map(|p| compile_pattern("allow-pattern", p))
            .transpose()?;
        let deny_pattern = crawler
            .deny_pattern
            .as_deref()
            .map(|p| compile_pattern("deny-pattern", p))
            .transpose()?;
        let max_concurrent_fetches = match crawler.max_concurrent_fetches {
            Some(n) => ConcurrencyLimit::bounded(n as usize),
            None => ConcurrencyLimit::Unbounded,
        };

        Ok(Self {
            start_url: crawler.start_url.clone(),
            allow_pattern,
            deny_pattern,
            max_concurrent_fetches,
            retry: RetryPolicy::new(
                config.fetch.max_attempts,
                Duration::from_millis(config.fetch.backoff_unit_ms),
            ),
            request_timeout: Duration::from_secs(config.fetch.request_timeout_secs),
            queue_capacity: crawler.queue_capacity,
            output_capacity: crawler.output_capacity,
        })
    }

    /// Checks everything a crawl needs before it starts
    ///
    /// A missing allow pattern is an error: it would silently reject every
    /// href, including the seed.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_start_url(&self.start_url)?;

        if self.allow_pattern.is_none() {
            return Err(ConfigError::Validation(
                "an allow pattern is required; without it every href is rejected".to_string(),
            ));
        }

        if let ConcurrencyLimit::Bounded(0) = self.max_concurrent_fetches {
            return Err(ConfigError::Validation(
                "max concurrent fetches must be >= 1".to_string(),
            ));
        }

        if self.queue_capacity < 1 || self.output_capacity < 1 {
            return Err(ConfigError::Validation(
                "queue and output capacities must be >= 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Normalizes the start URL
    pub fn seed_url(&self) -> ConfigResult<CanonicalUrl> {
        normalize_seed(&self.start_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid start URL '{}': {}", self.start_url, e))
        })
    }

    /// Builds the admission filter for these settings
    pub fn filter(&self) -> HrefFilter {
        HrefFilter::new(self.allow_pattern.clone(), self.deny_pattern.clone())
    }
}
