use crate::config::types::{Config, CrawlerConfig, FetchConfig};
use crate::url::normalize_seed;
use crate::{ConfigError, ConfigResult};
use regex::Regex;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_crawler_config(&config.crawler)?;
    validate_fetch_config(&config.fetch)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> ConfigResult<()> {
    validate_start_url(&config.start_url)?;

    match &config.allow_pattern {
        Some(pattern) => {
            compile_pattern("allow-pattern", pattern)?;
        }
        None => {
            return Err(ConfigError::Validation(
                "allow-pattern is required; without it every href is rejected".to_string(),
            ));
        }
    }

    if let Some(pattern) = &config.deny_pattern {
        compile_pattern("deny-pattern", pattern)?;
    }

    if config.max_concurrent_fetches == Some(0) {
        return Err(ConfigError::Validation(
            "max-concurrent-fetches must be >= 1 (omit it for unbounded)".to_string(),
        ));
    }

    if config.queue_capacity < 1 {
        return Err(ConfigError::Validation(format!(
            "queue-capacity must be >= 1, got {}",
            config.queue_capacity
        )));
    }

    if config.output_capacity < 1 {
        return Err(ConfigError::Validation(format!(
            "output-capacity must be >= 1, got {}",
            config.output_capacity
        )));
    }

    Ok(())
}

/// Validates fetch configuration
fn validate_fetch_config(config: &FetchConfig) -> ConfigResult<()> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request-timeout-secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    Ok(())
}

/// Validates that the start URL normalizes to a fetchable URL
pub(crate) fn validate_start_url(start_url: &str) -> ConfigResult<()> {
    if start_url.trim().is_empty() {
        return Err(ConfigError::Validation(
            "start-url cannot be empty".to_string(),
        ));
    }

    normalize_seed(start_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid start-url '{}': {}", start_url, e)))?;

    Ok(())
}

/// Compiles a configured pattern, naming the key in the error
pub(crate) fn compile_pattern(key: &str, pattern: &str) -> ConfigResult<Regex> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(format!("{} cannot be empty", key)));
    }

    Regex::new(pattern)
        .map_err(|e| ConfigError::InvalidPattern(format!("{} '{}': {}", key, pattern, e)))
}
