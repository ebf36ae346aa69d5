//! Configuration module for Href-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and turning them into the immutable [`CrawlSettings`] a crawl runs
//! with.
//!
//! # Example
//!
//! ```no_run
//! use href_harvest::config::{load_config, CrawlSettings};
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! let settings = CrawlSettings::from_config(&config).unwrap();
//! println!("Crawl starts at {}", settings.start_url);
//! ```

mod parser;
mod settings;
mod types;
mod validation;

// Re-export types
pub use settings::CrawlSettings;
pub use types::{
    Config, CrawlerConfig, FetchConfig, DEFAULT_BACKOFF_UNIT_MS, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_OUTPUT_CAPACITY, DEFAULT_QUEUE_CAPACITY, DEFAULT_REQUEST_TIMEOUT_SECS,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
