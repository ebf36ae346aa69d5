//! Href-Harvest main entry point
//!
//! This is the command-line interface for the Href-Harvest crawler.

use anyhow::Context;
use clap::Parser;
use href_harvest::config::{load_config_with_hash, Config, CrawlSettings};
use href_harvest::crawler::{ConcurrencyLimit, Crawler};
use href_harvest::output::print_report;
use href_harvest::url::MemoryLedger;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Href-Harvest: a concurrent link-following crawler
///
/// Href-Harvest fetches a seed page, follows every link admitted by the
/// allow/deny patterns, and prints each fetched page as it arrives.
#[derive(Parser, Debug)]
#[command(name = "href-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A concurrent link-following crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the effective settings without crawling
    #[arg(long, conflicts_with = "summary")]
    dry_run: bool,

    /// Print crawl statistics after the crawl
    #[arg(long)]
    summary: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let settings = CrawlSettings::from_config(&config)?;

    if cli.dry_run {
        handle_dry_run(&config, &settings)?;
    } else {
        handle_crawl(settings, cli.summary).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("href_harvest=info,warn"),
            1 => EnvFilter::new("href_harvest=debug,info"),
            2 => EnvFilter::new("href_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr; stdout carries the page lines
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates settings and shows what would be crawled
fn handle_dry_run(config: &Config, settings: &CrawlSettings) -> anyhow::Result<()> {
    println!("=== Href-Harvest Dry Run ===\n");

    let seed = settings.seed_url()?;

    println!("Crawler Configuration:");
    println!("  Start URL: {}", config.crawler.start_url);
    println!("  Normalized seed: {}", seed);
    println!(
        "  Allow pattern: {}",
        config.crawler.allow_pattern.as_deref().unwrap_or("(none)")
    );
    println!(
        "  Deny pattern: {}",
        config.crawler.deny_pattern.as_deref().unwrap_or("(none)")
    );
    match settings.max_concurrent_fetches {
        ConcurrencyLimit::Bounded(n) => println!("  Max concurrent fetches: {}", n),
        ConcurrencyLimit::Unbounded => println!("  Max concurrent fetches: unbounded"),
    }
    println!("  Queue capacity: {}", settings.queue_capacity);
    println!("  Output capacity: {}", settings.output_capacity);

    println!("\nFetch:");
    println!("  Max attempts: {}", settings.retry.max_attempts());
    println!("  Backoff unit: {:?}", settings.retry.backoff_unit());
    println!("  Request timeout: {:?}", settings.request_timeout);

    println!("\n✓ Configuration is valid");
    if settings.filter().is_allowed(&seed) {
        println!("✓ Would start crawling at {}", seed);
    } else {
        println!("✗ Seed {} is rejected by the allow/deny patterns", seed);
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(settings: CrawlSettings, summary: bool) -> anyhow::Result<()> {
    let ledger = Arc::new(MemoryLedger::new());
    let crawler = Crawler::new(settings, ledger)?;
    tracing::info!("Crawling from {}", crawler.seed());

    let mut handle = crawler.spawn();
    while let Some(page) = handle.next_page().await {
        println!("{}\t{}", page.url, page.content.len());
    }

    let report = handle.finish().await.context("Crawl task failed")?;
    tracing::info!(
        "Crawl completed: {} pages in {:?}",
        report.pages_emitted(),
        report.elapsed
    );

    if summary {
        println!();
        print_report(&report);
    }

    Ok(())
}
