//! Polite Crawler main entry point
//!
//! This is the command-line interface for the polite crawler.

use clap::Parser;
use polite_crawler::config::{load_config_with_hash, Config};
use polite_crawler::crawler::{crawl, StopSignal};
use polite_crawler::storage::{open_storage, Storage};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Polite Crawler: a robots.txt-respecting web crawler
///
/// Pulls URLs from a durable frontier, honors each host's robots.txt, waits a
/// randomized delay before every request, and stores page titles,
/// descriptions and newly discovered links.
#[derive(Parser, Debug)]
#[command(name = "polite-crawler")]
#[command(version = "1.0.0")]
#[command(about = "A polite, robots.txt-respecting web crawler", long_about = None)]
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

    /// Extra seed URL to add to the frontier (repeatable)
    #[arg(long = "seed", value_name = "URL")]
    seeds: Vec<String>,

    /// Stop after processing this many frontier items
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    max_pages: Option<u64>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let mut config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    config.seeds.extend(cli.seeds);
    if cli.max_pages.is_some() {
        config.crawler.max_pages = cli.max_pages;
    }

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config).await?;
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
            0 => EnvFilter::new("polite_crawler=info,warn"),
            1 => EnvFilter::new("polite_crawler=debug,info"),
            2 => EnvFilter::new("polite_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Polite Crawler Dry Run ===\n");

    println!("Crawler Configuration:");
    println!(
        "  Delay range: {}s (inclusive) to {}s (exclusive)",
        config.crawler.min_crawl_delay, config.crawler.max_crawl_delay
    );
    println!("  Batch size: {}", config.crawler.batch_size);
    println!(
        "  Robots crawl-delay cap: {}s",
        config.crawler.max_robots_crawl_delay
    );
    match config.crawler.max_pages {
        Some(max) => println!("  Page budget: {}", max),
        None => println!("  Page budget: until the frontier is empty"),
    }

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.user_agent_string());

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);
    println!("  Page table: {}", config.storage.page_table);
    println!("  Pending table: {}", config.storage.pending_table);

    println!("\nSeeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.storage.database_path);

    let storage = open_storage(&config.storage)?;

    println!("Crawled pages: {}", storage.count_crawled_pages()?);
    println!("Pending URLs:  {}", storage.count_pending_urls()?);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let stop = StopSignal::new();

    let on_interrupt = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current page");
            on_interrupt.stop();
        }
    });

    tracing::info!(
        "Seed URLs: {}, user agent: {}",
        config.seeds.len(),
        config.user_agent.user_agent_string()
    );

    // Run the crawler
    match crawl(&config, stop).await {
        Ok(stats) => {
            tracing::info!(
                "Crawl completed successfully: {} pages crawled, {} links queued",
                stats.crawled,
                stats.links_queued
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
