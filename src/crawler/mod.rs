//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching of pages and robots.txt documents
//! - HTML parsing and link extraction
//! - Same-host / external link classification
//! - Randomized per-host politeness delays
//! - Overall crawl orchestration

mod classifier;
mod coordinator;
mod fetcher;
mod parser;
mod scheduler;
mod stage;

pub use classifier::{
    build_page_info, classify_links, ClassifiedLinks, LinkKind, OutboundLink, PageInfo,
};
pub use coordinator::{CrawlOrchestrator, CrawlStats, StopSignal};
pub use fetcher::{build_http_client, is_html_content_type, HttpFetcher, PageSource};
pub use parser::{parse_html, ParsedPage};
pub use scheduler::{compute_delay, effective_delay, PoliteScheduler, Sleeper, TokioSleeper};
pub use stage::CrawlStage;

use crate::config::Config;
use crate::storage::open_storage;
use crate::CrawlerError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open storage and create the schema if needed
/// 2. Insert the configured seeds into the frontier
/// 3. Run the orchestrator until the frontier is empty, the budget is spent,
///    or `stop` fires
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `stop` - Signal checked between frontier items
///
/// # Returns
///
/// * `Ok(CrawlStats)` - Crawl finished
/// * `Err(CrawlerError)` - Setup failed or the frontier could not be read
pub async fn crawl(config: &Config, stop: StopSignal) -> Result<CrawlStats, CrawlerError> {
    let storage = open_storage(&config.storage)?;
    let mut orchestrator = CrawlOrchestrator::from_config(config, storage)?.with_stop_signal(stop);

    orchestrator.seed(&config.seeds)?;
    orchestrator.run().await
}
