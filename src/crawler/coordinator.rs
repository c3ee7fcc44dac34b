//! Crawl orchestrator - main crawl loop
//!
//! This module contains the loop that ties every other part together:
//! - Popping batches of URLs from the storage frontier
//! - Checking each URL against its host's robots.txt policy
//! - Waiting out the politeness delay and fetching the page
//! - Classifying outbound links and filtering same-host ones
//! - Writing the page record and new frontier entries back to storage
//!
//! A failure on one URL never stops the loop. Only a failure to read the
//! frontier leaves [`CrawlOrchestrator::run`] with an error.

use crate::config::Config;
use crate::crawler::classifier::{build_page_info, LinkKind};
use crate::crawler::fetcher::{HttpFetcher, PageSource};
use crate::crawler::scheduler::{PoliteScheduler, TokioSleeper};
use crate::crawler::stage::CrawlStage;
use crate::robots::{is_allowed, PolicyCache};
use crate::storage::Storage;
use crate::url::{extract_authority, parse_crawl_url};
use crate::CrawlerError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Cooperative stop flag, checked between frontier items
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the crawl to stop before its next item
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Counters for one crawl run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Frontier items taken through the state machine
    pub processed: u64,
    /// Pages fetched and persisted
    pub crawled: u64,
    /// Items disallowed by robots.txt or not crawlable URLs
    pub skipped: u64,
    /// Items whose fetch or parse failed
    pub failed: u64,
    /// New frontier entries written
    pub links_queued: u64,
    /// Storage writes that failed and were dropped
    pub storage_errors: u64,
}

impl CrawlStats {
    fn record(&mut self, stage: CrawlStage) {
        self.processed += 1;
        match stage {
            CrawlStage::Done => self.crawled += 1,
            CrawlStage::Skipped => self.skipped += 1,
            CrawlStage::Failed => self.failed += 1,
            other => tracing::error!("Item finished in non-terminal stage {}", other),
        }
    }
}

/// Main crawl orchestrator
///
/// Processes one frontier item at a time: policy check, politeness wait,
/// fetch, classification, persistence. The loop ends when the frontier is
/// empty, the page budget is spent, or the [`StopSignal`] fires.
pub struct CrawlOrchestrator<S: Storage> {
    storage: S,
    policies: Arc<PolicyCache>,
    pages: Arc<dyn PageSource>,
    scheduler: PoliteScheduler,
    batch_size: usize,
    max_pages: Option<u64>,
    stop: StopSignal,
}

impl<S: Storage> CrawlOrchestrator<S> {
    /// Creates an orchestrator from its collaborators
    ///
    /// # Arguments
    ///
    /// * `storage` - Frontier and page table
    /// * `policies` - Per-host robots.txt cache
    /// * `pages` - Fetches and parses pages
    /// * `scheduler` - Politeness delays
    /// * `batch_size` - URLs popped from the frontier at a time (at least 1)
    /// * `max_pages` - Optional budget of frontier items to process
    pub fn new(
        storage: S,
        policies: Arc<PolicyCache>,
        pages: Arc<dyn PageSource>,
        scheduler: PoliteScheduler,
        batch_size: usize,
        max_pages: Option<u64>,
    ) -> Self {
        Self {
            storage,
            policies,
            pages,
            scheduler,
            batch_size: batch_size.max(1),
            max_pages,
            stop: StopSignal::new(),
        }
    }

    /// Wires up the HTTP fetcher, policy cache and scheduler from `config`
    pub fn from_config(config: &Config, storage: S) -> Result<Self, CrawlerError> {
        let fetcher = Arc::new(HttpFetcher::new(&config.user_agent)?);
        let policies = Arc::new(PolicyCache::new(fetcher.clone()));
        let scheduler = PoliteScheduler::new(&config.crawler, Arc::new(TokioSleeper));

        Ok(Self::new(
            storage,
            policies,
            fetcher,
            scheduler,
            config.crawler.batch_size as usize,
            config.crawler.max_pages,
        ))
    }

    /// Uses an externally owned stop signal
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// Overrides the page budget
    pub fn with_max_pages(mut self, max_pages: Option<u64>) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn scheduler(&self) -> &PoliteScheduler {
        &self.scheduler
    }

    /// Validates seed URLs and inserts them into the frontier
    ///
    /// Invalid seeds are logged and left out.
    ///
    /// # Returns
    ///
    /// The number of seeds that were new to the frontier
    pub fn seed(&mut self, seeds: &[String]) -> Result<usize, CrawlerError> {
        let mut valid = Vec::with_capacity(seeds.len());
        for raw in seeds {
            match parse_crawl_url(raw) {
                Ok(url) => valid.push(url.to_string()),
                Err(e) => tracing::warn!("Ignoring seed {}: {}", raw, e),
            }
        }

        let added = self.storage.try_add_pending_urls(&valid)?;
        tracing::info!("Seeded frontier with {} of {} URLs", added, seeds.len());
        Ok(added)
    }

    /// Runs the main crawl loop
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlStats)` - The loop finished normally or was stopped
    /// * `Err(CrawlerError)` - The frontier could not be read
    pub async fn run(&mut self) -> Result<CrawlStats, CrawlerError> {
        let mut stats = CrawlStats::default();
        let start_time = Instant::now();

        tracing::info!(
            "Starting crawl (batch size {}, budget {:?})",
            self.batch_size,
            self.max_pages
        );

        'crawl: loop {
            if self.stop.is_stopped() {
                tracing::info!("Stop requested, ending crawl");
                break;
            }

            let wanted = match self.max_pages {
                Some(max) if stats.processed >= max => {
                    tracing::info!("Page budget of {} reached", max);
                    break;
                }
                Some(max) => self.batch_size.min((max - stats.processed) as usize),
                None => self.batch_size,
            };

            let batch = self.storage.get_uncrawled_urls(wanted)?;
            if batch.is_empty() {
                tracing::info!("Frontier is empty, crawl complete");
                break;
            }
            tracing::debug!("Popped {} URLs from the frontier", batch.len());

            let mut items = batch.into_iter();
            while let Some(raw) = items.next() {
                if self.stop.is_stopped() {
                    let unprocessed: Vec<String> = std::iter::once(raw).chain(items).collect();
                    self.requeue(&unprocessed, &mut stats);
                    tracing::info!("Stop requested, ending crawl");
                    break 'crawl;
                }

                let stage = self.process_url(&raw, &mut stats).await;
                stats.record(stage);

                if stats.processed % 10 == 0 {
                    tracing::info!(
                        "Progress: {} processed ({} crawled, {} skipped, {} failed) in {:?}",
                        stats.processed,
                        stats.crawled,
                        stats.skipped,
                        stats.failed,
                        start_time.elapsed()
                    );
                }
            }
        }

        tracing::info!(
            "Crawl finished in {:?}: {} processed, {} crawled, {} skipped, {} failed, {} links queued, {} storage errors",
            start_time.elapsed(),
            stats.processed,
            stats.crawled,
            stats.skipped,
            stats.failed,
            stats.links_queued,
            stats.storage_errors
        );

        Ok(stats)
    }

    /// Takes one frontier item through every stage
    ///
    /// Returns the terminal stage the item ended in.
    async fn process_url(&mut self, raw: &str, stats: &mut CrawlStats) -> CrawlStage {
        let mut stage = CrawlStage::Pending;
        stage.advance(CrawlStage::PolicyChecking, raw);

        let url = match parse_crawl_url(raw) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Skipping uncrawlable frontier entry {}: {}", raw, e);
                stage.advance(CrawlStage::Skipped, raw);
                return stage;
            }
        };
        let host = extract_authority(&url).unwrap_or_default();

        let policy = self.policies.get_policy(&url).await;
        if !is_allowed(&policy, &url) {
            tracing::info!("Skipping {}: disallowed by robots.txt for {}", url, host);
            stage.advance(CrawlStage::Skipped, raw);
            return stage;
        }

        stage.advance(CrawlStage::Fetching, raw);
        self.scheduler
            .wait_for_host(&host, policy.crawl_delay())
            .await;

        let page = match self.pages.fetch_and_extract(&url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}", url, e);
                stage.advance(CrawlStage::Failed, raw);
                return stage;
            }
        };
        tracing::info!("Fetched {} ({} links)", url, page.links.len());

        stage.advance(CrawlStage::Parsing, raw);
        if page.description.is_none() {
            tracing::debug!("No description on {}", url);
        }

        stage.advance(CrawlStage::Classifying, raw);
        let info = build_page_info(&url, page, &policy);
        tracing::debug!(
            "{}: {} same-host links kept, {} external links",
            url,
            info.count(LinkKind::SameHost),
            info.count(LinkKind::ExternalHost)
        );

        stage.advance(CrawlStage::Persisting, raw);
        match self.storage.add_or_update_crawled_page(&info.to_page_record()) {
            Ok(()) => tracing::debug!("Stored page record for {}", url),
            Err(e) => {
                tracing::error!("Failed to store page record for {}: {}", url, e);
                stats.storage_errors += 1;
            }
        }

        let discovered = info.frontier_urls();
        match self.storage.try_add_pending_urls(&discovered) {
            Ok(added) => {
                tracing::debug!(
                    "Queued {} of {} links from {}",
                    added,
                    discovered.len(),
                    url
                );
                stats.links_queued += added as u64;
            }
            Err(e) => {
                tracing::error!("Failed to queue links from {}: {}", url, e);
                stats.storage_errors += 1;
            }
        }

        stage.advance(CrawlStage::Done, raw);
        stage
    }

    /// Puts popped but unprocessed URLs back into the frontier
    fn requeue(&mut self, urls: &[String], stats: &mut CrawlStats) {
        match self.storage.try_add_pending_urls(urls) {
            Ok(added) => tracing::info!("Returned {} unprocessed URLs to the frontier", added),
            Err(e) => {
                tracing::error!("Failed to return {} URLs to the frontier: {}", urls.len(), e);
                stats.storage_errors += 1;
            }
        }
    }
}
