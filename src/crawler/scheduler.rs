//! Politeness scheduler for per-host request pacing
//!
//! This module handles:
//! - Drawing a random delay from the configured `[min, max)` second range
//! - Raising that delay to a host's robots.txt crawl-delay when one is set
//! - Suspending the crawl for the delay before each page request
//! - Counting requests per host for the end-of-run audit trail
//!
//! The delay computation is a pure function of the range and a random source;
//! the suspension goes through the [`Sleeper`] trait so tests can record
//! delays instead of waiting them out.

use crate::config::CrawlerConfig;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Computes a politeness delay
///
/// The result is a whole number of seconds drawn uniformly from `min..max`
/// (`min` inclusive, `max` exclusive). When `max <= min` the range is empty and
/// `min` is used as a fixed delay.
///
/// # Example
///
/// ```
/// use polite_crawler::crawler::compute_delay;
/// use rand::SeedableRng;
/// use std::time::Duration;
///
/// let mut rng = rand::rngs::StdRng::seed_from_u64(7);
/// let delay = compute_delay(2, 5, &mut rng);
/// assert!(delay >= Duration::from_secs(2) && delay < Duration::from_secs(5));
/// ```
pub fn compute_delay<R: Rng + ?Sized>(min_secs: u64, max_secs: u64, rng: &mut R) -> Duration {
    if max_secs <= min_secs {
        return Duration::from_secs(min_secs);
    }
    Duration::from_secs(rng.gen_range(min_secs..max_secs))
}

/// Applies a host's robots.txt crawl-delay on top of a random delay
///
/// The hint can only lengthen the wait, and never past `cap_secs`.
pub fn effective_delay(random: Duration, crawl_delay: Option<u32>, cap_secs: u64) -> Duration {
    match crawl_delay {
        Some(secs) => random.max(Duration::from_secs(u64::from(secs).min(cap_secs))),
        None => random,
    }
}

/// Suspends the caller for a politeness delay
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Paces requests so no host sees them back to back
///
/// One random source, seeded once per scheduler, is shared by every host.
pub struct PoliteScheduler {
    min_delay: u64,
    max_delay: u64,
    max_hint: u64,
    rng: Mutex<StdRng>,
    sleeper: Arc<dyn Sleeper>,
    requests: Mutex<HashMap<String, u32>>,
}

impl PoliteScheduler {
    /// Creates a scheduler seeded from the current time
    ///
    /// # Arguments
    ///
    /// * `config` - Supplies the delay range
    /// * `sleeper` - Performs the actual suspension
    pub fn new(config: &CrawlerConfig, sleeper: Arc<dyn Sleeper>) -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        Self::with_seed(config, sleeper, seed)
    }

    /// Creates a scheduler with a fixed seed, for reproducible delays
    pub fn with_seed(config: &CrawlerConfig, sleeper: Arc<dyn Sleeper>, seed: u64) -> Self {
        Self {
            min_delay: config.min_crawl_delay,
            max_delay: config.max_crawl_delay,
            max_hint: config.max_robots_crawl_delay,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            sleeper,
            requests: Mutex::new(HashMap::new()),
        }
    }

    /// Draws the next delay without waiting
    pub fn next_delay(&self, crawl_delay: Option<u32>) -> Duration {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let random = compute_delay(self.min_delay, self.max_delay, &mut *rng);
        if let Some(secs) = crawl_delay.filter(|secs| u64::from(*secs) > self.max_hint) {
            tracing::warn!("Robots crawl-delay {}s capped at {}s", secs, self.max_hint);
        }
        effective_delay(random, crawl_delay, self.max_hint)
    }

    /// Waits out the politeness delay before a request to `host`
    ///
    /// # Arguments
    ///
    /// * `host` - The host authority about to be requested
    /// * `crawl_delay` - The host's robots.txt crawl-delay, if any
    ///
    /// # Returns
    ///
    /// The delay that was applied
    pub async fn wait_for_host(&self, host: &str, crawl_delay: Option<u32>) -> Duration {
        let delay = self.next_delay(crawl_delay);
        let count = self.record_request(host);

        tracing::info!(
            "Waiting {:?} before request #{} to {}",
            delay,
            count,
            host
        );
        self.sleeper.sleep(delay).await;

        delay
    }

    /// Number of requests scheduled for `host` so far
    pub fn request_count(&self, host: &str) -> u32 {
        self.requests
            .lock()
            .map(|requests| requests.get(host).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Per-host request counts
    pub fn request_counts(&self) -> HashMap<String, u32> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    fn record_request(&self, host: &str) -> u32 {
        let Ok(mut requests) = self.requests.lock() else {
            return 0;
        };
        let count = requests.entry(host.to_string()).or_insert(0);
        *count += 1;
        *count
    }
}
