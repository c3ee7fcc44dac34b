//! Per-host robots.txt policy cache
//!
//! Most links on a page point back to the same host, so each host's robots.txt
//! is fetched and parsed once and then served from memory for the rest of the
//! process. Entries never expire.

use crate::robots::parser::{parse_policy, CrawlPolicy};
use crate::url::{extract_authority, robots_url};
use crate::CrawlerError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use url::Url;

/// Source of raw robots.txt documents
///
/// Implementations return the body of a 2xx response; any other status or a
/// transport failure is an error.
#[async_trait]
pub trait RobotsSource: Send + Sync {
    /// Fetches the robots.txt document at `robots_url`
    async fn fetch_robots(&self, robots_url: &Url) -> Result<String, CrawlerError>;
}

/// Memoizes one [`CrawlPolicy`] per host authority
///
/// The first lookup for a host fetches and parses its robots.txt; concurrent
/// first lookups for the same host wait on a single fetch. Fetch and parse
/// failures resolve to [`CrawlPolicy::disallow_all`].
pub struct PolicyCache {
    source: Arc<dyn RobotsSource>,
    entries: Mutex<HashMap<String, Arc<OnceCell<Arc<CrawlPolicy>>>>>,
}

impl PolicyCache {
    /// Creates an empty cache backed by `source`
    pub fn new(source: Arc<dyn RobotsSource>) -> Self {
        Self {
            source,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the policy for the host serving `url`
    ///
    /// The cache key is the lowercase host authority (host plus explicit port).
    /// A URL without a host gets the fail-closed policy and is not cached.
    pub async fn get_policy(&self, url: &Url) -> Arc<CrawlPolicy> {
        let Some(host) = extract_authority(url) else {
            tracing::warn!("No host in {}, treating as disallowed", url);
            return Arc::new(CrawlPolicy::disallow_all());
        };

        let cell = {
            let mut entries = self.entries.lock().await;
            entries
                .entry(host.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        if let Some(policy) = cell.get() {
            tracing::debug!("Host {} served from the robots.txt cache", host);
            return policy.clone();
        }

        cell.get_or_init(|| async {
            tracing::info!("Host {} is unknown, fetching robots.txt", host);
            Arc::new(self.load_policy(url, &host).await)
        })
        .await
        .clone()
    }

    /// Returns true if a policy for `host` has already been loaded
    pub async fn contains(&self, host: &str) -> bool {
        let entries = self.entries.lock().await;
        entries
            .get(host)
            .map(|cell| cell.initialized())
            .unwrap_or(false)
    }

    /// Number of hosts with a loaded policy
    pub async fn len(&self) -> usize {
        let entries = self.entries.lock().await;
        entries.values().filter(|cell| cell.initialized()).count()
    }

    /// Returns true if no policy has been loaded yet
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn load_policy(&self, url: &Url, host: &str) -> CrawlPolicy {
        let location = match robots_url(url) {
            Ok(location) => location,
            Err(e) => {
                tracing::warn!("Cannot build robots.txt URL for {}: {}", host, e);
                return CrawlPolicy::disallow_all();
            }
        };

        let content = match self.source.fetch_robots(&location).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(
                    "Failed to fetch {}: {}; disallowing all of {}",
                    location,
                    e,
                    host
                );
                return CrawlPolicy::disallow_all();
            }
        };

        match parse_policy(&content) {
            Ok(policy) => {
                tracing::info!(
                    "Parsed robots.txt for {}: {} disallow, {} allow, crawl-delay {:?}",
                    host,
                    policy.disallow_patterns().count(),
                    policy.allow_patterns().count(),
                    policy.crawl_delay()
                );
                policy
            }
            Err(e) => {
                tracing::warn!(
                    "Malformed robots.txt for {}: {}; disallowing all",
                    host,
                    e
                );
                CrawlPolicy::disallow_all()
            }
        }
    }
}
