use serde::Deserialize;

/// Main configuration structure for the crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// URLs inserted into the frontier when a crawl starts
    #[serde(default)]
    pub seeds: Vec<String>,
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Lower bound of the politeness delay in seconds (inclusive)
    #[serde(rename = "min-crawl-delay")]
    pub min_crawl_delay: u64,

    /// Upper bound of the politeness delay in seconds (exclusive)
    #[serde(rename = "max-crawl-delay")]
    pub max_crawl_delay: u64,

    /// Number of URLs popped from the frontier per batch
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: u32,

    /// Maximum number of frontier items to process before stopping
    #[serde(rename = "max-pages", default)]
    pub max_pages: Option<u64>,

    /// Longest robots.txt crawl-delay honored, in seconds; larger hints are capped
    #[serde(
        rename = "max-robots-crawl-delay",
        default = "default_max_robots_crawl_delay"
    )]
    pub max_robots_crawl_delay: u64,
}

fn default_batch_size() -> u32 {
    1
}

fn default_max_robots_crawl_delay() -> u64 {
    60
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Renders the identifying agent string sent with every request
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn user_agent_string(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Table holding crawled page records
    #[serde(rename = "page-table", default = "default_page_table")]
    pub page_table: String,

    /// Table holding the pending-URL frontier
    #[serde(rename = "pending-table", default = "default_pending_table")]
    pub pending_table: String,
}

fn default_page_table() -> String {
    "crawled_pages".to_string()
}

fn default_pending_table() -> String {
    "pending_urls".to_string()
}
