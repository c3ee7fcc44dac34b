//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::PageRecord;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    #[error("Invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// A backend holds two tables: crawled page records keyed by URL, and the
/// frontier of URLs pending a crawl. Each individual call is atomic; nothing
/// spans calls.
pub trait Storage {
    // ===== Schema =====

    /// Creates the page and pending tables if they do not exist yet
    ///
    /// Calling this repeatedly is harmless.
    fn try_create_schema(&mut self) -> StorageResult<()>;

    // ===== Frontier Management =====

    /// Removes and returns up to `count` pending URLs
    ///
    /// A URL returned here is gone from the frontier and will not be returned
    /// again unless it is re-added.
    fn get_uncrawled_urls(&mut self, count: usize) -> StorageResult<Vec<String>>;

    /// Inserts URLs into the frontier, ignoring duplicates
    ///
    /// URLs already pending or already present as crawled pages are left
    /// untouched.
    ///
    /// # Returns
    ///
    /// The number of URLs actually inserted
    fn try_add_pending_urls(&mut self, urls: &[String]) -> StorageResult<usize>;

    /// Counts the URLs currently pending
    fn count_pending_urls(&self) -> StorageResult<u64>;

    /// Checks whether a URL is pending
    fn is_pending(&self, url: &str) -> StorageResult<bool>;

    // ===== Page Management =====

    /// Inserts a crawled page or updates the existing record with the same URL
    ///
    /// On conflict the title, description, rank and timestamp are replaced.
    fn add_or_update_crawled_page(&mut self, page: &PageRecord) -> StorageResult<()>;

    /// Gets a crawled page by URL
    fn get_crawled_page(&self, url: &str) -> StorageResult<Option<PageRecord>>;

    /// Counts crawled pages
    fn count_crawled_pages(&self) -> StorageResult<u64>;
}
