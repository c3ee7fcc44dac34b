//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the crawler:
//! - SQLite database initialization and schema management
//! - Crawled page records (upsert keyed by URL)
//! - The pending-URL frontier (pop and insert-or-ignore)

mod schema;
mod sqlite;
mod traits;

pub use schema::TableNames;
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::config::StorageConfig;
use crate::CrawlerError;
use chrono::{DateTime, Utc};
use std::path::Path;

/// Opens the configured storage and makes sure its schema exists
///
/// # Arguments
///
/// * `config` - Storage section of the crawler configuration
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Storage ready for use
/// * `Err(CrawlerError)` - Failed to open the database or create tables
pub fn open_storage(config: &StorageConfig) -> Result<SqliteStorage, CrawlerError> {
    let tables = TableNames::new(&config.page_table, &config.pending_table)?;
    let mut storage = SqliteStorage::new(Path::new(&config.database_path), tables)?;
    storage.try_create_schema()?;
    Ok(storage)
}

/// A crawled page as stored in the page table
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    /// Absolute URL; unique in storage
    pub url: String,
    /// Page title, empty when the page has none
    pub title: String,
    /// Meta description, empty when the page has none
    pub description: String,
    /// Reserved for ranking; always 0.0 for now
    pub rank: f64,
    /// When the page was last crawled
    pub crawled_at: DateTime<Utc>,
}

impl PageRecord {
    /// Creates a record stamped with the current time
    pub fn new(url: impl Into<String>, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            description: description.into(),
            rank: 0.0,
            crawled_at: Utc::now(),
        }
    }
}
