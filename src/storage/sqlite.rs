//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.
//! Table names are spliced into statements only after [`TableNames`] has
//! validated them; URLs, titles and timestamps are always bound parameters.

use crate::storage::schema::{initialize_schema, TableNames};
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::PageRecord;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
    tables: TableNames,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// The schema is not touched here; call
    /// [`Storage::try_create_schema`] before first use.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `tables` - Validated page and pending table names
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path, tables: TableNames) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        Ok(Self { conn, tables })
    }

    /// Creates an in-memory database with the schema in place (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        let tables = TableNames::default();
        initialize_schema(&conn, &tables)?;
        Ok(Self { conn, tables })
    }
}

fn parse_timestamp(value: String) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StorageError::InvalidTimestamp {
            value,
            reason: e.to_string(),
        })
}

impl Storage for SqliteStorage {
    // ===== Schema =====

    fn try_create_schema(&mut self) -> StorageResult<()> {
        initialize_schema(&self.conn, &self.tables)?;
        tracing::debug!(
            "Schema ready: {}, {}",
            self.tables.page_table(),
            self.tables.pending_table()
        );
        Ok(())
    }

    // ===== Frontier Management =====

    fn get_uncrawled_urls(&mut self, count: usize) -> StorageResult<Vec<String>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let pending = self.tables.pending_table().to_string();
        let tx = self.conn.transaction()?;

        let rows: Vec<(i64, String)> = {
            let mut stmt = tx.prepare(&format!(
                "SELECT id, url FROM {} ORDER BY id ASC LIMIT ?1",
                pending
            ))?;
            let rows = stmt
                .query_map(params![count as i64], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        {
            let mut delete = tx.prepare(&format!("DELETE FROM {} WHERE id = ?1", pending))?;
            for (id, _) in &rows {
                delete.execute(params![id])?;
            }
        }

        tx.commit()?;

        Ok(rows.into_iter().map(|(_, url)| url).collect())
    }

    fn try_add_pending_urls(&mut self, urls: &[String]) -> StorageResult<usize> {
        if urls.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            "INSERT OR IGNORE INTO {pending} (url, discovered_at)
             SELECT ?1, ?2
             WHERE NOT EXISTS (SELECT 1 FROM {pages} WHERE url = ?1)",
            pending = self.tables.pending_table(),
            pages = self.tables.page_table(),
        );
        let now = Utc::now().to_rfc3339();

        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(&sql)?;
            for url in urls {
                inserted += stmt.execute(params![url, now])?;
            }
        }
        tx.commit()?;

        Ok(inserted)
    }

    fn count_pending_urls(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.tables.pending_table()),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn is_pending(&self, url: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                &format!(
                    "SELECT 1 FROM {} WHERE url = ?1",
                    self.tables.pending_table()
                ),
                params![url],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    // ===== Page Management =====

    fn add_or_update_crawled_page(&mut self, page: &PageRecord) -> StorageResult<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO {} (url, title, description, rank, crawled_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(url) DO UPDATE SET
                    title = excluded.title,
                    description = excluded.description,
                    rank = excluded.rank,
                    crawled_at = excluded.crawled_at",
                self.tables.page_table()
            ),
            params![
                page.url,
                page.title,
                page.description,
                page.rank,
                page.crawled_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_crawled_page(&self, url: &str) -> StorageResult<Option<PageRecord>> {
        let row: Option<(String, String, String, f64, String)> = self
            .conn
            .query_row(
                &format!(
                    "SELECT url, title, description, rank, crawled_at FROM {} WHERE url = ?1",
                    self.tables.page_table()
                ),
                params![url],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(url, title, description, rank, crawled_at)| {
            Ok(PageRecord {
                url,
                title,
                description,
                rank,
                crawled_at: parse_timestamp(crawled_at)?,
            })
        })
        .transpose()
    }

    fn count_crawled_pages(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.tables.page_table()),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_create_in_memory() {
        let storage = SqliteStorage::new_in_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_create_schema_is_idempotent() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.try_create_schema().unwrap();
        storage.try_create_schema().unwrap();
        assert_eq!(storage.count_crawled_pages().unwrap(), 0);
    }

    #[test]
    fn test_upsert_keeps_single_record() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();

        let first = PageRecord::new("https://example.com/", "Old title", "");
        storage.add_or_update_crawled_page(&first).unwrap();

        let second = PageRecord::new("https://example.com/", "New title", "Described");
        storage.add_or_update_crawled_page(&second).unwrap();

        assert_eq!(storage.count_crawled_pages().unwrap(), 1);
        let stored = storage
            .get_crawled_page("https://example.com/")
            .unwrap()
            .unwrap();
        assert_eq!(stored.title, "New title");
        assert_eq!(stored.description, "Described");
        assert_eq!(stored.rank, 0.0);
    }

    #[test]
    fn test_get_missing_page() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        assert!(storage
            .get_crawled_page("https://example.com/nope")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_pending_urls_are_deduplicated() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();

        let added = storage
            .try_add_pending_urls(&urls(&["https://a.com/1", "https://a.com/2"]))
            .unwrap();
        assert_eq!(added, 2);

        let added = storage
            .try_add_pending_urls(&urls(&["https://a.com/2", "https://a.com/3", "https://a.com/3"]))
            .unwrap();
        assert_eq!(added, 1);

        assert_eq!(storage.count_pending_urls().unwrap(), 3);
        assert!(storage.is_pending("https://a.com/3").unwrap());
    }

    #[test]
    fn test_pending_skips_crawled_pages() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage
            .add_or_update_crawled_page(&PageRecord::new("https://a.com/done", "Done", ""))
            .unwrap();

        let added = storage
            .try_add_pending_urls(&urls(&["https://a.com/done", "https://a.com/new"]))
            .unwrap();

        assert_eq!(added, 1);
        assert!(!storage.is_pending("https://a.com/done").unwrap());
        assert!(storage.is_pending("https://a.com/new").unwrap());
    }

    #[test]
    fn test_get_uncrawled_urls_removes_in_order() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage
            .try_add_pending_urls(&urls(&["https://a.com/1", "https://a.com/2", "https://a.com/3"]))
            .unwrap();

        let batch = storage.get_uncrawled_urls(2).unwrap();
        assert_eq!(batch, urls(&["https://a.com/1", "https://a.com/2"]));
        assert_eq!(storage.count_pending_urls().unwrap(), 1);
        assert!(!storage.is_pending("https://a.com/1").unwrap());

        let rest = storage.get_uncrawled_urls(10).unwrap();
        assert_eq!(rest, urls(&["https://a.com/3"]));

        assert!(storage.get_uncrawled_urls(10).unwrap().is_empty());
    }

    #[test]
    fn test_popped_url_can_be_requeued() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage
            .try_add_pending_urls(&urls(&["https://a.com/1"]))
            .unwrap();

        let batch = storage.get_uncrawled_urls(1).unwrap();
        let added = storage.try_add_pending_urls(&batch).unwrap();

        assert_eq!(added, 1);
        assert_eq!(storage.count_pending_urls().unwrap(), 1);
    }

    #[test]
    fn test_file_backed_storage_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crawl.db");

        {
            let mut storage = SqliteStorage::new(&path, TableNames::default()).unwrap();
            storage.try_create_schema().unwrap();
            storage
                .try_add_pending_urls(&urls(&["https://a.com/"]))
                .unwrap();
            storage
                .add_or_update_crawled_page(&PageRecord::new("https://b.com/", "B", ""))
                .unwrap();
        }

        let mut storage = SqliteStorage::new(&path, TableNames::default()).unwrap();
        storage.try_create_schema().unwrap();
        assert_eq!(storage.count_pending_urls().unwrap(), 1);
        assert_eq!(storage.count_crawled_pages().unwrap(), 1);
    }
}
