//! Database schema definitions
//!
//! Table names come from configuration, so the schema is rendered per
//! [`TableNames`] instead of being a fixed string. Names are validated as plain
//! identifiers before they are ever spliced into SQL; every value is bound as a
//! parameter.

use crate::config::validate_table_name;
use crate::storage::traits::{StorageError, StorageResult};

/// Validated names of the page and pending tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    page_table: String,
    pending_table: String,
}

impl TableNames {
    /// Validates and wraps the two table names
    pub fn new(page_table: &str, pending_table: &str) -> StorageResult<Self> {
        for name in [page_table, pending_table] {
            validate_table_name(name).map_err(|e| StorageError::InvalidTableName(e.to_string()))?;
        }

        if page_table.eq_ignore_ascii_case(pending_table) {
            return Err(StorageError::InvalidTableName(format!(
                "page and pending tables must differ, both are '{}'",
                page_table
            )));
        }

        Ok(Self {
            page_table: page_table.to_string(),
            pending_table: pending_table.to_string(),
        })
    }

    /// Name of the crawled page table
    pub fn page_table(&self) -> &str {
        &self.page_table
    }

    /// Name of the pending-URL table
    pub fn pending_table(&self) -> &str {
        &self.pending_table
    }
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            page_table: "crawled_pages".to_string(),
            pending_table: "pending_urls".to_string(),
        }
    }
}

/// Renders the schema SQL for the given tables
pub fn schema_sql(tables: &TableNames) -> String {
    format!(
        r#"
-- Crawled pages, one row per URL
CREATE TABLE IF NOT EXISTS {pages} (
    url TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    rank REAL NOT NULL DEFAULT 0.0,
    crawled_at TEXT NOT NULL
);

-- Crawl frontier, in discovery order
CREATE TABLE IF NOT EXISTS {pending} (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    discovered_at TEXT NOT NULL
);
"#,
        pages = tables.page_table(),
        pending = tables.pending_table(),
    )
}

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
/// * `tables` - The table names to create
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection, tables: &TableNames) -> Result<(), rusqlite::Error> {
    conn.execute_batch(&schema_sql(tables))?;
    Ok(())
}
