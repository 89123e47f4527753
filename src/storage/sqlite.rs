//! SQLite storage implementation
//!
//! One connection behind one mutex. Every method holds the lock only for its
//! own statements, so the sweep and delivery loops can share an
//! `Arc<SqliteStorage>` without either one blocking on the other's network I/O.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{
    OutboxStore, SourceStore, StorageError, StorageResult, WatermarkStore,
};
use crate::storage::{ItemRecord, PendingItem, SourceRecord};
use crate::RelayError;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(RelayError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, RelayError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self, RelayError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Database("storage lock poisoned".to_string()))
    }
}

fn source_from_row(row: &Row<'_>) -> rusqlite::Result<SourceRecord> {
    Ok(SourceRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        config: row.get(3)?,
        last_visited: row.get(4)?,
        retries: row.get(5)?,
    })
}

impl SourceStore for SqliteStorage {
    fn fetch_eligible(
        &self,
        threshold: i64,
        max_retries: u32,
    ) -> StorageResult<Option<SourceRecord>> {
        let conn = self.conn()?;
        let source = conn
            .query_row(
                "SELECT id, name, url, config, last_visited, retries
                 FROM sources
                 WHERE last_visited < ?1 AND retries < ?2
                 ORDER BY retries ASC, id ASC
                 LIMIT 1",
                params![threshold, max_retries],
                source_from_row,
            )
            .optional()?;
        Ok(source)
    }

    fn reset_all_retries(&self) -> StorageResult<()> {
        self.conn()?.execute("UPDATE sources SET retries = 0", [])?;
        Ok(())
    }

    fn increment_retries(&self, source_id: i64) -> StorageResult<()> {
        let changed = self.conn()?.execute(
            "UPDATE sources SET retries = retries + 1 WHERE id = ?1",
            params![source_id],
        )?;
        if changed == 0 {
            return Err(StorageError::SourceNotFound(source_id));
        }
        Ok(())
    }

    fn set_last_visited(&self, source_id: i64, visited_at: i64) -> StorageResult<()> {
        let changed = self.conn()?.execute(
            "UPDATE sources SET last_visited = ?1 WHERE id = ?2",
            params![visited_at, source_id],
        )?;
        if changed == 0 {
            return Err(StorageError::SourceNotFound(source_id));
        }
        Ok(())
    }

    fn upsert_source(&self, name: &str, url: &str, config: &str) -> StorageResult<i64> {
        let id = self.conn()?.query_row(
            "INSERT INTO sources (name, url, config) VALUES (?1, ?2, ?3)
             ON CONFLICT(url) DO UPDATE SET config = excluded.config
             RETURNING id",
            params![name, url, config],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn get_source(&self, source_id: i64) -> StorageResult<SourceRecord> {
        self.conn()?
            .query_row(
                "SELECT id, name, url, config, last_visited, retries FROM sources WHERE id = ?1",
                params![source_id],
                source_from_row,
            )
            .optional()?
            .ok_or(StorageError::SourceNotFound(source_id))
    }

    fn count_sources(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM sources", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_exhausted_sources(&self, max_retries: u32) -> StorageResult<u64> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM sources WHERE retries >= ?1",
            params![max_retries],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

impl OutboxStore for SqliteStorage {
    fn insert_item(
        &self,
        source_id: i64,
        title: &str,
        url: &str,
        added: i64,
    ) -> StorageResult<bool> {
        let inserted = self.conn()?.execute(
            "INSERT INTO items (source_id, title, url, added) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(url) DO NOTHING",
            params![source_id, title, url, added],
        )?;
        Ok(inserted > 0)
    }

    fn next_unsent(&self, after_id: i64) -> StorageResult<Option<PendingItem>> {
        let conn = self.conn()?;
        let item = conn
            .query_row(
                "SELECT i.id, i.title, i.url, s.name, s.config
                 FROM items AS i
                 JOIN sources AS s ON s.id = i.source_id
                 WHERE i.sent = 0 AND i.id > ?1
                 ORDER BY i.id ASC
                 LIMIT 1",
                params![after_id],
                |row| {
                    Ok(PendingItem {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        url: row.get(2)?,
                        source_name: row.get(3)?,
                        source_config: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(item)
    }

    fn mark_sent(&self, item_id: i64) -> StorageResult<bool> {
        let changed = self.conn()?.execute(
            "UPDATE items SET sent = 1 WHERE id = ?1 AND sent = 0",
            params![item_id],
        )?;
        Ok(changed > 0)
    }

    fn get_item_by_url(&self, url: &str) -> StorageResult<Option<ItemRecord>> {
        let item = self
            .conn()?
            .query_row(
                "SELECT id, source_id, title, url, added, sent FROM items WHERE url = ?1",
                params![url],
                |row| {
                    Ok(ItemRecord {
                        id: row.get(0)?,
                        source_id: row.get(1)?,
                        title: row.get(2)?,
                        url: row.get(3)?,
                        added: row.get(4)?,
                        sent: row.get::<_, i64>(5)? != 0,
                    })
                },
            )
            .optional()?;
        Ok(item)
    }

    fn count_items(&self, sent: bool) -> StorageResult<u64> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM items WHERE sent = ?1",
            params![sent as i64],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

impl WatermarkStore for SqliteStorage {
    fn latest_watermark(&self) -> StorageResult<Option<i64>> {
        let timestamp = self
            .conn()?
            .query_row(
                "SELECT timestamp FROM sweeps ORDER BY timestamp DESC, id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(timestamp)
    }

    fn append_watermark(&self, timestamp: i64) -> StorageResult<()> {
        self.conn()?.execute(
            "INSERT INTO sweeps (timestamp) VALUES (?1)",
            params![timestamp],
        )?;
        Ok(())
    }
}
