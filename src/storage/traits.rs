//! Storage traits and error types
//!
//! The stores are the single source of truth: the scheduler and the delivery
//! loop re-read every row they act on and keep nothing across calls.

use crate::storage::{ItemRecord, PendingItem, SourceRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Source not found: {0}")]
    SourceNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Source records and the per-sweep retry ledger
pub trait SourceStore: Send + Sync {
    /// Returns one source with `last_visited < threshold` and
    /// `retries < max_retries`, fewest retries first, ties by id
    fn fetch_eligible(&self, threshold: i64, max_retries: u32)
        -> StorageResult<Option<SourceRecord>>;

    /// Sets `retries = 0` on every source
    fn reset_all_retries(&self) -> StorageResult<()>;

    /// Adds one to the source's retry count
    fn increment_retries(&self, source_id: i64) -> StorageResult<()>;

    /// Records a successful visit; `retries` is left alone
    fn set_last_visited(&self, source_id: i64, visited_at: i64) -> StorageResult<()>;

    /// Inserts a source, or replaces the stored settings of the source with
    /// the same URL. Returns the source id.
    fn upsert_source(&self, name: &str, url: &str, config: &str) -> StorageResult<i64>;

    fn get_source(&self, source_id: i64) -> StorageResult<SourceRecord>;

    fn count_sources(&self) -> StorageResult<u64>;

    /// Counts sources that have used up their retry budget for this sweep
    fn count_exhausted_sources(&self, max_retries: u32) -> StorageResult<u64>;
}

/// Extracted articles waiting for (or done with) delivery
pub trait OutboxStore: Send + Sync {
    /// Inserts an article unless one with the same URL exists.
    /// Returns true when a row was created.
    fn insert_item(&self, source_id: i64, title: &str, url: &str, added: i64)
        -> StorageResult<bool>;

    /// Oldest unsent article with an id above `after_id`, joined with its
    /// source's name and settings. Pass 0 to start from the head.
    fn next_unsent(&self, after_id: i64) -> StorageResult<Option<PendingItem>>;

    /// Flags an article as sent. Returns false when it already was.
    fn mark_sent(&self, item_id: i64) -> StorageResult<bool>;

    fn get_item_by_url(&self, url: &str) -> StorageResult<Option<ItemRecord>>;

    fn count_items(&self, sent: bool) -> StorageResult<u64>;
}

/// The sweep watermark log
pub trait WatermarkStore: Send + Sync {
    /// Most recent watermark, if any sweep has ever started
    fn latest_watermark(&self) -> StorageResult<Option<i64>>;

    fn append_watermark(&self, timestamp: i64) -> StorageResult<()>;
}

/// Everything the relay needs from one backend
pub trait Storage: SourceStore + OutboxStore + WatermarkStore {}

impl<T: SourceStore + OutboxStore + WatermarkStore> Storage for T {}
