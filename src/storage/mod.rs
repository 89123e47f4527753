//! Storage module for persisting relay state
//!
//! This module handles all database operations for the relay, including:
//! - SQLite database initialization and schema management
//! - Source records, the sweep retry ledger and the watermark log
//! - The outbox of extracted articles and its transactional take

mod outbox;
mod schema;
mod sqlite;
mod traits;

pub use outbox::{take_one_unsent, TakeOutcome};
pub use sqlite::SqliteStorage;
pub use traits::{OutboxStore, SourceStore, Storage, StorageError, StorageResult, WatermarkStore};

use crate::config::SourceSettings;
use crate::RelayError;

use std::fmt;
use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, RelayError> {
    SqliteStorage::new(path)
}

/// Represents a source in the database
#[derive(Debug, Clone)]
pub struct SourceRecord {
    pub id: i64,
    pub name: String,
    pub url: String,
    /// Raw JSON of [`SourceSettings`]
    pub config: String,
    pub last_visited: i64,
    pub retries: u32,
}

impl SourceRecord {
    /// Decodes the stored settings
    pub fn settings(&self) -> Result<SourceSettings, serde_json::Error> {
        SourceSettings::from_json(&self.config)
    }
}

impl fmt::Display for SourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Source(id={}, name={})", self.id, self.name)
    }
}

/// Represents an article row in the outbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRecord {
    pub id: i64,
    pub source_id: i64,
    pub title: String,
    pub url: String,
    pub added: i64,
    pub sent: bool,
}

/// An unsent article together with what is needed to announce it
#[derive(Debug, Clone)]
pub struct PendingItem {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub source_name: String,
    /// Raw JSON of the owning source's [`SourceSettings`]
    pub source_config: String,
}

impl PendingItem {
    pub fn settings(&self) -> Result<SourceSettings, serde_json::Error> {
        SourceSettings::from_json(&self.source_config)
    }
}

impl fmt::Display for PendingItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Article(id={}, url={})", self.id, self.url)
    }
}
