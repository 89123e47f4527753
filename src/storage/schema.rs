//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Feedrelay database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Configured sources and their per-sweep retry ledger
CREATE TABLE IF NOT EXISTS sources (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    url TEXT NOT NULL UNIQUE,
    config TEXT NOT NULL,
    last_visited INTEGER NOT NULL DEFAULT 0,
    retries INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_sources_eligibility ON sources(retries, last_visited);

-- Extracted articles; url is the deduplication key
CREATE TABLE IF NOT EXISTS items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_id INTEGER NOT NULL REFERENCES sources(id),
    title TEXT NOT NULL,
    url TEXT NOT NULL UNIQUE,
    added INTEGER NOT NULL,
    sent INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_items_sent ON items(sent);

-- Append-only sweep watermark log
CREATE TABLE IF NOT EXISTS sweeps (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sweeps_timestamp ON sweeps(timestamp);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
