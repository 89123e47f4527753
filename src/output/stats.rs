//! Statistics from the relay database
//!
//! This module provides functionality for extracting and displaying the
//! state of sources, the outbox and the sweep watermark.

use crate::storage::Storage;
use crate::RelayError;
use chrono::{DateTime, Utc};

/// Relay statistics summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayStatistics {
    /// Number of sources in the store
    pub sources: u64,

    /// Sources that used up their retries in the latest sweep
    pub exhausted_sources: u64,

    /// Articles waiting for delivery
    pub pending_items: u64,

    /// Articles already announced
    pub sent_items: u64,

    /// Start of the window the next sweep will cover
    pub last_watermark: Option<i64>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `max_retries` - Retry budget used to decide which sources are exhausted
pub fn load_statistics<S: Storage + ?Sized>(
    storage: &S,
    max_retries: u32,
) -> Result<RelayStatistics, RelayError> {
    Ok(RelayStatistics {
        sources: storage.count_sources()?,
        exhausted_sources: storage.count_exhausted_sources(max_retries)?,
        pending_items: storage.count_items(false)?,
        sent_items: storage.count_items(true)?,
        last_watermark: storage.latest_watermark()?,
    })
}

/// Renders a unix timestamp as RFC 3339, falling back to the raw number
fn format_timestamp(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| timestamp.to_string())
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &RelayStatistics) {
    println!("=== Relay Statistics ===\n");

    println!("Sources:");
    println!("  Total: {}", stats.sources);
    println!("  Out of retries: {}", stats.exhausted_sources);
    println!();

    println!("Outbox:");
    println!("  Pending: {}", stats.pending_items);
    println!("  Sent: {}", stats.sent_items);
    println!();

    match stats.last_watermark {
        Some(ts) => println!("Last sweep watermark: {}", format_timestamp(ts)),
        None => println!("Last sweep watermark: never swept"),
    }
}
