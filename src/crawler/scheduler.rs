//! Sweep scheduling over the source ledger
//!
//! The scheduler owns no state of its own. Everything it decides is read back
//! from the store on each call:
//! - At sweep start every retry counter is reset and the watermark is read
//!   (or bootstrapped) to become the sweep's threshold
//! - A source is eligible while `last_visited < threshold` and it still has
//!   retry budget; the least-retried source is picked first
//! - A successful visit moves `last_visited` past the threshold, a failed one
//!   spends one retry
//! - At sweep end a new watermark is appended

use crate::storage::{SourceRecord, SourceStore, StorageResult, WatermarkStore};
use std::sync::Arc;

/// Picks the next source to visit and records visit outcomes
pub struct Scheduler<S: ?Sized> {
    store: Arc<S>,
    max_retries: u32,
}

impl<S> Scheduler<S>
where
    S: SourceStore + WatermarkStore + ?Sized,
{
    pub fn new(store: Arc<S>, max_retries: u32) -> Self {
        Self { store, max_retries }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Prepares a sweep and returns its threshold
    ///
    /// On a fresh database there is no watermark yet; `now` is recorded as the
    /// first one, so sources with `last_visited = 0` are all eligible.
    pub fn start_sweep(&self, now: i64) -> StorageResult<i64> {
        self.store.reset_all_retries()?;

        match self.store.latest_watermark()? {
            Some(threshold) => Ok(threshold),
            None => {
                tracing::info!("No previous sweep recorded, starting watermark at {}", now);
                self.store.append_watermark(now)?;
                Ok(now)
            }
        }
    }

    /// Next source to visit in the sweep bounded by `threshold`
    pub fn next_eligible(&self, threshold: i64) -> StorageResult<Option<SourceRecord>> {
        self.store.fetch_eligible(threshold, self.max_retries)
    }

    pub fn record_success(&self, source_id: i64, visited_at: i64) -> StorageResult<()> {
        self.store.set_last_visited(source_id, visited_at)
    }

    pub fn record_failure(&self, source_id: i64) -> StorageResult<()> {
        self.store.increment_retries(source_id)
    }

    /// Closes a completed sweep; the next one visits sources not seen since `now`
    pub fn finish_sweep(&self, now: i64) -> StorageResult<()> {
        self.store.append_watermark(now)
    }

    /// Sources that ran out of retries in the current sweep
    pub fn exhausted_count(&self) -> StorageResult<u64> {
        self.store.count_exhausted_sources(self.max_retries)
    }
}
