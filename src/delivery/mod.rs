//! Delivery loop - one outbox article per tick
//!
//! Each tick either does nothing (backoff active, or nothing to send) or
//! offers exactly one unsent article to the notifier. Rate-limit feedback
//! moves the loop into a suppression window during which the store is not
//! touched at all.
//!
//! An article that fails for any other reason moves to the back of the line:
//! the deliverer keeps a cursor past it, so later articles are offered first
//! and the failed one is retried once the cursor wraps around.

use crate::clock::Clock;
use crate::notify::{render_message, Notifier, NotifyError};
use crate::state::BackoffState;
use crate::storage::{take_one_unsent, OutboxStore, PendingItem, StorageResult, TakeOutcome};
use crate::RelayError;
use std::sync::Arc;
use thiserror::Error;

/// Why an article could not be delivered
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Unreadable source settings: {0}")]
    Settings(#[from] serde_json::Error),

    #[error(transparent)]
    Notify(#[from] NotifyError),
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Backoff is active; the store was not consulted
    Suppressed { until: i64 },

    /// Nothing is waiting in the outbox
    Idle,

    /// The article was announced and flagged as sent
    Delivered(i64),

    /// The notifier asked us to slow down; no sends before `until`
    RateLimited { until: i64 },

    /// The notifier failed for another reason; the article stays unsent
    Failed(i64),

    /// The article's source settings could not be read
    Skipped(i64),
}

/// Drains the outbox through a notifier
pub struct Deliverer<S: OutboxStore + ?Sized> {
    store: Arc<S>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    backoff: BackoffState,
    /// Id of the last article that failed or was skipped; 0 for the head
    cursor: i64,
}

impl<S: OutboxStore + ?Sized> Deliverer<S> {
    pub fn new(store: Arc<S>, notifier: Arc<dyn Notifier>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            notifier,
            clock,
            backoff: BackoffState::Ready,
            cursor: 0,
        }
    }

    pub fn backoff(&self) -> BackoffState {
        self.backoff
    }

    /// Runs one delivery tick
    ///
    /// Only store failures are returned as errors; notifier problems are part
    /// of the outcome.
    pub async fn tick(&mut self) -> Result<TickOutcome, RelayError> {
        if let Some(until) = self.backoff.suppressed_until(self.clock.now()) {
            tracing::trace!("Delivery suppressed until {}", until);
            return Ok(TickOutcome::Suppressed { until });
        }

        let mut outcome = self.take_after(self.cursor).await?;
        if matches!(outcome, TakeOutcome::Empty) && self.cursor > 0 {
            tracing::trace!("Outbox exhausted past article {}, starting over", self.cursor);
            self.cursor = 0;
            outcome = self.take_after(0).await?;
        }

        match outcome {
            TakeOutcome::Empty => Ok(TickOutcome::Idle),
            TakeOutcome::Sent(item_id) => {
                self.backoff.clear();
                tracing::info!("Delivered article {}", item_id);
                Ok(TickOutcome::Delivered(item_id))
            }
            TakeOutcome::Failed {
                item_id,
                error: DeliveryError::Settings(e),
            } => {
                tracing::warn!("Skipping article {}: unreadable source settings: {}", item_id, e);
                self.cursor = item_id;
                Ok(TickOutcome::Skipped(item_id))
            }
            TakeOutcome::Failed {
                item_id,
                error: DeliveryError::Notify(e),
            } => match e.retry_after() {
                Some(retry_after) => {
                    let until = self.clock.now() + retry_after as i64;
                    self.backoff.suppress(until);
                    tracing::warn!(
                        "Rate limited while sending article {}, pausing delivery for {}s",
                        item_id,
                        retry_after
                    );
                    Ok(TickOutcome::RateLimited { until })
                }
                None => {
                    tracing::warn!("Failed to deliver article {}: {}", item_id, e);
                    self.cursor = item_id;
                    Ok(TickOutcome::Failed(item_id))
                }
            },
        }
    }

    async fn take_after(&self, after_id: i64) -> StorageResult<TakeOutcome<DeliveryError>> {
        let notifier = Arc::clone(&self.notifier);
        take_one_unsent(self.store.as_ref(), after_id, |item| announce(notifier, item)).await
    }
}

async fn announce(notifier: Arc<dyn Notifier>, item: PendingItem) -> Result<(), DeliveryError> {
    let settings = item.settings()?;
    let text = render_message(&item.source_name, &item.title, &item.url, &settings.tags);
    tracing::debug!("Sending {} to {:?}", item, settings.channels);
    notifier.send(&settings.channels, &text).await?;
    Ok(())
}
