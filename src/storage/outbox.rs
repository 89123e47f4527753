//! Transactional take over the outbox
//!
//! An article is flagged as sent only after the handler has returned `Ok`.
//! The store lock is not held while the handler runs: the row is read, the
//! lock released, the handler awaited, and the flag written afterwards with
//! `sent = 0` as a guard. A failed handler therefore leaves the row exactly as
//! it was.

use crate::storage::traits::{OutboxStore, StorageResult};
use crate::storage::PendingItem;
use std::future::Future;

/// What happened to the article picked by [`take_one_unsent`]
#[derive(Debug)]
pub enum TakeOutcome<E> {
    /// The outbox had nothing unsent
    Empty,

    /// The handler succeeded and the article is now flagged as sent
    Sent(i64),

    /// The handler failed; the article is still unsent
    Failed { item_id: i64, error: E },
}

/// Picks the oldest unsent article with an id above `after_id`, hands it to
/// `handler`, and flags it as sent only if the handler succeeds
///
/// Storage failures are returned as `Err`; handler failures are part of the
/// `Ok` outcome so callers can tell the two apart.
pub async fn take_one_unsent<S, F, Fut, E>(
    store: &S,
    after_id: i64,
    handler: F,
) -> StorageResult<TakeOutcome<E>>
where
    S: OutboxStore + ?Sized,
    F: FnOnce(PendingItem) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    let item = match store.next_unsent(after_id)? {
        Some(item) => item,
        None => return Ok(TakeOutcome::Empty),
    };
    let item_id = item.id;

    if let Err(error) = handler(item).await {
        return Ok(TakeOutcome::Failed { item_id, error });
    }

    if !store.mark_sent(item_id)? {
        tracing::debug!("Article {} was already flagged as sent", item_id);
    }

    Ok(TakeOutcome::Sent(item_id))
}
