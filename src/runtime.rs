//! Periodic drivers for the sweep and delivery loops
//!
//! Both loops stop scheduling new work once the cancellation token fires. Work
//! already started (one sweep, one tick) runs to completion first.

use crate::crawler::SweepRunner;
use crate::delivery::{Deliverer, TickOutcome};
use crate::storage::{OutboxStore, Storage};
use crate::RelayError;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Runs a sweep immediately and then once per `every`
pub fn spawn_sweep_loop<S>(
    runner: SweepRunner<S>,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    S: Storage + ?Sized + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if let Err(e) = runner.run_sweep(&cancel).await {
                tracing::error!("Sweep aborted: {}", e);
            }
        }

        tracing::info!("Sweep loop stopped");
    })
}

/// Runs one delivery tick per `every`
pub fn spawn_delivery_loop<S>(
    mut deliverer: Deliverer<S>,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    S: OutboxStore + ?Sized + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if let Err(e) = deliverer.tick().await {
                tracing::error!("Delivery tick failed: {}", e);
            }
        }

        tracing::info!("Delivery loop stopped");
    })
}

/// Delivers outbox articles one per `every` until the outbox is empty, the
/// notifier refuses, or `cancel` fires. Returns how many were delivered.
pub async fn drain_outbox<S>(
    deliverer: &mut Deliverer<S>,
    every: Duration,
    cancel: &CancellationToken,
) -> Result<u64, RelayError>
where
    S: OutboxStore + ?Sized,
{
    let mut delivered = 0;
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match deliverer.tick().await? {
            TickOutcome::Delivered(_) => delivered += 1,
            outcome => {
                tracing::debug!("Stopping drain: {:?}", outcome);
                break;
            }
        }
    }

    Ok(delivered)
}
