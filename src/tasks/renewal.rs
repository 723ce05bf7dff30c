//! Lease Renewal Task
//!
//! Background task that keeps a held lease alive and deletes it on release.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::sync::{LeaseBackend, ReleaseNotifier};

/// Shortest renewal period, for leases under two milliseconds
const MIN_RENEWAL_PERIOD: Duration = Duration::from_millis(1);

// == Renewal Handle ==
/// Owner side of a running renewal task.
///
/// Dropping the handle without calling [`RenewalHandle::stop`] makes the
/// task exit on its next wake-up without deleting the lease, which then
/// expires in the backend.
#[derive(Debug)]
pub struct RenewalHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<Result<()>>,
    released: Arc<ReleaseNotifier>,
}

impl RenewalHandle {
    // == Stop ==
    /// Requests release and waits for the task to exit.
    ///
    /// Returns the outcome of the final compare-and-delete. The release
    /// signal has fired by the time this returns.
    pub async fn stop(self) -> Result<()> {
        // A send error means the task is already gone; the join reports why.
        let _ = self.stop.send(());
        match self.task.await {
            Ok(result) => result,
            Err(e) => {
                self.released.fire();
                Err(Error::Internal(format!("lease renewal task failed: {}", e)))
            }
        }
    }
}

/// Spawns the renewal task for a freshly acquired lease.
///
/// Every `ttl / 2` the task re-issues the conditional set to extend the
/// lease. Renewal outcomes are only logged; a failed renewal is retried on
/// the next tick. When stop is requested the timer is dropped, the lease is
/// deleted if still owned by `token`, and `released` fires.
///
/// # Arguments
/// * `backend` - Store holding the lease
/// * `key` - Lease key
/// * `token` - Owner token of this acquisition
/// * `ttl` - Lease time-to-live
/// * `released` - Signal fired once teardown completes
///
/// # Example
/// ```ignore
/// let released = Arc::new(ReleaseNotifier::new());
/// let renewal = spawn_renewal_task(backend, key, token, ttl, released.clone());
/// // Later, on unlock:
/// renewal.stop().await?;
/// assert!(released.is_fired());
/// ```
pub fn spawn_renewal_task(
    backend: Arc<dyn LeaseBackend>,
    key: String,
    token: String,
    ttl: Duration,
    released: Arc<ReleaseNotifier>,
) -> RenewalHandle {
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
    let period = (ttl / 2).max(MIN_RENEWAL_PERIOD);
    let task_released = Arc::clone(&released);

    let task = tokio::spawn(async move {
        debug!(key = %key, ?period, "starting lease renewal task");

        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                stop = &mut stop_rx => {
                    if stop.is_err() {
                        debug!(key = %key, "lock handle dropped, leaving lease to expire");
                        return Ok(());
                    }
                    let result = backend.release(&key, &token).await;
                    match &result {
                        Ok(true) => info!(key = %key, "lease released"),
                        Ok(false) => warn!(key = %key, "lease was no longer owned at release"),
                        Err(e) => error!(key = %key, error = %e, "failed to release lease"),
                    }
                    task_released.fire();
                    return result.map(|_| ());
                }
                _ = ticker.tick() => {
                    match backend.acquire(&key, &token, ttl).await {
                        Ok(true) => debug!(key = %key, "lease refreshed"),
                        Ok(false) => warn!(key = %key, "lease refresh rejected, key held by another owner"),
                        Err(e) => warn!(key = %key, error = %e, "failed to refresh lease"),
                    }
                }
            }
        }
    });

    RenewalHandle {
        stop: stop_tx,
        task,
        released,
    }
}
