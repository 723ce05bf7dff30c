//! Release Signal Module
//!
//! One-shot completion signal fired when a lock is released.

use std::future::{Future, IntoFuture};
use std::pin::Pin;

use tokio::sync::watch;

// == Release Notifier ==
/// Owning side of the release signal. Fires at most once.
#[derive(Debug)]
pub struct ReleaseNotifier {
    tx: watch::Sender<bool>,
}

impl ReleaseNotifier {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    // == Fire ==
    /// Marks the lock released and wakes every waiter.
    ///
    /// Returns false if the signal had already fired.
    pub fn fire(&self) -> bool {
        self.tx.send_if_modified(|fired| {
            if *fired {
                false
            } else {
                *fired = true;
                true
            }
        })
    }

    pub fn is_fired(&self) -> bool {
        *self.tx.borrow()
    }

    // == Subscribe ==
    /// Returns a waiter for this signal.
    pub fn subscribe(&self) -> UnlockSignal {
        UnlockSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for ReleaseNotifier {
    fn default() -> Self {
        Self::new()
    }
}

// == Unlock Signal ==
/// Waiting side of the release signal.
///
/// Cloneable and `'static`, so it can be moved into spawned tasks. Awaiting
/// it (or calling [`UnlockSignal::wait`]) completes once the lock is
/// released. If the lock handle is dropped without being released the
/// signal never completes.
#[derive(Debug, Clone)]
pub struct UnlockSignal {
    rx: watch::Receiver<bool>,
}

impl UnlockSignal {
    /// Non-blocking check.
    pub fn is_fired(&self) -> bool {
        *self.rx.borrow()
    }

    /// Waits until the lock is released.
    pub async fn wait(mut self) {
        let released = self.rx.wait_for(|fired| *fired).await.is_ok();
        if !released {
            // Notifier dropped without firing: the lock was abandoned.
            std::future::pending::<()>().await;
        }
    }
}

impl IntoFuture for UnlockSignal {
    type Output = ();
    type IntoFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.wait())
    }
}
