//! Periodic refresh loop with an explicit stop handle.

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Stops a running poller. Dropping the handle stops it too.
#[derive(Debug)]
pub struct StopHandle {
    tx: watch::Sender<bool>,
}

impl StopHandle {
    pub fn stop(&self) {
        let _ = self.tx.send(true);
    }
}

/// Run `task` every `interval` until the returned handle is stopped.
///
/// The first tick fires immediately. A failed tick is logged and the loop
/// keeps going; the join handle resolves to the number of ticks run.
pub fn spawn_poller<F, Fut>(interval: Duration, mut task: F) -> (StopHandle, JoinHandle<usize>)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let (tx, mut rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut ticks = 0usize;

        loop {
            tokio::select! {
                changed = rx.changed() => {
                    // Sender dropped or stop requested.
                    if changed.is_err() || *rx.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    ticks += 1;
                    debug!("Poll tick {}", ticks);
                    if let Err(e) = task().await {
                        warn!("Refresh failed: {:#}", e);
                    }
                }
            }
        }

        ticks
    });

    (StopHandle { tx }, handle)
}
