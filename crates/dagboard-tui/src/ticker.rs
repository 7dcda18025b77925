//! Cancellable periodic tick task driving the countdown column.

use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub seq: u64,
}

/// Stops the ticker when dropped.
#[derive(Debug)]
pub struct TickerGuard {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl TickerGuard {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel and wait for the task to finish.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TickerGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Spawn a ticker on the current runtime. Ticks that the receiver has not
/// taken yet are coalesced rather than queued.
pub fn spawn_ticker(period: Duration) -> (TickerGuard, mpsc::Receiver<Tick>) {
    let period = period.max(Duration::from_millis(1));
    let (tx, rx) = mpsc::channel(1);
    let token = CancellationToken::new();
    let cancel = token.clone();

    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick fires immediately.
        interval.tick().await;
        tracing::debug!(period_ms = period.as_millis() as u64, "ticker started");

        let mut seq = 0u64;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    seq += 1;
                    match tx.try_send(Tick { seq }) {
                        Ok(()) | Err(TrySendError::Full(_)) => {}
                        Err(TrySendError::Closed(_)) => break,
                    }
                }
            }
        }
        tracing::debug!(ticks = seq, "ticker stopped");
    });

    (
        TickerGuard {
            token,
            handle: Some(handle),
        },
        rx,
    )
}
