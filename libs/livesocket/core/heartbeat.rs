//! Heartbeat scheduler
//!
//! # Architecture
//!
//! One Tokio task per connection:
//!
//! ```text
//! ┌─────────────────────┐
//! │  Heartbeat Task     │
//! │                     │
//! │  Every period:      │
//! │  1. Wait for tick   │
//! │  2. Queue frame ────┼──> Outbound queue ──> Writer task ──> Socket
//! │  3. Repeat          │
//! └─────────────────────┘
//! ```
//!
//! The lifecycle actor keeps at most one [`HeartbeatHandle`] and drops it on
//! close, which stops the task. If the writer is already gone when a tick
//! fires, the tick is skipped.

use crate::traits::WsMessage;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Handle to a running heartbeat task. Dropping it cancels the task.
pub struct HeartbeatHandle {
    generation: u64,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

impl HeartbeatHandle {
    /// Connection generation this timer belongs to
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Stop the timer
    pub fn cancel(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.handle.abort();
    }
}

impl Drop for HeartbeatHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Heartbeat loop
///
/// Skips the immediate first tick; the handshake already sent one.
async fn heartbeat_task(
    generation: u64,
    interval: Duration,
    payload: WsMessage,
    outbound: mpsc::UnboundedSender<WsMessage>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    // If we miss ticks due to slow processing, skip them rather than bursting
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    debug!(generation, "Heartbeat task started with interval: {:?}", interval);

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                debug!(generation, "Heartbeat task received shutdown signal");
                break;
            }
            _ = ticker.tick() => {
                if outbound.send(payload.clone()).is_err() {
                    debug!(generation, "Heartbeat tick skipped, socket already released");
                    continue;
                }
                debug!(generation, "Heartbeat queued");
            }
        }
    }

    debug!(generation, "Heartbeat task exiting");
}

/// Spawn a heartbeat task feeding `outbound`
pub fn spawn_heartbeat(
    generation: u64,
    interval: Duration,
    payload: WsMessage,
    outbound: mpsc::UnboundedSender<WsMessage>,
) -> HeartbeatHandle {
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let handle = tokio::spawn(heartbeat_task(
        generation,
        interval,
        payload,
        outbound,
        shutdown_rx,
    ));

    HeartbeatHandle {
        generation,
        shutdown_tx: Some(shutdown_tx),
        handle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beat() -> WsMessage {
        WsMessage::Binary(vec![2])
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_ticks_once_per_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _handle = spawn_heartbeat(1, Duration::from_secs(30), beat(), tx);

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(rx.try_recv().unwrap(), beat());
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(rx.try_recv().unwrap(), beat());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_heartbeat_stops_sending() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = spawn_heartbeat(1, Duration::from_secs(30), beat(), tx);
        handle.cancel();

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_without_socket_is_skipped() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let handle = spawn_heartbeat(1, Duration::from_secs(30), beat(), tx);

        tokio::time::sleep(Duration::from_secs(95)).await;
        assert!(!handle.handle.is_finished());
    }
}
