//! Periodic tick driver
//!
//! Runs the controller in a single task. Ticks, error isolation and shutdown
//! are multiplexed with `tokio::select!`, so a tick never overlaps another
//! tick or an isolation pause.

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::controller::SyncController;

impl SyncController {
    /// Run the sync loop until `shutdown_rx` fires or its sender is dropped
    ///
    /// Returns the controller so callers can inspect its final state.
    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) -> Self {
        let period = self.config().tick_interval();
        tracing::info!("Sync loop started (interval: {:?})", period);

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Sync loop shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.tick();
                }
                Some(event) = self.next_error_event() => {
                    self.handle_error_event(event);
                }
            }
        }

        self
    }

    /// Spawn the sync loop onto the current runtime
    pub fn spawn(self, shutdown_rx: broadcast::Receiver<()>) -> JoinHandle<Self> {
        tokio::spawn(self.run(shutdown_rx))
    }
}
