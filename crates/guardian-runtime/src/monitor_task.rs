//! [`MonitorTask`] – runs a [`SafetyMonitor`] on a fixed wall-clock period.
//!
//! The task is decoupled from frame arrival: it ticks on a
//! [`tokio::time::interval`] and calls
//! [`SafetyMonitor::run_once`] with the tick's wall-clock time.  Stopping
//! takes effect between ticks; a tick in progress always completes.

use std::time::Duration;

use chrono::Utc;
use guardian_kernel::{SafetyMonitor, SafetyStatusHandle};
use guardian_types::GuardianError;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Handle to a spawned monitor loop.
///
/// Dropping the handle without calling [`stop`][Self::stop] also ends the
/// loop at its next tick boundary.
pub struct MonitorTask {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<SafetyMonitor>,
    status: SafetyStatusHandle,
}

impl MonitorTask {
    /// Spawn `monitor` onto the current Tokio runtime, ticking every `period`.
    pub fn spawn(mut monitor: SafetyMonitor, period: Duration) -> Self {
        let status = monitor.status();
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            info!(period_ms = period.as_millis() as u64, "safety monitor started");
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks: u64 = 0;
            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        monitor.run_once(Utc::now());
                        ticks += 1;
                    }
                }
            }
            debug!(ticks, "safety monitor stopped");
            monitor
        });

        Self {
            stop_tx: Some(stop_tx),
            handle,
            status,
        }
    }

    /// Read side of the status record the monitor writes.
    pub fn status(&self) -> SafetyStatusHandle {
        self.status.clone()
    }

    /// Stop the loop and hand the monitor back.
    pub async fn stop(mut self) -> Result<SafetyMonitor, GuardianError> {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        self.handle
            .await
            .map_err(|e| GuardianError::Channel(format!("safety monitor task failed: {e}")))
    }
}
