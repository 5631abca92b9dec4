//! Periodic driver for the status monitor.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::bootstrap::{Shutdown, ShutdownState};

use super::{CoreStatusMonitor, MonitorState};

/// Offers the monitor a check on every tick until shutdown.
///
/// The monitor's own interval gate decides whether a tick does any work, so
/// the tick can be much shorter than the check interval.
pub struct MonitorScheduler {
    monitor: Arc<CoreStatusMonitor>,
    tick: Duration,
    shutdown: Arc<Shutdown>,
}

impl MonitorScheduler {
    pub fn new(monitor: Arc<CoreStatusMonitor>, tick: Duration, shutdown: Arc<Shutdown>) -> Self {
        Self {
            monitor,
            tick,
            shutdown,
        }
    }

    /// Run until shutdown. Returns the number of checks that did work.
    pub async fn run(self) -> u64 {
        info!(
            core = %self.monitor.core(),
            tick_secs = self.tick.as_secs(),
            "status monitor scheduler started"
        );

        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut shutdown_rx = self.shutdown.subscribe();
        let mut checks = 0u64;

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow_and_update() != ShutdownState::Running {
                        info!(checks, "status monitor scheduler shutting down");
                        break;
                    }
                }

                _ = interval.tick() => {
                    let state = self.monitor.check_core_status(false).await;
                    if state != MonitorState::Idle {
                        checks += 1;
                    }
                    debug!(%state, "scheduler tick");
                }
            }
        }

        checks
    }
}
