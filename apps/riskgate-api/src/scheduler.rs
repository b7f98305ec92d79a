//! Periodic reconciliation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use riskgate_sync::SyncService;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, instrument, warn};

/// Runs a cycle every `interval`, one at a time.
///
/// Cycles are awaited inline, so a slow cycle delays the next tick rather
/// than overlapping with it. Outcomes are logged and otherwise dropped.
pub struct SyncScheduler {
    service: Arc<SyncService>,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
}

impl SyncScheduler {
    #[must_use]
    pub fn new(service: Arc<SyncService>, interval: Duration) -> Self {
        Self {
            service,
            interval,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the loop. The first cycle runs immediately.
    #[instrument(skip(self), fields(interval_secs = self.interval.as_secs()))]
    pub async fn run(&self) {
        info!("Starting reconciliation scheduler");
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if self.is_shutdown() {
                info!("Scheduler shutdown requested, stopping");
                break;
            }

            let report = self.service.run_cycle().await;
            if let Some(e) = &report.error {
                error!(cycle_id = %report.cycle_id, error = %e, "Scheduled cycle aborted");
            } else if report.success {
                info!(
                    cycle_id = %report.cycle_id,
                    duration_ms = report.duration_ms,
                    "Scheduled cycle succeeded"
                );
            } else {
                warn!(
                    cycle_id = %report.cycle_id,
                    failed_tiers = report.failed_tiers().count(),
                    "Scheduled cycle finished with failed tiers"
                );
            }
        }
    }

    /// Request a stop after the current cycle.
    pub fn shutdown(&self) {
        info!("Scheduler shutdown requested");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}
