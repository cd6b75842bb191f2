//! VisitSweeper - Background service for the engine's periodic work.
//!
//! Each tick runs two passes:
//! 1. Hold expiry: pending appointments past the hold window release their slot
//! 2. Reconciliation: initiated payments past the grace period are settled
//!    from the gateway's view of the order
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `interval` | 30s | Time between passes |
//! | `reconcile` | true | Whether to run the reconciliation pass |
//!
//! ## Graceful Shutdown
//!
//! The sweeper listens on a watch channel and finishes the pass in flight
//! before stopping.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use super::engine::VisitEngine;
use super::handlers::appointment::HoldSweepReport;
use super::handlers::payment::ReconciliationReport;

#[derive(Debug, Clone)]
pub struct SweeperConfig {
    pub interval: Duration,
    pub reconcile: bool,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            reconcile: true,
        }
    }
}

impl SweeperConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_reconcile(mut self, reconcile: bool) -> Self {
        self.reconcile = reconcile;
        self
    }
}

/// Combined outcome of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub holds: HoldSweepReport,
    pub payments: ReconciliationReport,
}

pub struct VisitSweeper {
    engine: Arc<VisitEngine>,
    config: SweeperConfig,
}

impl VisitSweeper {
    pub fn new(engine: Arc<VisitEngine>) -> Self {
        Self::with_config(engine, SweeperConfig::default())
    }

    pub fn with_config(engine: Arc<VisitEngine>, config: SweeperConfig) -> Self {
        Self { engine, config }
    }

    /// Runs passes until the shutdown signal flips to `true`.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_secs = self.config.interval.as_secs(), "Sweeper started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Sweeper stopped");
                        return;
                    }
                }
                _ = interval.tick() => {
                    self.run_once().await;
                }
            }
        }
    }

    /// Runs a single tick. A failing pass is logged and retried next tick.
    pub async fn run_once(&self) -> SweepReport {
        let mut report = SweepReport::default();

        match self.engine.expire_stale_holds().await {
            Ok(holds) => report.holds = holds,
            Err(e) => tracing::error!(error = %e, "Hold sweep failed"),
        }

        if self.config.reconcile {
            match self.engine.reconcile_payments().await {
                Ok(payments) => report.payments = payments,
                Err(e) => tracing::error!(error = %e, "Payment reconciliation failed"),
            }
        }

        report
    }
}
