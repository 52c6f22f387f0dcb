//! Stuck-test recovery sweep
//!
//! Periodic background pass with two phases: rescue tests stranded in
//! `Processing` past the staleness threshold, then drain a bounded number
//! of waiting tests into the check engine, one at a time with an
//! inter-test delay. Per-test failures are recorded and never stop the
//! sweep from reaching the remaining tests.

use std::{fmt, sync::Arc, time::Duration};

use chrono::Utc;
use domain::entities::DeliveryTest;
use tracing::{info, instrument, warn};

use crate::error::ApplicationError;
use crate::ports::TestStorePort;
use crate::services::check_service::CheckService;

/// Configuration for the recovery sweep
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// How long a processing pass may run before it counts as stuck
    /// (default: 10 minutes)
    pub staleness: chrono::Duration,
    /// Maximum waiting tests drained per pass (default: 2)
    pub batch_size: u32,
    /// Delay between drained tests (default: 45s)
    pub inter_test_delay: Duration,
    /// Waiting tests older than this are left for retention purge
    /// (default: 24 hours)
    pub retention_window: chrono::Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            staleness: chrono::Duration::minutes(10),
            batch_size: 2,
            inter_test_delay: Duration::from_secs(45),
            retention_window: chrono::Duration::hours(24),
        }
    }
}

/// What one sweep pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Stranded tests rolled back to waiting
    pub stuck_reset: u32,
    /// Waiting tests successfully run through the engine
    pub processed: u32,
    /// Waiting tests whose run failed (recorded, sweep continued)
    pub failed: u32,
}

/// Periodic recovery and drain process
pub struct SweepService<S: TestStorePort> {
    store: Arc<S>,
    engine: Arc<CheckService<S>>,
    config: SweepConfig,
}

impl<S: TestStorePort> fmt::Debug for SweepService<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SweepService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: TestStorePort + 'static> SweepService<S> {
    /// Create a new sweep over the store and check engine
    #[must_use]
    pub fn new(store: Arc<S>, engine: Arc<CheckService<S>>, config: SweepConfig) -> Self {
        Self {
            store,
            engine,
            config,
        }
    }

    /// Run one sweep pass: reset stuck tests, then drain waiting ones
    #[instrument(skip(self))]
    pub async fn run_sweep_once(&self) -> Result<SweepReport, ApplicationError> {
        let mut report = SweepReport::default();
        let now = Utc::now();

        // Phase 1: rescue tests stranded by a crashed or hung pass.
        let stale = self.store.find_stale(now - self.config.staleness).await?;
        for mut test in stale {
            info!(test_id = %test.id, started_at = ?test.started_at, "Resetting stuck test");
            match test.reset_stuck("processing timeout") {
                Ok(()) => match self.store.save(&test).await {
                    Ok(()) => report.stuck_reset += 1,
                    Err(e) => {
                        warn!(test_id = %test.id, error = %e, "Could not persist stuck reset");
                    },
                },
                Err(e) => warn!(test_id = %test.id, error = %e, "Stuck reset rejected"),
            }
        }

        // Phase 2: drain a bounded batch of waiting tests.
        let cutoff = now - self.config.retention_window;
        let waiting = self
            .store
            .find_waiting(cutoff, self.config.batch_size)
            .await?;

        if waiting.is_empty() {
            info!(stuck_reset = report.stuck_reset, "No waiting tests to process");
            return Ok(report);
        }

        info!(count = waiting.len(), "Processing waiting tests");
        let total = waiting.len();
        for (index, test) in waiting.into_iter().enumerate() {
            match self.process_one(&test).await {
                Ok(()) => report.processed += 1,
                Err(e) => {
                    // Contained: the next test in the batch still runs.
                    warn!(test_id = %test.id, error = %e, "Sweep check failed, continuing");
                    report.failed += 1;
                },
            }

            if index + 1 < total {
                tokio::time::sleep(self.config.inter_test_delay).await;
            }
        }

        info!(
            stuck_reset = report.stuck_reset,
            processed = report.processed,
            failed = report.failed,
            "Sweep pass finished"
        );
        Ok(report)
    }

    async fn process_one(&self, test: &DeliveryTest) -> Result<(), ApplicationError> {
        let mut picked = test.clone();
        picked.record_sweep_pickup();
        self.store.save(&picked).await?;

        self.engine.run_check(&test.id).await
    }
}
