//! # Expiry Sweeper
//!
//! Periodic enforcement of the wall-clock deadlines: force-expires open
//! wagers past their acceptance deadline and finalizes undisputed pending
//! results whose dispute window has passed (the disputer forfeits by
//! inaction).
//!
//! `sweep_once` is synchronous and deterministic; the service binary drives
//! it from a tokio interval task. Each wager is processed independently —
//! a failure on one (e.g. the ledger is unavailable) is logged and counted,
//! never aborting the rest of the sweep. The sweeper shares the engine's
//! transition methods with external callers, so the lazy-expiry path and
//! the swept path produce identical terminal states.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use bounty_core::WagerId;

use crate::engine::WagerEngine;
use crate::error::EngineError;

/// Counters from one sweep iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Open wagers moved to `Expired`.
    pub expired: usize,
    /// Pending results settled by default.
    pub finalized: usize,
    /// Wagers whose processing failed; they are retried next sweep.
    pub errors: usize,
    /// Every wager this sweep transitioned, for persistence write-behind.
    pub touched: Vec<WagerId>,
}

impl SweepReport {
    /// Whether the sweep changed anything or hit errors.
    pub fn is_noteworthy(&self) -> bool {
        self.expired > 0 || self.finalized > 0 || self.errors > 0
    }
}

/// The background deadline enforcer.
pub struct ExpirySweeper {
    engine: Arc<WagerEngine>,
}

impl ExpirySweeper {
    /// Create a sweeper over the engine.
    pub fn new(engine: Arc<WagerEngine>) -> Self {
        Self { engine }
    }

    /// Run one sweep iteration at `now`.
    pub fn sweep_once(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        for wager_id in self.engine.store().open_expired(now) {
            match self.engine.expire_at(now, &wager_id) {
                Ok(_) => {
                    report.expired += 1;
                    report.touched.push(wager_id);
                }
                // Lost the race to an acceptor or another sweep; the wager
                // is no longer stale-open.
                Err(EngineError::StateConflict { .. }) | Err(EngineError::NotYetExpired { .. }) => {
                    tracing::debug!(wager = %wager_id, "skipping expiry, state moved on");
                }
                Err(e) => {
                    tracing::warn!(wager = %wager_id, error = %e, "failed to expire wager");
                    report.errors += 1;
                }
            }
        }

        for wager_id in self
            .engine
            .store()
            .overdue_pending_result(now, self.engine.config().dispute_window())
        {
            match self.engine.finalize_overdue_at(now, &wager_id) {
                Ok(_) => {
                    report.finalized += 1;
                    report.touched.push(wager_id);
                }
                Err(EngineError::StateConflict { .. })
                | Err(EngineError::DisputeWindowOpen { .. }) => {
                    tracing::debug!(wager = %wager_id, "skipping default settlement, state moved on");
                }
                Err(e) => {
                    tracing::warn!(wager = %wager_id, error = %e, "failed to settle overdue wager");
                    report.errors += 1;
                }
            }
        }

        if report.is_noteworthy() {
            tracing::info!(
                expired = report.expired,
                finalized = report.finalized,
                errors = report.errors,
                "expiry sweep complete"
            );
        }
        report
    }

    /// Run one sweep at wall-clock time.
    pub fn sweep(&self) -> SweepReport {
        self.sweep_once(Utc::now())
    }
}

impl std::fmt::Debug for ExpirySweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpirySweeper").finish_non_exhaustive()
    }
}
