// SPDX-License-Identifier: BUSL-1.1
//! # Service Bootstrap
//!
//! Database hydration and the expiry sweeper background task.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use bounty_engine::ExpirySweeper;

use crate::db;
use crate::state::AppState;

/// Restore the in-memory store from the database, when one is configured.
/// Returns the number of hydrated wagers.
pub async fn hydrate_from_db(state: &AppState) -> Result<usize, sqlx::Error> {
    let Some(pool) = &state.db_pool else {
        return Ok(0);
    };
    let records = db::wagers::load_all_wager_records(pool).await?;
    let count = records.len();
    state.engine.store().hydrate(records);
    if count > 0 {
        tracing::info!(wagers = count, "hydrated wager store from database");
    }
    Ok(count)
}

/// Spawn the expiry sweeper loop.
///
/// Ticks at the engine's configured sweep interval, force-expiring stale
/// open wagers and finalizing overdue pending results. Touched wagers are
/// persisted write-behind. Shuts down when the watch channel flips.
pub fn spawn_expiry_sweeper(
    state: AppState,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let interval_secs = state.engine.config().sweep_interval_secs.max(1);
    tokio::spawn(async move {
        let sweeper = ExpirySweeper::new(state.engine.clone());
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    tracing::info!("expiry sweeper shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let report = sweeper.sweep();
                    if let Some(pool) = &state.db_pool {
                        for wager_id in &report.touched {
                            match state.engine.get_record(wager_id) {
                                Ok(record) => {
                                    if let Err(e) =
                                        db::wagers::save_wager_record(pool, &record).await
                                    {
                                        tracing::warn!(
                                            wager = %wager_id,
                                            error = %e,
                                            "failed to persist swept wager"
                                        );
                                    }
                                }
                                Err(e) => {
                                    tracing::warn!(
                                        wager = %wager_id,
                                        error = %e,
                                        "swept wager vanished before persistence"
                                    );
                                }
                            }
                        }
                    }
                }
            }
        }
    })
}
