// SPDX-License-Identifier: BUSL-1.1
//! Route modules for the wager API surface.

pub mod disputes;
pub mod wagers;
pub mod wallet;

use bounty_core::WagerId;

use crate::state::AppState;

/// Write-behind persistence: after a successful mutation, upsert the
/// wager record when a database is configured. Failures are logged, not
/// surfaced — the in-memory store is the system of record and the row is
/// rewritten on the next mutation or sweep.
pub(crate) async fn persist(state: &AppState, wager_id: &WagerId) {
    let Some(pool) = &state.db_pool else {
        return;
    };
    match state.engine.get_record(wager_id) {
        Ok(record) => {
            if let Err(e) = crate::db::wagers::save_wager_record(pool, &record).await {
                tracing::warn!(wager = %wager_id, error = %e, "failed to persist wager record");
            }
        }
        Err(e) => {
            tracing::warn!(wager = %wager_id, error = %e, "wager vanished before persistence");
        }
    }
}
