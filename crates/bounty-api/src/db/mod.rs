// SPDX-License-Identifier: BUSL-1.1
//! # Database Persistence Layer
//!
//! Optional Postgres persistence via SQLx. When a database URL is
//! configured, the service hydrates the in-memory store on boot and
//! upserts wager records after each mutation and sweep (write-behind).
//! When absent, the service runs in-memory only — suitable for
//! development and testing, with the caveat that state does not survive
//! restarts.
//!
//! What is persisted: wagers with their transition logs, acceptances,
//! proofs, and disputes. Wallet balances are NOT persisted here — they
//! belong to the wallet service.

pub mod wagers;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Initialize the connection pool and bootstrap the schema.
///
/// Returns `None` when no URL is configured (in-memory-only mode).
/// Returns `Err` when the URL is set but connection or schema bootstrap
/// fails.
pub async fn init_pool(database_url: Option<&str>) -> Result<Option<PgPool>, sqlx::Error> {
    let url = match database_url {
        Some(url) => url,
        None => {
            tracing::warn!(
                "no database configured — running in-memory only mode. \
                 Wagers will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    wagers::ensure_schema(&pool).await?;
    tracing::info!("Database schema ready");

    Ok(Some(pool))
}
