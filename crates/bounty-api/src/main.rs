// SPDX-License-Identifier: BUSL-1.1
//! # bounty-api entry point
//!
//! Parses service configuration, initializes tracing and (optionally)
//! Postgres, hydrates the wager store, spawns the expiry sweeper, and
//! serves the API with graceful shutdown on ctrl-c.

use clap::Parser;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use bounty_api::state::AppState;
use bounty_api::{app, bootstrap, db};
use bounty_core::Amount;
use bounty_engine::EngineConfig;

/// Bounty Stack API — peer-to-peer wager engine.
#[derive(Parser, Debug)]
#[command(name = "bounty-api", version, about, long_about = None)]
struct Args {
    /// Address to bind the HTTP listener to.
    #[arg(long, env = "BOUNTY_BIND_ADDR", default_value = "0.0.0.0:8080")]
    bind: String,

    /// Postgres connection URL; omit to run in-memory only.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Seconds between expiry sweeps.
    #[arg(long, env = "BOUNTY_SWEEP_INTERVAL_SECS", default_value_t = 60)]
    sweep_interval: u64,

    /// Minimum stake in minor units.
    #[arg(long, env = "BOUNTY_MIN_STAKE", default_value_t = 100)]
    min_stake: u64,

    /// Maximum stake in minor units.
    #[arg(long, env = "BOUNTY_MAX_STAKE", default_value_t = 10_000_000)]
    max_stake: u64,

    /// Platform fee in basis points of the stake.
    #[arg(long, env = "BOUNTY_FEE_BPS", default_value_t = 500)]
    fee_bps: u16,

    /// Emit logs as JSON.
    #[arg(long, env = "BOUNTY_JSON_LOGS")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = EngineConfig {
        min_stake: Amount::from_minor(args.min_stake),
        max_stake: Amount::from_minor(args.max_stake),
        fee_bps: args.fee_bps,
        sweep_interval_secs: args.sweep_interval,
        ..EngineConfig::default()
    };
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid engine configuration: {e}"))?;

    let pool = db::init_pool(args.database_url.as_deref()).await?;
    let state = AppState::with_config(config).with_db(pool);

    let hydrated = bootstrap::hydrate_from_db(&state).await?;
    tracing::info!(wagers = hydrated, "wager store ready");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper_handle = bootstrap::spawn_expiry_sweeper(state.clone(), shutdown_rx);

    let listener = tokio::net::TcpListener::bind(&args.bind).await?;
    tracing::info!(addr = %args.bind, "bounty-api listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    let _ = sweeper_handle.await;
    tracing::info!("bounty-api stopped");
    Ok(())
}
