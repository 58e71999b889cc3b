// SPDX-License-Identifier: BUSL-1.1
//! # Application State
//!
//! Shared state for all route handlers: the wager engine, the arbitration
//! service, the sovereign-mode wallet, and the optional Postgres pool.

use std::sync::Arc;

use sqlx::PgPool;

use bounty_engine::{
    DisputeArbitrationService, EngineConfig, InMemoryWallet, TracingSink, WagerEngine,
};

/// Shared application state. Cheap to clone; everything inside is `Arc`ed.
#[derive(Clone)]
pub struct AppState {
    /// The wager lifecycle engine.
    pub engine: Arc<WagerEngine>,
    /// Moderator roster and dispute resolution.
    pub arbitration: Arc<DisputeArbitrationService>,
    /// The in-process wallet (sovereign wallet mode). Production zones
    /// replace this boundary with the platform wallet service.
    pub wallet: Arc<InMemoryWallet>,
    /// Postgres pool when persistence is configured.
    pub db_pool: Option<PgPool>,
}

impl AppState {
    /// Build state with the default engine configuration, no database.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Build state with an explicit engine configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        let wallet = Arc::new(InMemoryWallet::new());
        let engine = Arc::new(WagerEngine::new(
            config,
            wallet.clone(),
            Arc::new(TracingSink),
        ));
        let arbitration = Arc::new(DisputeArbitrationService::new(engine.clone()));
        Self {
            engine,
            arbitration,
            wallet,
            db_pool: None,
        }
    }

    /// Attach a Postgres pool.
    pub fn with_db(mut self, pool: Option<PgPool>) -> Self {
        self.db_pool = pool;
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("engine", &self.engine)
            .field("db", &self.db_pool.is_some())
            .finish()
    }
}
