// SPDX-License-Identifier: BUSL-1.1
//! # bounty-api — Axum API Service for the Bounty Stack
//!
//! HTTP surface over the wager engine: wager lifecycle, dispute
//! arbitration, sovereign wallet mode, Postgres persistence, Prometheus
//! metrics, and the expiry sweeper background task.
//!
//! ## API Surface
//!
//! | Prefix              | Module                  | Domain                |
//! |---------------------|-------------------------|-----------------------|
//! | `/v1/wagers/*`      | [`routes::wagers`]      | Wager lifecycle       |
//! | `/v1/disputes/*`    | [`routes::disputes`]    | Dispute arbitration   |
//! | `/v1/moderators`    | [`routes::disputes`]    | Moderator roster      |
//! | `/v1/wallet/*`      | [`routes::wallet`]      | Sovereign wallet mode |
//! | `/openapi.json`     | [`openapi`]             | OpenAPI spec          |
//! | `/health/*`, `/metrics` | here                | Probes & metrics      |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → Handler
//! ```
//!
//! Authentication is deliberately absent: caller identity is established
//! by the platform gateway in front of this service, and user ids arrive
//! as opaque UUIDs.

pub mod bootstrap;
pub mod db;
pub mod error;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use std::collections::HashMap;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Check if metrics are enabled via the `BOUNTY_METRICS_ENABLED` env var.
/// Defaults to `true` unless the variable is set to `"false"`.
fn metrics_enabled() -> bool {
    std::env::var("BOUNTY_METRICS_ENABLED")
        .map(|v| v.to_lowercase() != "false")
        .unwrap_or(true)
}

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) and `/metrics` are mounted outside the API
/// middleware so they stay reachable from orchestration probes.
pub fn app(state: AppState) -> Router {
    let metrics = ApiMetrics::new();
    let metrics_on = metrics_enabled();

    // Body size limit: 1 MiB. Wager payloads are small; this bounds
    // memory per request.
    let mut api = Router::new()
        .merge(routes::wagers::router())
        .merge(routes::disputes::router())
        .merge(routes::wallet::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(1024 * 1024));

    if metrics_on {
        api = api
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(Extension(metrics.clone()));
    }

    let api = api
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let mut unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    if metrics_on {
        unauthenticated = unauthenticated
            .route("/metrics", axum::routing::get(prometheus_metrics))
            .layer(Extension(metrics));
    }

    let unauthenticated = unauthenticated.with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// GET /metrics — Prometheus scrape endpoint.
///
/// Updates domain gauges from current state on each scrape (pull model),
/// then gathers and encodes everything in text exposition format.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    // Wagers by state.
    let records = state.engine.store().list_all();
    let mut by_state: HashMap<&'static str, usize> = HashMap::new();
    let mut open_disputes = 0usize;
    for record in &records {
        *by_state.entry(record.wager.state.as_str()).or_default() += 1;
        if record
            .dispute
            .as_ref()
            .map(|d| d.resolution.is_none())
            .unwrap_or(false)
        {
            open_disputes += 1;
        }
    }
    metrics.wagers_total().reset();
    for (st, count) in &by_state {
        metrics
            .wagers_total()
            .with_label_values(&[st])
            .set(*count as f64);
    }
    metrics.open_disputes_total().set(open_disputes as f64);
    metrics
        .moderators_total()
        .set(state.arbitration.moderators().len() as f64);

    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness probe — always 200 while the process runs.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — verifies the service can serve traffic.
///
/// Checks the in-memory store is reachable and, when configured, that the
/// database answers a ping.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    // Store reachable (a read never blocks on other wagers).
    let _ = state.engine.store().len();

    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }

    (StatusCode::OK, "ready").into_response()
}
