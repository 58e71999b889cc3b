// SPDX-License-Identifier: BUSL-1.1
//! # Dispute & Moderation Routes
//!
//! Dispute lookup, moderator roster management, and the resolution
//! endpoint. Resolution goes through the arbitration service, which
//! verifies roster membership before delegating to the engine.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use bounty_core::DisputeId;
use bounty_engine::DisputeResolution;

use crate::error::AppError;
use crate::routes::persist;
use crate::routes::wagers::{dispute_to_response, parse_user_id, DisputeResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Request to resolve a dispute.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ResolveDisputeRequest {
    /// Resolving moderator UUID; must be on the roster.
    pub moderator_id: String,
    /// Ruling: confirm_original | reverse | void.
    pub outcome: String,
}

/// The settlement that a resolution produced.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SettlementResponse {
    /// Winner UUID, absent on a void ruling.
    pub winner_id: Option<String>,
    /// Minor units released to the winner (or refunded on void).
    pub payout_amount: u64,
    /// Minor units collected by the platform. Zero on void.
    pub platform_fee: u64,
    /// When settlement completed.
    pub settled_at: String,
}

/// Request to register a moderator.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterModeratorRequest {
    /// Moderator user UUID.
    pub user_id: String,
}

/// The moderator roster.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ModeratorsResponse {
    pub moderator_ids: Vec<String>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the dispute/moderation router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/disputes/:id", get(get_dispute))
        .route("/v1/disputes/:id/resolve", post(resolve_dispute))
        .route("/v1/moderators", post(register_moderator).get(list_moderators))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn parse_outcome(value: &str) -> Result<DisputeResolution, AppError> {
    match value {
        "confirm_original" => Ok(DisputeResolution::ConfirmOriginal),
        "reverse" => Ok(DisputeResolution::Reverse),
        "void" => Ok(DisputeResolution::Void),
        other => Err(AppError::Validation(format!("unknown outcome: '{other}'"))),
    }
}

/// GET /v1/disputes/:id — Dispute details.
#[utoipa::path(
    get,
    path = "/v1/disputes/{id}",
    params(("id" = Uuid, Path, description = "Dispute UUID")),
    responses(
        (status = 200, description = "Dispute details", body = DisputeResponse),
        (status = 404, description = "Unknown dispute"),
    ),
    tag = "disputes"
)]
async fn get_dispute(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DisputeResponse>, AppError> {
    let dispute = state.engine.get_dispute(&DisputeId::from_uuid(id))?;
    Ok(Json(dispute_to_response(&dispute)))
}

/// POST /v1/disputes/:id/resolve — Render a moderator ruling and settle.
#[utoipa::path(
    post,
    path = "/v1/disputes/{id}/resolve",
    params(("id" = Uuid, Path, description = "Dispute UUID")),
    request_body = ResolveDisputeRequest,
    responses(
        (status = 200, description = "Dispute resolved; wager settled", body = SettlementResponse),
        (status = 403, description = "Caller is not a registered moderator"),
        (status = 404, description = "Unknown dispute"),
        (status = 503, description = "Escrow ledger unavailable"),
    ),
    tag = "disputes"
)]
async fn resolve_dispute(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ResolveDisputeRequest>,
) -> Result<Json<SettlementResponse>, AppError> {
    let dispute_id = DisputeId::from_uuid(id);
    let moderator = parse_user_id("moderator_id", &req.moderator_id)?;
    let outcome = parse_outcome(&req.outcome)?;

    let settlement = state
        .arbitration
        .resolve(&dispute_id, &moderator, outcome)?;
    if let Some(wager_id) = state.engine.find_by_dispute(&dispute_id) {
        persist(&state, &wager_id).await;
    }

    Ok(Json(SettlementResponse {
        winner_id: settlement.winner.as_ref().map(|u| u.as_uuid().to_string()),
        payout_amount: settlement.payout.minor(),
        platform_fee: settlement.fee.minor(),
        settled_at: settlement.settled_at.to_rfc3339(),
    }))
}

/// POST /v1/moderators — Register a moderator.
#[utoipa::path(
    post,
    path = "/v1/moderators",
    request_body = RegisterModeratorRequest,
    responses(
        (status = 201, description = "Moderator registered", body = ModeratorsResponse),
        (status = 422, description = "Invalid user id"),
    ),
    tag = "disputes"
)]
async fn register_moderator(
    State(state): State<AppState>,
    Json(req): Json<RegisterModeratorRequest>,
) -> Result<(axum::http::StatusCode, Json<ModeratorsResponse>), AppError> {
    let moderator = parse_user_id("user_id", &req.user_id)?;
    state.arbitration.register_moderator(moderator);
    Ok((
        axum::http::StatusCode::CREATED,
        Json(roster_response(&state)),
    ))
}

/// GET /v1/moderators — The moderator roster.
#[utoipa::path(
    get,
    path = "/v1/moderators",
    responses(
        (status = 200, description = "Moderator roster", body = ModeratorsResponse),
    ),
    tag = "disputes"
)]
async fn list_moderators(State(state): State<AppState>) -> Json<ModeratorsResponse> {
    Json(roster_response(&state))
}

fn roster_response(state: &AppState) -> ModeratorsResponse {
    ModeratorsResponse {
        moderator_ids: state
            .arbitration
            .moderators()
            .iter()
            .map(|u| u.as_uuid().to_string())
            .collect(),
    }
}
