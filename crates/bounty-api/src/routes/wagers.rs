// SPDX-License-Identifier: BUSL-1.1
//! # Wager API Routes
//!
//! HTTP surface for the wager lifecycle. Every mutating endpoint delegates
//! to the engine's single transition path and returns a wager snapshot
//! with the derived fields (`is_expired`, `can_dispute`,
//! `dispute_deadline`) computed at response time.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use bounty_core::{Amount, UserId, WagerId};
use bounty_engine::{Evidence, EvidenceKind, WagerSnapshot};

use crate::error::AppError;
use crate::routes::persist;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Request to create a wager.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateWagerRequest {
    /// Creator user UUID.
    pub creator_id: String,
    /// Stake in minor units.
    pub stake_amount: u64,
    /// The game the challenge is played in.
    pub game: String,
    /// Restrict acceptance to this user UUID (optional).
    pub target_user_id: Option<String>,
    /// Free-form challenge description.
    #[serde(default)]
    pub description: String,
}

/// Request to accept a wager.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AcceptWagerRequest {
    /// Accepting user UUID.
    pub acceptor_id: String,
}

/// Request to submit a result proof.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitProofRequest {
    /// Submitting participant UUID.
    pub submitter_id: String,
    /// UUID of the participant the submitter claims won.
    pub claimed_winner_id: String,
    /// Evidence URL (screenshot, VOD, match log).
    pub evidence_url: String,
    /// Evidence kind: screenshot | video | match_log | other.
    pub evidence_kind: String,
}

/// Request to contest a claimed result.
#[derive(Debug, Deserialize, ToSchema)]
pub struct OpenDisputeRequest {
    /// Disputing participant UUID.
    pub disputer_id: String,
    /// Why the result is contested.
    pub reason: String,
}

/// Request to cancel an open wager.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CancelWagerRequest {
    /// The acting user UUID; must be the creator.
    pub actor_id: String,
}

/// Query for listing a user's active wagers.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListWagersQuery {
    /// User UUID whose active wagers to list.
    pub user_id: String,
}

/// Wager snapshot in API responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WagerResponse {
    pub wager_id: String,
    pub state: String,
    pub creator_id: String,
    pub acceptor_id: Option<String>,
    pub target_user_id: Option<String>,
    pub winner_id: Option<String>,
    pub game: String,
    pub description: String,
    pub stake_amount: u64,
    pub payout_amount: Option<u64>,
    pub platform_fee: Option<u64>,
    pub created_at: String,
    pub accepted_at: Option<String>,
    pub started_at: Option<String>,
    pub result_submitted_at: Option<String>,
    pub completed_at: Option<String>,
    pub expires_at: String,
    /// Derived: whether the acceptance deadline has passed while open.
    pub is_expired: bool,
    /// Derived: whether a dispute could be opened right now.
    pub can_dispute: bool,
    /// Derived: when the dispute window closes.
    pub dispute_deadline: Option<String>,
    pub proof_count: usize,
    pub has_dispute: bool,
}

/// Dispute summary returned when a dispute is opened.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DisputeResponse {
    pub dispute_id: String,
    pub wager_id: String,
    pub disputer_id: String,
    pub reason: String,
    pub moderator_id: Option<String>,
    pub resolution: Option<String>,
    pub resolved_by: Option<String>,
    pub opened_at: String,
    pub resolved_at: Option<String>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the wager lifecycle router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/wagers", post(create_wager).get(list_wagers))
        .route("/v1/wagers/:id", get(get_wager))
        .route("/v1/wagers/:id/accept", post(accept_wager))
        .route("/v1/wagers/:id/start", post(start_wager))
        .route("/v1/wagers/:id/proofs", post(submit_proof))
        .route("/v1/wagers/:id/dispute", post(open_dispute))
        .route("/v1/wagers/:id/cancel", post(cancel_wager))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn parse_user_id(field: &'static str, value: &str) -> Result<UserId, AppError> {
    Uuid::parse_str(value)
        .map(UserId::from_uuid)
        .map_err(|e| AppError::Validation(format!("invalid {field}: {e}")))
}

fn parse_evidence_kind(value: &str) -> Result<EvidenceKind, AppError> {
    match value {
        "screenshot" => Ok(EvidenceKind::Screenshot),
        "video" => Ok(EvidenceKind::Video),
        "match_log" => Ok(EvidenceKind::MatchLog),
        "other" => Ok(EvidenceKind::Other),
        other => Err(AppError::Validation(format!(
            "unknown evidence_kind: '{other}'"
        ))),
    }
}

fn wager_path_id(id: Uuid) -> WagerId {
    WagerId::from_uuid(id)
}

pub(crate) fn snapshot_to_response(snap: &WagerSnapshot) -> WagerResponse {
    WagerResponse {
        wager_id: snap.wager_id.as_uuid().to_string(),
        state: snap.state.as_str().to_string(),
        creator_id: snap.creator.as_uuid().to_string(),
        acceptor_id: snap.acceptor.as_ref().map(|u| u.as_uuid().to_string()),
        target_user_id: snap.target_user.as_ref().map(|u| u.as_uuid().to_string()),
        winner_id: snap.winner.as_ref().map(|u| u.as_uuid().to_string()),
        game: snap.game.clone(),
        description: snap.description.clone(),
        stake_amount: snap.stake_amount.minor(),
        payout_amount: snap.payout_amount.map(|a| a.minor()),
        platform_fee: snap.platform_fee.map(|a| a.minor()),
        created_at: snap.created_at.to_rfc3339(),
        accepted_at: snap.accepted_at.map(|t| t.to_rfc3339()),
        started_at: snap.started_at.map(|t| t.to_rfc3339()),
        result_submitted_at: snap.result_submitted_at.map(|t| t.to_rfc3339()),
        completed_at: snap.completed_at.map(|t| t.to_rfc3339()),
        expires_at: snap.expires_at.to_rfc3339(),
        is_expired: snap.is_expired,
        can_dispute: snap.can_dispute,
        dispute_deadline: snap.dispute_deadline.map(|t| t.to_rfc3339()),
        proof_count: snap.proof_count,
        has_dispute: snap.has_dispute,
    }
}

pub(crate) fn dispute_to_response(d: &bounty_engine::Dispute) -> DisputeResponse {
    DisputeResponse {
        dispute_id: d.id.as_uuid().to_string(),
        wager_id: d.wager_id.as_uuid().to_string(),
        disputer_id: d.disputer.as_uuid().to_string(),
        reason: d.reason.clone(),
        moderator_id: d.moderator.as_ref().map(|u| u.as_uuid().to_string()),
        resolution: d.resolution.map(|r| r.as_str().to_string()),
        resolved_by: d.resolved_by.as_ref().map(|u| u.as_uuid().to_string()),
        opened_at: d.opened_at.to_rfc3339(),
        resolved_at: d.resolved_at.map(|t| t.to_rfc3339()),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/wagers — Create a wager, escrowing the stake.
#[utoipa::path(
    post,
    path = "/v1/wagers",
    request_body = CreateWagerRequest,
    responses(
        (status = 201, description = "Wager created", body = WagerResponse),
        (status = 422, description = "Validation failure or insufficient funds"),
        (status = 503, description = "Escrow ledger unavailable"),
    ),
    tag = "wagers"
)]
async fn create_wager(
    State(state): State<AppState>,
    Json(req): Json<CreateWagerRequest>,
) -> Result<(StatusCode, Json<WagerResponse>), AppError> {
    let creator = parse_user_id("creator_id", &req.creator_id)?;
    let target_user = req
        .target_user_id
        .as_deref()
        .map(|s| parse_user_id("target_user_id", s))
        .transpose()?;

    let snapshot = state.engine.create(
        creator,
        Amount::from_minor(req.stake_amount),
        req.game,
        target_user,
        req.description,
    )?;
    persist(&state, &snapshot.wager_id).await;

    Ok((StatusCode::CREATED, Json(snapshot_to_response(&snapshot))))
}

/// GET /v1/wagers?user_id= — List a user's active wagers, newest first.
#[utoipa::path(
    get,
    path = "/v1/wagers",
    params(("user_id" = String, Query, description = "User UUID")),
    responses(
        (status = 200, description = "Active wagers for the user", body = Vec<WagerResponse>),
        (status = 422, description = "Invalid user id"),
    ),
    tag = "wagers"
)]
async fn list_wagers(
    State(state): State<AppState>,
    Query(query): Query<ListWagersQuery>,
) -> Result<Json<Vec<WagerResponse>>, AppError> {
    let user = parse_user_id("user_id", &query.user_id)?;
    let snapshots = state.engine.list_active(&user);
    Ok(Json(snapshots.iter().map(snapshot_to_response).collect()))
}

/// GET /v1/wagers/:id — Wager snapshot with derived fields.
#[utoipa::path(
    get,
    path = "/v1/wagers/{id}",
    params(("id" = Uuid, Path, description = "Wager UUID")),
    responses(
        (status = 200, description = "Wager snapshot", body = WagerResponse),
        (status = 404, description = "Unknown wager"),
    ),
    tag = "wagers"
)]
async fn get_wager(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<WagerResponse>, AppError> {
    let snapshot = state.engine.get(&wager_path_id(id))?;
    Ok(Json(snapshot_to_response(&snapshot)))
}

/// POST /v1/wagers/:id/accept — Accept an open wager.
#[utoipa::path(
    post,
    path = "/v1/wagers/{id}/accept",
    params(("id" = Uuid, Path, description = "Wager UUID")),
    request_body = AcceptWagerRequest,
    responses(
        (status = 200, description = "Wager accepted (idempotent)", body = WagerResponse),
        (status = 403, description = "Self-accept or target mismatch"),
        (status = 409, description = "Already accepted or not open"),
    ),
    tag = "wagers"
)]
async fn accept_wager(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AcceptWagerRequest>,
) -> Result<Json<WagerResponse>, AppError> {
    let wager_id = wager_path_id(id);
    let acceptor = parse_user_id("acceptor_id", &req.acceptor_id)?;

    let result = state.engine.accept(&wager_id, acceptor);
    // Lazy expiry may have flipped the record even on a conflict.
    persist(&state, &wager_id).await;
    result?;

    let snapshot = state.engine.get(&wager_id)?;
    Ok(Json(snapshot_to_response(&snapshot)))
}

/// POST /v1/wagers/:id/start — Mark the match as underway.
#[utoipa::path(
    post,
    path = "/v1/wagers/{id}/start",
    params(("id" = Uuid, Path, description = "Wager UUID")),
    responses(
        (status = 200, description = "Match started", body = WagerResponse),
        (status = 409, description = "Wager is not accepted"),
    ),
    tag = "wagers"
)]
async fn start_wager(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<WagerResponse>, AppError> {
    let wager_id = wager_path_id(id);
    let snapshot = state.engine.start(&wager_id)?;
    persist(&state, &wager_id).await;
    Ok(Json(snapshot_to_response(&snapshot)))
}

/// POST /v1/wagers/:id/proofs — Submit a result proof.
#[utoipa::path(
    post,
    path = "/v1/wagers/{id}/proofs",
    params(("id" = Uuid, Path, description = "Wager UUID")),
    request_body = SubmitProofRequest,
    responses(
        (status = 200, description = "Proof recorded; settles immediately when both proofs agree", body = WagerResponse),
        (status = 403, description = "Submitter or claimed winner is not a participant"),
        (status = 409, description = "Repeat submission or wrong state"),
    ),
    tag = "wagers"
)]
async fn submit_proof(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SubmitProofRequest>,
) -> Result<Json<WagerResponse>, AppError> {
    let wager_id = wager_path_id(id);
    let submitter = parse_user_id("submitter_id", &req.submitter_id)?;
    let claimed_winner = parse_user_id("claimed_winner_id", &req.claimed_winner_id)?;
    let evidence = Evidence {
        url: req.evidence_url,
        kind: parse_evidence_kind(&req.evidence_kind)?,
    };

    let snapshot = state
        .engine
        .submit_proof(&wager_id, submitter, claimed_winner, evidence)?;
    persist(&state, &wager_id).await;
    Ok(Json(snapshot_to_response(&snapshot)))
}

/// POST /v1/wagers/:id/dispute — Contest the claimed result.
#[utoipa::path(
    post,
    path = "/v1/wagers/{id}/dispute",
    params(("id" = Uuid, Path, description = "Wager UUID")),
    request_body = OpenDisputeRequest,
    responses(
        (status = 201, description = "Dispute opened", body = DisputeResponse),
        (status = 403, description = "Caller submitted the contested proof"),
        (status = 409, description = "Window closed or wrong state"),
    ),
    tag = "wagers"
)]
async fn open_dispute(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<OpenDisputeRequest>,
) -> Result<(StatusCode, Json<DisputeResponse>), AppError> {
    let wager_id = wager_path_id(id);
    let disputer = parse_user_id("disputer_id", &req.disputer_id)?;

    let dispute = state
        .engine
        .open_dispute(&wager_id, disputer, req.reason)?;

    // Hand the dispute to the next moderator when a roster exists.
    let dispute = match state.arbitration.assign(&dispute.id) {
        Ok(assigned) => assigned,
        Err(bounty_engine::EngineError::NoModeratorAvailable) => dispute,
        Err(e) => {
            tracing::warn!(dispute = %dispute.id, error = %e, "moderator assignment failed");
            dispute
        }
    };
    persist(&state, &wager_id).await;

    Ok((StatusCode::CREATED, Json(dispute_to_response(&dispute))))
}

/// POST /v1/wagers/:id/cancel — Withdraw an open wager (creator only).
#[utoipa::path(
    post,
    path = "/v1/wagers/{id}/cancel",
    params(("id" = Uuid, Path, description = "Wager UUID")),
    request_body = CancelWagerRequest,
    responses(
        (status = 200, description = "Wager cancelled and refunded", body = WagerResponse),
        (status = 403, description = "Caller is not the creator"),
        (status = 409, description = "Wager is not open"),
    ),
    tag = "wagers"
)]
async fn cancel_wager(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CancelWagerRequest>,
) -> Result<Json<WagerResponse>, AppError> {
    let wager_id = wager_path_id(id);
    let actor = parse_user_id("actor_id", &req.actor_id)?;

    let result = state.engine.cancel(&wager_id, actor);
    persist(&state, &wager_id).await;
    let snapshot = result?;
    Ok(Json(snapshot_to_response(&snapshot)))
}
