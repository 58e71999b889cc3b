// SPDX-License-Identifier: BUSL-1.1
//! # Sovereign Wallet Routes
//!
//! Balance queries and deposits against the in-process wallet. Only
//! meaningful in sovereign wallet mode (the default); zones wired to the
//! platform wallet service manage balances there instead.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use bounty_core::{Amount, UserId};

use crate::error::AppError;
use crate::state::AppState;

/// Request to credit a user's available balance.
#[derive(Debug, Deserialize, ToSchema)]
pub struct DepositRequest {
    /// Minor units to credit.
    pub amount: u64,
}

/// A user's balances.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    pub user_id: String,
    /// Spendable minor units.
    pub available: u64,
    /// Minor units held in escrow.
    pub escrow: u64,
}

/// Build the wallet router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/wallet/:user_id", get(get_balance))
        .route("/v1/wallet/:user_id/deposit", post(deposit))
}

/// GET /v1/wallet/:user_id — Current balances.
#[utoipa::path(
    get,
    path = "/v1/wallet/{user_id}",
    params(("user_id" = Uuid, Path, description = "User UUID")),
    responses(
        (status = 200, description = "User balances", body = BalanceResponse),
    ),
    tag = "wallet"
)]
async fn get_balance(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Json<BalanceResponse> {
    let user = UserId::from_uuid(user_id);
    let balances = state.wallet.balance_of(&user);
    Json(BalanceResponse {
        user_id: user_id.to_string(),
        available: balances.available.minor(),
        escrow: balances.escrow.minor(),
    })
}

/// POST /v1/wallet/:user_id/deposit — Credit available balance.
#[utoipa::path(
    post,
    path = "/v1/wallet/{user_id}/deposit",
    params(("user_id" = Uuid, Path, description = "User UUID")),
    request_body = DepositRequest,
    responses(
        (status = 200, description = "Balance after the deposit", body = BalanceResponse),
        (status = 422, description = "Zero deposit"),
    ),
    tag = "wallet"
)]
async fn deposit(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<DepositRequest>,
) -> Result<(StatusCode, Json<BalanceResponse>), AppError> {
    if req.amount == 0 {
        return Err(AppError::Validation("amount must be positive".to_string()));
    }
    let user = UserId::from_uuid(user_id);
    state.wallet.deposit(&user, Amount::from_minor(req.amount));
    let balances = state.wallet.balance_of(&user);
    Ok((
        StatusCode::OK,
        Json(BalanceResponse {
            user_id: user_id.to_string(),
            available: balances.available.minor(),
            escrow: balances.escrow.minor(),
        }),
    ))
}
