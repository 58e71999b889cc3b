// SPDX-License-Identifier: BUSL-1.1
//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the wager API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bounty Stack API — Peer-to-Peer Wager Engine",
        version = "0.3.2",
        description = "Peer-to-peer wager engine: one user stakes a sum against another in an informal challenge, the stake is held in escrow, the outcome is resolved cooperatively or via dispute arbitration, and funds are released to the winner minus the platform fee.\n\nProvides:\n- **Wager lifecycle** (create, accept, start, proof submission, cancel) with a 72-hour acceptance window\n- **Dispute arbitration** with a 24-hour dispute window and moderator rulings (confirm / reverse / void)\n- **Sovereign wallet mode** for zones without an external wallet service\n- **Prometheus metrics** and health probes",
        license(name = "BUSL-1.1"),
        contact(name = "OpenClash", url = "https://openclash.gg")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    paths(
        crate::routes::wagers::create_wager,
        crate::routes::wagers::list_wagers,
        crate::routes::wagers::get_wager,
        crate::routes::wagers::accept_wager,
        crate::routes::wagers::start_wager,
        crate::routes::wagers::submit_proof,
        crate::routes::wagers::open_dispute,
        crate::routes::wagers::cancel_wager,
        crate::routes::disputes::get_dispute,
        crate::routes::disputes::resolve_dispute,
        crate::routes::disputes::register_moderator,
        crate::routes::disputes::list_moderators,
        crate::routes::wallet::get_balance,
        crate::routes::wallet::deposit,
    ),
    components(schemas(
        crate::routes::wagers::CreateWagerRequest,
        crate::routes::wagers::AcceptWagerRequest,
        crate::routes::wagers::SubmitProofRequest,
        crate::routes::wagers::OpenDisputeRequest,
        crate::routes::wagers::CancelWagerRequest,
        crate::routes::wagers::WagerResponse,
        crate::routes::wagers::DisputeResponse,
        crate::routes::disputes::ResolveDisputeRequest,
        crate::routes::disputes::SettlementResponse,
        crate::routes::disputes::RegisterModeratorRequest,
        crate::routes::disputes::ModeratorsResponse,
        crate::routes::wallet::DepositRequest,
        crate::routes::wallet::BalanceResponse,
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "wagers", description = "Wager lifecycle operations"),
        (name = "disputes", description = "Dispute arbitration and moderation"),
        (name = "wallet", description = "Sovereign wallet mode"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(serve_openapi))
}

/// GET /openapi.json — the generated spec.
async fn serve_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_contains_wager_paths() {
        let spec = ApiDoc::openapi();
        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains("/v1/wagers"));
        assert!(json.contains("/v1/disputes/{id}/resolve"));
        assert!(json.contains("/v1/moderators"));
    }
}
