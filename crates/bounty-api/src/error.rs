// SPDX-License-Identifier: BUSL-1.1
//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps engine errors to HTTP status codes with machine-readable reason
//! codes. State conflicts carry the wager's current state in the details
//! so the caller can resync. Internal error details are never exposed to
//! clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use bounty_engine::EngineError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "STATE_CONFLICT").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional context, present only for client errors (e.g. the
    /// current wager state on a conflict).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed before any side effect (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// The caller may not perform this operation (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Operation illegal in the wager's current state (409). Carries the
    /// observed state for caller resync.
    #[error("conflict: {message}")]
    Conflict {
        /// What went wrong.
        message: String,
        /// The wager state observed under the record lock.
        state: Option<String>,
    },

    /// The stake could not be covered (422, client-actionable).
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    /// The escrow ledger is unavailable (503, retryable).
    #[error("escrow unavailable: {0}")]
    EscrowUnavailable(String),

    /// Internal server error (500). Message is logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict { .. } => (StatusCode::CONFLICT, "STATE_CONFLICT"),
            Self::InsufficientFunds(_) => (StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_FUNDS"),
            Self::EscrowUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "ESCROW_UNAVAILABLE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal error messages to clients.
        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        let details = match &self {
            Self::Conflict {
                state: Some(state), ..
            } => Some(serde_json::json!({ "state": state })),
            _ => None,
        };

        // Log server-side errors for operator visibility.
        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::EscrowUnavailable(_) => tracing::warn!(error = %self, "escrow unavailable"),
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match &err {
            EngineError::InvalidStake { .. }
            | EngineError::SelfChallenge { .. }
            | EngineError::Validation(_) => Self::Validation(err.to_string()),

            EngineError::StateConflict { state, .. } => Self::Conflict {
                message: err.to_string(),
                state: Some(state.as_str().to_string()),
            },
            EngineError::AlreadyAccepted { .. }
            | EngineError::ProofAlreadySubmitted { .. }
            | EngineError::DisputeWindowClosed { .. }
            | EngineError::DisputeWindowOpen { .. }
            | EngineError::NotYetExpired { .. } => Self::Conflict {
                message: err.to_string(),
                state: None,
            },

            EngineError::NotCreator { .. }
            | EngineError::NotParticipant { .. }
            | EngineError::TargetMismatch { .. }
            | EngineError::CannotDisputeOwnProof { .. }
            | EngineError::NotModerator { .. } => Self::Forbidden(err.to_string()),

            EngineError::InsufficientFunds { .. } => Self::InsufficientFunds(err.to_string()),
            EngineError::LedgerUnavailable(_) | EngineError::NoModeratorAvailable => {
                Self::EscrowUnavailable(err.to_string())
            }

            EngineError::WagerNotFound(_) | EngineError::DisputeNotFound(_) => {
                Self::NotFound(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bounty_core::{Amount, UserId, WagerId};
    use bounty_engine::WagerState;

    #[test]
    fn engine_validation_maps_to_422() {
        let err = AppError::from(EngineError::InvalidStake {
            stake: Amount::from_minor(1),
            min: Amount::from_minor(100),
            max: Amount::from_minor(1000),
        });
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(code, "VALIDATION_ERROR");
    }

    #[test]
    fn state_conflict_maps_to_409_with_state() {
        let err = AppError::from(EngineError::StateConflict {
            wager_id: WagerId::new(),
            state: WagerState::Completed,
            operation: "accept",
        });
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(code, "STATE_CONFLICT");
        match err {
            AppError::Conflict { state, .. } => assert_eq!(state.as_deref(), Some("COMPLETED")),
            other => panic!("expected Conflict, got: {other:?}"),
        }
    }

    #[test]
    fn insufficient_funds_maps_to_422() {
        let err = AppError::from(EngineError::InsufficientFunds {
            required: Amount::from_minor(1000),
            available: Amount::from_minor(10),
        });
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(code, "INSUFFICIENT_FUNDS");
    }

    #[test]
    fn ledger_unavailable_maps_to_503() {
        let err = AppError::from(EngineError::LedgerUnavailable("down".into()));
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(code, "ESCROW_UNAVAILABLE");
    }

    #[test]
    fn permission_errors_map_to_403() {
        let err = AppError::from(EngineError::NotModerator {
            user: UserId::new(),
        });
        let (status, _) = err.status_and_code();
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn not_found_maps_to_404() {
        let err = AppError::from(EngineError::WagerNotFound(WagerId::new()));
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(code, "NOT_FOUND");
    }

    #[test]
    fn error_body_skips_absent_details() {
        let body = ErrorBody {
            error: ErrorDetail {
                code: "NOT_FOUND".to_string(),
                message: "missing".to_string(),
                details: None,
            },
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("details"));
    }

    use http_body_util::BodyExt;

    #[tokio::test]
    async fn into_response_internal_hides_details() {
        let response = AppError::Internal("db password leaked".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error.message, "An internal error occurred");
        assert!(!body.error.message.contains("password"));
    }

    #[tokio::test]
    async fn into_response_conflict_carries_state() {
        let err = AppError::from(EngineError::StateConflict {
            wager_id: WagerId::new(),
            state: WagerState::Expired,
            operation: "accept",
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body.error.details.unwrap()["state"],
            serde_json::json!("EXPIRED")
        );
    }
}
