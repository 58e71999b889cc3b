//! Engine error hierarchy.
//!
//! Four classes, mirroring how the API surface reports them: validation
//! failures (rejected before any side effect), state conflicts (the current
//! state is returned so the caller can resync), escrow failures (abort the
//! whole operation), and not-found lookups.

use chrono::{DateTime, Utc};
use thiserror::Error;

use bounty_core::{Amount, DisputeId, UserId, ValidationError, WagerId};

use crate::escrow::WalletError;
use crate::wager::WagerState;

/// Errors returned by wager engine operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Stake outside the configured band. Rejected before any escrow call.
    #[error("invalid stake {stake}: allowed band is [{min}, {max}]")]
    InvalidStake {
        /// The offered stake.
        stake: Amount,
        /// Configured minimum.
        min: Amount,
        /// Configured maximum.
        max: Amount,
    },

    /// A user attempted to wager against themselves.
    #[error("{user} cannot take both sides of a wager")]
    SelfChallenge {
        /// The offending user.
        user: UserId,
    },

    /// Generic input validation failure.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The operation is not legal from the wager's current state.
    ///
    /// Carries the state observed under the record lock so the caller can
    /// resync instead of retrying blindly.
    #[error("operation '{operation}' is not legal while wager {wager_id} is {state}")]
    StateConflict {
        /// The wager.
        wager_id: WagerId,
        /// State at the time of the attempt.
        state: WagerState,
        /// The rejected operation.
        operation: &'static str,
    },

    /// A second, different user attempted to accept an accepted wager.
    #[error("wager {wager_id} has already been accepted by another user")]
    AlreadyAccepted {
        /// The wager.
        wager_id: WagerId,
    },

    /// The wager is restricted to a targeted opponent.
    #[error("wager {wager_id} is restricted to a targeted opponent")]
    TargetMismatch {
        /// The wager.
        wager_id: WagerId,
        /// The user who attempted to accept.
        acceptor: UserId,
    },

    /// Only the creator may cancel an open wager.
    #[error("only the creator may cancel wager {wager_id}")]
    NotCreator {
        /// The wager.
        wager_id: WagerId,
        /// The non-creator who attempted the cancel.
        actor: UserId,
    },

    /// The named user is neither creator nor acceptor of the wager.
    #[error("{user} is not a participant of wager {wager_id}")]
    NotParticipant {
        /// The wager.
        wager_id: WagerId,
        /// The non-participant.
        user: UserId,
    },

    /// Each participant may submit at most one proof.
    #[error("{submitter} has already submitted a proof for wager {wager_id}")]
    ProofAlreadySubmitted {
        /// The wager.
        wager_id: WagerId,
        /// The repeat submitter.
        submitter: UserId,
    },

    /// The submitter of the contested proof cannot dispute it.
    #[error("{user} submitted the contested proof for wager {wager_id} and cannot dispute it")]
    CannotDisputeOwnProof {
        /// The wager.
        wager_id: WagerId,
        /// The proof submitter.
        user: UserId,
    },

    /// The dispute window has closed; the claimed result stands.
    #[error("dispute window for wager {wager_id} closed at {deadline}")]
    DisputeWindowClosed {
        /// The wager.
        wager_id: WagerId,
        /// When the window closed.
        deadline: DateTime<Utc>,
    },

    /// Default settlement attempted while the dispute window is still open.
    #[error("dispute window for wager {wager_id} is open until {deadline}")]
    DisputeWindowOpen {
        /// The wager.
        wager_id: WagerId,
        /// When the window closes.
        deadline: DateTime<Utc>,
    },

    /// Expiry attempted before the acceptance deadline has passed.
    #[error("wager {wager_id} does not expire until {expires_at}")]
    NotYetExpired {
        /// The wager.
        wager_id: WagerId,
        /// The acceptance deadline.
        expires_at: DateTime<Utc>,
    },

    /// The creator's available balance cannot cover the stake.
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        /// Amount the operation needed.
        required: Amount,
        /// Amount actually available.
        available: Amount,
    },

    /// The wallet service failed or is unreachable. Retryable.
    #[error("escrow ledger unavailable: {0}")]
    LedgerUnavailable(String),

    /// Unknown wager id.
    #[error("wager not found: {0}")]
    WagerNotFound(WagerId),

    /// Unknown dispute id.
    #[error("dispute not found: {0}")]
    DisputeNotFound(DisputeId),

    /// The caller does not hold moderator capability.
    #[error("{user} does not hold moderator capability")]
    NotModerator {
        /// The caller.
        user: UserId,
    },

    /// No moderator is registered to take an assignment.
    #[error("no moderator is available for assignment")]
    NoModeratorAvailable,
}

impl From<WalletError> for EngineError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::InsufficientFunds {
                required,
                available,
            } => Self::InsufficientFunds {
                required,
                available,
            },
            WalletError::Unavailable(reason) => Self::LedgerUnavailable(reason),
        }
    }
}
