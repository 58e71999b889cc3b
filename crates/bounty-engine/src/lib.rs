//! # bounty-engine — Peer-to-Peer Wager Engine
//!
//! The wager ("bounty") engine of the platform: one user stakes a sum
//! against another in an informal challenge, the stake is held in escrow,
//! the outcome is resolved cooperatively or through dispute arbitration,
//! and funds are released to the winner minus the platform fee.
//!
//! - **Error** ([`error`]): structured error hierarchy for the engine.
//!
//! - **Config** ([`config`]): stake band, fee rate, and lifecycle windows.
//!
//! - **Wager** ([`wager`]): entities and the lifecycle state machine
//!   `OPEN → ACCEPTED → IN_PROGRESS → PENDING_RESULT → {DISPUTED →}
//!   COMPLETED`, with terminal `EXPIRED` and `CANCELLED` exits from `OPEN`.
//!
//! - **Escrow** ([`escrow`]): the wallet-service boundary. The only module
//!   that moves money; every call is idempotent per
//!   `(wager_id, operation_kind)`.
//!
//! - **Store** ([`store`]): thread-safe wager records with per-wager
//!   mutation serialization.
//!
//! - **Settlement** ([`settlement`]): pure consensus evaluation over the
//!   submitted proof set.
//!
//! - **Engine** ([`engine`]): the single entry point for every state
//!   transition; HTTP handlers and the sweeper share these code paths.
//!
//! - **Arbitration** ([`arbitration`]): moderator roster and the dispute
//!   resolution path.
//!
//! - **Sweeper** ([`sweeper`]): force-expires stale open wagers and
//!   finalizes overdue pending results.
//!
//! - **Events** ([`events`]): domain events emitted for the notification
//!   component.

pub mod arbitration;
pub mod config;
pub mod engine;
pub mod error;
pub mod escrow;
pub mod events;
pub mod settlement;
pub mod store;
pub mod sweeper;
pub mod wager;

// Re-export primary types for ergonomic imports.

pub use error::EngineError;

pub use config::EngineConfig;

pub use wager::{
    Acceptance, Dispute, DisputeResolution, Evidence, EvidenceKind, Proof, SettlementOutcome,
    TransitionRecord, Wager, WagerSnapshot, WagerState,
};

pub use escrow::{
    AccountBalances, EscrowLedger, EscrowOp, IdempotencyKey, InMemoryWallet, WalletError,
    WalletService,
};

pub use store::{WagerRecord, WagerStore};

pub use settlement::{evaluate_proofs, ProofConsensus};

pub use engine::WagerEngine;

pub use arbitration::DisputeArbitrationService;

pub use sweeper::{ExpirySweeper, SweepReport};

pub use events::{BufferingSink, EventSink, TracingSink, WagerEvent};
