//! # Wager Lifecycle
//!
//! Entities and the lifecycle state machine:
//! `OPEN → ACCEPTED → IN_PROGRESS → PENDING_RESULT → {DISPUTED → COMPLETED,
//! COMPLETED}`, with `OPEN` also exiting to `CANCELLED` (creator cancels)
//! and `EXPIRED` (acceptance timeout).
//!
//! ## Design Choice: Validated Enum over Typestate
//!
//! The state is a runtime-checked enum rather than a typestate. Three
//! factors drive this decision:
//!
//! 1. **Multi-source transitions.** Settlement is reached from both
//!    `PENDING_RESULT` (proofs agree, or window expiry) and `DISPUTED`
//!    (moderator ruling). Typestate would duplicate the settlement logic
//!    across `impl` blocks.
//!
//! 2. **Serialization frequency.** Wagers are stored in databases and
//!    returned from APIs where the state is not known at compile time.
//!
//! 3. **One precondition check per operation.** Every mutating operation
//!    validates the current state under the record lock and returns the
//!    observed state on conflict, which is all the safety typestate would
//!    buy here.
//!
//! A void dispute resolution still produces a `COMPLETED` wager with
//! `winner = None` and a full refund; void is a settlement outcome, not a
//! distinct state.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use bounty_core::{Amount, DisputeId, ProofId, UserId, WagerId};

use crate::error::EngineError;

// ── Wager State ────────────────────────────────────────────────────────

/// The lifecycle state of a wager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WagerState {
    /// Created and escrowed, awaiting an acceptor.
    Open,
    /// An opponent has accepted; the match has not started.
    Accepted,
    /// The match is underway.
    InProgress,
    /// At least one result proof has been submitted; the dispute window
    /// runs from the first submission.
    PendingResult,
    /// The non-submitting participant contested the claimed result.
    Disputed,
    /// Settled: payout released, fee collected (or fully refunded on a
    /// void ruling). Terminal state.
    Completed,
    /// No one accepted within the acceptance window. Terminal state.
    Expired,
    /// Withdrawn by the creator before acceptance. Terminal state.
    Cancelled,
}

impl WagerState {
    /// The canonical string name of this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Accepted => "ACCEPTED",
            Self::InProgress => "IN_PROGRESS",
            Self::PendingResult => "PENDING_RESULT",
            Self::Disputed => "DISPUTED",
            Self::Completed => "COMPLETED",
            Self::Expired => "EXPIRED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Whether this state is terminal (no further transitions allowed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Expired | Self::Cancelled)
    }

    /// Valid target states from this state.
    pub fn valid_transitions(&self) -> &'static [WagerState] {
        match self {
            Self::Open => &[Self::Accepted, Self::Cancelled, Self::Expired],
            Self::Accepted => &[Self::InProgress],
            Self::InProgress => &[Self::PendingResult],
            Self::PendingResult => &[Self::Disputed, Self::Completed],
            Self::Disputed => &[Self::Completed],
            Self::Completed | Self::Expired | Self::Cancelled => &[],
        }
    }
}

impl std::fmt::Display for WagerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ── Evidence ───────────────────────────────────────────────────────────

/// The medium of a result proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvidenceKind {
    /// A screenshot of the result screen.
    Screenshot,
    /// A recorded video or stream clip.
    Video,
    /// An exported match log.
    MatchLog,
    /// Anything else.
    Other,
}

impl EvidenceKind {
    /// The canonical string identifier for serialization.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Screenshot => "screenshot",
            Self::Video => "video",
            Self::MatchLog => "match_log",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for EvidenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Evidence attached to a result proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// Where the evidence lives (screenshot URL, VOD link, ...).
    pub url: String,
    /// What kind of artifact the URL points at.
    pub kind: EvidenceKind,
}

// ── Child entities ─────────────────────────────────────────────────────

/// The single acceptance of a wager. Immutable once written; creating it
/// is the transition `OPEN → ACCEPTED`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acceptance {
    /// The wager accepted.
    pub wager_id: WagerId,
    /// The accepting user.
    pub acceptor: UserId,
    /// When the wager was accepted (UTC).
    pub accepted_at: DateTime<Utc>,
}

/// A result submission. Append-only; the *set* of proofs determines the
/// settlement outcome, never a single entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// Unique proof identifier.
    pub id: ProofId,
    /// The wager this proof belongs to.
    pub wager_id: WagerId,
    /// The participant who submitted.
    pub submitter: UserId,
    /// The participant the submitter claims won.
    pub claimed_winner: UserId,
    /// Supporting evidence.
    pub evidence: Evidence,
    /// When the proof was submitted (UTC).
    pub submitted_at: DateTime<Utc>,
}

/// A moderator ruling on a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisputeResolution {
    /// The originally claimed winner stands.
    ConfirmOriginal,
    /// The other participant wins instead.
    Reverse,
    /// No winner; the creator is refunded in full and no fee is taken.
    Void,
}

impl DisputeResolution {
    /// The canonical string identifier for serialization.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfirmOriginal => "confirm_original",
            Self::Reverse => "reverse",
            Self::Void => "void",
        }
    }
}

impl std::fmt::Display for DisputeResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A contested result. 1:1 with its wager; immutable once resolved except
/// for the resolution fields, which are written exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispute {
    /// Unique dispute identifier.
    pub id: DisputeId,
    /// The wager under dispute.
    pub wager_id: WagerId,
    /// The participant contesting the claimed result.
    pub disputer: UserId,
    /// Why the result is contested.
    pub reason: String,
    /// Assigned moderator, if one has been assigned.
    pub moderator: Option<UserId>,
    /// The ruling, once rendered.
    pub resolution: Option<DisputeResolution>,
    /// The moderator who rendered the ruling.
    pub resolved_by: Option<UserId>,
    /// When the dispute was opened (UTC).
    pub opened_at: DateTime<Utc>,
    /// When the ruling was rendered (UTC).
    pub resolved_at: Option<DateTime<Utc>>,
}

/// The terminal ledger effect of a settled wager.
///
/// `winner = None` means a void ruling: the full stake went back to the
/// creator and no fee was taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementOutcome {
    /// The winning participant, or `None` on void.
    pub winner: Option<UserId>,
    /// Minor units released to the winner (or refunded to the creator).
    pub payout: Amount,
    /// Minor units collected by the platform. Zero on void.
    pub fee: Amount,
    /// When settlement completed (UTC).
    pub settled_at: DateTime<Utc>,
}

// ── Transition Record ──────────────────────────────────────────────────

/// A record of a single state transition, kept per wager for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// State before the transition.
    pub from_state: WagerState,
    /// State after the transition.
    pub to_state: WagerState,
    /// Transition kind string (e.g. "wager.accept.v1").
    pub kind: String,
    /// When the transition occurred (UTC).
    pub at: DateTime<Utc>,
}

// ── The Wager ──────────────────────────────────────────────────────────

/// The root entity. Owned exclusively by the engine; acceptance, proofs,
/// and dispute cascade with it and never outlive it. Terminal wagers are
/// permanent historical records, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wager {
    /// Unique wager identifier.
    pub id: WagerId,
    /// The staking user.
    pub creator: UserId,
    /// The accepting user, once accepted.
    pub acceptor: Option<UserId>,
    /// If set, only this user may accept.
    pub target_user: Option<UserId>,
    /// The winning participant, once settled. `None` after a void ruling.
    pub winner: Option<UserId>,
    /// The game the challenge is played in.
    pub game: String,
    /// Free-form challenge description.
    pub description: String,
    /// The staked amount in minor units.
    pub stake_amount: Amount,
    /// Winner payout, set at settlement. `payout + fee == stake` once set.
    pub payout_amount: Option<Amount>,
    /// Platform fee, set at settlement.
    pub platform_fee: Option<Amount>,
    /// Current lifecycle state.
    pub state: WagerState,
    /// When the wager was created (UTC).
    pub created_at: DateTime<Utc>,
    /// When the wager was accepted (UTC).
    pub accepted_at: Option<DateTime<Utc>>,
    /// When the match started (UTC).
    pub started_at: Option<DateTime<Utc>>,
    /// When the first result proof arrived (UTC). Anchors the dispute
    /// window.
    pub result_submitted_at: Option<DateTime<Utc>>,
    /// When settlement completed (UTC).
    pub completed_at: Option<DateTime<Utc>>,
    /// Acceptance deadline. Only meaningful while state is `Open`.
    pub expires_at: DateTime<Utc>,
    /// Complete transition history for audit purposes.
    pub transition_log: Vec<TransitionRecord>,
}

impl Wager {
    /// Open a new wager. This is the only constructor; stake-band and
    /// self-challenge validation happens in the engine before escrow is
    /// touched.
    pub fn open(
        creator: UserId,
        stake_amount: Amount,
        game: String,
        target_user: Option<UserId>,
        description: String,
        now: DateTime<Utc>,
        acceptance_window: Duration,
    ) -> Self {
        Self {
            id: WagerId::new(),
            creator,
            acceptor: None,
            target_user,
            winner: None,
            game,
            description,
            stake_amount,
            payout_amount: None,
            platform_fee: None,
            state: WagerState::Open,
            created_at: now,
            accepted_at: None,
            started_at: None,
            result_submitted_at: None,
            completed_at: None,
            expires_at: now + acceptance_window,
            transition_log: vec![TransitionRecord {
                from_state: WagerState::Open,
                to_state: WagerState::Open,
                kind: "wager.create.v1".to_string(),
                at: now,
            }],
        }
    }

    /// Whether the user is the creator or the acceptor.
    pub fn is_participant(&self, user: &UserId) -> bool {
        &self.creator == user || self.acceptor.as_ref() == Some(user)
    }

    /// The participant that is not `user`, if `user` is a participant and
    /// the wager has two participants.
    pub fn other_participant(&self, user: &UserId) -> Option<UserId> {
        let acceptor = self.acceptor.as_ref()?;
        if user == &self.creator {
            Some(acceptor.clone())
        } else if user == acceptor {
            Some(self.creator.clone())
        } else {
            None
        }
    }

    /// Whether the acceptance deadline has passed. Strictly
    /// `now > expires_at`; only meaningful while `Open`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.state == WagerState::Open && now > self.expires_at
    }

    /// When the dispute window closes, once a result has been submitted.
    pub fn dispute_deadline(&self, dispute_window: Duration) -> Option<DateTime<Utc>> {
        self.result_submitted_at.map(|t| t + dispute_window)
    }

    /// Check that the wager is in the expected state for an operation.
    pub fn require_state(
        &self,
        expected: WagerState,
        operation: &'static str,
    ) -> Result<(), EngineError> {
        if self.state != expected {
            return Err(EngineError::StateConflict {
                wager_id: self.id.clone(),
                state: self.state,
                operation,
            });
        }
        Ok(())
    }

    /// Apply a transition: append the audit record and set the new state.
    pub(crate) fn transition(&mut self, to: WagerState, kind: &str, at: DateTime<Utc>) {
        self.transition_log.push(TransitionRecord {
            from_state: self.state,
            to_state: to,
            kind: kind.to_string(),
            at,
        });
        self.state = to;
    }
}

// ── Snapshot ───────────────────────────────────────────────────────────

/// The API-facing view of a wager.
///
/// `is_expired`, `can_dispute`, and `dispute_deadline` are derived from the
/// source timestamps at read time and are never persisted independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WagerSnapshot {
    pub wager_id: WagerId,
    pub state: WagerState,
    pub creator: UserId,
    pub acceptor: Option<UserId>,
    pub target_user: Option<UserId>,
    pub winner: Option<UserId>,
    pub game: String,
    pub description: String,
    pub stake_amount: Amount,
    pub payout_amount: Option<Amount>,
    pub platform_fee: Option<Amount>,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub result_submitted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    /// Whether the acceptance deadline has passed on a still-open wager.
    pub is_expired: bool,
    /// Whether a dispute could be opened right now.
    pub can_dispute: bool,
    /// When the dispute window closes, if a result has been submitted.
    pub dispute_deadline: Option<DateTime<Utc>>,
    /// Number of proofs submitted so far.
    pub proof_count: usize,
    /// Whether a dispute exists.
    pub has_dispute: bool,
}
