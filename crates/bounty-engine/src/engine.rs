//! # Wager Engine
//!
//! The single entry point for every state transition. HTTP handlers and
//! the expiry sweeper invoke the same methods, so each transition has
//! exactly one code path.
//!
//! Every mutating operation runs validate-then-mutate under the wager's
//! store entry lock, against a draft that commits only on success; escrow
//! calls happen inside that scope, so a wager is never observed in a
//! terminal state without its ledger effect applied, and a failed escrow
//! call leaves no partial state write. Ledger idempotency keys make a
//! partially applied settlement resumable: a retry replays the
//! already-applied operations as no-ops and performs only the missing
//! ones.
//!
//! Deadline checks are strict everywhere: a wager expires when
//! `now > expires_at` and a dispute is accepted while
//! `now <= result_submitted_at + dispute_window`. The `*_at` variants take
//! an explicit clock and back both the sweeper and the deterministic
//! tests; the plain variants use wall-clock time.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use bounty_core::{Amount, DisputeId, ProofId, UserId, ValidationError, WagerId};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::escrow::{EscrowLedger, WalletService};
use crate::events::{EventSink, TracingSink, WagerEvent};
use crate::settlement::{evaluate_proofs, ProofConsensus};
use crate::store::{WagerRecord, WagerStore};
use crate::wager::{
    Acceptance, Dispute, DisputeResolution, Evidence, Proof, SettlementOutcome, Wager,
    WagerSnapshot, WagerState,
};

/// The wager lifecycle engine.
pub struct WagerEngine {
    config: EngineConfig,
    store: WagerStore,
    ledger: EscrowLedger,
    events: Arc<dyn EventSink>,
}

impl WagerEngine {
    /// Create an engine over a wallet service and event sink.
    pub fn new(
        config: EngineConfig,
        wallet: Arc<dyn WalletService>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            config,
            store: WagerStore::new(),
            ledger: EscrowLedger::new(wallet),
            events,
        }
    }

    /// Create an engine with the default configuration, logging events via
    /// [`TracingSink`].
    pub fn with_defaults(wallet: Arc<dyn WalletService>) -> Self {
        Self::new(EngineConfig::default(), wallet, Arc::new(TracingSink))
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The underlying store. Used by the sweeper's queries and the
    /// persistence layer; mutations still go through engine methods only.
    pub fn store(&self) -> &WagerStore {
        &self.store
    }

    // ── Create ─────────────────────────────────────────────────────────

    /// Open a new wager, escrowing the stake.
    pub fn create(
        &self,
        creator: UserId,
        stake: Amount,
        game: String,
        target_user: Option<UserId>,
        description: String,
    ) -> Result<WagerSnapshot, EngineError> {
        self.create_at(Utc::now(), creator, stake, game, target_user, description)
    }

    /// Deterministic-clock variant of [`create`](Self::create).
    pub fn create_at(
        &self,
        now: DateTime<Utc>,
        creator: UserId,
        stake: Amount,
        game: String,
        target_user: Option<UserId>,
        description: String,
    ) -> Result<WagerSnapshot, EngineError> {
        if stake < self.config.min_stake || stake > self.config.max_stake {
            return Err(EngineError::InvalidStake {
                stake,
                min: self.config.min_stake,
                max: self.config.max_stake,
            });
        }
        if game.trim().is_empty() {
            return Err(ValidationError::EmptyField("game").into());
        }
        if target_user.as_ref() == Some(&creator) {
            return Err(EngineError::SelfChallenge { user: creator });
        }

        let wager = Wager::open(
            creator.clone(),
            stake,
            game,
            target_user,
            description,
            now,
            self.config.acceptance_window(),
        );

        // Hold before persisting: a failed hold must leave no orphan wager.
        self.ledger.hold(&wager.id, &creator, stake)?;

        let record = WagerRecord::new(wager);
        let snapshot = record.snapshot(now, self.config.dispute_window());
        self.events.emit(WagerEvent::WagerCreated {
            wager_id: record.wager.id.clone(),
            creator,
            stake_amount: stake,
            expires_at: record.wager.expires_at,
        });
        self.store.insert(record);
        Ok(snapshot)
    }

    // ── Accept ─────────────────────────────────────────────────────────

    /// Accept an open wager.
    ///
    /// Idempotent: a repeat call by the same acceptor returns the existing
    /// [`Acceptance`]; a different user gets
    /// [`EngineError::AlreadyAccepted`].
    pub fn accept(&self, wager_id: &WagerId, acceptor: UserId) -> Result<Acceptance, EngineError> {
        self.accept_at(Utc::now(), wager_id, acceptor)
    }

    /// Deterministic-clock variant of [`accept`](Self::accept).
    pub fn accept_at(
        &self,
        now: DateTime<Utc>,
        wager_id: &WagerId,
        acceptor: UserId,
    ) -> Result<Acceptance, EngineError> {
        self.lazy_expire(wager_id, now, "accept")?;
        self.store.with_record_mut(wager_id, |rec| {
            if let Some(existing) = &rec.acceptance {
                if existing.acceptor == acceptor {
                    return Ok(existing.clone());
                }
                return Err(EngineError::AlreadyAccepted {
                    wager_id: wager_id.clone(),
                });
            }

            rec.wager.require_state(WagerState::Open, "accept")?;

            if acceptor == rec.wager.creator {
                return Err(EngineError::SelfChallenge { user: acceptor });
            }
            if let Some(target) = &rec.wager.target_user {
                if target != &acceptor {
                    return Err(EngineError::TargetMismatch {
                        wager_id: wager_id.clone(),
                        acceptor,
                    });
                }
            }

            let acceptance = Acceptance {
                wager_id: wager_id.clone(),
                acceptor: acceptor.clone(),
                accepted_at: now,
            };
            rec.acceptance = Some(acceptance.clone());
            rec.wager.acceptor = Some(acceptor.clone());
            rec.wager.accepted_at = Some(now);
            rec.wager.transition(WagerState::Accepted, "wager.accept.v1", now);

            self.events.emit(WagerEvent::WagerAccepted {
                wager_id: wager_id.clone(),
                acceptor,
            });
            Ok(acceptance)
        })
    }

    // ── Start ──────────────────────────────────────────────────────────

    /// Mark the match as underway. A pure timeline marker with no escrow
    /// effect.
    pub fn start(&self, wager_id: &WagerId) -> Result<WagerSnapshot, EngineError> {
        self.start_at(Utc::now(), wager_id)
    }

    /// Deterministic-clock variant of [`start`](Self::start).
    pub fn start_at(
        &self,
        now: DateTime<Utc>,
        wager_id: &WagerId,
    ) -> Result<WagerSnapshot, EngineError> {
        self.lazy_expire(wager_id, now, "start")?;
        self.store.with_record_mut(wager_id, |rec| {
            rec.wager.require_state(WagerState::Accepted, "start")?;
            rec.wager.started_at = Some(now);
            rec.wager
                .transition(WagerState::InProgress, "wager.start.v1", now);
            Ok(rec.snapshot(now, self.config.dispute_window()))
        })
    }

    // ── Submit proof ───────────────────────────────────────────────────

    /// Submit a result proof.
    ///
    /// The first submission opens the dispute window. A second submission
    /// that agrees settles immediately; one that disagrees leaves the wager
    /// awaiting a dispute or passive window expiry, in which case the first
    /// submission wins by default.
    pub fn submit_proof(
        &self,
        wager_id: &WagerId,
        submitter: UserId,
        claimed_winner: UserId,
        evidence: Evidence,
    ) -> Result<WagerSnapshot, EngineError> {
        self.submit_proof_at(Utc::now(), wager_id, submitter, claimed_winner, evidence)
    }

    /// Deterministic-clock variant of [`submit_proof`](Self::submit_proof).
    pub fn submit_proof_at(
        &self,
        now: DateTime<Utc>,
        wager_id: &WagerId,
        submitter: UserId,
        claimed_winner: UserId,
        evidence: Evidence,
    ) -> Result<WagerSnapshot, EngineError> {
        if evidence.url.trim().is_empty() {
            return Err(ValidationError::EmptyField("evidence_url").into());
        }

        self.lazy_expire(wager_id, now, "submit_proof")?;
        self.store.with_record_mut(wager_id, |rec| {
            if !matches!(
                rec.wager.state,
                WagerState::InProgress | WagerState::PendingResult
            ) {
                return Err(EngineError::StateConflict {
                    wager_id: wager_id.clone(),
                    state: rec.wager.state,
                    operation: "submit_proof",
                });
            }

            if !rec.wager.is_participant(&submitter) {
                return Err(EngineError::NotParticipant {
                    wager_id: wager_id.clone(),
                    user: submitter,
                });
            }
            if !rec.wager.is_participant(&claimed_winner) {
                return Err(EngineError::NotParticipant {
                    wager_id: wager_id.clone(),
                    user: claimed_winner,
                });
            }
            if rec.proofs.iter().any(|p| p.submitter == submitter) {
                return Err(EngineError::ProofAlreadySubmitted {
                    wager_id: wager_id.clone(),
                    submitter,
                });
            }

            rec.proofs.push(Proof {
                id: ProofId::new(),
                wager_id: wager_id.clone(),
                submitter: submitter.clone(),
                claimed_winner: claimed_winner.clone(),
                evidence,
                submitted_at: now,
            });
            self.events.emit(WagerEvent::ProofSubmitted {
                wager_id: wager_id.clone(),
                submitter,
                claimed_winner,
            });

            // First proof opens the dispute window.
            if rec.wager.state == WagerState::InProgress {
                rec.wager.result_submitted_at = Some(now);
                rec.wager
                    .transition(WagerState::PendingResult, "wager.proof.submit.v1", now);
            }

            match evaluate_proofs(&rec.proofs) {
                ProofConsensus::Agreed { winner } => {
                    self.finalize_locked(rec, Some(winner), now, "wager.settle.v1")?;
                }
                // Awaiting the second proof, or conflicting claims that a
                // dispute or the window deadline will resolve.
                ProofConsensus::NoProof
                | ProofConsensus::AwaitingSecondProof { .. }
                | ProofConsensus::Conflicting { .. } => {}
            }

            Ok(rec.snapshot(now, self.config.dispute_window()))
        })
    }

    // ── Dispute ────────────────────────────────────────────────────────

    /// Contest the claimed result. Only the participant who did not submit
    /// the contested (first) proof, and only inside the dispute window.
    pub fn open_dispute(
        &self,
        wager_id: &WagerId,
        disputer: UserId,
        reason: String,
    ) -> Result<Dispute, EngineError> {
        self.open_dispute_at(Utc::now(), wager_id, disputer, reason)
    }

    /// Deterministic-clock variant of [`open_dispute`](Self::open_dispute).
    pub fn open_dispute_at(
        &self,
        now: DateTime<Utc>,
        wager_id: &WagerId,
        disputer: UserId,
        reason: String,
    ) -> Result<Dispute, EngineError> {
        if reason.trim().is_empty() {
            return Err(ValidationError::EmptyField("reason").into());
        }

        self.lazy_expire(wager_id, now, "open_dispute")?;
        self.store.with_record_mut(wager_id, |rec| {
            rec.wager
                .require_state(WagerState::PendingResult, "open_dispute")?;

            if !rec.wager.is_participant(&disputer) {
                return Err(EngineError::NotParticipant {
                    wager_id: wager_id.clone(),
                    user: disputer,
                });
            }
            let contested = rec.proofs.first().ok_or(EngineError::StateConflict {
                wager_id: wager_id.clone(),
                state: rec.wager.state,
                operation: "open_dispute",
            })?;
            if contested.submitter == disputer {
                return Err(EngineError::CannotDisputeOwnProof {
                    wager_id: wager_id.clone(),
                    user: disputer,
                });
            }

            let deadline = rec
                .wager
                .dispute_deadline(self.config.dispute_window())
                .ok_or(EngineError::StateConflict {
                    wager_id: wager_id.clone(),
                    state: rec.wager.state,
                    operation: "open_dispute",
                })?;
            if now > deadline {
                return Err(EngineError::DisputeWindowClosed {
                    wager_id: wager_id.clone(),
                    deadline,
                });
            }

            let dispute = Dispute {
                id: DisputeId::new(),
                wager_id: wager_id.clone(),
                disputer: disputer.clone(),
                reason,
                moderator: None,
                resolution: None,
                resolved_by: None,
                opened_at: now,
                resolved_at: None,
            };
            rec.dispute = Some(dispute.clone());
            rec.wager
                .transition(WagerState::Disputed, "wager.dispute.open.v1", now);

            self.events.emit(WagerEvent::DisputeOpened {
                wager_id: wager_id.clone(),
                dispute_id: dispute.id.clone(),
                disputer,
            });
            Ok(dispute)
        })
    }

    /// Record a moderator assignment on an open dispute. Returns the
    /// existing assignment unchanged if one is already recorded.
    pub fn assign_moderator(
        &self,
        wager_id: &WagerId,
        moderator: UserId,
    ) -> Result<Dispute, EngineError> {
        self.store.with_record_mut(wager_id, |rec| {
            let dispute = rec
                .dispute
                .as_mut()
                .ok_or(EngineError::StateConflict {
                    wager_id: wager_id.clone(),
                    state: rec.wager.state,
                    operation: "assign_moderator",
                })?;
            if dispute.moderator.is_none() {
                dispute.moderator = Some(moderator);
            }
            Ok(dispute.clone())
        })
    }

    /// Resolve a dispute and settle the wager.
    ///
    /// Moderator *capability* is the caller's authorization concern (the
    /// arbitration service checks its roster before delegating here).
    /// Retrying against an already-settled wager returns the recorded
    /// outcome without touching the ledger again.
    pub fn resolve_dispute(
        &self,
        wager_id: &WagerId,
        moderator: UserId,
        outcome: DisputeResolution,
    ) -> Result<SettlementOutcome, EngineError> {
        self.resolve_dispute_at(Utc::now(), wager_id, moderator, outcome)
    }

    /// Deterministic-clock variant of
    /// [`resolve_dispute`](Self::resolve_dispute).
    pub fn resolve_dispute_at(
        &self,
        now: DateTime<Utc>,
        wager_id: &WagerId,
        moderator: UserId,
        outcome: DisputeResolution,
    ) -> Result<SettlementOutcome, EngineError> {
        self.store.with_record_mut(wager_id, |rec| {
            if rec.wager.state == WagerState::Completed {
                return Ok(recorded_outcome(rec));
            }
            rec.wager
                .require_state(WagerState::Disputed, "resolve_dispute")?;

            let original = rec
                .proofs
                .first()
                .map(|p| p.claimed_winner.clone())
                .ok_or(EngineError::StateConflict {
                    wager_id: wager_id.clone(),
                    state: rec.wager.state,
                    operation: "resolve_dispute",
                })?;
            let winner = match outcome {
                DisputeResolution::ConfirmOriginal => Some(original),
                DisputeResolution::Reverse => Some(
                    rec.wager
                        .other_participant(&original)
                        .ok_or(EngineError::StateConflict {
                            wager_id: wager_id.clone(),
                            state: rec.wager.state,
                            operation: "resolve_dispute",
                        })?,
                ),
                DisputeResolution::Void => None,
            };

            {
                let dispute = rec.dispute.as_mut().ok_or(EngineError::StateConflict {
                    wager_id: wager_id.clone(),
                    state: rec.wager.state,
                    operation: "resolve_dispute",
                })?;
                if dispute.moderator.is_none() {
                    dispute.moderator = Some(moderator.clone());
                }
                dispute.resolution = Some(outcome);
                dispute.resolved_by = Some(moderator);
                dispute.resolved_at = Some(now);
            }

            self.finalize_locked(rec, winner, now, "wager.dispute.resolve.v1")
        })
    }

    // ── Cancel / Expire ────────────────────────────────────────────────

    /// Withdraw an open wager. Creator only; full refund.
    pub fn cancel(&self, wager_id: &WagerId, actor: UserId) -> Result<WagerSnapshot, EngineError> {
        self.cancel_at(Utc::now(), wager_id, actor)
    }

    /// Deterministic-clock variant of [`cancel`](Self::cancel).
    pub fn cancel_at(
        &self,
        now: DateTime<Utc>,
        wager_id: &WagerId,
        actor: UserId,
    ) -> Result<WagerSnapshot, EngineError> {
        self.lazy_expire(wager_id, now, "cancel")?;
        self.store.with_record_mut(wager_id, |rec| {
            rec.wager.require_state(WagerState::Open, "cancel")?;
            if actor != rec.wager.creator {
                return Err(EngineError::NotCreator {
                    wager_id: wager_id.clone(),
                    actor,
                });
            }

            self.ledger
                .refund(wager_id, &rec.wager.creator, rec.wager.stake_amount)?;
            rec.wager
                .transition(WagerState::Cancelled, "wager.cancel.v1", now);
            Ok(rec.snapshot(now, self.config.dispute_window()))
        })
    }

    /// Force-expire a stale open wager: same refund path as cancel.
    ///
    /// Idempotent: expiring an already-expired wager is a successful no-op.
    /// Invoked by the sweeper, and lazily by any mutating operation that
    /// touches a stale open wager.
    pub fn expire(&self, wager_id: &WagerId) -> Result<WagerSnapshot, EngineError> {
        self.expire_at(Utc::now(), wager_id)
    }

    /// Deterministic-clock variant of [`expire`](Self::expire).
    pub fn expire_at(
        &self,
        now: DateTime<Utc>,
        wager_id: &WagerId,
    ) -> Result<WagerSnapshot, EngineError> {
        self.store.with_record_mut(wager_id, |rec| {
            if rec.wager.state == WagerState::Expired {
                return Ok(rec.snapshot(now, self.config.dispute_window()));
            }
            rec.wager.require_state(WagerState::Open, "expire")?;
            if now <= rec.wager.expires_at {
                return Err(EngineError::NotYetExpired {
                    wager_id: wager_id.clone(),
                    expires_at: rec.wager.expires_at,
                });
            }
            self.expire_locked(rec, now)?;
            Ok(rec.snapshot(now, self.config.dispute_window()))
        })
    }

    /// Settle an undisputed pending result whose window has passed, with
    /// the sole (first) proof's claimed winner: the disputer forfeits by
    /// inaction. Returns the recorded outcome if already settled.
    pub fn finalize_overdue(&self, wager_id: &WagerId) -> Result<SettlementOutcome, EngineError> {
        self.finalize_overdue_at(Utc::now(), wager_id)
    }

    /// Deterministic-clock variant of
    /// [`finalize_overdue`](Self::finalize_overdue).
    pub fn finalize_overdue_at(
        &self,
        now: DateTime<Utc>,
        wager_id: &WagerId,
    ) -> Result<SettlementOutcome, EngineError> {
        self.store.with_record_mut(wager_id, |rec| {
            if rec.wager.state == WagerState::Completed {
                return Ok(recorded_outcome(rec));
            }
            rec.wager
                .require_state(WagerState::PendingResult, "finalize_overdue")?;
            if rec.dispute.is_some() {
                return Err(EngineError::StateConflict {
                    wager_id: wager_id.clone(),
                    state: rec.wager.state,
                    operation: "finalize_overdue",
                });
            }
            let deadline = rec
                .wager
                .dispute_deadline(self.config.dispute_window())
                .ok_or(EngineError::StateConflict {
                    wager_id: wager_id.clone(),
                    state: rec.wager.state,
                    operation: "finalize_overdue",
                })?;
            if now <= deadline {
                return Err(EngineError::DisputeWindowOpen {
                    wager_id: wager_id.clone(),
                    deadline,
                });
            }
            let winner = rec
                .proofs
                .first()
                .map(|p| p.claimed_winner.clone())
                .ok_or(EngineError::StateConflict {
                    wager_id: wager_id.clone(),
                    state: rec.wager.state,
                    operation: "finalize_overdue",
                })?;
            self.finalize_locked(rec, Some(winner), now, "wager.settle.v1")
        })
    }

    // ── Reads ──────────────────────────────────────────────────────────

    /// A snapshot of the wager with derived fields computed now.
    pub fn get(&self, wager_id: &WagerId) -> Result<WagerSnapshot, EngineError> {
        self.get_at(Utc::now(), wager_id)
    }

    /// Deterministic-clock variant of [`get`](Self::get).
    pub fn get_at(
        &self,
        now: DateTime<Utc>,
        wager_id: &WagerId,
    ) -> Result<WagerSnapshot, EngineError> {
        self.store
            .get(wager_id)
            .map(|rec| rec.snapshot(now, self.config.dispute_window()))
            .ok_or_else(|| EngineError::WagerNotFound(wager_id.clone()))
    }

    /// The full record: wager plus acceptance, proofs, and dispute.
    pub fn get_record(&self, wager_id: &WagerId) -> Result<WagerRecord, EngineError> {
        self.store
            .get(wager_id)
            .ok_or_else(|| EngineError::WagerNotFound(wager_id.clone()))
    }

    /// Look up a dispute by id.
    pub fn get_dispute(&self, dispute_id: &DisputeId) -> Result<Dispute, EngineError> {
        let wager_id = self
            .store
            .find_by_dispute(dispute_id)
            .ok_or_else(|| EngineError::DisputeNotFound(dispute_id.clone()))?;
        self.store
            .get(&wager_id)
            .and_then(|rec| rec.dispute)
            .ok_or_else(|| EngineError::DisputeNotFound(dispute_id.clone()))
    }

    /// Resolve a dispute id to its wager.
    pub fn find_by_dispute(&self, dispute_id: &DisputeId) -> Option<WagerId> {
        self.store.find_by_dispute(dispute_id)
    }

    /// Snapshots of the user's non-terminal wagers.
    pub fn list_active(&self, user: &UserId) -> Vec<WagerSnapshot> {
        self.list_active_at(Utc::now(), user)
    }

    /// Deterministic-clock variant of [`list_active`](Self::list_active).
    pub fn list_active_at(&self, now: DateTime<Utc>, user: &UserId) -> Vec<WagerSnapshot> {
        let mut snapshots: Vec<WagerSnapshot> = self
            .store
            .list_active(user)
            .into_iter()
            .map(|rec| rec.snapshot(now, self.config.dispute_window()))
            .collect();
        snapshots.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        snapshots
    }

    // ── Internal transitions ───────────────────────────────────────────

    /// Opportunistic expiry: a mutating operation that finds a stale open
    /// wager applies the expiry transition first (committed on its own),
    /// then reports the conflict against the now-expired wager. Produces
    /// the same terminal state and refund as the sweeper path.
    fn lazy_expire(
        &self,
        wager_id: &WagerId,
        now: DateTime<Utc>,
        operation: &'static str,
    ) -> Result<(), EngineError> {
        let expired = self.store.with_record_mut(wager_id, |rec| {
            if rec.wager.is_expired(now) {
                self.expire_locked(rec, now)?;
                return Ok(true);
            }
            Ok(false)
        })?;
        if expired {
            return Err(EngineError::StateConflict {
                wager_id: wager_id.clone(),
                state: WagerState::Expired,
                operation,
            });
        }
        Ok(())
    }

    /// Refund the stake and move to `Expired`. Caller has verified the
    /// state and the deadline.
    fn expire_locked(&self, rec: &mut WagerRecord, now: DateTime<Utc>) -> Result<(), EngineError> {
        self.ledger
            .refund(&rec.wager.id, &rec.wager.creator, rec.wager.stake_amount)?;
        rec.wager
            .transition(WagerState::Expired, "wager.expire.v1", now);
        Ok(())
    }

    /// Perform settlement under the entry lock.
    ///
    /// Guarded on the current state: if the wager is already `Completed`
    /// the recorded outcome is returned and no ledger call is made, so a
    /// retried request settles exactly once.
    fn finalize_locked(
        &self,
        rec: &mut WagerRecord,
        winner: Option<UserId>,
        now: DateTime<Utc>,
        kind: &'static str,
    ) -> Result<SettlementOutcome, EngineError> {
        if rec.wager.state == WagerState::Completed {
            return Ok(recorded_outcome(rec));
        }

        let wager_id = rec.wager.id.clone();
        let creator = rec.wager.creator.clone();
        let stake = rec.wager.stake_amount;

        let outcome = match winner {
            Some(winner) => {
                let (payout, fee) = stake.split_fee(self.config.fee_bps);
                self.ledger.release(&wager_id, &creator, &winner, payout)?;
                self.ledger.collect(&wager_id, fee)?;
                rec.wager.winner = Some(winner.clone());
                rec.wager.payout_amount = Some(payout);
                rec.wager.platform_fee = Some(fee);
                SettlementOutcome {
                    winner: Some(winner),
                    payout,
                    fee,
                    settled_at: now,
                }
            }
            None => {
                // Void ruling: full refund, no fee.
                self.ledger.refund(&wager_id, &creator, stake)?;
                SettlementOutcome {
                    winner: None,
                    payout: stake,
                    fee: Amount::ZERO,
                    settled_at: now,
                }
            }
        };

        rec.wager.completed_at = Some(now);
        rec.wager.transition(WagerState::Completed, kind, now);

        self.events.emit(WagerEvent::WagerSettled {
            wager_id,
            outcome: outcome.clone(),
        });
        Ok(outcome)
    }
}

impl std::fmt::Debug for WagerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WagerEngine")
            .field("wagers", &self.store.len())
            .finish()
    }
}

/// Reconstruct the outcome of an already-settled wager from its fields.
fn recorded_outcome(rec: &WagerRecord) -> SettlementOutcome {
    SettlementOutcome {
        winner: rec.wager.winner.clone(),
        // A void settlement leaves payout/fee unset: the whole stake went
        // back to the creator.
        payout: rec.wager.payout_amount.unwrap_or(rec.wager.stake_amount),
        fee: rec.wager.platform_fee.unwrap_or(Amount::ZERO),
        settled_at: rec.wager.completed_at.unwrap_or(rec.wager.created_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::escrow::InMemoryWallet;
    use crate::events::BufferingSink;
    use crate::wager::EvidenceKind;

    struct Harness {
        wallet: Arc<InMemoryWallet>,
        sink: Arc<BufferingSink>,
        engine: WagerEngine,
        now: DateTime<Utc>,
    }

    fn harness() -> Harness {
        let wallet = Arc::new(InMemoryWallet::new());
        let sink = Arc::new(BufferingSink::new());
        let engine = WagerEngine::new(EngineConfig::default(), wallet.clone(), sink.clone());
        Harness {
            wallet,
            sink,
            engine,
            now: Utc::now(),
        }
    }

    fn funded(h: &Harness, minor: u64) -> UserId {
        let user = UserId::new();
        h.wallet.deposit(&user, Amount::from_minor(minor));
        user
    }

    fn evidence() -> Evidence {
        Evidence {
            url: "https://clips.example/final".to_string(),
            kind: EvidenceKind::Screenshot,
        }
    }

    /// Create + accept + start, returning (wager_id, creator, acceptor).
    fn in_progress(h: &Harness, stake: u64) -> (WagerId, UserId, UserId) {
        let creator = funded(h, stake);
        let acceptor = UserId::new();
        let snap = h
            .engine
            .create_at(
                h.now,
                creator.clone(),
                Amount::from_minor(stake),
                "cs2".to_string(),
                None,
                "bo3".to_string(),
            )
            .unwrap();
        h.engine
            .accept_at(h.now, &snap.wager_id, acceptor.clone())
            .unwrap();
        h.engine.start_at(h.now, &snap.wager_id).unwrap();
        (snap.wager_id, creator, acceptor)
    }

    // ── Create ───────────────────────────────────────────────────────

    #[test]
    fn create_holds_stake_and_opens() {
        let h = harness();
        let creator = funded(&h, 1000);
        let snap = h
            .engine
            .create_at(
                h.now,
                creator.clone(),
                Amount::from_minor(1000),
                "cs2".to_string(),
                None,
                String::new(),
            )
            .unwrap();

        assert_eq!(snap.state, WagerState::Open);
        assert_eq!(snap.expires_at, h.now + Duration::hours(72));
        let bal = h.wallet.balance_of(&creator);
        assert_eq!(bal.available, Amount::ZERO);
        assert_eq!(bal.escrow, Amount::from_minor(1000));
        assert_eq!(h.sink.events().len(), 1);
    }

    #[test]
    fn create_rejects_stake_outside_band() {
        let h = harness();
        let creator = funded(&h, 100_000_000);
        let low = h.engine.create_at(
            h.now,
            creator.clone(),
            Amount::from_minor(99),
            "cs2".to_string(),
            None,
            String::new(),
        );
        assert!(matches!(low, Err(EngineError::InvalidStake { .. })));

        let high = h.engine.create_at(
            h.now,
            creator,
            Amount::from_minor(10_000_001),
            "cs2".to_string(),
            None,
            String::new(),
        );
        assert!(matches!(high, Err(EngineError::InvalidStake { .. })));
        assert!(h.engine.store().is_empty());
    }

    #[test]
    fn create_rejects_self_target() {
        let h = harness();
        let creator = funded(&h, 1000);
        let result = h.engine.create_at(
            h.now,
            creator.clone(),
            Amount::from_minor(1000),
            "cs2".to_string(),
            Some(creator),
            String::new(),
        );
        assert!(matches!(result, Err(EngineError::SelfChallenge { .. })));
    }

    #[test]
    fn failed_hold_leaves_no_orphan_wager() {
        let h = harness();
        let broke = funded(&h, 50);
        let result = h.engine.create_at(
            h.now,
            broke,
            Amount::from_minor(1000),
            "cs2".to_string(),
            None,
            String::new(),
        );
        assert!(matches!(result, Err(EngineError::InsufficientFunds { .. })));
        assert!(h.engine.store().is_empty());
        assert!(h.sink.is_empty());
    }

    // ── Accept ───────────────────────────────────────────────────────

    #[test]
    fn accept_transitions_and_is_idempotent() {
        let h = harness();
        let creator = funded(&h, 1000);
        let acceptor = UserId::new();
        let snap = h
            .engine
            .create_at(
                h.now,
                creator,
                Amount::from_minor(1000),
                "cs2".to_string(),
                None,
                String::new(),
            )
            .unwrap();

        let first = h
            .engine
            .accept_at(h.now, &snap.wager_id, acceptor.clone())
            .unwrap();
        let again = h
            .engine
            .accept_at(h.now + Duration::minutes(5), &snap.wager_id, acceptor.clone())
            .unwrap();
        assert_eq!(first, again);

        let wager = h.engine.get_at(h.now, &snap.wager_id).unwrap();
        assert_eq!(wager.state, WagerState::Accepted);
        assert_eq!(wager.acceptor, Some(acceptor));
        assert_eq!(wager.accepted_at, Some(h.now));
        // Exactly one acceptance event despite the repeat call.
        assert_eq!(
            h.sink
                .events()
                .iter()
                .filter(|e| e.kind() == "bounty.wager.accepted.v1")
                .count(),
            1
        );
    }

    #[test]
    fn accept_by_second_user_conflicts() {
        let h = harness();
        let creator = funded(&h, 1000);
        let snap = h
            .engine
            .create_at(
                h.now,
                creator,
                Amount::from_minor(1000),
                "cs2".to_string(),
                None,
                String::new(),
            )
            .unwrap();
        h.engine
            .accept_at(h.now, &snap.wager_id, UserId::new())
            .unwrap();

        let result = h.engine.accept_at(h.now, &snap.wager_id, UserId::new());
        assert!(matches!(result, Err(EngineError::AlreadyAccepted { .. })));
    }

    #[test]
    fn accept_rejects_creator_and_non_target() {
        let h = harness();
        let creator = funded(&h, 1000);
        let target = UserId::new();
        let snap = h
            .engine
            .create_at(
                h.now,
                creator.clone(),
                Amount::from_minor(1000),
                "cs2".to_string(),
                Some(target.clone()),
                String::new(),
            )
            .unwrap();

        assert!(matches!(
            h.engine.accept_at(h.now, &snap.wager_id, creator),
            Err(EngineError::SelfChallenge { .. })
        ));
        assert!(matches!(
            h.engine.accept_at(h.now, &snap.wager_id, UserId::new()),
            Err(EngineError::TargetMismatch { .. })
        ));
        // The targeted user may accept.
        assert!(h.engine.accept_at(h.now, &snap.wager_id, target).is_ok());
    }

    #[test]
    fn accept_on_stale_wager_expires_it_lazily() {
        let h = harness();
        let creator = funded(&h, 1000);
        let snap = h
            .engine
            .create_at(
                h.now,
                creator.clone(),
                Amount::from_minor(1000),
                "cs2".to_string(),
                None,
                String::new(),
            )
            .unwrap();

        let late = snap.expires_at + Duration::seconds(1);
        let result = h.engine.accept_at(late, &snap.wager_id, UserId::new());
        match result {
            Err(EngineError::StateConflict { state, .. }) => {
                assert_eq!(state, WagerState::Expired)
            }
            other => panic!("expected StateConflict, got: {other:?}"),
        }
        // Same terminal state and refund as the sweeper path.
        let wager = h.engine.get_at(late, &snap.wager_id).unwrap();
        assert_eq!(wager.state, WagerState::Expired);
        assert_eq!(
            h.wallet.balance_of(&creator).available,
            Amount::from_minor(1000)
        );
    }

    // ── Start ────────────────────────────────────────────────────────

    #[test]
    fn start_requires_accepted() {
        let h = harness();
        let creator = funded(&h, 1000);
        let snap = h
            .engine
            .create_at(
                h.now,
                creator,
                Amount::from_minor(1000),
                "cs2".to_string(),
                None,
                String::new(),
            )
            .unwrap();

        assert!(matches!(
            h.engine.start_at(h.now, &snap.wager_id),
            Err(EngineError::StateConflict { .. })
        ));

        h.engine
            .accept_at(h.now, &snap.wager_id, UserId::new())
            .unwrap();
        let started = h.engine.start_at(h.now, &snap.wager_id).unwrap();
        assert_eq!(started.state, WagerState::InProgress);
        assert_eq!(started.started_at, Some(h.now));
    }

    // ── Proofs ───────────────────────────────────────────────────────

    #[test]
    fn first_proof_opens_dispute_window() {
        let h = harness();
        let (wager_id, creator, acceptor) = in_progress(&h, 1000);

        let snap = h
            .engine
            .submit_proof_at(h.now, &wager_id, creator, acceptor, evidence())
            .unwrap();
        assert_eq!(snap.state, WagerState::PendingResult);
        assert_eq!(snap.result_submitted_at, Some(h.now));
        assert_eq!(snap.dispute_deadline, Some(h.now + Duration::hours(24)));
        assert!(snap.can_dispute);
    }

    #[test]
    fn agreeing_proofs_settle_immediately() {
        // Scenario A: stake 1000, both agree the acceptor won.
        let h = harness();
        let (wager_id, creator, acceptor) = in_progress(&h, 1000);

        h.engine
            .submit_proof_at(h.now, &wager_id, creator.clone(), acceptor.clone(), evidence())
            .unwrap();
        let snap = h
            .engine
            .submit_proof_at(
                h.now + Duration::minutes(10),
                &wager_id,
                acceptor.clone(),
                acceptor.clone(),
                evidence(),
            )
            .unwrap();

        assert_eq!(snap.state, WagerState::Completed);
        assert_eq!(snap.winner, Some(acceptor.clone()));
        assert_eq!(snap.payout_amount, Some(Amount::from_minor(950)));
        assert_eq!(snap.platform_fee, Some(Amount::from_minor(50)));

        assert_eq!(
            h.wallet.balance_of(&acceptor).available,
            Amount::from_minor(950)
        );
        assert_eq!(h.wallet.platform_collected(), Amount::from_minor(50));
        let creator_bal = h.wallet.balance_of(&creator);
        assert_eq!(creator_bal.available, Amount::ZERO);
        assert_eq!(creator_bal.escrow, Amount::ZERO);
    }

    #[test]
    fn conflicting_proofs_await_dispute() {
        let h = harness();
        let (wager_id, creator, acceptor) = in_progress(&h, 1000);

        h.engine
            .submit_proof_at(h.now, &wager_id, creator.clone(), creator.clone(), evidence())
            .unwrap();
        let snap = h
            .engine
            .submit_proof_at(h.now, &wager_id, acceptor.clone(), acceptor, evidence())
            .unwrap();

        assert_eq!(snap.state, WagerState::PendingResult);
        assert_eq!(snap.proof_count, 2);
        assert!(snap.winner.is_none());
    }

    #[test]
    fn proof_rejects_repeat_submitter_and_outsiders() {
        let h = harness();
        let (wager_id, creator, acceptor) = in_progress(&h, 1000);

        h.engine
            .submit_proof_at(h.now, &wager_id, creator.clone(), acceptor.clone(), evidence())
            .unwrap();
        assert!(matches!(
            h.engine
                .submit_proof_at(h.now, &wager_id, creator.clone(), creator.clone(), evidence()),
            Err(EngineError::ProofAlreadySubmitted { .. })
        ));
        assert!(matches!(
            h.engine
                .submit_proof_at(h.now, &wager_id, UserId::new(), acceptor, evidence()),
            Err(EngineError::NotParticipant { .. })
        ));
        assert!(matches!(
            h.engine
                .submit_proof_at(h.now, &wager_id, creator.clone(), UserId::new(), evidence()),
            Err(EngineError::NotParticipant { .. })
        ));
    }

    #[test]
    fn proof_rejects_empty_evidence_url() {
        let h = harness();
        let (wager_id, creator, acceptor) = in_progress(&h, 1000);
        let result = h.engine.submit_proof_at(
            h.now,
            &wager_id,
            creator,
            acceptor,
            Evidence {
                url: "  ".to_string(),
                kind: EvidenceKind::Other,
            },
        );
        assert!(matches!(result, Err(EngineError::Validation(_))));
    }

    // ── Disputes ─────────────────────────────────────────────────────

    #[test]
    fn dispute_window_boundary_is_exact() {
        let h = harness();
        let (wager_id, creator, acceptor) = in_progress(&h, 1000);
        h.engine
            .submit_proof_at(h.now, &wager_id, creator.clone(), creator.clone(), evidence())
            .unwrap();

        let deadline = h.now + Duration::hours(24);

        // One second before the deadline: allowed.
        let dispute = h.engine.open_dispute_at(
            deadline - Duration::seconds(1),
            &wager_id,
            acceptor.clone(),
            "that's not what happened".to_string(),
        );
        assert!(dispute.is_ok());

        // Fresh wager for the late case.
        let (wager_id2, creator2, acceptor2) = in_progress(&h, 1000);
        h.engine
            .submit_proof_at(h.now, &wager_id2, creator2.clone(), creator2, evidence())
            .unwrap();
        let late = h.engine.open_dispute_at(
            deadline + Duration::seconds(1),
            &wager_id2,
            acceptor2,
            "too late".to_string(),
        );
        assert!(matches!(late, Err(EngineError::DisputeWindowClosed { .. })));
    }

    #[test]
    fn dispute_at_exact_deadline_is_allowed() {
        let h = harness();
        let (wager_id, creator, acceptor) = in_progress(&h, 1000);
        h.engine
            .submit_proof_at(h.now, &wager_id, creator.clone(), creator, evidence())
            .unwrap();
        let deadline = h.now + Duration::hours(24);
        assert!(h
            .engine
            .open_dispute_at(deadline, &wager_id, acceptor, "contested".to_string())
            .is_ok());
    }

    #[test]
    fn submitter_cannot_dispute_own_proof() {
        let h = harness();
        let (wager_id, creator, _) = in_progress(&h, 1000);
        h.engine
            .submit_proof_at(h.now, &wager_id, creator.clone(), creator.clone(), evidence())
            .unwrap();

        let result =
            h.engine
                .open_dispute_at(h.now, &wager_id, creator, "disputing myself".to_string());
        assert!(matches!(
            result,
            Err(EngineError::CannotDisputeOwnProof { .. })
        ));
    }

    #[test]
    fn dispute_requires_pending_result() {
        let h = harness();
        let (wager_id, _, acceptor) = in_progress(&h, 1000);
        let result =
            h.engine
                .open_dispute_at(h.now, &wager_id, acceptor, "premature".to_string());
        assert!(matches!(result, Err(EngineError::StateConflict { .. })));
    }

    #[test]
    fn resolve_confirm_pays_original_claim() {
        let h = harness();
        let (wager_id, creator, acceptor) = in_progress(&h, 1000);
        h.engine
            .submit_proof_at(h.now, &wager_id, creator.clone(), creator.clone(), evidence())
            .unwrap();
        h.engine
            .open_dispute_at(h.now, &wager_id, acceptor.clone(), "no way".to_string())
            .unwrap();

        let moderator = UserId::new();
        let outcome = h
            .engine
            .resolve_dispute_at(
                h.now,
                &wager_id,
                moderator.clone(),
                DisputeResolution::ConfirmOriginal,
            )
            .unwrap();

        assert_eq!(outcome.winner, Some(creator.clone()));
        assert_eq!(outcome.payout, Amount::from_minor(950));
        assert_eq!(outcome.fee, Amount::from_minor(50));
        assert_eq!(
            h.wallet.balance_of(&creator).available,
            Amount::from_minor(950)
        );
        assert_eq!(h.wallet.balance_of(&acceptor).available, Amount::ZERO);

        let record = h.engine.get_record(&wager_id).unwrap();
        let dispute = record.dispute.unwrap();
        assert_eq!(dispute.resolution, Some(DisputeResolution::ConfirmOriginal));
        assert_eq!(dispute.resolved_by, Some(moderator));
        assert!(dispute.resolved_at.is_some());
    }

    #[test]
    fn resolve_reverse_pays_the_other_participant() {
        // Scenario C: conflicting proofs, dispute, moderator reverses.
        let h = harness();
        let (wager_id, creator, acceptor) = in_progress(&h, 1000);
        h.engine
            .submit_proof_at(h.now, &wager_id, creator.clone(), creator.clone(), evidence())
            .unwrap();
        h.engine
            .submit_proof_at(h.now, &wager_id, acceptor.clone(), acceptor.clone(), evidence())
            .unwrap();
        h.engine
            .open_dispute_at(h.now, &wager_id, acceptor.clone(), "I won game 3".to_string())
            .unwrap();

        let outcome = h
            .engine
            .resolve_dispute_at(h.now, &wager_id, UserId::new(), DisputeResolution::Reverse)
            .unwrap();

        // The original claimed winner (the creator) does NOT get the payout.
        assert_eq!(outcome.winner, Some(acceptor.clone()));
        assert_eq!(
            h.wallet.balance_of(&acceptor).available,
            Amount::from_minor(950)
        );
        assert_eq!(h.wallet.balance_of(&creator).available, Amount::ZERO);
        assert_eq!(h.wallet.platform_collected(), Amount::from_minor(50));
    }

    #[test]
    fn resolve_void_refunds_in_full_without_fee() {
        let h = harness();
        let (wager_id, creator, acceptor) = in_progress(&h, 1000);
        h.engine
            .submit_proof_at(h.now, &wager_id, creator.clone(), creator.clone(), evidence())
            .unwrap();
        h.engine
            .open_dispute_at(h.now, &wager_id, acceptor, "match never happened".to_string())
            .unwrap();

        let outcome = h
            .engine
            .resolve_dispute_at(h.now, &wager_id, UserId::new(), DisputeResolution::Void)
            .unwrap();

        assert_eq!(outcome.winner, None);
        assert_eq!(outcome.payout, Amount::from_minor(1000));
        assert_eq!(outcome.fee, Amount::ZERO);
        assert_eq!(
            h.wallet.balance_of(&creator).available,
            Amount::from_minor(1000)
        );
        assert_eq!(h.wallet.platform_collected(), Amount::ZERO);

        let snap = h.engine.get_at(h.now, &wager_id).unwrap();
        assert_eq!(snap.state, WagerState::Completed);
        assert_eq!(snap.winner, None);
        assert_eq!(snap.payout_amount, None);
        assert_eq!(snap.platform_fee, None);
    }

    #[test]
    fn resolve_retry_returns_recorded_outcome_once() {
        let h = harness();
        let (wager_id, creator, acceptor) = in_progress(&h, 1000);
        h.engine
            .submit_proof_at(h.now, &wager_id, creator.clone(), creator.clone(), evidence())
            .unwrap();
        h.engine
            .open_dispute_at(h.now, &wager_id, acceptor, "contested".to_string())
            .unwrap();

        let first = h
            .engine
            .resolve_dispute_at(
                h.now,
                &wager_id,
                UserId::new(),
                DisputeResolution::ConfirmOriginal,
            )
            .unwrap();
        let retry = h
            .engine
            .resolve_dispute_at(
                h.now + Duration::minutes(1),
                &wager_id,
                UserId::new(),
                DisputeResolution::ConfirmOriginal,
            )
            .unwrap();

        assert_eq!(first.winner, retry.winner);
        assert_eq!(first.payout, retry.payout);
        // Exactly one ledger settlement.
        assert_eq!(
            h.wallet.balance_of(&creator).available,
            Amount::from_minor(950)
        );
        assert_eq!(h.wallet.platform_collected(), Amount::from_minor(50));
        assert_eq!(
            h.sink
                .events()
                .iter()
                .filter(|e| e.kind() == "bounty.wager.settled.v1")
                .count(),
            1
        );
    }

    // ── Cancel / Expire ──────────────────────────────────────────────

    #[test]
    fn cancel_refunds_creator() {
        let h = harness();
        let creator = funded(&h, 500);
        let snap = h
            .engine
            .create_at(
                h.now,
                creator.clone(),
                Amount::from_minor(500),
                "cs2".to_string(),
                None,
                String::new(),
            )
            .unwrap();

        assert!(matches!(
            h.engine.cancel_at(h.now, &snap.wager_id, UserId::new()),
            Err(EngineError::NotCreator { .. })
        ));

        let cancelled = h
            .engine
            .cancel_at(h.now, &snap.wager_id, creator.clone())
            .unwrap();
        assert_eq!(cancelled.state, WagerState::Cancelled);
        assert_eq!(
            h.wallet.balance_of(&creator).available,
            Amount::from_minor(500)
        );
    }

    #[test]
    fn cancel_illegal_after_accept() {
        let h = harness();
        let creator = funded(&h, 1000);
        let snap = h
            .engine
            .create_at(
                h.now,
                creator.clone(),
                Amount::from_minor(1000),
                "cs2".to_string(),
                None,
                String::new(),
            )
            .unwrap();
        h.engine
            .accept_at(h.now, &snap.wager_id, UserId::new())
            .unwrap();

        let result = h.engine.cancel_at(h.now, &snap.wager_id, creator);
        assert!(matches!(result, Err(EngineError::StateConflict { .. })));
    }

    #[test]
    fn expire_respects_deadline_and_is_idempotent() {
        let h = harness();
        let creator = funded(&h, 500);
        let snap = h
            .engine
            .create_at(
                h.now,
                creator.clone(),
                Amount::from_minor(500),
                "cs2".to_string(),
                None,
                String::new(),
            )
            .unwrap();

        // At the deadline: not yet expired (strictly greater than).
        assert!(matches!(
            h.engine.expire_at(snap.expires_at, &snap.wager_id),
            Err(EngineError::NotYetExpired { .. })
        ));

        let late = snap.expires_at + Duration::seconds(1);
        let expired = h.engine.expire_at(late, &snap.wager_id).unwrap();
        assert_eq!(expired.state, WagerState::Expired);
        assert_eq!(
            h.wallet.balance_of(&creator).available,
            Amount::from_minor(500)
        );

        // Second expiry is a no-op with the same result.
        let again = h.engine.expire_at(late + Duration::hours(1), &snap.wager_id).unwrap();
        assert_eq!(again.state, WagerState::Expired);
        assert_eq!(
            h.wallet.balance_of(&creator).available,
            Amount::from_minor(500)
        );
    }

    // ── Default settlement ───────────────────────────────────────────

    #[test]
    fn overdue_pending_result_settles_with_first_claim() {
        // Scenario D: single proof, no dispute, window elapses.
        let h = harness();
        let (wager_id, creator, acceptor) = in_progress(&h, 1000);
        h.engine
            .submit_proof_at(h.now, &wager_id, creator.clone(), acceptor.clone(), evidence())
            .unwrap();

        let deadline = h.now + Duration::hours(24);
        assert!(matches!(
            h.engine.finalize_overdue_at(deadline, &wager_id),
            Err(EngineError::DisputeWindowOpen { .. })
        ));

        let outcome = h
            .engine
            .finalize_overdue_at(deadline + Duration::seconds(1), &wager_id)
            .unwrap();
        assert_eq!(outcome.winner, Some(acceptor.clone()));
        assert_eq!(
            h.wallet.balance_of(&acceptor).available,
            Amount::from_minor(950)
        );
    }

    #[test]
    fn late_conflicting_proof_does_not_override_first_claim() {
        let h = harness();
        let (wager_id, creator, acceptor) = in_progress(&h, 1000);
        h.engine
            .submit_proof_at(h.now, &wager_id, creator.clone(), creator.clone(), evidence())
            .unwrap();
        // The acceptor responds with a conflicting claim only after the
        // window has already closed.
        let late = h.now + Duration::hours(25);
        h.engine
            .submit_proof_at(late, &wager_id, acceptor.clone(), acceptor, evidence())
            .unwrap();

        let outcome = h.engine.finalize_overdue_at(late, &wager_id).unwrap();
        // First submission wins by inaction.
        assert_eq!(outcome.winner, Some(creator));
    }

    // ── Reads ────────────────────────────────────────────────────────

    #[test]
    fn get_unknown_wager_is_not_found() {
        let h = harness();
        assert!(matches!(
            h.engine.get_at(h.now, &WagerId::new()),
            Err(EngineError::WagerNotFound(_))
        ));
    }

    #[test]
    fn list_active_orders_newest_first() {
        let h = harness();
        let creator = funded(&h, 5000);
        let older = h
            .engine
            .create_at(
                h.now,
                creator.clone(),
                Amount::from_minor(1000),
                "cs2".to_string(),
                None,
                String::new(),
            )
            .unwrap();
        let newer = h
            .engine
            .create_at(
                h.now + Duration::minutes(5),
                creator.clone(),
                Amount::from_minor(1000),
                "dota2".to_string(),
                None,
                String::new(),
            )
            .unwrap();

        let active = h.engine.list_active_at(h.now + Duration::hours(1), &creator);
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].wager_id, newer.wager_id);
        assert_eq!(active[1].wager_id, older.wager_id);
    }

    #[test]
    fn get_dispute_by_id() {
        let h = harness();
        let (wager_id, creator, acceptor) = in_progress(&h, 1000);
        h.engine
            .submit_proof_at(h.now, &wager_id, creator.clone(), creator, evidence())
            .unwrap();
        let dispute = h
            .engine
            .open_dispute_at(h.now, &wager_id, acceptor, "contested".to_string())
            .unwrap();

        let found = h.engine.get_dispute(&dispute.id).unwrap();
        assert_eq!(found.id, dispute.id);
        assert_eq!(h.engine.find_by_dispute(&dispute.id), Some(wager_id));
        assert!(matches!(
            h.engine.get_dispute(&DisputeId::new()),
            Err(EngineError::DisputeNotFound(_))
        ));
    }

    #[test]
    fn money_is_conserved_on_every_settlement_path() {
        for (stake, resolution) in [
            (999u64, DisputeResolution::ConfirmOriginal),
            (1001, DisputeResolution::Reverse),
            (777, DisputeResolution::Void),
        ] {
            let h = harness();
            let (wager_id, creator, acceptor) = in_progress(&h, stake);
            h.engine
                .submit_proof_at(h.now, &wager_id, creator.clone(), creator.clone(), evidence())
                .unwrap();
            h.engine
                .open_dispute_at(h.now, &wager_id, acceptor.clone(), "c".to_string())
                .unwrap();
            h.engine
                .resolve_dispute_at(h.now, &wager_id, UserId::new(), resolution)
                .unwrap();

            let total = h
                .wallet
                .balance_of(&creator)
                .available
                .checked_add(h.wallet.balance_of(&acceptor).available)
                .and_then(|t| t.checked_add(h.wallet.platform_collected()))
                .unwrap();
            assert_eq!(total, Amount::from_minor(stake), "stake not conserved");

            let snap = h.engine.get_at(h.now, &wager_id).unwrap();
            if let (Some(payout), Some(fee)) = (snap.payout_amount, snap.platform_fee) {
                assert_eq!(payout.checked_add(fee), Some(snap.stake_amount));
            }
        }
    }
}
