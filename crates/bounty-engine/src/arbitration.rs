//! # Dispute Arbitration
//!
//! Moderator roster and the sole mutation path for dispute resolution.
//! Assignment is round-robin over an explicitly registered roster; the
//! engine itself only records assignments and rulings, so a deployment
//! with its own assignment policy can bypass this service and call the
//! engine directly under its own authorization checks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use bounty_core::{DisputeId, UserId};

use crate::engine::WagerEngine;
use crate::error::EngineError;
use crate::wager::{Dispute, DisputeResolution, SettlementOutcome};

/// Moderator assignment and dispute resolution.
pub struct DisputeArbitrationService {
    engine: Arc<WagerEngine>,
    roster: RwLock<Vec<UserId>>,
    cursor: AtomicUsize,
}

impl DisputeArbitrationService {
    /// Create a service with an empty roster.
    pub fn new(engine: Arc<WagerEngine>) -> Self {
        Self {
            engine,
            roster: RwLock::new(Vec::new()),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Add a moderator to the roster. Re-registering is a no-op.
    pub fn register_moderator(&self, moderator: UserId) {
        let mut roster = self.roster.write();
        if !roster.contains(&moderator) {
            roster.push(moderator);
        }
    }

    /// The current roster.
    pub fn moderators(&self) -> Vec<UserId> {
        self.roster.read().clone()
    }

    /// Whether the user holds moderator capability.
    pub fn is_moderator(&self, user: &UserId) -> bool {
        self.roster.read().contains(user)
    }

    /// The next moderator in round-robin order, if any are registered.
    pub fn assign_next(&self) -> Option<UserId> {
        let roster = self.roster.read();
        if roster.is_empty() {
            return None;
        }
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % roster.len();
        Some(roster[idx].clone())
    }

    /// Assign the next moderator to a dispute and record the assignment.
    pub fn assign(&self, dispute_id: &DisputeId) -> Result<Dispute, EngineError> {
        let moderator = self
            .assign_next()
            .ok_or(EngineError::NoModeratorAvailable)?;
        let wager_id = self
            .engine
            .find_by_dispute(dispute_id)
            .ok_or_else(|| EngineError::DisputeNotFound(dispute_id.clone()))?;
        self.engine.assign_moderator(&wager_id, moderator)
    }

    /// Resolve a dispute. Verifies the caller is a registered moderator,
    /// then delegates to [`WagerEngine::resolve_dispute`].
    pub fn resolve(
        &self,
        dispute_id: &DisputeId,
        moderator: &UserId,
        outcome: DisputeResolution,
    ) -> Result<SettlementOutcome, EngineError> {
        if !self.is_moderator(moderator) {
            return Err(EngineError::NotModerator {
                user: moderator.clone(),
            });
        }
        let wager_id = self
            .engine
            .find_by_dispute(dispute_id)
            .ok_or_else(|| EngineError::DisputeNotFound(dispute_id.clone()))?;
        self.engine
            .resolve_dispute(&wager_id, moderator.clone(), outcome)
    }
}

impl std::fmt::Debug for DisputeArbitrationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisputeArbitrationService")
            .field("moderators", &self.roster.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use bounty_core::Amount;

    use crate::escrow::InMemoryWallet;
    use crate::wager::{Evidence, EvidenceKind};

    fn disputed_wager(
        engine: &Arc<WagerEngine>,
        wallet: &InMemoryWallet,
    ) -> (DisputeId, UserId, UserId) {
        let now = Utc::now();
        let creator = UserId::new();
        wallet.deposit(&creator, Amount::from_minor(1000));
        let acceptor = UserId::new();

        let snap = engine
            .create_at(
                now,
                creator.clone(),
                Amount::from_minor(1000),
                "rl".to_string(),
                None,
                String::new(),
            )
            .unwrap();
        engine.accept_at(now, &snap.wager_id, acceptor.clone()).unwrap();
        engine.start_at(now, &snap.wager_id).unwrap();
        engine
            .submit_proof_at(
                now,
                &snap.wager_id,
                creator.clone(),
                creator.clone(),
                Evidence {
                    url: "https://clips.example/1".to_string(),
                    kind: EvidenceKind::Video,
                },
            )
            .unwrap();
        let dispute = engine
            .open_dispute_at(now, &snap.wager_id, acceptor.clone(), "contested".to_string())
            .unwrap();
        (dispute.id, creator, acceptor)
    }

    #[test]
    fn round_robin_assignment_cycles() {
        let wallet = Arc::new(InMemoryWallet::new());
        let engine = Arc::new(WagerEngine::with_defaults(wallet));
        let service = DisputeArbitrationService::new(engine);

        assert!(service.assign_next().is_none());

        let (a, b) = (UserId::new(), UserId::new());
        service.register_moderator(a.clone());
        service.register_moderator(b.clone());
        service.register_moderator(a.clone()); // duplicate ignored

        assert_eq!(service.moderators().len(), 2);
        assert_eq!(service.assign_next(), Some(a.clone()));
        assert_eq!(service.assign_next(), Some(b));
        assert_eq!(service.assign_next(), Some(a));
    }

    #[test]
    fn resolve_requires_roster_membership() {
        let wallet = Arc::new(InMemoryWallet::new());
        let engine = Arc::new(WagerEngine::with_defaults(wallet.clone()));
        let service = DisputeArbitrationService::new(engine.clone());
        let (dispute_id, _, _) = disputed_wager(&engine, &wallet);

        let outsider = UserId::new();
        let result = service.resolve(&dispute_id, &outsider, DisputeResolution::Void);
        assert!(matches!(result, Err(EngineError::NotModerator { .. })));
    }

    #[test]
    fn resolve_delegates_to_engine() {
        let wallet = Arc::new(InMemoryWallet::new());
        let engine = Arc::new(WagerEngine::with_defaults(wallet.clone()));
        let service = DisputeArbitrationService::new(engine.clone());
        let (dispute_id, creator, _) = disputed_wager(&engine, &wallet);

        let moderator = UserId::new();
        service.register_moderator(moderator.clone());

        let outcome = service
            .resolve(&dispute_id, &moderator, DisputeResolution::ConfirmOriginal)
            .unwrap();
        assert_eq!(outcome.winner, Some(creator));

        let dispute = engine.get_dispute(&dispute_id).unwrap();
        assert_eq!(dispute.resolved_by, Some(moderator));
    }

    #[test]
    fn assign_records_moderator_on_dispute() {
        let wallet = Arc::new(InMemoryWallet::new());
        let engine = Arc::new(WagerEngine::with_defaults(wallet.clone()));
        let service = DisputeArbitrationService::new(engine.clone());
        let (dispute_id, _, _) = disputed_wager(&engine, &wallet);

        assert!(matches!(
            service.assign(&dispute_id),
            Err(EngineError::NoModeratorAvailable)
        ));

        let moderator = UserId::new();
        service.register_moderator(moderator.clone());
        let dispute = service.assign(&dispute_id).unwrap();
        assert_eq!(dispute.moderator, Some(moderator.clone()));

        // Re-assignment keeps the original.
        service.register_moderator(UserId::new());
        let dispute = service.assign(&dispute_id).unwrap();
        assert_eq!(dispute.moderator, Some(moderator));
    }

    #[test]
    fn resolve_unknown_dispute_not_found() {
        let wallet = Arc::new(InMemoryWallet::new());
        let engine = Arc::new(WagerEngine::with_defaults(wallet));
        let service = DisputeArbitrationService::new(engine);
        let moderator = UserId::new();
        service.register_moderator(moderator.clone());

        let result = service.resolve(&DisputeId::new(), &moderator, DisputeResolution::Void);
        assert!(matches!(result, Err(EngineError::DisputeNotFound(_))));
    }
}
