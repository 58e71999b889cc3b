//! # Wager Store
//!
//! In-memory system of record backed by `DashMap`. Each wager record owns
//! its cascading children (acceptance, proofs, dispute); none of them ever
//! outlives the wager, and terminal wagers are kept as permanent history.
//!
//! The `with_record_mut` pattern ensures TOCTOU-free state transitions:
//! read-validate-update runs under a single entry write lock, which is the
//! per-wager serialization boundary. Across different wagers there is no
//! ordering guarantee, and read paths never block on other wagers.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use bounty_core::{DisputeId, UserId, WagerId};

use crate::error::EngineError;
use crate::wager::{Acceptance, Dispute, Proof, Wager, WagerSnapshot, WagerState};

/// A wager and its cascading children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WagerRecord {
    /// The root entity.
    pub wager: Wager,
    /// The single acceptance, once accepted.
    pub acceptance: Option<Acceptance>,
    /// Append-only proof log, at most one entry per participant.
    pub proofs: Vec<Proof>,
    /// The dispute, if one was opened.
    pub dispute: Option<Dispute>,
}

impl WagerRecord {
    /// Wrap a freshly opened wager.
    pub fn new(wager: Wager) -> Self {
        Self {
            wager,
            acceptance: None,
            proofs: Vec::new(),
            dispute: None,
        }
    }

    /// Build the API-facing snapshot with derived fields computed at `now`.
    pub fn snapshot(&self, now: DateTime<Utc>, dispute_window: Duration) -> WagerSnapshot {
        let w = &self.wager;
        let dispute_deadline = w.dispute_deadline(dispute_window);
        let can_dispute = w.state == WagerState::PendingResult
            && self.dispute.is_none()
            && dispute_deadline.map(|d| now <= d).unwrap_or(false);
        WagerSnapshot {
            wager_id: w.id.clone(),
            state: w.state,
            creator: w.creator.clone(),
            acceptor: w.acceptor.clone(),
            target_user: w.target_user.clone(),
            winner: w.winner.clone(),
            game: w.game.clone(),
            description: w.description.clone(),
            stake_amount: w.stake_amount,
            payout_amount: w.payout_amount,
            platform_fee: w.platform_fee,
            created_at: w.created_at,
            accepted_at: w.accepted_at,
            started_at: w.started_at,
            result_submitted_at: w.result_submitted_at,
            completed_at: w.completed_at,
            expires_at: w.expires_at,
            is_expired: w.is_expired(now),
            can_dispute,
            dispute_deadline,
            proof_count: self.proofs.len(),
            has_dispute: self.dispute.is_some(),
        }
    }
}

/// Thread-safe store of wager records.
pub struct WagerStore {
    records: DashMap<WagerId, WagerRecord>,
}

impl WagerStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Insert a new record.
    pub fn insert(&self, record: WagerRecord) {
        self.records.insert(record.wager.id.clone(), record);
    }

    /// Get a record by wager id.
    pub fn get(&self, wager_id: &WagerId) -> Option<WagerRecord> {
        self.records.get(wager_id).map(|r| r.value().clone())
    }

    /// Run a validate-then-mutate closure under the record's entry lock.
    ///
    /// All mutating engine operations go through here; the entry lock
    /// serializes them per wager and makes the escrow call and the state
    /// write a single atomic step from the point of view of every other
    /// caller. The closure works on a draft copy that replaces the stored
    /// record only on success, so a failing operation (including an escrow
    /// failure after validation) leaves no partial state write behind.
    pub fn with_record_mut<T>(
        &self,
        wager_id: &WagerId,
        f: impl FnOnce(&mut WagerRecord) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let mut entry = self
            .records
            .get_mut(wager_id)
            .ok_or_else(|| EngineError::WagerNotFound(wager_id.clone()))?;
        let mut draft = entry.value().clone();
        let result = f(&mut draft)?;
        *entry.value_mut() = draft;
        Ok(result)
    }

    /// All records. Used for persistence snapshots.
    pub fn list_all(&self) -> Vec<WagerRecord> {
        self.records.iter().map(|r| r.value().clone()).collect()
    }

    /// Non-terminal wagers the user is involved in: as creator, acceptor,
    /// or targeted opponent of a still-open wager.
    pub fn list_active(&self, user: &UserId) -> Vec<WagerRecord> {
        self.records
            .iter()
            .filter(|r| {
                let w = &r.value().wager;
                if w.state.is_terminal() {
                    return false;
                }
                w.is_participant(user)
                    || (w.state == WagerState::Open && w.target_user.as_ref() == Some(user))
            })
            .map(|r| r.value().clone())
            .collect()
    }

    /// Open wagers whose acceptance deadline has passed (`now > expires_at`).
    pub fn open_expired(&self, now: DateTime<Utc>) -> Vec<WagerId> {
        self.records
            .iter()
            .filter(|r| r.value().wager.is_expired(now))
            .map(|r| r.key().clone())
            .collect()
    }

    /// Undisputed pending-result wagers whose dispute window has passed.
    pub fn overdue_pending_result(
        &self,
        now: DateTime<Utc>,
        dispute_window: Duration,
    ) -> Vec<WagerId> {
        self.records
            .iter()
            .filter(|r| {
                let rec = r.value();
                rec.wager.state == WagerState::PendingResult
                    && rec.dispute.is_none()
                    && rec
                        .wager
                        .dispute_deadline(dispute_window)
                        .map(|d| now > d)
                        .unwrap_or(false)
            })
            .map(|r| r.key().clone())
            .collect()
    }

    /// Resolve a dispute id to its wager.
    pub fn find_by_dispute(&self, dispute_id: &DisputeId) -> Option<WagerId> {
        self.records
            .iter()
            .find(|r| {
                r.value()
                    .dispute
                    .as_ref()
                    .map(|d| &d.id == dispute_id)
                    .unwrap_or(false)
            })
            .map(|r| r.key().clone())
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Bulk-insert records restored from the database.
    pub fn hydrate(&self, records: Vec<WagerRecord>) {
        for record in records {
            self.insert(record);
        }
    }
}

impl Default for WagerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WagerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WagerStore")
            .field("records", &self.records.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bounty_core::Amount;

    fn record(creator: UserId, now: DateTime<Utc>) -> WagerRecord {
        WagerRecord::new(Wager::open(
            creator,
            Amount::from_minor(1000),
            "cs2".to_string(),
            None,
            String::new(),
            now,
            Duration::hours(72),
        ))
    }

    #[test]
    fn insert_and_get() {
        let store = WagerStore::new();
        let rec = record(UserId::new(), Utc::now());
        let id = rec.wager.id.clone();
        store.insert(rec);

        assert!(store.get(&id).is_some());
        assert!(store.get(&WagerId::new()).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn with_record_mut_not_found() {
        let store = WagerStore::new();
        let result = store.with_record_mut(&WagerId::new(), |_| Ok(()));
        assert!(matches!(result, Err(EngineError::WagerNotFound(_))));
    }

    #[test]
    fn with_record_mut_applies_changes() {
        let store = WagerStore::new();
        let rec = record(UserId::new(), Utc::now());
        let id = rec.wager.id.clone();
        store.insert(rec);

        store
            .with_record_mut(&id, |rec| {
                rec.wager.transition(WagerState::Cancelled, "wager.cancel.v1", Utc::now());
                Ok(())
            })
            .unwrap();
        assert_eq!(store.get(&id).unwrap().wager.state, WagerState::Cancelled);
    }

    #[test]
    fn with_record_mut_rolls_back_on_error() {
        let store = WagerStore::new();
        let rec = record(UserId::new(), Utc::now());
        let id = rec.wager.id.clone();
        store.insert(rec);

        let result: Result<(), EngineError> = store.with_record_mut(&id, |rec| {
            rec.wager
                .transition(WagerState::Cancelled, "wager.cancel.v1", Utc::now());
            Err(EngineError::LedgerUnavailable("wallet down".to_string()))
        });
        assert!(result.is_err());
        // The failed operation left no partial write behind.
        let stored = store.get(&id).unwrap();
        assert_eq!(stored.wager.state, WagerState::Open);
        assert_eq!(stored.wager.transition_log.len(), 1);
    }

    #[test]
    fn list_active_filters_terminal_and_strangers() {
        let store = WagerStore::new();
        let now = Utc::now();
        let creator = UserId::new();
        let stranger = UserId::new();

        store.insert(record(creator.clone(), now));
        let mut done = record(creator.clone(), now);
        done.wager
            .transition(WagerState::Cancelled, "wager.cancel.v1", now);
        store.insert(done);

        assert_eq!(store.list_active(&creator).len(), 1);
        assert!(store.list_active(&stranger).is_empty());
    }

    #[test]
    fn list_active_includes_targeted_invitee() {
        let store = WagerStore::new();
        let now = Utc::now();
        let target = UserId::new();
        let mut rec = record(UserId::new(), now);
        rec.wager.target_user = Some(target.clone());
        store.insert(rec);

        assert_eq!(store.list_active(&target).len(), 1);
    }

    #[test]
    fn open_expired_respects_strict_boundary() {
        let store = WagerStore::new();
        let now = Utc::now();
        let rec = record(UserId::new(), now);
        let expires_at = rec.wager.expires_at;
        store.insert(rec);

        assert!(store.open_expired(expires_at).is_empty());
        assert_eq!(
            store.open_expired(expires_at + Duration::seconds(1)).len(),
            1
        );
    }

    #[test]
    fn overdue_pending_result_requires_no_dispute() {
        let store = WagerStore::new();
        let now = Utc::now();
        let creator = UserId::new();
        let mut rec = record(creator.clone(), now);
        rec.wager
            .transition(WagerState::PendingResult, "wager.proof.submit.v1", now);
        rec.wager.result_submitted_at = Some(now);
        let id = rec.wager.id.clone();
        store.insert(rec);

        let window = Duration::hours(24);
        assert!(store.overdue_pending_result(now + window, window).is_empty());
        assert_eq!(
            store
                .overdue_pending_result(now + window + Duration::seconds(1), window)
                .len(),
            1
        );

        // A dispute takes the wager off the overdue list.
        store
            .with_record_mut(&id, |rec| {
                rec.dispute = Some(Dispute {
                    id: DisputeId::new(),
                    wager_id: id.clone(),
                    disputer: creator.clone(),
                    reason: "contested".to_string(),
                    moderator: None,
                    resolution: None,
                    resolved_by: None,
                    opened_at: now,
                    resolved_at: None,
                });
                Ok(())
            })
            .unwrap();
        assert!(store
            .overdue_pending_result(now + window + Duration::seconds(1), window)
            .is_empty());
    }

    #[test]
    fn find_by_dispute() {
        let store = WagerStore::new();
        let now = Utc::now();
        let mut rec = record(UserId::new(), now);
        let wager_id = rec.wager.id.clone();
        let dispute_id = DisputeId::new();
        rec.dispute = Some(Dispute {
            id: dispute_id.clone(),
            wager_id: wager_id.clone(),
            disputer: UserId::new(),
            reason: "x".to_string(),
            moderator: None,
            resolution: None,
            resolved_by: None,
            opened_at: now,
            resolved_at: None,
        });
        store.insert(rec);

        assert_eq!(store.find_by_dispute(&dispute_id), Some(wager_id));
        assert_eq!(store.find_by_dispute(&DisputeId::new()), None);
    }

    #[test]
    fn snapshot_derives_dispute_fields() {
        let now = Utc::now();
        let mut rec = record(UserId::new(), now);
        rec.wager
            .transition(WagerState::PendingResult, "wager.proof.submit.v1", now);
        rec.wager.result_submitted_at = Some(now);

        let window = Duration::hours(24);
        let snap = rec.snapshot(now + Duration::hours(1), window);
        assert!(snap.can_dispute);
        assert_eq!(snap.dispute_deadline, Some(now + window));

        let snap = rec.snapshot(now + window + Duration::seconds(1), window);
        assert!(!snap.can_dispute);
    }
}
