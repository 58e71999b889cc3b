//! # Escrow Ledger
//!
//! The only module that touches money. The engine never mutates balances
//! directly; every movement goes through the [`WalletService`] boundary,
//! which the wallet side serializes per account.
//!
//! Every call carries an [`IdempotencyKey`] derived from
//! `(wager_id, operation_kind)`, so a retried settlement performs each
//! ledger effect at most once.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bounty_core::{Amount, UserId, WagerId};

use crate::error::EngineError;

// ── Idempotency ────────────────────────────────────────────────────────

/// The four escrow operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscrowOp {
    /// Earmark the stake against the creator's available balance.
    Hold,
    /// Move the payout from the creator's hold to the winner.
    Release,
    /// Move the fee portion to the platform account.
    Collect,
    /// Return the hold to the creator's available balance.
    Refund,
}

impl EscrowOp {
    /// The canonical string identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hold => "hold",
            Self::Release => "release",
            Self::Collect => "collect",
            Self::Refund => "refund",
        }
    }
}

impl std::fmt::Display for EscrowOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Idempotency key for a wallet call: one per `(wager_id, operation_kind)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyKey {
    /// The wager whose escrow is being operated on.
    pub wager_id: WagerId,
    /// The operation kind.
    pub op: EscrowOp,
}

impl IdempotencyKey {
    /// Build the key for a wager operation.
    pub fn new(wager_id: WagerId, op: EscrowOp) -> Self {
        Self { wager_id, op }
    }
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.wager_id, self.op)
    }
}

// ── Wallet boundary ────────────────────────────────────────────────────

/// Errors from the wallet service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    /// The available balance cannot cover the requested amount.
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        /// Amount requested.
        required: Amount,
        /// Amount available.
        available: Amount,
    },

    /// The wallet service failed or is unreachable. Retryable.
    #[error("wallet unavailable: {0}")]
    Unavailable(String),
}

/// The external wallet service boundary.
///
/// Implementations must make every call idempotent per key: replaying an
/// already-applied key is a successful no-op.
pub trait WalletService: Send + Sync {
    /// Debit the user's available balance and credit their escrow balance.
    fn hold(
        &self,
        key: &IdempotencyKey,
        user: &UserId,
        amount: Amount,
    ) -> Result<(), WalletError>;

    /// Move `amount` from `from`'s escrow hold into `to`'s available
    /// balance (cross-user transfer).
    fn release(
        &self,
        key: &IdempotencyKey,
        from: &UserId,
        to: &UserId,
        amount: Amount,
    ) -> Result<(), WalletError>;

    /// Move the fee portion of the hold into the platform account.
    fn collect(&self, key: &IdempotencyKey, amount: Amount) -> Result<(), WalletError>;

    /// Return escrow to the original holder's available balance.
    fn refund(
        &self,
        key: &IdempotencyKey,
        user: &UserId,
        amount: Amount,
    ) -> Result<(), WalletError>;
}

// ── In-memory wallet ───────────────────────────────────────────────────

/// A user's balances as seen by the in-memory wallet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalances {
    /// Spendable balance.
    pub available: Amount,
    /// Balance earmarked in escrow holds.
    pub escrow: Amount,
}

/// An active escrow lot, created by `hold` and drawn down by
/// release/collect/refund. Keyed by wager so `collect(amount)` can resolve
/// the source account without carrying a user id.
#[derive(Debug, Clone)]
struct HoldLot {
    owner: UserId,
    remaining: Amount,
}

/// In-memory wallet service.
///
/// The sovereign-mode wallet: per-user available/escrow balances, a
/// platform fee account, and an applied-key set so replayed calls are
/// no-ops. Production zones point the engine at the real wallet service
/// instead; this implementation also backs the test suites.
pub struct InMemoryWallet {
    accounts: DashMap<UserId, AccountBalances>,
    holds: DashMap<WagerId, HoldLot>,
    platform: Mutex<Amount>,
    applied: DashMap<String, ()>,
}

impl InMemoryWallet {
    /// Create an empty wallet.
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            holds: DashMap::new(),
            platform: Mutex::new(Amount::ZERO),
            applied: DashMap::new(),
        }
    }

    /// Credit a user's available balance.
    pub fn deposit(&self, user: &UserId, amount: Amount) {
        let mut acct = self.accounts.entry(user.clone()).or_default();
        acct.available = acct
            .available
            .checked_add(amount)
            .unwrap_or(acct.available);
    }

    /// A user's current balances.
    pub fn balance_of(&self, user: &UserId) -> AccountBalances {
        self.accounts
            .get(user)
            .map(|r| *r.value())
            .unwrap_or_default()
    }

    /// Total fees collected by the platform account.
    pub fn platform_collected(&self) -> Amount {
        *self.platform.lock()
    }

    fn already_applied(&self, key: &IdempotencyKey) -> bool {
        self.applied.contains_key(&key.to_string())
    }

    fn mark_applied(&self, key: &IdempotencyKey) {
        self.applied.insert(key.to_string(), ());
    }

    fn debit_escrow(&self, user: &UserId, amount: Amount) -> Result<(), WalletError> {
        let mut acct = self.accounts.entry(user.clone()).or_default();
        acct.escrow = acct.escrow.checked_sub(amount).ok_or_else(|| {
            WalletError::Unavailable(format!("escrow balance of {user} underfunded"))
        })?;
        Ok(())
    }
}

impl Default for InMemoryWallet {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryWallet")
            .field("accounts", &self.accounts.len())
            .field("holds", &self.holds.len())
            .finish()
    }
}

impl WalletService for InMemoryWallet {
    fn hold(
        &self,
        key: &IdempotencyKey,
        user: &UserId,
        amount: Amount,
    ) -> Result<(), WalletError> {
        if self.already_applied(key) {
            return Ok(());
        }
        {
            let mut acct = self.accounts.entry(user.clone()).or_default();
            let available = acct.available;
            acct.available = available.checked_sub(amount).ok_or(
                WalletError::InsufficientFunds {
                    required: amount,
                    available,
                },
            )?;
            acct.escrow = acct.escrow.checked_add(amount).ok_or_else(|| {
                WalletError::Unavailable("escrow balance overflow".to_string())
            })?;
        }
        self.holds.insert(
            key.wager_id.clone(),
            HoldLot {
                owner: user.clone(),
                remaining: amount,
            },
        );
        self.mark_applied(key);
        Ok(())
    }

    fn release(
        &self,
        key: &IdempotencyKey,
        from: &UserId,
        to: &UserId,
        amount: Amount,
    ) -> Result<(), WalletError> {
        if self.already_applied(key) {
            return Ok(());
        }
        {
            let mut lot = self.holds.get_mut(&key.wager_id).ok_or_else(|| {
                WalletError::Unavailable(format!("no escrow hold for {}", key.wager_id))
            })?;
            lot.remaining = lot.remaining.checked_sub(amount).ok_or_else(|| {
                WalletError::Unavailable(format!("escrow hold for {} underfunded", key.wager_id))
            })?;
        }
        self.debit_escrow(from, amount)?;
        {
            let mut acct = self.accounts.entry(to.clone()).or_default();
            acct.available = acct.available.checked_add(amount).ok_or_else(|| {
                WalletError::Unavailable("available balance overflow".to_string())
            })?;
        }
        self.mark_applied(key);
        Ok(())
    }

    fn collect(&self, key: &IdempotencyKey, amount: Amount) -> Result<(), WalletError> {
        if self.already_applied(key) {
            return Ok(());
        }
        let owner = {
            let mut lot = self.holds.get_mut(&key.wager_id).ok_or_else(|| {
                WalletError::Unavailable(format!("no escrow hold for {}", key.wager_id))
            })?;
            lot.remaining = lot.remaining.checked_sub(amount).ok_or_else(|| {
                WalletError::Unavailable(format!("escrow hold for {} underfunded", key.wager_id))
            })?;
            lot.owner.clone()
        };
        self.debit_escrow(&owner, amount)?;
        {
            let mut platform = self.platform.lock();
            *platform = platform.checked_add(amount).unwrap_or(*platform);
        }
        // Drop the lot once fully drawn down.
        if let Some(lot) = self.holds.get(&key.wager_id) {
            if lot.remaining.is_zero() {
                drop(lot);
                self.holds.remove(&key.wager_id);
            }
        }
        self.mark_applied(key);
        Ok(())
    }

    fn refund(
        &self,
        key: &IdempotencyKey,
        user: &UserId,
        amount: Amount,
    ) -> Result<(), WalletError> {
        if self.already_applied(key) {
            return Ok(());
        }
        self.debit_escrow(user, amount)?;
        {
            let mut acct = self.accounts.entry(user.clone()).or_default();
            acct.available = acct.available.checked_add(amount).ok_or_else(|| {
                WalletError::Unavailable("available balance overflow".to_string())
            })?;
        }
        self.holds.remove(&key.wager_id);
        self.mark_applied(key);
        Ok(())
    }
}

// ── Ledger wrapper ─────────────────────────────────────────────────────

/// Binds a [`WalletService`] to the wager domain: derives idempotency keys
/// from `(wager_id, operation_kind)` and maps wallet errors into
/// [`EngineError`].
pub struct EscrowLedger {
    wallet: Arc<dyn WalletService>,
}

impl EscrowLedger {
    /// Wrap a wallet service.
    pub fn new(wallet: Arc<dyn WalletService>) -> Self {
        Self { wallet }
    }

    /// Hold the stake against the creator's balance.
    pub fn hold(
        &self,
        wager_id: &WagerId,
        user: &UserId,
        amount: Amount,
    ) -> Result<(), EngineError> {
        let key = IdempotencyKey::new(wager_id.clone(), EscrowOp::Hold);
        tracing::debug!(key = %key, user = %user, amount = %amount, "escrow hold");
        self.wallet.hold(&key, user, amount).map_err(EngineError::from)
    }

    /// Release the payout from the creator's hold to the winner.
    pub fn release(
        &self,
        wager_id: &WagerId,
        from: &UserId,
        to: &UserId,
        amount: Amount,
    ) -> Result<(), EngineError> {
        let key = IdempotencyKey::new(wager_id.clone(), EscrowOp::Release);
        tracing::debug!(key = %key, from = %from, to = %to, amount = %amount, "escrow release");
        self.wallet
            .release(&key, from, to, amount)
            .map_err(EngineError::from)
    }

    /// Collect the platform fee.
    pub fn collect(&self, wager_id: &WagerId, amount: Amount) -> Result<(), EngineError> {
        let key = IdempotencyKey::new(wager_id.clone(), EscrowOp::Collect);
        tracing::debug!(key = %key, amount = %amount, "escrow collect");
        self.wallet.collect(&key, amount).map_err(EngineError::from)
    }

    /// Refund the hold to its owner in full.
    pub fn refund(
        &self,
        wager_id: &WagerId,
        user: &UserId,
        amount: Amount,
    ) -> Result<(), EngineError> {
        let key = IdempotencyKey::new(wager_id.clone(), EscrowOp::Refund);
        tracing::debug!(key = %key, user = %user, amount = %amount, "escrow refund");
        self.wallet
            .refund(&key, user, amount)
            .map_err(EngineError::from)
    }
}

impl std::fmt::Debug for EscrowLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscrowLedger").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn funded_user(wallet: &InMemoryWallet, amount: u64) -> UserId {
        let user = UserId::new();
        wallet.deposit(&user, Amount::from_minor(amount));
        user
    }

    #[test]
    fn hold_moves_available_to_escrow() {
        let wallet = InMemoryWallet::new();
        let user = funded_user(&wallet, 1000);
        let wager_id = WagerId::new();

        let key = IdempotencyKey::new(wager_id, EscrowOp::Hold);
        wallet.hold(&key, &user, Amount::from_minor(600)).unwrap();

        let bal = wallet.balance_of(&user);
        assert_eq!(bal.available, Amount::from_minor(400));
        assert_eq!(bal.escrow, Amount::from_minor(600));
    }

    #[test]
    fn hold_rejects_insufficient_funds() {
        let wallet = InMemoryWallet::new();
        let user = funded_user(&wallet, 100);
        let key = IdempotencyKey::new(WagerId::new(), EscrowOp::Hold);

        let err = wallet
            .hold(&key, &user, Amount::from_minor(500))
            .unwrap_err();
        assert!(matches!(err, WalletError::InsufficientFunds { .. }));
        // Nothing moved.
        assert_eq!(wallet.balance_of(&user).available, Amount::from_minor(100));
        assert_eq!(wallet.balance_of(&user).escrow, Amount::ZERO);
    }

    #[test]
    fn hold_is_idempotent_per_key() {
        let wallet = InMemoryWallet::new();
        let user = funded_user(&wallet, 1000);
        let key = IdempotencyKey::new(WagerId::new(), EscrowOp::Hold);

        wallet.hold(&key, &user, Amount::from_minor(300)).unwrap();
        wallet.hold(&key, &user, Amount::from_minor(300)).unwrap();

        let bal = wallet.balance_of(&user);
        assert_eq!(bal.available, Amount::from_minor(700));
        assert_eq!(bal.escrow, Amount::from_minor(300));
    }

    #[test]
    fn release_and_collect_settle_a_hold() {
        let wallet = InMemoryWallet::new();
        let creator = funded_user(&wallet, 1000);
        let winner = UserId::new();
        let wager_id = WagerId::new();

        wallet
            .hold(
                &IdempotencyKey::new(wager_id.clone(), EscrowOp::Hold),
                &creator,
                Amount::from_minor(1000),
            )
            .unwrap();
        wallet
            .release(
                &IdempotencyKey::new(wager_id.clone(), EscrowOp::Release),
                &creator,
                &winner,
                Amount::from_minor(950),
            )
            .unwrap();
        wallet
            .collect(
                &IdempotencyKey::new(wager_id.clone(), EscrowOp::Collect),
                Amount::from_minor(50),
            )
            .unwrap();

        assert_eq!(wallet.balance_of(&creator).available, Amount::ZERO);
        assert_eq!(wallet.balance_of(&creator).escrow, Amount::ZERO);
        assert_eq!(
            wallet.balance_of(&winner).available,
            Amount::from_minor(950)
        );
        assert_eq!(wallet.platform_collected(), Amount::from_minor(50));
    }

    #[test]
    fn release_to_creator_when_creator_wins() {
        let wallet = InMemoryWallet::new();
        let creator = funded_user(&wallet, 1000);
        let wager_id = WagerId::new();

        wallet
            .hold(
                &IdempotencyKey::new(wager_id.clone(), EscrowOp::Hold),
                &creator,
                Amount::from_minor(1000),
            )
            .unwrap();
        wallet
            .release(
                &IdempotencyKey::new(wager_id.clone(), EscrowOp::Release),
                &creator,
                &creator,
                Amount::from_minor(950),
            )
            .unwrap();

        let bal = wallet.balance_of(&creator);
        assert_eq!(bal.available, Amount::from_minor(950));
        assert_eq!(bal.escrow, Amount::from_minor(50));
    }

    #[test]
    fn refund_returns_full_hold() {
        let wallet = InMemoryWallet::new();
        let creator = funded_user(&wallet, 500);
        let wager_id = WagerId::new();

        wallet
            .hold(
                &IdempotencyKey::new(wager_id.clone(), EscrowOp::Hold),
                &creator,
                Amount::from_minor(500),
            )
            .unwrap();
        wallet
            .refund(
                &IdempotencyKey::new(wager_id.clone(), EscrowOp::Refund),
                &creator,
                Amount::from_minor(500),
            )
            .unwrap();

        let bal = wallet.balance_of(&creator);
        assert_eq!(bal.available, Amount::from_minor(500));
        assert_eq!(bal.escrow, Amount::ZERO);
        assert_eq!(wallet.platform_collected(), Amount::ZERO);
    }

    #[test]
    fn settlement_replays_are_noops() {
        let wallet = InMemoryWallet::new();
        let creator = funded_user(&wallet, 1000);
        let winner = UserId::new();
        let wager_id = WagerId::new();

        wallet
            .hold(
                &IdempotencyKey::new(wager_id.clone(), EscrowOp::Hold),
                &creator,
                Amount::from_minor(1000),
            )
            .unwrap();
        let release_key = IdempotencyKey::new(wager_id.clone(), EscrowOp::Release);
        let collect_key = IdempotencyKey::new(wager_id.clone(), EscrowOp::Collect);
        for _ in 0..3 {
            wallet
                .release(&release_key, &creator, &winner, Amount::from_minor(950))
                .unwrap();
            wallet.collect(&collect_key, Amount::from_minor(50)).unwrap();
        }

        assert_eq!(
            wallet.balance_of(&winner).available,
            Amount::from_minor(950)
        );
        assert_eq!(wallet.platform_collected(), Amount::from_minor(50));
    }

    #[test]
    fn release_without_hold_is_unavailable() {
        let wallet = InMemoryWallet::new();
        let err = wallet
            .release(
                &IdempotencyKey::new(WagerId::new(), EscrowOp::Release),
                &UserId::new(),
                &UserId::new(),
                Amount::from_minor(10),
            )
            .unwrap_err();
        assert!(matches!(err, WalletError::Unavailable(_)));
    }

    #[test]
    fn ledger_maps_wallet_errors() {
        let wallet = Arc::new(InMemoryWallet::new());
        let ledger = EscrowLedger::new(wallet.clone());
        let user = UserId::new();
        wallet.deposit(&user, Amount::from_minor(50));

        let err = ledger
            .hold(&WagerId::new(), &user, Amount::from_minor(100))
            .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientFunds { .. }));
    }

    #[test]
    fn idempotency_key_display() {
        let wager_id = WagerId::new();
        let key = IdempotencyKey::new(wager_id.clone(), EscrowOp::Collect);
        assert_eq!(format!("{key}"), format!("{wager_id}:collect"));
    }
}
