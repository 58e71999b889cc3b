//! Integer minor-unit money.
//!
//! Amounts are u64 minor units (e.g. cents). Floating-point representations
//! of money are rejected at the type level: there is no `f64` constructor
//! and no float arithmetic anywhere in the settlement path.

use serde::{Deserialize, Serialize};

/// Basis points in one whole (100%).
pub const BPS_DENOMINATOR: u64 = 10_000;

/// A monetary amount in integer minor units of the platform currency.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    /// Zero amount.
    pub const ZERO: Amount = Amount(0);

    /// Create an amount from minor units.
    pub const fn from_minor(units: u64) -> Self {
        Self(units)
    }

    /// The raw minor-unit value.
    pub const fn minor(&self) -> u64 {
        self.0
    }

    /// Whether this amount is zero.
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition.
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Checked subtraction.
    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Split this amount into `(payout, fee)` for a fee given in basis
    /// points.
    ///
    /// The payout is `floor(amount * (10_000 - fee_bps) / 10_000)` and the
    /// fee is the remainder, so `payout + fee == amount` holds for every
    /// input. Fee rates above 100% are clamped to 100%.
    pub fn split_fee(self, fee_bps: u16) -> (Amount, Amount) {
        let fee_bps = u64::from(fee_bps).min(BPS_DENOMINATOR);
        // u128 intermediate: u64::MAX * 10_000 overflows u64.
        let payout =
            (u128::from(self.0) * u128::from(BPS_DENOMINATOR - fee_bps)) / u128::from(BPS_DENOMINATOR);
        let payout = Amount(payout as u64);
        let fee = Amount(self.0 - payout.0);
        (payout, fee)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
