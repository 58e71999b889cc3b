//! Engine configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use bounty_core::{Amount, ValidationError};

/// Tunable parameters of the wager engine.
///
/// Windows are stored as whole seconds so the config serializes cleanly;
/// accessors return [`chrono::Duration`] for arithmetic against timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Minimum stake in minor units, inclusive.
    pub min_stake: Amount,
    /// Maximum stake in minor units, inclusive.
    pub max_stake: Amount,
    /// Platform fee in basis points of the stake, taken at settlement.
    pub fee_bps: u16,
    /// How long an open wager waits for an acceptor.
    pub acceptance_window_secs: i64,
    /// How long the non-submitting participant has to contest a result.
    pub dispute_window_secs: i64,
    /// Interval between expiry sweeps.
    pub sweep_interval_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_stake: Amount::from_minor(100),
            max_stake: Amount::from_minor(10_000_000),
            fee_bps: 500,
            acceptance_window_secs: 72 * 3600,
            dispute_window_secs: 24 * 3600,
            sweep_interval_secs: 60,
        }
    }
}

impl EngineConfig {
    /// The acceptance window as a duration.
    pub fn acceptance_window(&self) -> Duration {
        Duration::seconds(self.acceptance_window_secs)
    }

    /// The dispute window as a duration.
    pub fn dispute_window(&self) -> Duration {
        Duration::seconds(self.dispute_window_secs)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.fee_bps > 10_000 {
            return Err(ValidationError::InvalidBasisPoints(self.fee_bps));
        }
        if self.min_stake > self.max_stake {
            return Err(ValidationError::OutOfRange {
                field: "min_stake",
                reason: format!(
                    "minimum stake {} exceeds maximum stake {}",
                    self.min_stake, self.max_stake
                ),
            });
        }
        if self.acceptance_window_secs <= 0 {
            return Err(ValidationError::OutOfRange {
                field: "acceptance_window_secs",
                reason: "acceptance window must be positive".to_string(),
            });
        }
        if self.dispute_window_secs <= 0 {
            return Err(ValidationError::OutOfRange {
                field: "dispute_window_secs",
                reason: "dispute window must be positive".to_string(),
            });
        }
        Ok(())
    }
}
