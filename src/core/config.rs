//! Ledger configuration
//!
//! `LedgerConfig` carries the tunables of the core: the epsilon below which a
//! balance counts as settled, the tolerance allowed between an expense total
//! and the sum of its splits, and what deleting an expense does to balances.

use rust_decimal::Decimal;
use std::fmt;
use tracing::warn;

/// Balances whose magnitude is below 0.10 are treated as settled
pub const DEFAULT_EPSILON: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Splits may differ from the expense total by at most 0.01
pub const DEFAULT_SPLIT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// What deleting an expense does to the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletionPolicy {
    /// Reverse the expense's balance deltas along with removing the record
    #[default]
    Reverse,

    /// Only remove the record; balances keep the expense's effect
    RecordOnly,
}

impl fmt::Display for DeletionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeletionPolicy::Reverse => f.write_str("reverse"),
            DeletionPolicy::RecordOnly => f.write_str("record-only"),
        }
    }
}

/// Tunables of the ledger core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Minimum absolute balance considered outstanding
    pub epsilon: Decimal,
    /// Maximum allowed gap between an expense total and its splits
    pub split_tolerance: Decimal,
    /// Effect of deleting an expense
    pub deletion: DeletionPolicy,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            split_tolerance: DEFAULT_SPLIT_TOLERANCE,
            deletion: DeletionPolicy::default(),
        }
    }
}

impl LedgerConfig {
    /// Create a LedgerConfig with custom thresholds
    ///
    /// Negative thresholds are meaningless; they are replaced by the default
    /// with a warning rather than rejected.
    pub fn new(epsilon: Decimal, split_tolerance: Decimal, deletion: DeletionPolicy) -> Self {
        let default = Self::default();

        let epsilon = if epsilon < Decimal::ZERO {
            warn!(
                epsilon = %epsilon,
                default = %default.epsilon,
                "invalid epsilon, using default"
            );
            default.epsilon
        } else {
            epsilon
        };

        let split_tolerance = if split_tolerance < Decimal::ZERO {
            warn!(
                split_tolerance = %split_tolerance,
                default = %default.split_tolerance,
                "invalid split tolerance, using default"
            );
            default.split_tolerance
        } else {
            split_tolerance
        };

        Self {
            epsilon,
            split_tolerance,
            deletion,
        }
    }

    pub fn with_deletion(mut self, deletion: DeletionPolicy) -> Self {
        self.deletion = deletion;
        self
    }
}
