//! Balance tracking types for the Orbook escrow ledger.
//!
//! Every (user, asset) pair has an `available` balance (withdrawable and
//! usable for new orders) and a `reserved` balance (locked behind the
//! user's resting orders).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single balance entry for a (user, asset) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BalanceEntry {
    /// Available for new orders / withdrawal.
    pub available: Decimal,
    /// Locked behind resting orders.
    pub reserved: Decimal,
}

impl BalanceEntry {
    /// Create a zero balance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            available: Decimal::ZERO,
            reserved: Decimal::ZERO,
        }
    }

    /// Total balance (available + reserved).
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.available + self.reserved
    }

    /// Whether this entry has no balance at all.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.available.is_zero() && self.reserved.is_zero()
    }

    /// Whether either component has gone below zero.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.available < Decimal::ZERO || self.reserved < Decimal::ZERO
    }
}

impl Default for BalanceEntry {
    fn default() -> Self {
        Self::new()
    }
}
