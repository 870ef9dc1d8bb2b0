//! Per-asset supply accounting.
//!
//! ```text
//! ∀ asset: Σ(available + reserved) == Σ(deposits) - Σ(withdrawals)
//! ```
//!
//! Trades only move value between ledger entries, so the right-hand side
//! changes exclusively on deposit and withdrawal.

use std::collections::{BTreeSet, HashMap};

use orbook_types::{AssetId, OrbookError, Result};
use rust_decimal::Decimal;

/// Cumulative deposits and withdrawals per asset.
#[derive(Debug, Default)]
pub struct SupplyConservation {
    deposits: HashMap<AssetId, Decimal>,
    withdrawals: HashMap<AssetId, Decimal>,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_deposit(&mut self, asset: &AssetId, amount: Decimal) {
        *self.deposits.entry(asset.clone()).or_default() += amount;
    }

    pub fn record_withdrawal(&mut self, asset: &AssetId, amount: Decimal) {
        *self.withdrawals.entry(asset.clone()).or_default() += amount;
    }

    #[must_use]
    pub fn total_deposits(&self, asset: &AssetId) -> Decimal {
        self.deposits.get(asset).copied().unwrap_or(Decimal::ZERO)
    }

    #[must_use]
    pub fn total_withdrawals(&self, asset: &AssetId) -> Decimal {
        self.withdrawals.get(asset).copied().unwrap_or(Decimal::ZERO)
    }

    /// Deposits minus withdrawals.
    #[must_use]
    pub fn expected_supply(&self, asset: &AssetId) -> Decimal {
        self.total_deposits(asset) - self.total_withdrawals(asset)
    }

    /// Compare the ledger's actual holdings of `asset` against the expected
    /// supply.
    pub fn verify(&self, asset: &AssetId, actual_supply: Decimal) -> Result<()> {
        let expected = self.expected_supply(asset);
        if actual_supply != expected {
            return Err(OrbookError::invariant(format!(
                "asset {asset}: ledger holds {actual_supply}, expected {expected} \
                 (deposits={}, withdrawals={})",
                self.total_deposits(asset),
                self.total_withdrawals(asset),
            )));
        }
        Ok(())
    }

    /// Every asset that has ever been deposited or withdrawn, sorted.
    #[must_use]
    pub fn tracked_assets(&self) -> Vec<AssetId> {
        let assets: BTreeSet<&AssetId> = self
            .deposits
            .keys()
            .chain(self.withdrawals.keys())
            .collect();
        assets.into_iter().cloned().collect()
    }
}
