//! The escrow ledger.
//!
//! Tracks per-(user, asset) balances with available/reserved accounting.
//! Deposits and withdrawals go through an [`AssetCustody`]; settlement goes
//! through a [`LedgerTxn`], which either commits every staged mutation or
//! none of them.

use std::collections::HashMap;

use orbook_types::{AssetId, BalanceEntry, OrbookError, Result, UserId};
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use crate::custody::AssetCustody;
use crate::supply_conservation::SupplyConservation;

type Key = (UserId, AssetId);

/// Custodial balances for every user and asset.
#[derive(Debug, Default)]
pub struct EscrowLedger {
    balances: HashMap<Key, BalanceEntry>,
    supply: SupplyConservation,
}

impl EscrowLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pull `amount` from the user's external account and credit it to
    /// their available balance.
    pub fn deposit<C: AssetCustody + ?Sized>(
        &mut self,
        custody: &mut C,
        user: UserId,
        asset: &AssetId,
        amount: Decimal,
    ) -> Result<()> {
        ensure_positive(amount)?;
        custody.transfer_from(asset, user, amount).inspect_err(|e| {
            warn!(user = %user, asset = %asset, amount = %amount, error = %e, "Deposit rejected");
        })?;

        self.credit(user, asset, amount);
        self.supply.record_deposit(asset, amount);
        info!(user = %user, asset = %asset, amount = %amount, "Deposit credited");
        Ok(())
    }

    /// Debit `amount` from the user's available balance and push it back to
    /// their external account. If the push fails the ledger is untouched.
    pub fn withdraw<C: AssetCustody + ?Sized>(
        &mut self,
        custody: &mut C,
        user: UserId,
        asset: &AssetId,
        amount: Decimal,
    ) -> Result<()> {
        ensure_positive(amount)?;
        self.ensure_available(user, asset, amount)?;
        custody.transfer_to(asset, user, amount).inspect_err(|e| {
            warn!(user = %user, asset = %asset, amount = %amount, error = %e, "Withdrawal push failed");
        })?;

        self.debit(user, asset, amount)?;
        self.supply.record_withdrawal(asset, amount);
        info!(user = %user, asset = %asset, amount = %amount, "Withdrawal sent");
        Ok(())
    }

    /// Available balance for a (user, asset) pair.
    #[must_use]
    pub fn balance_of(&self, user: UserId, asset: &AssetId) -> Decimal {
        self.balance(user, asset).available
    }

    /// Full balance entry (available and reserved).
    #[must_use]
    pub fn balance(&self, user: UserId, asset: &AssetId) -> BalanceEntry {
        self.balances
            .get(&(user, asset.clone()))
            .cloned()
            .unwrap_or_default()
    }

    /// Read-only sufficiency check against the available balance.
    pub fn ensure_available(&self, user: UserId, asset: &AssetId, amount: Decimal) -> Result<()> {
        let available = self.balance_of(user, asset);
        if available < amount {
            return Err(OrbookError::BalanceInsufficient {
                needed: amount,
                available,
            });
        }
        Ok(())
    }

    pub(crate) fn credit(&mut self, user: UserId, asset: &AssetId, amount: Decimal) {
        self.balances
            .entry((user, asset.clone()))
            .or_default()
            .available += amount;
    }

    /// Only called after a sufficiency check, so a shortfall here means the
    /// ledger is corrupt.
    pub(crate) fn debit(&mut self, user: UserId, asset: &AssetId, amount: Decimal) -> Result<()> {
        let entry = self.balances.entry((user, asset.clone())).or_default();
        if entry.available < amount {
            error!(user = %user, asset = %asset, amount = %amount, available = %entry.available, "Debit would go negative");
            return Err(OrbookError::invariant(format!(
                "debit of {amount} {asset} from {user} exceeds available {}",
                entry.available
            )));
        }
        entry.available -= amount;
        Ok(())
    }

    /// Open a staged settlement transaction.
    pub fn begin(&mut self) -> LedgerTxn<'_> {
        LedgerTxn {
            ledger: self,
            staged: HashMap::new(),
            net: HashMap::new(),
        }
    }

    /// Sum of available + reserved over every user for `asset`.
    #[must_use]
    pub fn total_supply(&self, asset: &AssetId) -> Decimal {
        self.balances
            .iter()
            .filter(|((_, a), _)| a == asset)
            .map(|(_, entry)| entry.total())
            .sum()
    }

    /// Check that the ledger holds exactly deposits minus withdrawals of
    /// `asset`.
    pub fn verify_supply(&self, asset: &AssetId) -> Result<()> {
        self.supply
            .verify(asset, self.total_supply(asset))
            .inspect_err(|e| error!(asset = %asset, error = %e, "Supply conservation broken"))
    }

    /// [`verify_supply`](Self::verify_supply) for every asset ever deposited.
    pub fn verify_all_supply(&self) -> Result<()> {
        for asset in self.supply.tracked_assets() {
            self.verify_supply(&asset)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn supply(&self) -> &SupplyConservation {
        &self.supply
    }
}

fn ensure_positive(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(OrbookError::invalid(format!(
            "amount must be positive, got {amount}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// LedgerTxn
// ---------------------------------------------------------------------------

/// A staged set of balance mutations over an [`EscrowLedger`].
///
/// Reads see the staged state layered over the ledger. Nothing reaches the
/// ledger until [`commit`](Self::commit); dropping the transaction discards
/// it.
#[derive(Debug)]
pub struct LedgerTxn<'a> {
    ledger: &'a mut EscrowLedger,
    staged: HashMap<Key, BalanceEntry>,
    /// Net change in total holdings per asset. Must be zero at commit.
    net: HashMap<AssetId, Decimal>,
}

impl LedgerTxn<'_> {
    fn entry(&mut self, user: UserId, asset: &AssetId) -> &mut BalanceEntry {
        let ledger = &*self.ledger;
        self.staged
            .entry((user, asset.clone()))
            .or_insert_with(|| ledger.balance(user, asset))
    }

    /// Balance as seen through this transaction.
    #[must_use]
    pub fn balance(&self, user: UserId, asset: &AssetId) -> BalanceEntry {
        self.staged
            .get(&(user, asset.clone()))
            .cloned()
            .unwrap_or_else(|| self.ledger.balance(user, asset))
    }

    /// Lock `amount` behind an order: available → reserved.
    pub fn reserve(&mut self, user: UserId, asset: &AssetId, amount: Decimal) -> Result<()> {
        ensure_non_negative(amount)?;
        let entry = self.entry(user, asset);
        if entry.available < amount {
            return Err(OrbookError::BalanceInsufficient {
                needed: amount,
                available: entry.available,
            });
        }
        entry.available -= amount;
        entry.reserved += amount;
        Ok(())
    }

    /// Unlock `amount`: reserved → available.
    pub fn release(&mut self, user: UserId, asset: &AssetId, amount: Decimal) -> Result<()> {
        ensure_non_negative(amount)?;
        let entry = self.entry(user, asset);
        if entry.reserved < amount {
            return Err(OrbookError::invariant(format!(
                "release of {amount} {asset} from {user} exceeds reserved {}",
                entry.reserved
            )));
        }
        entry.reserved -= amount;
        entry.available += amount;
        Ok(())
    }

    /// Take `amount` out of the user's reserve. The matching credit to the
    /// counterparty must be staged in the same transaction.
    pub fn consume_reserved(
        &mut self,
        user: UserId,
        asset: &AssetId,
        amount: Decimal,
    ) -> Result<()> {
        ensure_non_negative(amount)?;
        let entry = self.entry(user, asset);
        if entry.reserved < amount {
            return Err(OrbookError::invariant(format!(
                "consume of {amount} {asset} from {user} exceeds reserved {}",
                entry.reserved
            )));
        }
        entry.reserved -= amount;
        *self.net.entry(asset.clone()).or_default() -= amount;
        Ok(())
    }

    /// Add `amount` to the user's available balance.
    pub fn credit(&mut self, user: UserId, asset: &AssetId, amount: Decimal) -> Result<()> {
        ensure_non_negative(amount)?;
        self.entry(user, asset).available += amount;
        *self.net.entry(asset.clone()).or_default() += amount;
        Ok(())
    }

    /// Take `amount` out of the user's available balance.
    pub fn debit(&mut self, user: UserId, asset: &AssetId, amount: Decimal) -> Result<()> {
        ensure_non_negative(amount)?;
        let entry = self.entry(user, asset);
        if entry.available < amount {
            return Err(OrbookError::invariant(format!(
                "debit of {amount} {asset} from {user} exceeds available {}",
                entry.available
            )));
        }
        entry.available -= amount;
        *self.net.entry(asset.clone()).or_default() -= amount;
        Ok(())
    }

    /// Number of (user, asset) entries touched so far.
    #[must_use]
    pub fn touched(&self) -> usize {
        self.staged.len()
    }

    /// Verify value conservation and write every staged entry back.
    pub fn commit(self) -> Result<()> {
        for (asset, delta) in &self.net {
            if !delta.is_zero() {
                error!(asset = %asset, delta = %delta, "Settlement does not conserve value");
                return Err(OrbookError::invariant(format!(
                    "settlement changes total {asset} by {delta}"
                )));
            }
        }
        if let Some(((user, asset), entry)) = self.staged.iter().find(|(_, e)| e.is_negative()) {
            error!(user = %user, asset = %asset, ?entry, "Settlement leaves negative balance");
            return Err(OrbookError::invariant(format!(
                "settlement leaves {user} with negative {asset}"
            )));
        }

        self.ledger.balances.extend(self.staged);
        Ok(())
    }
}

fn ensure_non_negative(amount: Decimal) -> Result<()> {
    if amount < Decimal::ZERO {
        return Err(OrbookError::invariant(format!(
            "negative settlement amount {amount}"
        )));
    }
    Ok(())
}
