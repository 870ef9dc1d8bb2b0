//! External asset custody.
//!
//! The ledger never owns the assets themselves. Deposits pull funds from a
//! user's external account into venue custody (allowance gated), and
//! withdrawals push them back out.

use std::collections::{HashMap, HashSet};

use orbook_types::{AssetId, OrbookError, Result, UserId};
use rust_decimal::Decimal;

/// The fungible-asset capability the ledger depends on.
pub trait AssetCustody {
    /// Pull `amount` of `asset` from `owner` into venue custody. Fails with
    /// [`OrbookError::AllowanceInsufficient`] if `owner` has not approved
    /// the venue for at least `amount`.
    fn transfer_from(&mut self, asset: &AssetId, owner: UserId, amount: Decimal) -> Result<()>;

    /// Push `amount` of `asset` from venue custody to `recipient`.
    fn transfer_to(&mut self, asset: &AssetId, recipient: UserId, amount: Decimal) -> Result<()>;
}

/// In-process asset bank with `approve`/`transferFrom` semantics.
///
/// Tracks every account's external balance, the allowance each owner has
/// granted the venue, and the amount the venue holds in custody.
#[derive(Debug, Default)]
pub struct InMemoryAssetBank {
    balances: HashMap<(UserId, AssetId), Decimal>,
    allowances: HashMap<(UserId, AssetId), Decimal>,
    custody: HashMap<AssetId, Decimal>,
    blocked: HashSet<UserId>,
}

impl InMemoryAssetBank {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `amount` of `asset` in `to`'s external account.
    pub fn mint(&mut self, asset: &AssetId, to: UserId, amount: Decimal) {
        *self.balances.entry((to, asset.clone())).or_default() += amount;
    }

    /// Set the amount the venue may pull from `owner` (overwrites).
    pub fn approve(&mut self, owner: UserId, asset: &AssetId, amount: Decimal) {
        self.allowances.insert((owner, asset.clone()), amount);
    }

    #[must_use]
    pub fn allowance(&self, owner: UserId, asset: &AssetId) -> Decimal {
        self.allowances
            .get(&(owner, asset.clone()))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// External (non-escrowed) balance of `owner`.
    #[must_use]
    pub fn balance_of(&self, owner: UserId, asset: &AssetId) -> Decimal {
        self.balances
            .get(&(owner, asset.clone()))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Amount of `asset` currently held by the venue.
    #[must_use]
    pub fn custody_of(&self, asset: &AssetId) -> Decimal {
        self.custody.get(asset).copied().unwrap_or(Decimal::ZERO)
    }

    /// Refuse all future pushes to `account`.
    pub fn block(&mut self, account: UserId) {
        self.blocked.insert(account);
    }

    pub fn unblock(&mut self, account: UserId) {
        self.blocked.remove(&account);
    }
}

impl AssetCustody for InMemoryAssetBank {
    fn transfer_from(&mut self, asset: &AssetId, owner: UserId, amount: Decimal) -> Result<()> {
        let key = (owner, asset.clone());
        let allowance = self.allowances.get(&key).copied().unwrap_or(Decimal::ZERO);
        if allowance < amount {
            return Err(OrbookError::AllowanceInsufficient {
                asset: asset.clone(),
                needed: amount,
                allowance,
            });
        }
        let held = self.balances.get(&key).copied().unwrap_or(Decimal::ZERO);
        if held < amount {
            return Err(OrbookError::TransferFailed {
                reason: format!("{owner} holds {held} {asset}, cannot send {amount}"),
            });
        }

        self.allowances.insert(key.clone(), allowance - amount);
        self.balances.insert(key, held - amount);
        *self.custody.entry(asset.clone()).or_default() += amount;
        Ok(())
    }

    fn transfer_to(&mut self, asset: &AssetId, recipient: UserId, amount: Decimal) -> Result<()> {
        if self.blocked.contains(&recipient) {
            return Err(OrbookError::TransferFailed {
                reason: format!("recipient {recipient} is blocked for {asset}"),
            });
        }
        let held = self.custody_of(asset);
        if held < amount {
            return Err(OrbookError::TransferFailed {
                reason: format!("custody holds {held} {asset}, cannot release {amount}"),
            });
        }

        self.custody.insert(asset.clone(), held - amount);
        *self.balances.entry((recipient, asset.clone())).or_default() += amount;
        Ok(())
    }
}
