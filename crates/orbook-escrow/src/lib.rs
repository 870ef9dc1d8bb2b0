//! # orbook-escrow
//!
//! Custodial balances for the Orbook venue.
//!
//! Users move assets in and out through an [`AssetCustody`] collaborator;
//! everything in between (reservations behind resting orders, trade
//! settlement) happens inside the [`EscrowLedger`] and never touches the
//! external asset.
//!
//! Settlement is staged: the matching engine opens a [`LedgerTxn`], applies
//! every reserve/consume/credit for a placement, and commits once. A
//! transaction that is dropped without committing leaves the ledger exactly
//! as it was.

pub mod custody;
pub mod ledger;
pub mod supply_conservation;

pub use custody::{AssetCustody, InMemoryAssetBank};
pub use ledger::{EscrowLedger, LedgerTxn};
pub use supply_conservation::SupplyConservation;
