//! # orbook-registry
//!
//! The public surface of the Orbook venue.
//!
//! A [`MarketRegistry`] owns the escrow ledger and every order book. It
//! creates at most one book per asset pair (operator only), routes
//! placements to the right book after a pre-trade balance check, and
//! scopes deposits and withdrawals to the calling identity.
//!
//! [`SharedRegistry`] wraps a registry behind a single mutex for callers on
//! multiple threads, so every state change still happens in one total
//! order.

pub mod registry;
pub mod shared;

pub use orbook_escrow::{AssetCustody, InMemoryAssetBank};
pub use orbook_matchcore::{OrderBook, Placement};
pub use registry::MarketRegistry;
pub use shared::SharedRegistry;
