//! # orbook-types
//!
//! Shared types, errors, and configuration for the **Orbook** matching venue.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`UserId`], [`AssetId`], [`MarketId`], [`RegistryId`], [`OrderId`], [`TradeId`], [`MarketPair`]
//! - **Order model**: [`Order`], [`OrderSide`]
//! - **Trade model**: [`Trade`]
//! - **Balance model**: [`BalanceEntry`]
//! - **Events**: [`VenueEvent`]
//! - **Configuration**: [`RegistryConfig`]
//! - **Errors**: [`OrbookError`] with `OB_ERR_` prefix codes
//! - **Constants**: precision limits and defaults

pub mod balance;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;
pub mod order;
pub mod trade;

// Re-export all primary types at crate root for ergonomic imports:
//   use orbook_types::{Order, OrderSide, Trade, ...};

pub use balance::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use order::*;
pub use trade::*;

// Constants are accessed via `orbook_types::constants::FOO`
// (not re-exported to avoid name collisions).
