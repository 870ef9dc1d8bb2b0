//! # orbook-matchcore
//!
//! **Continuous price-time priority matching for Orbook.**
//!
//! Each market has its own [`OrderBook`]. An incoming limit order is run
//! against the opposite side by [`OrderBook::accept`]:
//!
//! - **Maker price**: every fill executes at the resting order's price
//! - **FIFO at equal price**: earlier resting orders fill first
//! - **All-or-nothing**: fills are planned read-only, settled in one escrow
//!   transaction, and only then applied to the book
//! - **Owner gated**: only the registry that created a book may drive it

pub mod matcher;
pub mod orderbook;
pub mod price_level;

pub use matcher::{Fill, FillPlan, Placement, plan_fills};
pub use orderbook::OrderBook;
pub use price_level::PriceLevel;
