//! Observable venue events.
//!
//! The registry appends one event per state change. Consumers drain them
//! with `take_events` or inspect them in place.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AssetId, MarketId, MarketPair, Order, Trade, UserId};

/// Something that happened on the venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VenueEvent {
    MarketCreated {
        market_id: MarketId,
        pair: MarketPair,
    },
    /// An incoming order's remainder was inserted into a book.
    OrderRested { market_id: MarketId, order: Order },
    TradeExecuted { trade: Trade },
    Deposited {
        user: UserId,
        asset: AssetId,
        amount: Decimal,
    },
    Withdrawn {
        user: UserId,
        asset: AssetId,
        amount: Decimal,
    },
}

impl VenueEvent {
    /// Short tag for log lines.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MarketCreated { .. } => "market_created",
            Self::OrderRested { .. } => "order_rested",
            Self::TradeExecuted { .. } => "trade_executed",
            Self::Deposited { .. } => "deposited",
            Self::Withdrawn { .. } => "withdrawn",
        }
    }
}
