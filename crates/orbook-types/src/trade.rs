//! Trade types produced by the matching engine.
//!
//! A [`Trade`] is the immutable record of one fill between an incoming
//! (taker) order and a resting (maker) order, executed at the maker's price.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{MarketId, MarketPair, OrderId, OrderSide, TradeId, UserId};

/// A single fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Deterministic trade identifier (market + trade sequence).
    pub id: TradeId,
    /// The book that produced this trade.
    pub market_id: MarketId,
    pub market: MarketPair,
    /// Per-book trade sequence, starting at 0.
    pub sequence: u64,
    /// The resting order that was matched.
    pub maker_order_id: OrderId,
    pub maker: UserId,
    /// The trader whose incoming order triggered the fill.
    pub taker: UserId,
    /// Which side the taker was on.
    pub taker_side: OrderSide,
    /// Execution price (always the maker's limit price).
    pub price: Decimal,
    /// Executed quantity in base asset.
    pub quantity: Decimal,
    /// Quote amount = price × quantity.
    pub quote_amount: Decimal,
    pub executed_at: DateTime<Utc>,
}

impl Trade {
    #[must_use]
    pub fn notional(&self) -> Decimal {
        self.quote_amount
    }

    #[must_use]
    pub fn taker_is_buyer(&self) -> bool {
        self.taker_side == OrderSide::Buy
    }

    /// The account that received base and paid quote.
    #[must_use]
    pub fn buyer(&self) -> UserId {
        if self.taker_is_buyer() {
            self.taker
        } else {
            self.maker
        }
    }

    /// The account that delivered base and received quote.
    #[must_use]
    pub fn seller(&self) -> UserId {
        if self.taker_is_buyer() {
            self.maker
        } else {
            self.taker
        }
    }
}

impl std::fmt::Display for Trade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Trade[{}] {} {} {} @ {} = {}",
            self.id.short(),
            self.market,
            self.taker_side,
            self.quantity,
            self.price,
            self.quote_amount,
        )
    }
}
