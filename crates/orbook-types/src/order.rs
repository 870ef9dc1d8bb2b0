//! Order types for the Orbook venue.
//!
//! Only pure limit orders exist. An [`Order`] is created when an incoming
//! order's remainder rests in a book; its `quantity` is the remaining
//! unfilled amount and only ever decreases.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AssetId, MarketPair, OrbookError, OrderId, Result, UserId};

/// Which side of the book this order is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// The side an incoming order on `self` matches against.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Whether an incoming order on this side at `incoming_price` crosses a
    /// resting order at `resting_price`.
    #[must_use]
    pub fn crosses(self, incoming_price: Decimal, resting_price: Decimal) -> bool {
        match self {
            Self::Buy => incoming_price >= resting_price,
            Self::Sell => incoming_price <= resting_price,
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// A resting limit order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub trader: UserId,
    pub side: OrderSide,
    /// Limit price in quote units per base unit.
    pub price: Decimal,
    /// Remaining unfilled quantity in base units.
    pub quantity: Decimal,
    /// Quantity at the moment the order rested.
    pub original_quantity: Decimal,
    pub base_asset: AssetId,
    pub quote_asset: AssetId,
    pub created_at: DateTime<Utc>,
}

impl Order {
    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.quantity.is_zero()
    }

    #[must_use]
    pub fn filled_qty(&self) -> Decimal {
        self.original_quantity - self.quantity
    }
}

/// The asset and amount an order on `side` locks in escrow on `pair`:
/// `price * quantity` of quote for a buy, `quantity` of base for a sell.
pub fn reservation(
    pair: &MarketPair,
    side: OrderSide,
    price: Decimal,
    quantity: Decimal,
) -> Result<(&AssetId, Decimal)> {
    match side {
        OrderSide::Buy => Ok((&pair.quote, notional(price, quantity)?)),
        OrderSide::Sell => Ok((&pair.base, quantity)),
    }
}

/// Exact quote-asset amount for `quantity` base units at `price`.
///
/// Fails with `InvalidParameters` when the product would not fit in a
/// `Decimal` without dropping fractional digits.
pub fn notional(price: Decimal, quantity: Decimal) -> Result<Decimal> {
    let (price, quantity) = (price.normalize(), quantity.normalize());
    match price.checked_mul(quantity) {
        Some(product) if product.scale() >= price.scale() + quantity.scale() => Ok(product),
        _ => Err(OrbookError::invalid(format!(
            "notional {price} * {quantity} is not representable exactly"
        ))),
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    pub fn dummy_limit(id: u64, side: OrderSide, price: Decimal, qty: Decimal) -> Self {
        Self::dummy_limit_for_user(id, UserId::new(), side, price, qty)
    }

    pub fn dummy_limit_for_user(
        id: u64,
        trader: UserId,
        side: OrderSide,
        price: Decimal,
        qty: Decimal,
    ) -> Self {
        Self {
            id: OrderId(id),
            trader,
            side,
            price,
            quantity: qty,
            original_quantity: qty,
            base_asset: AssetId::new("BASE"),
            quote_asset: AssetId::new("QUOTE"),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_side_display() {
        assert_eq!(format!("{}", OrderSide::Buy), "BUY");
        assert_eq!(format!("{}", OrderSide::Sell), "SELL");
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
    }

    #[test]
    fn crossing_condition() {
        let hundred = Decimal::new(100, 0);
        let ninety = Decimal::new(90, 0);
        assert!(OrderSide::Buy.crosses(hundred, hundred));
        assert!(OrderSide::Buy.crosses(hundred, ninety));
        assert!(!OrderSide::Buy.crosses(ninety, hundred));
        assert!(OrderSide::Sell.crosses(ninety, hundred));
        assert!(!OrderSide::Sell.crosses(hundred, ninety));
    }

    #[test]
    fn fill_tracking() {
        let mut order =
            Order::dummy_limit(1, OrderSide::Buy, Decimal::new(100, 0), Decimal::new(10, 0));
        assert!(!order.is_filled());
        order.quantity = Decimal::new(4, 0);
        assert_eq!(order.filled_qty(), Decimal::new(6, 0));
        order.quantity = Decimal::ZERO;
        assert!(order.is_filled());
        assert_eq!(order.filled_qty(), Decimal::new(10, 0));
    }

    #[test]
    fn reservation_per_side() {
        let pair = MarketPair::new("BASE", "QUOTE");
        let price = Decimal::new(100, 0);
        let qty = Decimal::new(8, 0);

        let (asset, amount) = reservation(&pair, OrderSide::Buy, price, qty).unwrap();
        assert_eq!(asset.as_str(), "QUOTE");
        assert_eq!(amount, Decimal::new(800, 0));

        let (asset, amount) = reservation(&pair, OrderSide::Sell, price, qty).unwrap();
        assert_eq!(asset.as_str(), "BASE");
        assert_eq!(amount, qty);
    }

    #[test]
    fn notional_is_exact_and_overflow_is_rejected() {
        // 1.5 * 0.25 carries no rounding.
        assert_eq!(
            notional(Decimal::new(15, 1), Decimal::new(25, 2)).unwrap(),
            Decimal::new(375, 3)
        );
        let err = notional(Decimal::MAX, Decimal::TWO).unwrap_err();
        assert!(matches!(err, OrbookError::InvalidParameters { .. }));
    }

    #[test]
    fn notional_ignores_trailing_zeros() {
        // 100.00000000 * 8.0 is exact even though the raw scales add to 9.
        assert_eq!(
            notional(Decimal::new(10_000_000_000, 8), Decimal::new(80, 1)).unwrap(),
            Decimal::new(800, 0)
        );
    }

    #[test]
    fn notional_refuses_to_round() {
        // (1e18 + 1e-8) * 1000.00000001 needs 16 fractional digits on top of
        // 22 integer digits, which is more than a Decimal mantissa holds.
        let price = Decimal::from_i128_with_scale(100_000_000_000_000_000_000_000_001, 8);
        let qty = Decimal::new(100_000_000_001, 8);
        let err = notional(price, qty).unwrap_err();
        assert!(matches!(err, OrbookError::InvalidParameters { .. }));
    }
}
