//! The order book for a single market pair.
//!
//! Uses `BTreeMap` for price-level ordering:
//! - **Bids** (buys): `BTreeMap<Reverse<Decimal>, PriceLevel>` -- highest price first
//! - **Asks** (sells): `BTreeMap<Decimal, PriceLevel>` -- lowest price first
//!
//! An auxiliary `HashMap<OrderId, (Side, Price)>` gives O(log N) lookup and
//! removal by ID.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use orbook_types::{
    AssetId, MarketId, MarketPair, OrbookError, Order, OrderId, OrderSide, RegistryId, Result,
    Trade, constants,
};
use rust_decimal::Decimal;

use crate::price_level::PriceLevel;

/// The order book for a single market pair.
#[derive(Debug)]
pub struct OrderBook {
    market_id: MarketId,
    pair: MarketPair,
    /// The registry allowed to call `accept`.
    owner: RegistryId,
    pub(crate) price_precision: u32,
    pub(crate) quantity_precision: u32,
    bids: BTreeMap<Reverse<Decimal>, PriceLevel>,
    asks: BTreeMap<Decimal, PriceLevel>,
    index: HashMap<OrderId, (OrderSide, Decimal)>,
    next_order_id: OrderId,
    pub(crate) next_trade_seq: u64,
    pub(crate) trades: Vec<Trade>,
}

impl OrderBook {
    /// Create an empty book with the default precision limits.
    #[must_use]
    pub fn new(market_id: MarketId, pair: MarketPair, owner: RegistryId) -> Self {
        Self {
            market_id,
            pair,
            owner,
            price_precision: constants::PRICE_PRECISION,
            quantity_precision: constants::QTY_PRECISION,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            index: HashMap::new(),
            next_order_id: OrderId::FIRST,
            next_trade_seq: 0,
            trades: Vec::new(),
        }
    }

    /// Override the fractional-digit limits for prices and quantities.
    #[must_use]
    pub fn with_precision(mut self, price_precision: u32, quantity_precision: u32) -> Self {
        self.price_precision = price_precision;
        self.quantity_precision = quantity_precision;
        self
    }

    // =================================================================
    // Identity
    // =================================================================

    #[must_use]
    pub fn market_id(&self) -> MarketId {
        self.market_id
    }

    #[must_use]
    pub fn pair(&self) -> &MarketPair {
        &self.pair
    }

    #[must_use]
    pub fn pair_base(&self) -> &AssetId {
        &self.pair.base
    }

    #[must_use]
    pub fn pair_quote(&self) -> &AssetId {
        &self.pair.quote
    }

    #[must_use]
    pub fn owner(&self) -> RegistryId {
        self.owner
    }

    // =================================================================
    // Insertion / removal
    // =================================================================

    /// Hand out the next order ID. IDs are never reused.
    pub fn next_id(&mut self) -> OrderId {
        let id = self.next_order_id;
        self.next_order_id = id.next();
        id
    }

    /// Rest an order at the back of its price level.
    pub fn insert(&mut self, order: Order) -> Result<()> {
        if self.index.contains_key(&order.id) {
            return Err(OrbookError::invariant(format!(
                "order {} already rests in {}",
                order.id, self.pair
            )));
        }
        if order.quantity <= Decimal::ZERO {
            return Err(OrbookError::invariant(format!(
                "order {} would rest with quantity {}",
                order.id, order.quantity
            )));
        }

        let price = order.price;
        self.index.insert(order.id, (order.side, price));

        match order.side {
            OrderSide::Buy => {
                self.bids
                    .entry(Reverse(price))
                    .or_insert_with(|| PriceLevel::new(price))
                    .push_back(order);
            }
            OrderSide::Sell => {
                self.asks
                    .entry(price)
                    .or_insert_with(|| PriceLevel::new(price))
                    .push_back(order);
            }
        }
        Ok(())
    }

    /// Remove an order whose quantity has reached zero. Empty price levels
    /// are dropped with it.
    pub fn remove_filled(&mut self, side: OrderSide, order_id: OrderId) -> Result<Order> {
        let missing = || OrbookError::invariant(format!("order {order_id} not resting on {side}"));
        let &(indexed_side, price) = self.index.get(&order_id).ok_or_else(missing)?;
        if indexed_side != side {
            return Err(missing());
        }
        let level = self.level_mut(side, price).ok_or_else(missing)?;
        let remaining = level.get_mut(order_id).ok_or_else(missing)?.quantity;
        if !remaining.is_zero() {
            return Err(OrbookError::invariant(format!(
                "order {order_id} still has {remaining} open"
            )));
        }

        let order = level.remove_order(order_id).ok_or_else(missing)?;
        if level.is_empty() {
            match side {
                OrderSide::Buy => self.bids.remove(&Reverse(price)),
                OrderSide::Sell => self.asks.remove(&price),
            };
        }
        self.index.remove(&order_id);
        Ok(order)
    }

    /// Reduce a resting order by `quantity`, removing it once it reaches
    /// zero. Returns whether the order was removed.
    pub(crate) fn reduce(&mut self, order_id: OrderId, quantity: Decimal) -> Result<bool> {
        let missing = || OrbookError::invariant(format!("order {order_id} not resting"));
        let &(side, price) = self.index.get(&order_id).ok_or_else(missing)?;
        let order = self
            .level_mut(side, price)
            .and_then(|level| level.get_mut(order_id))
            .ok_or_else(missing)?;
        if order.quantity < quantity {
            return Err(OrbookError::invariant(format!(
                "fill of {quantity} exceeds order {order_id} remaining {}",
                order.quantity
            )));
        }
        order.quantity -= quantity;
        if order.is_filled() {
            self.remove_filled(side, order_id)?;
            return Ok(true);
        }
        Ok(false)
    }

    fn level_mut(&mut self, side: OrderSide, price: Decimal) -> Option<&mut PriceLevel> {
        match side {
            OrderSide::Buy => self.bids.get_mut(&Reverse(price)),
            OrderSide::Sell => self.asks.get_mut(&price),
        }
    }

    // =================================================================
    // Queries
    // =================================================================

    /// Highest-priority resting buy.
    #[must_use]
    pub fn best_bid(&self) -> Option<&Order> {
        self.bids.values().next().and_then(PriceLevel::front)
    }

    /// Highest-priority resting sell.
    #[must_use]
    pub fn best_ask(&self) -> Option<&Order> {
        self.asks.values().next().and_then(PriceLevel::front)
    }

    #[must_use]
    pub fn best_bid_price(&self) -> Option<Decimal> {
        self.bids.keys().next().map(|r| r.0)
    }

    #[must_use]
    pub fn best_ask_price(&self) -> Option<Decimal> {
        self.asks.keys().next().copied()
    }

    /// Spread = best_ask - best_bid. `None` if either side is empty.
    #[must_use]
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid_price(), self.best_ask_price()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Mid price = (best_bid + best_ask) / 2. `None` if either side is empty.
    #[must_use]
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid_price(), self.best_ask_price()) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::TWO),
            _ => None,
        }
    }

    /// Resting buys in priority order (price desc, then arrival).
    #[must_use]
    pub fn list_bids(&self) -> Vec<Order> {
        self.bid_levels().flat_map(PriceLevel::iter).cloned().collect()
    }

    /// Resting sells in priority order (price asc, then arrival).
    #[must_use]
    pub fn list_asks(&self) -> Vec<Order> {
        self.ask_levels().flat_map(PriceLevel::iter).cloned().collect()
    }

    /// Look up a resting order by ID.
    #[must_use]
    pub fn order(&self, order_id: OrderId) -> Option<&Order> {
        let &(side, price) = self.index.get(&order_id)?;
        let level = match side {
            OrderSide::Buy => self.bids.get(&Reverse(price)),
            OrderSide::Sell => self.asks.get(&price),
        }?;
        level.iter().find(|o| o.id == order_id)
    }

    #[must_use]
    pub fn order_count(&self) -> usize {
        self.index.len()
    }

    /// Number of distinct bid price levels.
    #[must_use]
    pub fn bid_depth(&self) -> usize {
        self.bids.len()
    }

    /// Number of distinct ask price levels.
    #[must_use]
    pub fn ask_depth(&self) -> usize {
        self.asks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Every trade this book has executed, oldest first.
    #[must_use]
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Drain the trade history. Sequence numbers keep counting.
    pub fn take_trades(&mut self) -> Vec<Trade> {
        std::mem::take(&mut self.trades)
    }

    /// Iterate bid levels from best (highest) to worst.
    pub fn bid_levels(&self) -> impl Iterator<Item = &PriceLevel> {
        self.bids.values()
    }

    /// Iterate ask levels from best (lowest) to worst.
    pub fn ask_levels(&self) -> impl Iterator<Item = &PriceLevel> {
        self.asks.values()
    }

    /// Levels an incoming order on `side` would match against, best first.
    pub(crate) fn opposite_levels(
        &self,
        side: OrderSide,
    ) -> Box<dyn Iterator<Item = &PriceLevel> + '_> {
        match side {
            OrderSide::Buy => Box::new(self.ask_levels()),
            OrderSide::Sell => Box::new(self.bid_levels()),
        }
    }
}

#[cfg(test)]
mod tests {
    use orbook_types::UserId;

    use super::*;

    fn book() -> OrderBook {
        OrderBook::new(
            MarketId::new(),
            MarketPair::new("BASE", "QUOTE"),
            RegistryId::new(),
        )
    }

    fn rest(book: &mut OrderBook, side: OrderSide, price: i64, qty: i64) -> OrderId {
        let id = book.next_id();
        book.insert(Order::dummy_limit(
            id.0,
            side,
            Decimal::new(price, 0),
            Decimal::new(qty, 0),
        ))
        .unwrap();
        id
    }

    #[test]
    fn ids_start_at_one_and_increase() {
        let mut book = book();
        assert_eq!(book.next_id(), OrderId(1));
        assert_eq!(book.next_id(), OrderId(2));
        assert_eq!(book.next_id(), OrderId(3));
    }

    #[test]
    fn accessors() {
        let book = book();
        assert_eq!(book.pair_base().as_str(), "BASE");
        assert_eq!(book.pair_quote().as_str(), "QUOTE");
        assert!(book.is_empty());
        assert!(book.trades().is_empty());
    }

    #[test]
    fn insert_and_query_best_bid_ask() {
        let mut book = book();
        rest(&mut book, OrderSide::Buy, 100, 1);
        rest(&mut book, OrderSide::Buy, 99, 1);
        let ask = rest(&mut book, OrderSide::Sell, 101, 1);
        rest(&mut book, OrderSide::Sell, 102, 1);

        assert_eq!(book.best_bid().unwrap().price, Decimal::new(100, 0));
        assert_eq!(book.best_ask().unwrap().id, ask);
        assert_eq!(book.spread(), Some(Decimal::ONE));
        assert_eq!(book.mid_price(), Some(Decimal::new(1005, 1)));
        assert_eq!(book.order_count(), 4);
        assert_eq!(book.bid_depth(), 2);
        assert_eq!(book.ask_depth(), 2);
    }

    #[test]
    fn bids_list_highest_first_then_fifo() {
        let mut book = book();
        let a = rest(&mut book, OrderSide::Buy, 90, 1);
        let b = rest(&mut book, OrderSide::Buy, 100, 1);
        let c = rest(&mut book, OrderSide::Buy, 100, 2);
        let d = rest(&mut book, OrderSide::Buy, 95, 1);

        let ids: Vec<OrderId> = book.list_bids().iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![b, c, d, a]);
    }

    #[test]
    fn asks_list_lowest_first_then_fifo() {
        let mut book = book();
        let a = rest(&mut book, OrderSide::Sell, 110, 1);
        let b = rest(&mut book, OrderSide::Sell, 101, 1);
        let c = rest(&mut book, OrderSide::Sell, 105, 1);
        let d = rest(&mut book, OrderSide::Sell, 101, 1);

        let ids: Vec<OrderId> = book.list_asks().iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![b, d, c, a]);
    }

    #[test]
    fn duplicate_id_rejected() {
        let mut book = book();
        let order = Order::dummy_limit(1, OrderSide::Buy, Decimal::new(100, 0), Decimal::ONE);
        book.insert(order.clone()).unwrap();
        assert!(book.insert(order).unwrap_err().is_fatal());
    }

    #[test]
    fn zero_quantity_never_rests() {
        let mut book = book();
        let order = Order::dummy_limit(1, OrderSide::Sell, Decimal::new(100, 0), Decimal::ZERO);
        assert!(book.insert(order).is_err());
        assert!(book.is_empty());
    }

    #[test]
    fn reduce_to_zero_removes_order_and_level() {
        let mut book = book();
        let id = rest(&mut book, OrderSide::Sell, 100, 10);

        assert!(!book.reduce(id, Decimal::new(4, 0)).unwrap());
        assert_eq!(book.order(id).unwrap().quantity, Decimal::new(6, 0));
        assert_eq!(book.order(id).unwrap().filled_qty(), Decimal::new(4, 0));

        assert!(book.reduce(id, Decimal::new(6, 0)).unwrap());
        assert!(book.order(id).is_none());
        assert_eq!(book.ask_depth(), 0);
        assert!(book.is_empty());
    }

    #[test]
    fn reduce_beyond_remaining_is_fatal() {
        let mut book = book();
        let id = rest(&mut book, OrderSide::Buy, 100, 1);
        assert!(book.reduce(id, Decimal::TWO).unwrap_err().is_fatal());
        assert_eq!(book.order(id).unwrap().quantity, Decimal::ONE);
    }

    #[test]
    fn remove_filled_requires_zero_quantity() {
        let mut book = book();
        let id = rest(&mut book, OrderSide::Buy, 100, 1);
        assert!(book.remove_filled(OrderSide::Buy, id).is_err());
        assert!(book.remove_filled(OrderSide::Sell, id).is_err());
        assert!(book.remove_filled(OrderSide::Buy, OrderId(42)).is_err());
        assert_eq!(book.order_count(), 1);
    }

    #[test]
    fn order_lookup_carries_trader() {
        let mut book = book();
        let trader = UserId::new();
        let id = book.next_id();
        book.insert(Order::dummy_limit_for_user(
            id.0,
            trader,
            OrderSide::Sell,
            Decimal::new(100, 0),
            Decimal::ONE,
        ))
        .unwrap();
        assert_eq!(book.order(id).unwrap().trader, trader);
    }

    #[test]
    fn empty_book() {
        let book = book();
        assert!(book.best_bid().is_none());
        assert!(book.best_ask().is_none());
        assert_eq!(book.spread(), None);
        assert_eq!(book.mid_price(), None);
        assert!(book.list_bids().is_empty());
        assert!(book.list_asks().is_empty());
    }
}
