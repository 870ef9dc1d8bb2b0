//! Continuous price-time priority matching.
//!
//! [`OrderBook::accept`] runs one incoming limit order against the book:
//!
//! ```text
//! accept(caller, ledger, side, trader, price, quantity) -> Placement
//! ```
//!
//! ## Algorithm
//!
//! 1. Owner check and parameter validation
//! 2. [`plan_fills`] walks the opposite side read-only, best level first and
//!    FIFO within a level, while the incoming price still crosses
//! 3. One escrow transaction reserves the incoming order's funds and
//!    settles every planned fill at the maker's price
//! 4. Only after the transaction commits are makers reduced and the
//!    remainder (if any) rested with a fresh order ID
//!
//! Any error before step 4 leaves the book and the ledger untouched.

use chrono::Utc;
use orbook_escrow::{EscrowLedger, LedgerTxn};
use orbook_types::{
    AssetId, OrbookError, Order, OrderId, OrderSide, RegistryId, Result, Trade, TradeId, UserId,
    check_order, notional, reservation,
};
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use crate::OrderBook;

/// One planned execution against a resting order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fill {
    pub maker_order_id: OrderId,
    pub maker: UserId,
    /// The maker's limit price.
    pub price: Decimal,
    pub quantity: Decimal,
    /// `price * quantity`.
    pub quote_amount: Decimal,
}

/// The fills an incoming order would produce and what would be left over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillPlan {
    pub fills: Vec<Fill>,
    pub remaining: Decimal,
}

impl FillPlan {
    #[must_use]
    pub fn filled_quantity(&self) -> Decimal {
        self.fills.iter().map(|f| f.quantity).sum()
    }
}

/// Outcome of a successful placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Executed trades, in execution order.
    pub trades: Vec<Trade>,
    /// The remainder that now rests in the book, if any.
    pub resting: Option<Order>,
}

impl Placement {
    #[must_use]
    pub fn filled_quantity(&self) -> Decimal {
        self.trades.iter().map(|t| t.quantity).sum()
    }

    #[must_use]
    pub fn is_fully_filled(&self) -> bool {
        self.resting.is_none()
    }
}

/// Walk the opposite side of `book` and plan fills for an incoming order.
/// Does not touch the book.
pub fn plan_fills(
    book: &OrderBook,
    side: OrderSide,
    price: Decimal,
    quantity: Decimal,
) -> Result<FillPlan> {
    let mut remaining = quantity;
    let mut fills = Vec::new();

    'levels: for level in book.opposite_levels(side) {
        if !side.crosses(price, level.price) {
            break;
        }
        for maker in level.iter() {
            if remaining.is_zero() {
                break 'levels;
            }
            let fill_qty = remaining.min(maker.quantity);
            fills.push(Fill {
                maker_order_id: maker.id,
                maker: maker.trader,
                price: maker.price,
                quantity: fill_qty,
                quote_amount: notional(maker.price, fill_qty)?,
            });
            remaining -= fill_qty;
        }
    }

    Ok(FillPlan { fills, remaining })
}

impl OrderBook {
    /// Run an incoming limit order against the book.
    ///
    /// Only the owning registry may call this. The trader must hold enough
    /// available balance for the full reservation (`price * quantity` of
    /// quote for a buy, `quantity` of base for a sell).
    pub fn accept(
        &mut self,
        caller: RegistryId,
        ledger: &mut EscrowLedger,
        side: OrderSide,
        trader: UserId,
        price: Decimal,
        quantity: Decimal,
    ) -> Result<Placement> {
        if caller != self.owner() {
            warn!(caller = %caller, owner = %self.owner(), market = %self.pair(), "Rejected accept from non-owner");
            return Err(OrbookError::NotAuthorized {
                reason: format!("{caller} does not own the {} book", self.pair()),
            });
        }
        check_order(price, quantity, self.price_precision, self.quantity_precision)?;

        let plan = plan_fills(self, side, price, quantity)?;

        let mut txn = ledger.begin();
        self.settle(&mut txn, side, trader, price, quantity, &plan.fills)?;
        txn.commit()?;

        let trades = self.apply_fills(side, trader, &plan.fills)?;
        let resting = if plan.remaining.is_zero() {
            None
        } else {
            Some(self.rest_remainder(side, trader, price, plan.remaining, quantity)?)
        };

        info!(
            market = %self.pair(),
            side = %side,
            trader = %trader,
            price = %price,
            quantity = %quantity,
            filled = %plan.filled_quantity(),
            trades = trades.len(),
            resting = ?resting.as_ref().map(|o| o.id),
            "Order placed"
        );
        Ok(Placement { trades, resting })
    }

    /// Stage the incoming reservation and every fill's balance movements.
    fn settle(
        &self,
        txn: &mut LedgerTxn<'_>,
        side: OrderSide,
        trader: UserId,
        price: Decimal,
        quantity: Decimal,
        fills: &[Fill],
    ) -> Result<()> {
        let base = self.pair_base();
        let quote = self.pair_quote();

        let (locked_asset, locked) = reservation(self.pair(), side, price, quantity)?;
        txn.reserve(trader, locked_asset, locked)?;

        for fill in fills {
            match side {
                OrderSide::Buy => {
                    move_reserved(txn, fill.maker, trader, base, fill.quantity)?;
                    move_reserved(txn, trader, fill.maker, quote, fill.quote_amount)?;
                    let improvement = notional(price, fill.quantity)? - fill.quote_amount;
                    if improvement > Decimal::ZERO {
                        txn.release(trader, quote, improvement)?;
                    }
                }
                OrderSide::Sell => {
                    move_reserved(txn, trader, fill.maker, base, fill.quantity)?;
                    move_reserved(txn, fill.maker, trader, quote, fill.quote_amount)?;
                }
            }
        }
        Ok(())
    }

    /// Reduce makers and record trades. Runs only after settlement committed.
    fn apply_fills(
        &mut self,
        taker_side: OrderSide,
        taker: UserId,
        fills: &[Fill],
    ) -> Result<Vec<Trade>> {
        let mut trades = Vec::with_capacity(fills.len());
        for fill in fills {
            let maker_done = self.reduce(fill.maker_order_id, fill.quantity).inspect_err(|e| {
                error!(market = %self.pair(), order = %fill.maker_order_id, error = %e, "Book diverged from settled fills");
            })?;

            let sequence = self.next_trade_seq;
            self.next_trade_seq += 1;
            let trade = Trade {
                id: TradeId::deterministic(self.market_id(), sequence),
                market_id: self.market_id(),
                market: self.pair().clone(),
                sequence,
                maker_order_id: fill.maker_order_id,
                maker: fill.maker,
                taker,
                taker_side,
                price: fill.price,
                quantity: fill.quantity,
                quote_amount: fill.quote_amount,
                executed_at: Utc::now(),
            };
            debug!(
                trade = %trade,
                maker_order = %fill.maker_order_id,
                maker_filled = maker_done,
                "Fill"
            );
            self.trades.push(trade.clone());
            trades.push(trade);
        }
        Ok(trades)
    }

    fn rest_remainder(
        &mut self,
        side: OrderSide,
        trader: UserId,
        price: Decimal,
        remaining: Decimal,
        original: Decimal,
    ) -> Result<Order> {
        let order = Order {
            id: self.next_id(),
            trader,
            side,
            price,
            quantity: remaining,
            original_quantity: original,
            base_asset: self.pair_base().clone(),
            quote_asset: self.pair_quote().clone(),
            created_at: Utc::now(),
        };
        self.insert(order.clone())?;
        debug!(market = %self.pair(), order = %order.id, remaining = %remaining, "Remainder rested");
        Ok(order)
    }
}

/// Move `amount` of `asset` out of `from`'s reserve into `to`'s available
/// balance.
fn move_reserved(
    txn: &mut LedgerTxn<'_>,
    from: UserId,
    to: UserId,
    asset: &AssetId,
    amount: Decimal,
) -> Result<()> {
    txn.consume_reserved(from, asset, amount)?;
    txn.credit(to, asset, amount)
}
