//! The market registry.
//!
//! Owns one [`OrderBook`] per asset pair plus the shared [`EscrowLedger`].
//! Every state-changing call takes `&mut self`, so a registry is a single
//! writer by construction.

use std::collections::HashMap;

use orbook_escrow::{AssetCustody, EscrowLedger};
use orbook_matchcore::{OrderBook, Placement};
use orbook_types::{
    AssetId, BalanceEntry, MarketId, MarketPair, OrbookError, OrderSide, RegistryConfig,
    RegistryId, Result, Trade, UserId, VenueEvent, constants, reservation,
};
use rust_decimal::Decimal;
use tracing::{info, warn};

/// Market registry over an external asset custody `C`.
#[derive(Debug)]
pub struct MarketRegistry<C> {
    id: RegistryId,
    config: RegistryConfig,
    custody: C,
    ledger: EscrowLedger,
    books: HashMap<MarketId, OrderBook>,
    /// Canonical (creation-time) orientation only.
    pairs: HashMap<MarketPair, MarketId>,
    /// Market IDs in creation order.
    created: Vec<MarketId>,
    events: Vec<VenueEvent>,
}

impl<C: AssetCustody> MarketRegistry<C> {
    /// Create an empty registry. Fails if `config` is invalid.
    pub fn new(config: RegistryConfig, custody: C) -> Result<Self> {
        config.validate()?;
        let id = RegistryId::new();
        info!(
            venue = constants::VENUE_NAME,
            version = constants::VERSION,
            registry = %id,
            operator = %config.operator,
            "Registry created"
        );
        Ok(Self {
            id,
            config,
            custody,
            ledger: EscrowLedger::new(),
            books: HashMap::new(),
            pairs: HashMap::new(),
            created: Vec::new(),
            events: Vec::new(),
        })
    }

    #[must_use]
    pub fn id(&self) -> RegistryId {
        self.id
    }

    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    #[must_use]
    pub fn custody(&self) -> &C {
        &self.custody
    }

    /// Mutable access to the external asset side (minting, approvals).
    pub fn custody_mut(&mut self) -> &mut C {
        &mut self.custody
    }

    #[must_use]
    pub fn ledger(&self) -> &EscrowLedger {
        &self.ledger
    }

    // =================================================================
    // Markets
    // =================================================================

    /// Create the order book for `base`/`quote`. Operator only.
    pub fn create_market(
        &mut self,
        caller: UserId,
        base: impl Into<AssetId>,
        quote: impl Into<AssetId>,
    ) -> Result<MarketId> {
        let pair = MarketPair::new(base, quote);
        if caller != self.config.operator {
            warn!(caller = %caller, pair = %pair, "Market creation by non-operator");
            return Err(OrbookError::NotAuthorized {
                reason: format!("{caller} may not create markets"),
            });
        }
        if pair.base == pair.quote {
            return Err(OrbookError::invalid(format!(
                "market needs two distinct assets, got {pair}"
            )));
        }
        if self.pairs.contains_key(&pair) || self.pairs.contains_key(&pair.reversed()) {
            warn!(pair = %pair, "Market already exists");
            return Err(OrbookError::MarketAlreadyExists(pair));
        }

        let market_id = MarketId::new();
        let book = OrderBook::new(market_id, pair.clone(), self.id)
            .with_precision(self.config.price_precision, self.config.quantity_precision);
        self.books.insert(market_id, book);
        self.pairs.insert(pair.clone(), market_id);
        self.created.push(market_id);

        info!(market = %market_id, pair = %pair, "Market created");
        self.events.push(VenueEvent::MarketCreated { market_id, pair });
        Ok(market_id)
    }

    /// The book registered for `base`/`quote` in that exact orientation.
    #[must_use]
    pub fn market_for(&self, base: &AssetId, quote: &AssetId) -> Option<MarketId> {
        self.pairs
            .get(&MarketPair::new(base.clone(), quote.clone()))
            .copied()
    }

    #[must_use]
    pub fn is_known_market(&self, market_id: MarketId) -> bool {
        self.books.contains_key(&market_id)
    }

    #[must_use]
    pub fn order_book(&self, market_id: MarketId) -> Option<&OrderBook> {
        self.books.get(&market_id)
    }

    /// Every book, in creation order.
    pub fn markets(&self) -> impl Iterator<Item = &OrderBook> {
        self.created.iter().filter_map(|id| self.books.get(id))
    }

    // =================================================================
    // Placement
    // =================================================================

    /// Place a limit order for `caller` on the `base`/`quote` book.
    pub fn place_order(
        &mut self,
        caller: UserId,
        side: OrderSide,
        price: Decimal,
        quantity: Decimal,
        base: &AssetId,
        quote: &AssetId,
    ) -> Result<Placement> {
        let pair = MarketPair::new(base.clone(), quote.clone());
        let market_id = self
            .pairs
            .get(&pair)
            .copied()
            .ok_or_else(|| OrbookError::MarketNotFound(pair.clone()))?;

        self.pre_check(caller, side, price, quantity, &pair)
            .inspect_err(|e| {
                warn!(trader = %caller, pair = %pair, side = %side, price = %price, quantity = %quantity, error = %e, "Placement rejected");
            })?;

        let book = self
            .books
            .get_mut(&market_id)
            .ok_or_else(|| OrbookError::invariant(format!("{market_id} indexed but missing")))?;
        let placement = book.accept(self.id, &mut self.ledger, side, caller, price, quantity)?;

        for trade in &placement.trades {
            self.events.push(VenueEvent::TradeExecuted {
                trade: trade.clone(),
            });
        }
        if let Some(order) = &placement.resting {
            self.events.push(VenueEvent::OrderRested {
                market_id,
                order: order.clone(),
            });
        }
        Ok(placement)
    }

    pub fn place_buy_order(
        &mut self,
        caller: UserId,
        price: Decimal,
        quantity: Decimal,
        base: &AssetId,
        quote: &AssetId,
    ) -> Result<Placement> {
        self.place_order(caller, OrderSide::Buy, price, quantity, base, quote)
    }

    pub fn place_sell_order(
        &mut self,
        caller: UserId,
        price: Decimal,
        quantity: Decimal,
        base: &AssetId,
        quote: &AssetId,
    ) -> Result<Placement> {
        self.place_order(caller, OrderSide::Sell, price, quantity, base, quote)
    }

    /// Parameter validation and the read-only balance check.
    fn pre_check(
        &self,
        caller: UserId,
        side: OrderSide,
        price: Decimal,
        quantity: Decimal,
        pair: &MarketPair,
    ) -> Result<()> {
        self.config.check_order(price, quantity)?;
        let (asset, amount) = reservation(pair, side, price, quantity)?;
        self.ledger.ensure_available(caller, asset, amount)
    }

    // =================================================================
    // Escrow
    // =================================================================

    /// Pull `amount` of `asset` from the caller into escrow.
    pub fn deposit(&mut self, caller: UserId, asset: &AssetId, amount: Decimal) -> Result<()> {
        self.ledger
            .deposit(&mut self.custody, caller, asset, amount)?;
        self.events.push(VenueEvent::Deposited {
            user: caller,
            asset: asset.clone(),
            amount,
        });
        Ok(())
    }

    /// Send `amount` of the caller's available `asset` back out of escrow.
    pub fn withdraw(&mut self, caller: UserId, asset: &AssetId, amount: Decimal) -> Result<()> {
        self.ledger
            .withdraw(&mut self.custody, caller, asset, amount)?;
        self.events.push(VenueEvent::Withdrawn {
            user: caller,
            asset: asset.clone(),
            amount,
        });
        Ok(())
    }

    /// The caller's available balance of `asset`.
    #[must_use]
    pub fn balance_of(&self, caller: UserId, asset: &AssetId) -> Decimal {
        self.ledger.balance_of(caller, asset)
    }

    /// Available and reserved balance of `asset`.
    #[must_use]
    pub fn balance(&self, caller: UserId, asset: &AssetId) -> BalanceEntry {
        self.ledger.balance(caller, asset)
    }

    /// Check supply conservation for every asset ever deposited.
    pub fn verify_conservation(&self) -> Result<()> {
        self.ledger.verify_all_supply()
    }

    // =================================================================
    // Events
    // =================================================================

    #[must_use]
    pub fn events(&self) -> &[VenueEvent] {
        &self.events
    }

    /// Drain the event log.
    pub fn take_events(&mut self) -> Vec<VenueEvent> {
        std::mem::take(&mut self.events)
    }

    /// Drain the trade history of one book. `None` for an unknown market.
    pub fn take_trades(&mut self, market_id: MarketId) -> Option<Vec<Trade>> {
        self.books.get_mut(&market_id).map(OrderBook::take_trades)
    }
}

#[cfg(test)]
mod tests {
    use orbook_escrow::InMemoryAssetBank;

    use super::*;

    fn dec(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    fn asset(s: &str) -> AssetId {
        AssetId::new(s)
    }

    fn registry() -> (MarketRegistry<InMemoryAssetBank>, UserId) {
        let operator = UserId::new();
        let reg = MarketRegistry::new(RegistryConfig::new(operator), InMemoryAssetBank::new()).unwrap();
        (reg, operator)
    }

    #[test]
    fn new_rejects_invalid_config() {
        let mut config = RegistryConfig::new(UserId::new());
        config.price_precision = 20;
        config.quantity_precision = 20;
        let err = MarketRegistry::new(config, InMemoryAssetBank::new()).unwrap_err();
        assert!(matches!(err, OrbookError::Configuration(_)));
    }

    #[test]
    fn operator_creates_market() {
        let (mut reg, operator) = registry();
        let id = reg.create_market(operator, "A", "B").unwrap();
        assert_eq!(reg.market_for(&asset("A"), &asset("B")), Some(id));
        assert!(reg.is_known_market(id));
        let book = reg.order_book(id).unwrap();
        assert_eq!(book.owner(), reg.id());
        assert_eq!(book.pair_base(), &asset("A"));
        assert_eq!(
            reg.events(),
            &[VenueEvent::MarketCreated {
                market_id: id,
                pair: MarketPair::new("A", "B"),
            }]
        );
    }

    #[test]
    fn non_operator_cannot_create_market() {
        let (mut reg, _) = registry();
        let err = reg.create_market(UserId::new(), "A", "B").unwrap_err();
        assert!(matches!(err, OrbookError::NotAuthorized { .. }));
        assert_eq!(reg.markets().count(), 0);
        assert!(reg.events().is_empty());
    }

    #[test]
    fn duplicate_market_fails_in_either_orientation() {
        let (mut reg, operator) = registry();
        reg.create_market(operator, "A", "B").unwrap();
        assert_eq!(
            reg.create_market(operator, "A", "B").unwrap_err(),
            OrbookError::MarketAlreadyExists(MarketPair::new("A", "B"))
        );
        assert!(matches!(
            reg.create_market(operator, "B", "A").unwrap_err(),
            OrbookError::MarketAlreadyExists(_)
        ));
        assert_eq!(reg.markets().count(), 1);
        // Lookups only resolve the creation orientation.
        assert!(reg.market_for(&asset("B"), &asset("A")).is_none());
    }

    #[test]
    fn same_asset_pair_is_invalid() {
        let (mut reg, operator) = registry();
        let err = reg.create_market(operator, "A", "A").unwrap_err();
        assert!(matches!(err, OrbookError::InvalidParameters { .. }));
    }

    #[test]
    fn unknown_market_lookups() {
        let (reg, _) = registry();
        assert!(reg.market_for(&asset("A"), &asset("B")).is_none());
        assert!(!reg.is_known_market(MarketId::new()));
        assert!(reg.order_book(MarketId::new()).is_none());
    }

    #[test]
    fn placement_on_missing_market_fails() {
        let (mut reg, _) = registry();
        let err = reg
            .place_buy_order(UserId::new(), dec(1), dec(1), &asset("A"), &asset("B"))
            .unwrap_err();
        assert_eq!(err, OrbookError::MarketNotFound(MarketPair::new("A", "B")));
    }

    #[test]
    fn pre_check_rejects_unfunded_order() {
        let (mut reg, operator) = registry();
        let id = reg.create_market(operator, "A", "B").unwrap();
        let err = reg
            .place_sell_order(UserId::new(), dec(100), dec(10), &asset("A"), &asset("B"))
            .unwrap_err();
        assert_eq!(
            err,
            OrbookError::BalanceInsufficient {
                needed: dec(10),
                available: Decimal::ZERO,
            }
        );
        assert!(reg.order_book(id).unwrap().is_empty());
    }

    #[test]
    fn markets_listed_in_creation_order() {
        let (mut reg, operator) = registry();
        let first = reg.create_market(operator, "A", "B").unwrap();
        let second = reg.create_market(operator, "C", "B").unwrap();
        let third = reg.create_market(operator, "A", "C").unwrap();
        let ids: Vec<MarketId> = reg.markets().map(OrderBook::market_id).collect();
        assert_eq!(ids, vec![first, second, third]);
    }

    #[test]
    fn deposit_and_withdraw_emit_events() {
        let (mut reg, _) = registry();
        let user = UserId::new();
        reg.custody_mut().mint(&asset("A"), user, dec(2000));
        reg.custody_mut().approve(user, &asset("A"), dec(2000));

        reg.deposit(user, &asset("A"), dec(2000)).unwrap();
        reg.withdraw(user, &asset("A"), dec(500)).unwrap();
        assert_eq!(reg.balance_of(user, &asset("A")), dec(1500));
        assert_eq!(reg.custody().balance_of(user, &asset("A")), dec(500));

        let kinds: Vec<&str> = reg.take_events().iter().map(VenueEvent::kind).collect();
        assert_eq!(kinds, vec!["deposited", "withdrawn"]);
        assert!(reg.events().is_empty());
        reg.verify_conservation().unwrap();
    }

    #[test]
    fn take_trades_drains_one_book() {
        let (mut reg, operator) = registry();
        let id = reg.create_market(operator, "A", "B").unwrap();
        let other = reg.create_market(operator, "C", "B").unwrap();
        let (seller, buyer) = (UserId::new(), UserId::new());
        for (user, a) in [(seller, "A"), (buyer, "B")] {
            reg.custody_mut().mint(&asset(a), user, dec(1000));
            reg.custody_mut().approve(user, &asset(a), dec(1000));
            reg.deposit(user, &asset(a), dec(1000)).unwrap();
        }
        reg.place_sell_order(seller, dec(10), dec(3), &asset("A"), &asset("B"))
            .unwrap();
        reg.place_buy_order(buyer, dec(10), dec(3), &asset("A"), &asset("B"))
            .unwrap();

        let trades = reg.take_trades(id).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].quote_amount, dec(30));
        assert!(reg.order_book(id).unwrap().trades().is_empty());
        assert_eq!(reg.take_trades(other), Some(Vec::new()));
        assert!(reg.take_trades(MarketId::new()).is_none());
    }
}
