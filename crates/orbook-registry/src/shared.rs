//! A cloneable, thread-safe registry handle.
//!
//! All calls go through one mutex, so concurrent callers observe a single
//! total order of state changes and every placement stays atomic.

use std::sync::{Arc, Mutex, MutexGuard};

use orbook_escrow::AssetCustody;
use orbook_matchcore::Placement;
use orbook_types::{AssetId, MarketId, OrbookError, OrderSide, Result, UserId, VenueEvent};
use rust_decimal::Decimal;
use tracing::error;

use crate::MarketRegistry;

/// Shared handle to a [`MarketRegistry`].
#[derive(Debug)]
pub struct SharedRegistry<C> {
    inner: Arc<Mutex<MarketRegistry<C>>>,
}

impl<C> Clone for SharedRegistry<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: AssetCustody> SharedRegistry<C> {
    #[must_use]
    pub fn new(registry: MarketRegistry<C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(registry)),
        }
    }

    /// A poisoned lock means a caller panicked mid-operation; the registry
    /// may be half-updated, so it is reported as an invariant violation.
    fn lock(&self) -> Result<MutexGuard<'_, MarketRegistry<C>>> {
        self.inner.lock().map_err(|_| {
            error!("Registry lock poisoned");
            OrbookError::invariant("registry lock poisoned")
        })
    }

    /// Run `f` with exclusive access to the registry.
    pub fn with<R>(&self, f: impl FnOnce(&mut MarketRegistry<C>) -> Result<R>) -> Result<R> {
        let mut guard = self.lock()?;
        f(&mut guard)
    }

    pub fn create_market(
        &self,
        caller: UserId,
        base: impl Into<AssetId>,
        quote: impl Into<AssetId>,
    ) -> Result<MarketId> {
        self.lock()?.create_market(caller, base, quote)
    }

    pub fn market_for(&self, base: &AssetId, quote: &AssetId) -> Result<Option<MarketId>> {
        Ok(self.lock()?.market_for(base, quote))
    }

    pub fn is_known_market(&self, market_id: MarketId) -> Result<bool> {
        Ok(self.lock()?.is_known_market(market_id))
    }

    pub fn place_order(
        &self,
        caller: UserId,
        side: OrderSide,
        price: Decimal,
        quantity: Decimal,
        base: &AssetId,
        quote: &AssetId,
    ) -> Result<Placement> {
        self.lock()?
            .place_order(caller, side, price, quantity, base, quote)
    }

    pub fn place_buy_order(
        &self,
        caller: UserId,
        price: Decimal,
        quantity: Decimal,
        base: &AssetId,
        quote: &AssetId,
    ) -> Result<Placement> {
        self.place_order(caller, OrderSide::Buy, price, quantity, base, quote)
    }

    pub fn place_sell_order(
        &self,
        caller: UserId,
        price: Decimal,
        quantity: Decimal,
        base: &AssetId,
        quote: &AssetId,
    ) -> Result<Placement> {
        self.place_order(caller, OrderSide::Sell, price, quantity, base, quote)
    }

    pub fn deposit(&self, caller: UserId, asset: &AssetId, amount: Decimal) -> Result<()> {
        self.lock()?.deposit(caller, asset, amount)
    }

    pub fn withdraw(&self, caller: UserId, asset: &AssetId, amount: Decimal) -> Result<()> {
        self.lock()?.withdraw(caller, asset, amount)
    }

    pub fn balance_of(&self, caller: UserId, asset: &AssetId) -> Result<Decimal> {
        Ok(self.lock()?.balance_of(caller, asset))
    }

    pub fn take_events(&self) -> Result<Vec<VenueEvent>> {
        Ok(self.lock()?.take_events())
    }
}
