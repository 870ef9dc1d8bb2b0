//! Shared fixtures for the registry integration tests.

#![allow(dead_code)]

use std::sync::Once;

use orbook_registry::{InMemoryAssetBank, MarketRegistry};
use orbook_types::{AssetId, MarketId, RegistryConfig, UserId};
use rust_decimal::Decimal;

static TRACING: Once = Once::new();

/// Install a test-writer subscriber once per test binary. Honors `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

pub fn dec(n: i64) -> Decimal {
    Decimal::new(n, 0)
}

pub fn base() -> AssetId {
    AssetId::new("A")
}

pub fn quote() -> AssetId {
    AssetId::new("B")
}

/// A registry with one `A`/`B` market and helpers to fund traders.
pub struct Venue {
    pub registry: MarketRegistry<InMemoryAssetBank>,
    pub operator: UserId,
    pub market: MarketId,
}

impl Venue {
    pub fn new() -> Self {
        init_tracing();
        let operator = UserId::new();
        let mut registry =
            MarketRegistry::new(RegistryConfig::new(operator), InMemoryAssetBank::new()).unwrap();
        let market = registry.create_market(operator, base(), quote()).unwrap();
        Self {
            registry,
            operator,
            market,
        }
    }

    /// Mint, approve and deposit `amount` of `asset` for `user`.
    pub fn fund(&mut self, user: UserId, asset: &AssetId, amount: Decimal) {
        let bank = self.registry.custody_mut();
        bank.mint(asset, user, amount);
        bank.approve(user, asset, amount);
        self.registry.deposit(user, asset, amount).unwrap();
    }

    pub fn trader(&mut self, base_amount: i64, quote_amount: i64) -> UserId {
        let user = UserId::new();
        if base_amount > 0 {
            self.fund(user, &base(), dec(base_amount));
        }
        if quote_amount > 0 {
            self.fund(user, &quote(), dec(quote_amount));
        }
        user
    }

    pub fn available(&self, user: UserId, asset: &AssetId) -> Decimal {
        self.registry.balance_of(user, asset)
    }

    pub fn book(&self) -> &orbook_registry::OrderBook {
        self.registry.order_book(self.market).unwrap()
    }
}
