//! Concurrent access through `SharedRegistry`.

mod common;

use std::thread;

use common::{base, dec, init_tracing, quote};
use orbook_registry::{InMemoryAssetBank, MarketRegistry, SharedRegistry};
use orbook_types::{OrbookError, RegistryConfig, UserId};

fn shared_with_traders(n: usize) -> (SharedRegistry<InMemoryAssetBank>, Vec<UserId>) {
    init_tracing();
    let operator = UserId::new();
    let mut registry =
        MarketRegistry::new(RegistryConfig::new(operator), InMemoryAssetBank::new()).unwrap();
    registry.create_market(operator, base(), quote()).unwrap();

    let traders: Vec<UserId> = (0..n).map(|_| UserId::new()).collect();
    for &t in &traders {
        for asset in [base(), quote()] {
            registry.custody_mut().mint(&asset, t, dec(10_000));
            registry.custody_mut().approve(t, &asset, dec(10_000));
            registry.deposit(t, &asset, dec(10_000)).unwrap();
        }
    }
    (SharedRegistry::new(registry), traders)
}

#[test]
fn concurrent_placements_conserve_value() {
    let (shared, traders) = shared_with_traders(8);

    let handles: Vec<_> = traders
        .iter()
        .enumerate()
        .map(|(i, &trader)| {
            let shared = shared.clone();
            thread::spawn(move || {
                for round in 0..25i64 {
                    let price = dec(100 + (round % 3) - 1);
                    let result = if i % 2 == 0 {
                        shared.place_buy_order(trader, price, dec(2), &base(), &quote())
                    } else {
                        shared.place_sell_order(trader, price, dec(2), &base(), &quote())
                    };
                    match result {
                        Ok(_) | Err(OrbookError::BalanceInsufficient { .. }) => {}
                        Err(e) => panic!("unexpected error: {e}"),
                    }
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    shared
        .with(|registry| {
            registry.verify_conservation()?;
            let market = registry.market_for(&base(), &quote()).unwrap();
            let book = registry.order_book(market).unwrap();
            if let (Some(bid), Some(ask)) = (book.best_bid_price(), book.best_ask_price()) {
                assert!(bid < ask);
            }
            Ok(())
        })
        .unwrap();
}

#[test]
fn handle_exposes_registry_surface() {
    let (shared, traders) = shared_with_traders(1);
    let user = traders[0];

    let market = shared.market_for(&base(), &quote()).unwrap().unwrap();
    assert!(shared.is_known_market(market).unwrap());

    shared.withdraw(user, &base(), dec(4_000)).unwrap();
    assert_eq!(shared.balance_of(user, &base()).unwrap(), dec(6_000));

    let err = shared.create_market(user, "X", "Y").unwrap_err();
    assert!(matches!(err, OrbookError::NotAuthorized { .. }));

    let events = shared.take_events().unwrap();
    assert!(!events.is_empty());
    assert!(shared.take_events().unwrap().is_empty());
}
