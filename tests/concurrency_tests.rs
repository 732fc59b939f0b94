//! Races between resolutions and purchases touching the same inventories.
//!
//! Threads share one `Marketplace` and therefore one lock table; each test
//! uses its own temp database.

use std::sync::Barrier;
use std::thread;
use tempfile::{TempDir, tempdir};
use trade_inventory::{
    Marketplace, TradeError,
    config::ServiceConfig,
    trade::{Decision, TradeStatus},
    types::ProductId,
};

fn open_market() -> anyhow::Result<(TempDir, Marketplace)> {
    let temp_dir = tempdir()?;
    let config = ServiceConfig {
        db_path: temp_dir.path().join("race.db"),
        lock_timeout_ms: 10_000,
        ..ServiceConfig::default()
    };
    let market = Marketplace::open(&config)?;
    Ok((temp_dir, market))
}

#[test]
fn one_item_claimed_twice_is_traded_once() -> anyhow::Result<()> {
    let (_dir, market) = open_market()?;

    for round in 0..10 {
        let item = market.catalog.create_product("Rare", 1, "", None)?;
        let owner = market.catalog.create_user(&format!("owner{round}"), None, 0)?;
        let left = market.catalog.create_user(&format!("left{round}"), None, 0)?;
        let right = market.catalog.create_user(&format!("right{round}"), None, 0)?;
        market.inventories.add_items(&owner.id, &[item.id.clone()])?;
        market.inventories.get_or_create(&left.id)?;
        market.inventories.get_or_create(&right.id)?;

        // both offers pass the proposal check; only one can be honoured
        let to_left = market
            .trades
            .propose(&owner.id, &left.id, vec![item.id.clone()], vec![])?;
        let to_right = market
            .trades
            .propose(&owner.id, &right.id, vec![item.id.clone()], vec![])?;

        let barrier = Barrier::new(2);
        let (first, second) = thread::scope(|s| {
            let a = s.spawn(|| {
                barrier.wait();
                market.trades.resolve(&to_left.id, &left.id, Decision::Completed)
            });
            let b = s.spawn(|| {
                barrier.wait();
                market.trades.resolve(&to_right.id, &right.id, Decision::Completed)
            });
            (a.join().unwrap(), b.join().unwrap())
        });

        let outcomes = [&first, &second];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            outcomes
                .iter()
                .filter(|r| matches!(r, Err(TradeError::OwnershipViolation(_))))
                .count(),
            1
        );

        let held = |id| -> anyhow::Result<usize> {
            Ok(market
                .inventories
                .load(id)?
                .map(|inv| inv.count_of(&item.id))
                .unwrap_or(0))
        };
        assert_eq!(held(&owner.id)?, 0);
        assert_eq!(held(&left.id)? + held(&right.id)?, 1);

        let statuses = [
            market.trades.ledger().require(&to_left.id)?.status,
            market.trades.ledger().require(&to_right.id)?.status,
        ];
        assert_eq!(
            statuses
                .iter()
                .filter(|s| **s == TradeStatus::Pending)
                .count(),
            1
        );
    }

    Ok(())
}

#[test]
fn same_trade_resolved_concurrently_closes_once() -> anyhow::Result<()> {
    let (_dir, market) = open_market()?;

    let item = market.catalog.create_product("Item", 1, "", None)?;
    let alice = market.catalog.create_user("alice", None, 0)?;
    let bob = market.catalog.create_user("bob", None, 0)?;
    market.inventories.add_items(&alice.id, &[item.id.clone()])?;
    market.inventories.get_or_create(&bob.id)?;

    let trade = market
        .trades
        .propose(&alice.id, &bob.id, vec![item.id.clone()], vec![])?;

    let barrier = Barrier::new(4);
    let results: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let (barrier, market, trade, bob) = (&barrier, &market, &trade, &bob);
                s.spawn(move || {
                    barrier.wait();
                    let decision = if i % 2 == 0 {
                        Decision::Completed
                    } else {
                        Decision::Canceled
                    };
                    market.trades.resolve(&trade.id, &bob.id, decision)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .filter(|r| r.is_err())
            .all(|r| matches!(r, Err(TradeError::AlreadyClosed)))
    );

    let stored = market.trades.ledger().require(&trade.id)?;
    assert!(stored.status.is_terminal());
    let total = market.inventories.load(&alice.id)?.map_or(0, |inv| inv.len())
        + market.inventories.load(&bob.id)?.map_or(0, |inv| inv.len());
    assert_eq!(total, 1);

    Ok(())
}

#[test]
fn opposite_direction_trades_do_not_deadlock() -> anyhow::Result<()> {
    let (_dir, market) = open_market()?;
    const ROUNDS: usize = 20;

    let alice = market.catalog.create_user("alice", None, 0)?;
    let bob = market.catalog.create_user("bob", None, 0)?;
    let alice_items: Vec<ProductId> = (0..ROUNDS)
        .map(|i| ProductId::from(format!("product_alice{i}")))
        .collect();
    let bob_items: Vec<ProductId> = (0..ROUNDS)
        .map(|i| ProductId::from(format!("product_bob{i}")))
        .collect();
    market.inventories.add_items(&alice.id, &alice_items)?;
    market.inventories.add_items(&bob.id, &bob_items)?;

    thread::scope(|s| {
        let forward = s.spawn(|| -> trade_inventory::Result<()> {
            for item in &alice_items {
                let trade = market
                    .trades
                    .propose(&alice.id, &bob.id, vec![item.clone()], vec![])?;
                market.trades.resolve(&trade.id, &bob.id, Decision::Completed)?;
            }
            Ok(())
        });
        let backward = s.spawn(|| -> trade_inventory::Result<()> {
            for item in &bob_items {
                let trade = market
                    .trades
                    .propose(&bob.id, &alice.id, vec![item.clone()], vec![])?;
                market.trades.resolve(&trade.id, &alice.id, Decision::Completed)?;
            }
            Ok(())
        });
        forward.join().unwrap().unwrap();
        backward.join().unwrap().unwrap();
    });

    let alice_now = market.inventories.load(&alice.id)?.map(|inv| inv.items).unwrap_or_default();
    let bob_now = market.inventories.load(&bob.id)?.map(|inv| inv.items).unwrap_or_default();
    assert_eq!(alice_now, bob_items);
    assert_eq!(bob_now, alice_items);

    Ok(())
}

#[test]
fn concurrent_purchases_never_overdraw() -> anyhow::Result<()> {
    let (_dir, market) = open_market()?;

    let product = market.catalog.create_product("Ticket", 3, "", None)?;
    let buyer = market.catalog.create_user("buyer", None, 15)?;

    let barrier = Barrier::new(12);
    let results: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..12)
            .map(|_| {
                let (barrier, market, product, buyer) = (&barrier, &market, &product, &buyer);
                s.spawn(move || {
                    barrier.wait();
                    market.purchases.purchase(&buyer.id, &product.id)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 5);
    assert!(
        results
            .iter()
            .filter(|r| r.is_err())
            .all(|r| matches!(r, Err(TradeError::InsufficientFunds)))
    );

    let stored = market.catalog.get_user(&buyer.id)?.expect("buyer exists");
    assert_eq!(stored.balance, 0);
    assert_eq!(market.inventories.load(&buyer.id)?.map_or(0, |inv| inv.len()), 5);

    Ok(())
}

#[test]
fn concurrent_signups_claim_a_username_once() -> anyhow::Result<()> {
    let (_dir, market) = open_market()?;

    for round in 0..20 {
        let name = format!("same{round}");
        let barrier = Barrier::new(8);
        let results: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let (barrier, market, name) = (&barrier, &market, &name);
                    s.spawn(move || {
                        barrier.wait();
                        market.catalog.create_user(name, None, 0)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .filter(|r| r.is_err())
                .all(|r| matches!(r, Err(TradeError::Conflict(_))))
        );
    }

    Ok(())
}
