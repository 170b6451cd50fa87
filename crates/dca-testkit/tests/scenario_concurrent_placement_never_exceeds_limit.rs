//! Scenario: concurrent placements for one pair serialize on the pair's lock.
//!
//! The in-memory store validates reads at commit, so racing staging
//! transactions conflict, retry, and re-evaluate against committed spend.

use dca_db::{order_lock_key, AccountId, AssetId, MemStats};
use dca_limits::{TradeSpec, MICROS_SCALE};
use dca_testkit::Harness;
use futures_util::future::join_all;

#[tokio::test]
async fn two_racers_one_slot_exactly_one_wins() {
    let h = Harness::new();
    let account = AccountId::new("acct-1");
    let asset = AssetId::new("BTC-USD");
    h.allocate(&account, TradeSpec::new("BTC-USD", 1, 10 * MICROS_SCALE).unwrap());

    let (a, b) = tokio::join!(
        h.placer.place_order(&account, &asset),
        h.placer.place_order(&account, &asset)
    );

    let results = [a, b];
    let wins = results.iter().filter(|r| r.is_ok()).count();
    let denied = results
        .iter()
        .filter(|r| matches!(r, Err(e) if e.is_daily_target_reached()))
        .count();
    assert_eq!((wins, denied), (1, 1));
    assert_eq!(h.store.snapshot().unwrap().len(), 1);
    assert_eq!(h.exchange.order_count(), 1);
}

#[tokio::test]
async fn six_racers_four_slots_spend_stops_at_target() {
    let h = Harness::new();
    let account = AccountId::new("acct-1");
    let asset = AssetId::new("SOL-USD");
    h.allocate(&account, TradeSpec::new("SOL-USD", 4, 100 * MICROS_SCALE).unwrap());

    let results = join_all((0..6).map(|_| h.placer.place_order(&account, &asset))).await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 4);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| e.is_daily_target_reached()));

    let total: i64 = h.store.snapshot().unwrap().iter().map(|r| r.quote_micros).sum();
    assert_eq!(total, 100 * MICROS_SCALE);
    assert_eq!(
        h.store.lock_counter(&order_lock_key(&account, &asset)).unwrap(),
        4
    );
}

#[tokio::test]
async fn different_pairs_do_not_block_each_other() {
    let h = Harness::new();
    let alice = AccountId::new("alice");
    let bob = AccountId::new("bob");
    let btc = AssetId::new("BTC-USD");
    h.allocate(&alice, TradeSpec::new("BTC-USD", 1, 10 * MICROS_SCALE).unwrap());
    h.allocate(&bob, TradeSpec::new("BTC-USD", 1, 10 * MICROS_SCALE).unwrap());

    let (a, b) = tokio::join!(h.placer.place_order(&alice, &btc), h.placer.place_order(&bob, &btc));
    assert!(a.unwrap().is_accepted());
    assert!(b.unwrap().is_accepted());
    assert_eq!(h.store.lock_counter(&order_lock_key(&alice, &btc)).unwrap(), 1);
    assert_eq!(h.store.lock_counter(&order_lock_key(&bob, &btc)).unwrap(), 1);

    // One staging transaction per pair, neither retried.
    assert_eq!(
        h.store.stats().unwrap(),
        MemStats {
            transactions_begun: 2,
            commits: 2,
            commit_conflicts: 0,
        }
    );
}
