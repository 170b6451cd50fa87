//! Scenario: target=100, frequency=4 places four 25.0 buys, then refuses.
//!
//! Every accepted record carries the venue id returned for its own token, and
//! the denied fifth call reaches neither the ledger nor the venue.

use dca_db::{AccountId, AssetId, OrderStatus};
use dca_execution::{format_micros, PlaceOrderError, ResolveError};
use dca_limits::{SpecError, TradeSpec, MICROS_SCALE};
use dca_testkit::Harness;

#[tokio::test]
async fn four_orders_then_daily_target_reached() {
    let h = Harness::new();
    let account = AccountId::new("acct-1");
    let asset = AssetId::new("BTC-USD");
    h.allocate(&account, TradeSpec::new("BTC-USD", 4, 100 * MICROS_SCALE).unwrap());

    for n in 1..=4 {
        let outcome = h.placer.place_order(&account, &asset).await.unwrap();
        assert!(outcome.is_accepted());
        let rec = outcome.record();
        assert_eq!(rec.status, OrderStatus::Accepted);
        assert_eq!(rec.quote_micros, 25 * MICROS_SCALE);
        assert_eq!(rec.venue_order_id.as_deref(), Some(format!("VENUE-{n:06}").as_str()));
        assert_eq!(
            h.exchange.venue_id_for(&rec.idempotency_token).as_deref(),
            rec.venue_order_id.as_deref()
        );
    }

    let err = h.placer.place_order(&account, &asset).await.unwrap_err();
    match err {
        PlaceOrderError::DailyTargetDepositReached {
            asset,
            todays_total_micros,
            daily_target_micros,
        } => {
            assert_eq!(asset.as_str(), "BTC-USD");
            assert_eq!(todays_total_micros, 100 * MICROS_SCALE);
            assert_eq!(daily_target_micros, 100 * MICROS_SCALE);
        }
        other => panic!("expected daily target denial, got {other}"),
    }

    assert_eq!(h.store.snapshot().unwrap().len(), 4);
    assert_eq!(h.exchange.submissions().len(), 4);
}

#[tokio::test]
async fn submitted_request_forwards_the_staged_token_and_amount() {
    let h = Harness::new();
    let account = AccountId::new("acct-2");
    let asset = AssetId::new("ETH-USD");
    h.allocate(&account, TradeSpec::new("ETH-USD", 3, 100 * MICROS_SCALE).unwrap());

    let outcome = h.placer.place_order(&account, &asset).await.unwrap();
    let sent = h.exchange.submissions();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].idempotency_token, outcome.record().idempotency_token);
    assert_eq!(sent[0].asset, asset);
    assert_eq!(format_micros(sent[0].quote_micros), "33.3");
}

#[tokio::test]
async fn unknown_allocation_is_a_resolve_error() {
    let h = Harness::new();
    let err = h
        .placer
        .place_order(&AccountId::new("nobody"), &AssetId::new("BTC-USD"))
        .await
        .unwrap_err();
    assert!(matches!(err, PlaceOrderError::Resolve(_)));
    assert!(h.store.snapshot().unwrap().is_empty());
}

#[tokio::test]
async fn place_all_skips_exhausted_pairs_and_places_the_rest() {
    let h = Harness::new();
    let account = AccountId::new("acct-3");
    h.allocate(&account, TradeSpec::new("BTC-USD", 1, 10 * MICROS_SCALE).unwrap());
    h.allocate(&account, TradeSpec::new("ETH-USD", 2, 10 * MICROS_SCALE).unwrap());

    let first = h.placer.place_all(&account).await.unwrap();
    assert_eq!(first.placed.len(), 2);
    assert!(first.skipped.is_empty());
    assert!(first.failed.is_empty());

    let second = h.placer.place_all(&account).await.unwrap();
    assert_eq!(second.placed.len(), 1);
    assert_eq!(second.placed[0].record().asset.as_str(), "ETH-USD");
    assert_eq!(second.skipped, vec![AssetId::new("BTC-USD")]);
}

#[tokio::test]
async fn place_all_reports_an_invalid_allocation_and_places_the_rest() {
    let h = Harness::new();
    let account = AccountId::new("acct-4");
    h.resolver
        .set_invalid(&account, &AssetId::new("DOGE-USD"), SpecError::ZeroFrequency);
    h.allocate(&account, TradeSpec::new("BTC-USD", 1, 10 * MICROS_SCALE).unwrap());

    let report = h.placer.place_all(&account).await.unwrap();
    assert_eq!(report.placed.len(), 1);
    assert_eq!(report.placed[0].record().asset.as_str(), "BTC-USD");
    assert!(report.skipped.is_empty());
    assert_eq!(report.failed.len(), 1);
    let (asset, err) = &report.failed[0];
    assert_eq!(asset.as_str(), "DOGE-USD");
    assert!(matches!(
        err,
        PlaceOrderError::Resolve(ResolveError::Invalid {
            source: SpecError::ZeroFrequency,
            ..
        })
    ));
    assert_eq!(h.exchange.order_count(), 1);
}
