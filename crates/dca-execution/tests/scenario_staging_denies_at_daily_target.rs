//! Scenario: the staging transaction enforces the daily target.
//!
//! target=100, frequency=4 stages four records of 25.0 and denies the fifth
//! without writing anything. Records from the previous UTC day do not count.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use dca_db::{order_lock_key, AccountId, AssetId, Clock, MemLedgerStore, OrderStatus, TxnPolicy};
use dca_execution::{stage, StageError};
use dca_limits::{ReasonCode, TradeSpec, MICROS_SCALE};

struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    fn set(&self, t: DateTime<Utc>) {
        *self.0.lock().unwrap() = t;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        let mut t = self.0.lock().unwrap();
        // Strictly increasing so records order deterministically.
        *t += Duration::milliseconds(1);
        *t
    }
}

fn setup() -> (MemLedgerStore, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock(Mutex::new(
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap(),
    )));
    let store = MemLedgerStore::with_clock(clock.clone());
    (store, clock)
}

#[tokio::test]
async fn fifth_staging_is_denied_and_writes_nothing() {
    let (store, _clock) = setup();
    let account = AccountId::new("acct-1");
    let spec = TradeSpec::new("BTC-USD", 4, 100 * MICROS_SCALE).unwrap();
    let policy = TxnPolicy::default();

    for i in 0..4 {
        let staged = stage(&store, &policy, &account, &spec).await.unwrap();
        assert_eq!(staged.quote_micros, 25 * MICROS_SCALE);
        assert_eq!(staged.todays_total_micros, i * 25 * MICROS_SCALE);
    }

    let err = stage(&store, &policy, &account, &spec).await.unwrap_err();
    match err {
        StageError::Denied { asset, decision } => {
            assert_eq!(asset, "BTC-USD");
            assert_eq!(decision.reason, ReasonCode::DailyTargetDepositReached);
            assert_eq!(decision.todays_total_micros, 100 * MICROS_SCALE);
        }
        other => panic!("expected denial, got {other}"),
    }

    let records = store.snapshot().unwrap();
    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|r| r.status == OrderStatus::Staged));

    let key = order_lock_key(&account, &AssetId::new("BTC-USD"));
    assert_eq!(store.lock_counter(&key).unwrap(), 4, "denied attempt must not bump the lock");
}

#[tokio::test]
async fn yesterday_spend_does_not_count_toward_today() {
    let (store, clock) = setup();
    let account = AccountId::new("acct-1");
    let spec = TradeSpec::new("ETH-USD", 2, 10 * MICROS_SCALE).unwrap();
    let policy = TxnPolicy::default();

    clock.set(Utc.with_ymd_and_hms(2026, 10, 18, 23, 0, 0).unwrap());
    stage(&store, &policy, &account, &spec).await.unwrap();
    stage(&store, &policy, &account, &spec).await.unwrap();
    assert!(stage(&store, &policy, &account, &spec).await.is_err());

    clock.set(Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 1).unwrap());
    let staged = stage(&store, &policy, &account, &spec).await.unwrap();
    assert_eq!(staged.todays_total_micros, 0);
}

#[tokio::test]
async fn tokens_are_distinct_per_staged_record() {
    let (store, _clock) = setup();
    let account = AccountId::new("acct-1");
    let spec = TradeSpec::new("BTC-USD", 6, 60 * MICROS_SCALE).unwrap();
    let policy = TxnPolicy::default();

    let mut tokens = std::collections::HashSet::new();
    for _ in 0..6 {
        let staged = stage(&store, &policy, &account, &spec).await.unwrap();
        assert!(tokens.insert(staged.idempotency_token));
    }
}
