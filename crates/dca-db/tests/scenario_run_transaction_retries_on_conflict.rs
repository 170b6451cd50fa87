//! Scenario: conflict retry is owned by the store layer.
//!
//! Two transactions that increment the same lock counter concurrently must
//! both land (the loser is re-run), a domain abort is never retried, and a
//! body that keeps conflicting gives up after `max_attempts`.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dca_db::{
    order_lock_key, run_transaction, AccountId, AssetId, KeyLock, MemLedgerStore,
    StoreError, TxnFailure, TxnPolicy,
};

fn policy(max_attempts: u32) -> TxnPolicy {
    TxnPolicy {
        max_attempts,
        backoff_base: Duration::ZERO,
    }
}

async fn bump(store: &MemLedgerStore, key: String, calls: Arc<AtomicU32>) -> Result<i64, TxnFailure<()>> {
    run_transaction(store, &policy(5), move |txn| {
        let key = key.clone();
        let calls = Arc::clone(&calls);
        Box::pin(async move {
            calls.fetch_add(1, Ordering::SeqCst);
            let lock = KeyLock::acquire(key, txn).await?;
            let seen = lock.counter();
            lock.release(txn).await?;
            Ok(seen)
        })
    })
    .await
}

#[tokio::test]
async fn concurrent_increments_both_land() {
    let store = MemLedgerStore::new();
    let key = order_lock_key(&AccountId::new("acct-1"), &AssetId::new("BTC-USD"));
    let calls = Arc::new(AtomicU32::new(0));

    let (a, b) = tokio::join!(
        bump(&store, key.clone(), Arc::clone(&calls)),
        bump(&store, key.clone(), Arc::clone(&calls)),
    );

    let mut seen = vec![a.unwrap(), b.unwrap()];
    seen.sort();
    assert_eq!(seen, vec![0, 1], "each increment must observe a distinct counter");
    assert_eq!(store.lock_counter(&key).unwrap(), 2);
    assert!(calls.load(Ordering::SeqCst) >= 3, "loser must have been re-run");
}

#[tokio::test]
async fn aborted_body_is_not_retried_and_writes_nothing() {
    let store = MemLedgerStore::new();
    let key = order_lock_key(&AccountId::new("acct-1"), &AssetId::new("BTC-USD"));
    let calls = Arc::new(AtomicU32::new(0));

    let c = Arc::clone(&calls);
    let k = key.clone();
    let res: Result<(), TxnFailure<&'static str>> = run_transaction(&store, &policy(5), move |txn| {
        let key = k.clone();
        let calls = Arc::clone(&c);
        Box::pin(async move {
            calls.fetch_add(1, Ordering::SeqCst);
            let lock = KeyLock::acquire(key, txn).await?;
            lock.release(txn).await?;
            Err(TxnFailure::Aborted("denied"))
        })
    })
    .await;

    assert!(matches!(res, Err(TxnFailure::Aborted("denied"))));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.lock_counter(&key).unwrap(), 0);
}

#[tokio::test]
async fn persistent_conflict_exhausts_retries() {
    let store = MemLedgerStore::new();
    let calls = Arc::new(AtomicU32::new(0));

    let c = Arc::clone(&calls);
    let res: Result<(), TxnFailure<()>> = run_transaction(&store, &policy(3), move |_txn| {
        let calls = Arc::clone(&c);
        Box::pin(async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TxnFailure::Store(StoreError::Conflict("always".to_string())))
        })
    })
    .await;

    match res {
        Err(TxnFailure::Store(StoreError::RetriesExhausted { attempts })) => assert_eq!(attempts, 3),
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(store.snapshot().unwrap().is_empty());
}
