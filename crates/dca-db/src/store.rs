use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use tracing::{debug, warn};

use crate::{
    AccountId, AssetId, NewOrderRecord, OrderId, OrderRecord, Resolution, StagedCursor, StoreError,
};

// ---------------------------------------------------------------------------
// Store traits
// ---------------------------------------------------------------------------

/// One open ledger transaction.
///
/// Reads and writes are isolated until [`LedgerTxn::commit`]. A commit that
/// would violate serializability fails with [`StoreError::Conflict`] and leaves
/// no trace; the caller may run the whole body again.
#[async_trait]
pub trait LedgerTxn: Send + Sized {
    /// The store clock as seen by this transaction. Stable for its lifetime.
    async fn server_time(&mut self) -> Result<DateTime<Utc>, StoreError>;

    /// Serialization counter for `key`; 0 when the key was never written.
    async fn read_lock_counter(&mut self, key: &str) -> Result<i64, StoreError>;

    async fn write_lock_counter(&mut self, key: &str, value: i64) -> Result<(), StoreError>;

    /// At most `limit` records for the pair, most-recent-first.
    async fn recent_orders(
        &mut self,
        account: &AccountId,
        asset: &AssetId,
        limit: usize,
    ) -> Result<Vec<OrderRecord>, StoreError>;

    /// Insert a `STAGED` record stamped with [`LedgerTxn::server_time`].
    async fn create_order(&mut self, record: NewOrderRecord) -> Result<(), StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}

/// Durable spend ledger.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    type Txn: LedgerTxn + 'static;

    async fn begin(&self) -> Result<Self::Txn, StoreError>;

    /// Conditionally move a `STAGED` record to a terminal state.
    ///
    /// Re-applying the stored terminal state returns the existing record;
    /// a conflicting one fails with [`StoreError::IllegalTransition`].
    async fn resolve(
        &self,
        order_id: OrderId,
        resolution: &Resolution,
    ) -> Result<OrderRecord, StoreError>;

    async fn fetch_order(&self, order_id: OrderId) -> Result<Option<OrderRecord>, StoreError>;

    /// Most-recent-first, read outside any staging transaction (reporting).
    async fn list_orders(
        &self,
        account: &AccountId,
        asset: &AssetId,
        limit: usize,
    ) -> Result<Vec<OrderRecord>, StoreError>;

    /// `STAGED` records created strictly before `cutoff`, ordered by
    /// `(created_at_utc, order_id)` and starting strictly after `after`.
    async fn list_staged_before(
        &self,
        cutoff: DateTime<Utc>,
        after: Option<StagedCursor>,
        limit: usize,
    ) -> Result<Vec<OrderRecord>, StoreError>;
}

// ---------------------------------------------------------------------------
// Retry driver
// ---------------------------------------------------------------------------

/// Bounds for [`run_transaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxnPolicy {
    pub max_attempts: u32,
    /// Sleep `backoff_base * attempt` between attempts.
    pub backoff_base: Duration,
}

impl Default for TxnPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base: Duration::from_millis(25),
        }
    }
}

/// Why a transaction body did not produce a value.
#[derive(Debug)]
pub enum TxnFailure<E> {
    Store(StoreError),
    /// The body chose to abort with a domain outcome. Never retried.
    Aborted(E),
}

impl<E> From<StoreError> for TxnFailure<E> {
    fn from(e: StoreError) -> Self {
        TxnFailure::Store(e)
    }
}

/// Run `body` inside a fresh transaction, committing on success.
///
/// Conflicts (from the body or from commit) roll back and re-run the body up
/// to `policy.max_attempts` times. The body must have no effects outside the
/// transaction since it can run more than once.
pub async fn run_transaction<S, T, E, F>(
    store: &S,
    policy: &TxnPolicy,
    mut body: F,
) -> Result<T, TxnFailure<E>>
where
    S: LedgerStore + ?Sized,
    T: Send,
    E: Send,
    F: for<'t> FnMut(&'t mut S::Txn) -> BoxFuture<'t, Result<T, TxnFailure<E>>> + Send,
{
    let attempts = policy.max_attempts.max(1);

    for attempt in 1..=attempts {
        let mut txn = store.begin().await?;

        match body(&mut txn).await {
            Ok(value) => match txn.commit().await {
                Ok(()) => return Ok(value),
                Err(e) if e.is_conflict() => {
                    debug!(attempt, error = %e, "commit conflict; retrying");
                }
                Err(e) => return Err(TxnFailure::Store(e)),
            },
            Err(TxnFailure::Store(e)) if e.is_conflict() => {
                debug!(attempt, error = %e, "conflict inside transaction; retrying");
                discard(txn).await;
            }
            Err(other) => {
                discard(txn).await;
                return Err(other);
            }
        }

        if attempt < attempts {
            tokio::time::sleep(policy.backoff_base.saturating_mul(attempt)).await;
        }
    }

    Err(TxnFailure::Store(StoreError::RetriesExhausted { attempts }))
}

async fn discard<X: LedgerTxn>(txn: X) {
    if let Err(e) = txn.rollback().await {
        warn!(error = %e, "rollback failed");
    }
}
