//! Order staging transaction.
//!
//! One store transaction per attempt:
//!
//! 1. acquire the pair's [`KeyLock`]
//! 2. read the `2 × daily_frequency` most recent records
//! 3. evaluate the daily limit against the transaction clock's UTC day
//! 4. DENY: abort, nothing is written
//! 5. ALLOW: insert a `STAGED` record with a fresh idempotency token and
//!    release the lock
//!
//! The body touches nothing outside the transaction, so the store layer may
//! re-run it after a conflict. The token is generated inside the body and a
//! re-run therefore gets a new one; only the committed attempt's token is ever
//! seen by the exchange.

use chrono::{DateTime, Datelike, Utc};
use dca_db::{
    order_lock_key, run_transaction, AccountId, AssetId, IdempotencyToken, KeyLock, LedgerStore,
    LedgerTxn, NewOrderRecord, OrderId, StoreError, TxnFailure, TxnPolicy,
};
use dca_limits::{evaluate, LimitDecision, LimitInput, SpendEntry, TradeSpec};
use tracing::debug;

use crate::StagedOrder;

/// `YYYYMMDD` of the UTC calendar date.
pub fn utc_day_id(ts: DateTime<Utc>) -> u32 {
    let d = ts.date_naive();
    // Years before 0 never occur on a store clock; clamp instead of wrapping.
    let year = u32::try_from(d.year()).unwrap_or(0);
    year * 10_000 + d.month() * 100 + d.day()
}

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// The limit evaluator refused; `decision.reason` says why.
    #[error("staging denied for {asset}: {}", .decision.reason.as_str())]
    Denied {
        asset: String,
        decision: LimitDecision,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Stage one purchase for `(account, spec.asset())`.
pub async fn stage<S>(
    store: &S,
    policy: &TxnPolicy,
    account: &AccountId,
    spec: &TradeSpec,
) -> Result<StagedOrder, StageError>
where
    S: LedgerStore + ?Sized,
{
    let asset = spec.asset().to_string();
    let account = account.clone();
    let spec = spec.clone();

    let res = run_transaction(store, policy, move |txn| {
        let account = account.clone();
        let spec = spec.clone();
        Box::pin(async move { stage_body(txn, account, spec).await })
    })
    .await;

    match res {
        Ok(staged) => Ok(staged),
        Err(TxnFailure::Aborted(decision)) => Err(StageError::Denied { asset, decision }),
        Err(TxnFailure::Store(e)) => Err(StageError::Store(e)),
    }
}

async fn stage_body<T: LedgerTxn>(
    txn: &mut T,
    account: AccountId,
    spec: TradeSpec,
) -> Result<StagedOrder, TxnFailure<LimitDecision>> {
    let asset = AssetId::new(spec.asset());
    let lock = KeyLock::acquire(order_lock_key(&account, &asset), txn).await?;

    let now = txn.server_time().await?;
    let today = utc_day_id(now);

    let recent = txn.recent_orders(&account, &asset, spec.recent_window()).await?;
    let entries: Vec<SpendEntry> = recent
        .iter()
        .map(|r| SpendEntry::new(utc_day_id(r.created_at_utc), r.quote_micros))
        .collect();

    let decision = evaluate(
        &spec,
        &LimitInput {
            today,
            recent: &entries,
        },
    );
    debug!(
        account = %account,
        asset = %asset,
        today,
        todays_total_micros = decision.todays_total_micros,
        reason = decision.reason.as_str(),
        "limit evaluated"
    );
    if !decision.is_allowed() {
        return Err(TxnFailure::Aborted(decision));
    }

    let order_id = OrderId::new_random();
    let idempotency_token = IdempotencyToken::generate();
    let quote_micros = spec.per_order_micros();

    txn.create_order(NewOrderRecord {
        order_id,
        account: account.clone(),
        asset: asset.clone(),
        quote_micros,
        idempotency_token,
    })
    .await?;
    lock.release(txn).await?;

    Ok(StagedOrder {
        order_id,
        account,
        asset,
        quote_micros,
        idempotency_token,
        todays_total_micros: decision.todays_total_micros,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn day_id_is_utc_date() {
        let ts = Utc.with_ymd_and_hms(2026, 10, 19, 23, 59, 59).unwrap();
        assert_eq!(utc_day_id(ts), 20261019);
        let ts = Utc.with_ymd_and_hms(2026, 10, 20, 0, 0, 0).unwrap();
        assert_eq!(utc_day_id(ts), 20261020);
    }

    #[test]
    fn day_id_orders_like_dates() {
        let a = Utc.with_ymd_and_hms(2026, 12, 31, 12, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2027, 1, 1, 12, 0, 0).unwrap();
        assert!(utc_day_id(a) < utc_day_id(b));
    }
}
