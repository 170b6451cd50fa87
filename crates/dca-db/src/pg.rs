use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::error::classify_sqlx;
use crate::status::{check_resolution, TransitionCheck};
use crate::{
    AccountId, AssetId, IdempotencyToken, LedgerStore, LedgerTxn, NewOrderRecord, OrderId,
    OrderRecord, OrderStatus, Resolution, StagedCursor, StoreError,
};

const ORDER_COLUMNS: &str = "order_id, account_id, asset_id, quote_amount_micros, \
     idempotency_token, created_at_utc, status, venue_order_id, rejection_reason, \
     resolved_at_utc";

/// Postgres-backed ledger.
///
/// Staging transactions run at `SERIALIZABLE`; serialization failures and
/// deadlocks surface as [`StoreError::Conflict`].
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

pub struct PgLedgerTxn {
    tx: Transaction<'static, Postgres>,
    now: Option<DateTime<Utc>>,
}

fn order_from_row(row: &PgRow) -> Result<OrderRecord, StoreError> {
    let status: String = row.try_get("status")?;
    let status = OrderStatus::parse(&status).map_err(|e| StoreError::Backend(e.to_string()))?;

    Ok(OrderRecord {
        order_id: OrderId(row.try_get::<Uuid, _>("order_id")?),
        account: AccountId::new(row.try_get::<String, _>("account_id")?),
        asset: AssetId::new(row.try_get::<String, _>("asset_id")?),
        quote_micros: row.try_get("quote_amount_micros")?,
        idempotency_token: IdempotencyToken(row.try_get::<Uuid, _>("idempotency_token")?),
        created_at_utc: row.try_get("created_at_utc")?,
        status,
        venue_order_id: row.try_get("venue_order_id")?,
        rejection_reason: row.try_get("rejection_reason")?,
        resolved_at_utc: row.try_get("resolved_at_utc")?,
    })
}

fn to_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    type Txn = PgLedgerTxn;

    async fn begin(&self) -> Result<PgLedgerTxn, StoreError> {
        let mut tx = self.pool.begin().await.map_err(classify_sqlx)?;
        sqlx::query("set transaction isolation level serializable")
            .execute(&mut *tx)
            .await
            .map_err(classify_sqlx)?;
        Ok(PgLedgerTxn { tx, now: None })
    }

    async fn resolve(
        &self,
        order_id: OrderId,
        resolution: &Resolution,
    ) -> Result<OrderRecord, StoreError> {
        let (status, venue_order_id, reason) = match resolution {
            Resolution::Accepted { venue_order_id } => {
                (OrderStatus::Accepted, Some(venue_order_id.as_str()), None)
            }
            Resolution::Rejected { reason } => (OrderStatus::Rejected, None, Some(reason.as_str())),
        };

        let sql = format!(
            r#"
            update order_records
               set status = $2,
                   venue_order_id = $3,
                   rejection_reason = $4,
                   resolved_at_utc = now()
             where order_id = $1
               and status = 'STAGED'
            returning {ORDER_COLUMNS}
            "#
        );
        let updated = sqlx::query(&sql)
            .bind(order_id.0)
            .bind(status.as_str())
            .bind(venue_order_id)
            .bind(reason)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify_sqlx)?;

        if let Some(row) = updated {
            return order_from_row(&row);
        }

        // Not STAGED (or missing): decide between no-op and illegal transition.
        let current = self
            .fetch_order(order_id)
            .await?
            .ok_or(StoreError::NotFound(order_id))?;
        match check_resolution(&current, resolution)? {
            TransitionCheck::AlreadyApplied => Ok(current),
            TransitionCheck::Apply => Err(StoreError::Conflict(format!(
                "order {order_id} changed during resolve"
            ))),
        }
    }

    async fn fetch_order(&self, order_id: OrderId) -> Result<Option<OrderRecord>, StoreError> {
        let sql = format!("select {ORDER_COLUMNS} from order_records where order_id = $1");
        let row = sqlx::query(&sql)
            .bind(order_id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify_sqlx)?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn list_orders(
        &self,
        account: &AccountId,
        asset: &AssetId,
        limit: usize,
    ) -> Result<Vec<OrderRecord>, StoreError> {
        let sql = format!(
            r#"
            select {ORDER_COLUMNS}
              from order_records
             where account_id = $1 and asset_id = $2
             order by created_at_utc desc
             limit $3
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(account.as_str())
            .bind(asset.as_str())
            .bind(to_limit(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(classify_sqlx)?;
        rows.iter().map(order_from_row).collect()
    }

    async fn list_staged_before(
        &self,
        cutoff: DateTime<Utc>,
        after: Option<StagedCursor>,
        limit: usize,
    ) -> Result<Vec<OrderRecord>, StoreError> {
        let sql = format!(
            r#"
            select {ORDER_COLUMNS}
              from order_records
             where status = 'STAGED'
               and created_at_utc < $1
               and ($2::timestamptz is null or (created_at_utc, order_id) > ($2, $3::uuid))
             order by created_at_utc asc, order_id asc
             limit $4
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(cutoff)
            .bind(after.map(|c| c.created_at_utc))
            .bind(after.map(|c| c.order_id.0))
            .fetch_all(&self.pool)
            .await
            .map_err(classify_sqlx)?;
        rows.iter().map(order_from_row).collect()
    }
}

#[async_trait]
impl LedgerTxn for PgLedgerTxn {
    async fn server_time(&mut self) -> Result<DateTime<Utc>, StoreError> {
        if let Some(now) = self.now {
            return Ok(now);
        }
        // now() is the transaction start time, stable for its lifetime.
        let (now,): (DateTime<Utc>,) = sqlx::query_as("select now()")
            .fetch_one(&mut *self.tx)
            .await
            .map_err(classify_sqlx)?;
        self.now = Some(now);
        Ok(now)
    }

    async fn read_lock_counter(&mut self, key: &str) -> Result<i64, StoreError> {
        let row: Option<(i64,)> =
            sqlx::query_as("select counter from order_locks where lock_key = $1")
                .bind(key)
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(classify_sqlx)?;
        Ok(row.map(|(c,)| c).unwrap_or(0))
    }

    async fn write_lock_counter(&mut self, key: &str, value: i64) -> Result<(), StoreError> {
        let res = sqlx::query(
            r#"
            insert into order_locks (lock_key, counter)
            values ($1, $2)
            on conflict (lock_key) do update set counter = excluded.counter
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&mut *self.tx)
        .await;

        match res {
            Ok(_) => Ok(()),
            // Two first-time writers racing on a fresh key.
            Err(e) if is_unique_constraint_violation(&e, "order_locks_pkey") => {
                Err(StoreError::Conflict(e.to_string()))
            }
            Err(e) => Err(classify_sqlx(e)),
        }
    }

    async fn recent_orders(
        &mut self,
        account: &AccountId,
        asset: &AssetId,
        limit: usize,
    ) -> Result<Vec<OrderRecord>, StoreError> {
        let sql = format!(
            r#"
            select {ORDER_COLUMNS}
              from order_records
             where account_id = $1 and asset_id = $2
             order by created_at_utc desc
             limit $3
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(account.as_str())
            .bind(asset.as_str())
            .bind(to_limit(limit))
            .fetch_all(&mut *self.tx)
            .await
            .map_err(classify_sqlx)?;
        rows.iter().map(order_from_row).collect()
    }

    async fn create_order(&mut self, record: NewOrderRecord) -> Result<(), StoreError> {
        let now = self.server_time().await?;
        sqlx::query(
            r#"
            insert into order_records (
              order_id, account_id, asset_id, quote_amount_micros,
              idempotency_token, created_at_utc, status
            ) values (
              $1, $2, $3, $4, $5, $6, 'STAGED'
            )
            "#,
        )
        .bind(record.order_id.0)
        .bind(record.account.as_str())
        .bind(record.asset.as_str())
        .bind(record.quote_micros)
        .bind(record.idempotency_token.0)
        .bind(now)
        .execute(&mut *self.tx)
        .await
        .map_err(classify_sqlx)?;
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(classify_sqlx)
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await.map_err(classify_sqlx)
    }
}

/// Detect a Postgres unique constraint violation by name.
fn is_unique_constraint_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some("23505") && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}
