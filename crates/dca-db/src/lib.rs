//! dca-db
//!
//! Spend ledger persistence.
//!
//! - [`LedgerStore`] / [`LedgerTxn`]: transactional store seam with
//!   conflict-retry driver [`run_transaction`]
//! - [`KeyLock`]: per-(account, asset) serialization counter
//! - [`PgLedgerStore`]: Postgres backend (`SERIALIZABLE` staging)
//! - [`MemLedgerStore`]: in-memory backend with optimistic validation
//! - trade spec table helpers and migrations

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};

mod error;
mod lock;
mod mem;
mod pg;
mod specs;
pub mod status;
mod store;
mod types;

pub use error::StoreError;
pub use lock::{order_lock_key, KeyLock};
pub use mem::{Clock, MemLedgerStore, MemLedgerTxn, MemStats, SystemClock};
pub use pg::{PgLedgerStore, PgLedgerTxn};
pub use specs::{fetch_trade_spec, list_trade_specs, upsert_trade_spec};
pub use status::TransitionError;
pub use store::{run_transaction, LedgerStore, LedgerTxn, TxnFailure, TxnPolicy};
pub use types::*;

pub const ENV_DB_URL: &str = "DCA_DATABASE_URL";

/// Connect to Postgres using DCA_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url).await
}

pub async fn connect(url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;
    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;
    let ok = one == 1;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='order_records'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok,
        has_ledger_table: exists,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_ledger_table: bool,
}

/// Count records still `STAGED` (reconciliation debt).
pub async fn count_staged(pool: &PgPool) -> Result<i64> {
    let st = status(pool).await?;
    if !st.has_ledger_table {
        return Ok(0);
    }

    let (n,): (i64,) = sqlx::query_as::<_, (i64,)>(
        "select count(*)::bigint from order_records where status = 'STAGED'",
    )
    .fetch_one(pool)
    .await
    .context("count_staged failed")?;
    Ok(n)
}
