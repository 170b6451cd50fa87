use anyhow::{Context, Result};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::{AccountId, AssetId, TradeSpecRow};

fn spec_from_row(row: &PgRow) -> Result<TradeSpecRow> {
    Ok(TradeSpecRow {
        account: AccountId::new(row.try_get::<String, _>("account_id")?),
        asset: AssetId::new(row.try_get::<String, _>("asset_id")?),
        daily_target_micros: row.try_get("daily_target_micros")?,
        daily_frequency: row.try_get("daily_frequency")?,
        updated_at_utc: row.try_get("updated_at_utc")?,
    })
}

/// Insert or replace the allocation for one (account, asset) pair.
pub async fn upsert_trade_spec(
    pool: &PgPool,
    account: &AccountId,
    asset: &AssetId,
    daily_target_micros: i64,
    daily_frequency: i32,
) -> Result<()> {
    sqlx::query(
        r#"
        insert into trade_specs (account_id, asset_id, daily_target_micros, daily_frequency, updated_at_utc)
        values ($1, $2, $3, $4, now())
        on conflict (account_id, asset_id) do update
           set daily_target_micros = excluded.daily_target_micros,
               daily_frequency = excluded.daily_frequency,
               updated_at_utc = excluded.updated_at_utc
        "#,
    )
    .bind(account.as_str())
    .bind(asset.as_str())
    .bind(daily_target_micros)
    .bind(daily_frequency)
    .execute(pool)
    .await
    .context("upsert_trade_spec failed")?;
    Ok(())
}

pub async fn fetch_trade_spec(
    pool: &PgPool,
    account: &AccountId,
    asset: &AssetId,
) -> Result<Option<TradeSpecRow>> {
    let row = sqlx::query(
        r#"
        select account_id, asset_id, daily_target_micros, daily_frequency, updated_at_utc
          from trade_specs
         where account_id = $1 and asset_id = $2
        "#,
    )
    .bind(account.as_str())
    .bind(asset.as_str())
    .fetch_optional(pool)
    .await
    .context("fetch_trade_spec failed")?;

    row.as_ref().map(spec_from_row).transpose()
}

/// Every allocation configured for `account`, ordered by asset.
pub async fn list_trade_specs(pool: &PgPool, account: &AccountId) -> Result<Vec<TradeSpecRow>> {
    let rows = sqlx::query(
        r#"
        select account_id, asset_id, daily_target_micros, daily_frequency, updated_at_utc
          from trade_specs
         where account_id = $1
         order by asset_id
        "#,
    )
    .bind(account.as_str())
    .fetch_all(pool)
    .await
    .context("list_trade_specs failed")?;

    rows.iter().map(spec_from_row).collect()
}
