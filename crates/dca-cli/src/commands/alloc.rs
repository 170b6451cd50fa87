use anyhow::{anyhow, Context, Result};
use dca_db::{AccountId, AssetId};
use dca_execution::{format_micros, parse_decimal_to_micros, trade_spec_from_row};
use dca_limits::TradeSpec;

pub async fn set(account: &str, asset: &str, daily_target: &str, frequency: u32) -> Result<()> {
    let target_micros =
        parse_decimal_to_micros(daily_target).map_err(|e| anyhow!("invalid --daily-target: {e}"))?;
    // Validate before touching the database.
    let spec = TradeSpec::new(asset, frequency, target_micros)
        .map_err(|e| anyhow!("invalid allocation: {e}"))?;
    let frequency = i32::try_from(frequency).context("--frequency out of range")?;

    let pool = dca_db::connect_from_env().await?;
    let account = AccountId::new(account);
    dca_db::upsert_trade_spec(
        &pool,
        &account,
        &AssetId::new(spec.asset()),
        spec.daily_target_micros(),
        frequency,
    )
    .await?;

    println!(
        "alloc_set=true account={} asset={} daily_target={} frequency={} per_order={}",
        account,
        spec.asset(),
        format_micros(spec.daily_target_micros()),
        spec.daily_frequency(),
        format_micros(spec.per_order_micros())
    );
    Ok(())
}

pub async fn show(account: &str) -> Result<()> {
    let pool = dca_db::connect_from_env().await?;
    let rows = dca_db::list_trade_specs(&pool, &AccountId::new(account)).await?;
    if rows.is_empty() {
        println!("no allocations for account={account}");
        return Ok(());
    }
    for row in rows {
        let per_order = match trade_spec_from_row(&row) {
            Ok(spec) => format_micros(spec.per_order_micros()),
            Err(e) => format!("INVALID({e})"),
        };
        println!(
            "account={} asset={} daily_target={} frequency={} per_order={} updated_at={}",
            row.account,
            row.asset,
            format_micros(row.daily_target_micros),
            row.daily_frequency,
            per_order,
            row.updated_at_utc.to_rfc3339()
        );
    }
    Ok(())
}
