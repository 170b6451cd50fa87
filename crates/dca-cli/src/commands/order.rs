use std::sync::Arc;

use anyhow::Result;
use dca_db::{AccountId, AssetId, PgLedgerStore};
use dca_execution::{OrderPlacer, PgTradeSpecResolver, PlaceOrderError};
use dca_limits::ReasonCode;

use super::ledger::render;
use super::{build_exchange, build_publisher, load_engine_config, placement_config};

/// `asset = None` places for every allocation of the account.
pub async fn place(config_paths: &[String], account: &str, asset: Option<&str>) -> Result<()> {
    let (cfg, secrets) = load_engine_config(config_paths)?;
    let pool = dca_db::connect_from_env().await?;

    let placer = OrderPlacer::new(
        Arc::new(PgLedgerStore::new(pool.clone())),
        Arc::new(build_exchange(&cfg, &secrets)?),
        build_publisher(&cfg, &secrets)?,
        Arc::new(PgTradeSpecResolver::new(pool)),
        placement_config(&cfg),
    );
    let account = AccountId::new(account);

    let Some(asset) = asset else {
        let report = placer.place_all(&account).await?;
        for outcome in &report.placed {
            println!("{}", render(outcome.record()));
        }
        for asset in &report.skipped {
            println!(
                "skipped asset={asset} reason={}",
                ReasonCode::DailyTargetDepositReached.as_str()
            );
        }
        for (asset, err) in &report.failed {
            println!("failed asset={asset} error={err}");
        }
        if !report.failed.is_empty() {
            anyhow::bail!("{} allocation(s) failed", report.failed.len());
        }
        return Ok(());
    };

    match placer.place_order(&account, &AssetId::new(asset)).await {
        Ok(outcome) => println!("{}", render(outcome.record())),
        Err(PlaceOrderError::DailyTargetDepositReached {
            asset,
            todays_total_micros,
            daily_target_micros,
        }) => println!(
            "skipped asset={asset} reason={} todays_total_micros={todays_total_micros} \
             daily_target_micros={daily_target_micros}",
            ReasonCode::DailyTargetDepositReached.as_str()
        ),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
