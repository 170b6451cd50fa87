use anyhow::Result;
use chrono::Utc;
use dca_db::PgLedgerStore;
use dca_reconcile::sweep_staged;

use super::{build_exchange, load_engine_config, sweep_config};

pub async fn sweep(config_paths: &[String]) -> Result<()> {
    let (cfg, secrets) = load_engine_config(config_paths)?;
    let store = PgLedgerStore::new(dca_db::connect_from_env().await?);
    let exchange = build_exchange(&cfg, &secrets)?;

    let report = sweep_staged(&store, &exchange, &sweep_config(&cfg), Utc::now()).await?;
    println!(
        "inspected={} accepted={} rejected={} unresolved={} clean={}",
        report.inspected,
        report.accepted,
        report.rejected,
        report.unresolved,
        report.is_clean()
    );
    Ok(())
}
