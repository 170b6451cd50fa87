use anyhow::Result;
use dca_db::{AccountId, AssetId, LedgerStore, OrderRecord, PgLedgerStore};
use dca_execution::format_micros;

pub async fn list(account: &str, asset: &str, limit: usize) -> Result<()> {
    let store = PgLedgerStore::new(dca_db::connect_from_env().await?);
    let records = store
        .list_orders(&AccountId::new(account), &AssetId::new(asset), limit)
        .await?;
    for r in &records {
        println!("{}", render(r));
    }
    println!("count={}", records.len());
    Ok(())
}

pub(crate) fn render(r: &OrderRecord) -> String {
    let mut line = format!(
        "order_id={} account={} asset={} funds={} status={} created_at={} token={}",
        r.order_id,
        r.account,
        r.asset,
        format_micros(r.quote_micros),
        r.status.as_str(),
        r.created_at_utc.to_rfc3339(),
        r.idempotency_token
    );
    if let Some(v) = &r.venue_order_id {
        line.push_str(&format!(" venue_order_id={v}"));
    }
    if let Some(reason) = &r.rejection_reason {
        line.push_str(&format!(" reason={reason:?}"));
    }
    line
}
