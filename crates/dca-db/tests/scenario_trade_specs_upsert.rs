//! Scenario: trade spec allocations are upserted per (account, asset).

use dca_db::{AccountId, AssetId};
use uuid::Uuid;

#[tokio::test]
#[ignore = "requires DCA_DATABASE_URL; run: cargo test -p dca-db -- --include-ignored"]
async fn upsert_replaces_existing_allocation() -> anyhow::Result<()> {
    let url = std::env::var(dca_db::ENV_DB_URL).expect("DB tests require DCA_DATABASE_URL");
    let pool = dca_db::connect(&url).await?;
    dca_db::migrate(&pool).await?;

    let account = AccountId::new(format!("acct-{}", Uuid::new_v4()));
    let btc = AssetId::new("BTC-USD");
    let eth = AssetId::new("ETH-USD");

    dca_db::upsert_trade_spec(&pool, &account, &btc, 100_000_000, 4).await?;
    dca_db::upsert_trade_spec(&pool, &account, &eth, 20_000_000, 2).await?;
    dca_db::upsert_trade_spec(&pool, &account, &btc, 60_000_000, 3).await?;

    let row = dca_db::fetch_trade_spec(&pool, &account, &btc)
        .await?
        .expect("allocation must exist");
    assert_eq!(row.daily_target_micros, 60_000_000);
    assert_eq!(row.daily_frequency, 3);

    let all = dca_db::list_trade_specs(&pool, &account).await?;
    let assets: Vec<&str> = all.iter().map(|r| r.asset.as_str()).collect();
    assert_eq!(assets, vec!["BTC-USD", "ETH-USD"]);

    assert!(dca_db::fetch_trade_spec(&pool, &account, &AssetId::new("SOL-USD"))
        .await?
        .is_none());
    Ok(())
}
