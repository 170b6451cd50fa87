use async_trait::async_trait;
use dca_db::{AccountId, AssetId, TradeSpecRow};
use dca_limits::{SpecError, TradeSpec};
use sqlx::PgPool;

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("no allocation for {account}/{asset}")]
    NotFound { account: AccountId, asset: AssetId },

    #[error("allocation for {account}/{asset} is invalid: {source}")]
    Invalid {
        account: AccountId,
        asset: AssetId,
        #[source]
        source: SpecError,
    },

    #[error("trade spec lookup failed: {0}")]
    Backend(String),
}

/// Source of per-(account, asset) allocations.
#[async_trait]
pub trait TradeSpecResolver: Send + Sync {
    async fn resolve(&self, account: &AccountId, asset: &AssetId) -> Result<TradeSpec, ResolveError>;

    /// Every allocation configured for `account`. A row that fails
    /// validation is returned as an error in its own slot.
    async fn resolve_all(&self, account: &AccountId)
        -> Result<Vec<ResolvedAllocation>, ResolveError>;
}

/// One configured allocation, valid or not.
#[derive(Debug)]
pub struct ResolvedAllocation {
    pub asset: AssetId,
    pub spec: Result<TradeSpec, ResolveError>,
}

impl ResolvedAllocation {
    pub fn from_row(row: &TradeSpecRow) -> Self {
        Self {
            asset: row.asset.clone(),
            spec: trade_spec_from_row(row),
        }
    }
}

/// Validate a stored allocation row.
pub fn trade_spec_from_row(row: &TradeSpecRow) -> Result<TradeSpec, ResolveError> {
    let invalid = |source: SpecError| ResolveError::Invalid {
        account: row.account.clone(),
        asset: row.asset.clone(),
        source,
    };
    let frequency = u32::try_from(row.daily_frequency).map_err(|_| invalid(SpecError::ZeroFrequency))?;
    TradeSpec::new(row.asset.as_str(), frequency, row.daily_target_micros).map_err(invalid)
}

/// Reads allocations from the `trade_specs` table.
#[derive(Debug, Clone)]
pub struct PgTradeSpecResolver {
    pool: PgPool,
}

impl PgTradeSpecResolver {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TradeSpecResolver for PgTradeSpecResolver {
    async fn resolve(&self, account: &AccountId, asset: &AssetId) -> Result<TradeSpec, ResolveError> {
        let row = dca_db::fetch_trade_spec(&self.pool, account, asset)
            .await
            .map_err(|e| ResolveError::Backend(format!("{e:#}")))?
            .ok_or_else(|| ResolveError::NotFound {
                account: account.clone(),
                asset: asset.clone(),
            })?;
        trade_spec_from_row(&row)
    }

    async fn resolve_all(
        &self,
        account: &AccountId,
    ) -> Result<Vec<ResolvedAllocation>, ResolveError> {
        let rows = dca_db::list_trade_specs(&self.pool, account)
            .await
            .map_err(|e| ResolveError::Backend(format!("{e:#}")))?;
        Ok(rows.iter().map(ResolvedAllocation::from_row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(target: i64, freq: i32) -> TradeSpecRow {
        TradeSpecRow {
            account: AccountId::new("acct-1"),
            asset: AssetId::new("BTC-USD"),
            daily_target_micros: target,
            daily_frequency: freq,
            updated_at_utc: Utc::now(),
        }
    }

    #[test]
    fn valid_row_converts() {
        let spec = trade_spec_from_row(&row(100_000_000, 4)).unwrap();
        assert_eq!(spec.asset(), "BTC-USD");
        assert_eq!(spec.per_order_micros(), 25_000_000);
    }

    #[test]
    fn negative_frequency_is_invalid() {
        assert!(matches!(
            trade_spec_from_row(&row(100_000_000, -1)),
            Err(ResolveError::Invalid {
                source: SpecError::ZeroFrequency,
                ..
            })
        ));
    }

    #[test]
    fn invalid_row_keeps_its_own_slot() {
        let mut bad = row(100_000_000, 0);
        bad.asset = AssetId::new("ETH-USD");
        let resolved: Vec<ResolvedAllocation> = [row(100_000_000, 4), bad]
            .iter()
            .map(ResolvedAllocation::from_row)
            .collect();

        assert_eq!(resolved.len(), 2);
        assert!(resolved[0].spec.is_ok());
        assert_eq!(resolved[1].asset.as_str(), "ETH-USD");
        assert!(matches!(resolved[1].spec, Err(ResolveError::Invalid { .. })));
    }

    #[test]
    fn zero_frequency_is_invalid() {
        assert!(matches!(
            trade_spec_from_row(&row(100_000_000, 0)),
            Err(ResolveError::Invalid { .. })
        ));
    }
}
