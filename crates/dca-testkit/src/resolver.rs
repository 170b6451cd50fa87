use std::sync::Mutex;

use async_trait::async_trait;
use dca_db::{AccountId, AssetId};
use dca_execution::{ResolveError, ResolvedAllocation, TradeSpecResolver};
use dca_limits::{SpecError, TradeSpec};

type Entry = (AccountId, AssetId, Result<TradeSpec, SpecError>);

/// Fixed allocation table. `resolve_all` returns an account's entries in
/// insertion order, invalid ones included.
#[derive(Default)]
pub struct StaticSpecResolver {
    specs: Mutex<Vec<Entry>>,
}

impl StaticSpecResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the allocation for `(account, spec.asset())`.
    pub fn set(&self, account: &AccountId, spec: TradeSpec) {
        let asset = AssetId::new(spec.asset());
        self.put(account, asset, Ok(spec));
    }

    /// Store an allocation row that fails validation with `error`.
    pub fn set_invalid(&self, account: &AccountId, asset: &AssetId, error: SpecError) {
        self.put(account, asset.clone(), Err(error));
    }

    fn put(&self, account: &AccountId, asset: AssetId, entry: Result<TradeSpec, SpecError>) {
        let mut specs = self.specs.lock().unwrap_or_else(|p| p.into_inner());
        match specs.iter_mut().find(|(a, s, _)| a == account && s == &asset) {
            Some(slot) => slot.2 = entry,
            None => specs.push((account.clone(), asset, entry)),
        }
    }

    fn snapshot(&self) -> Vec<Entry> {
        self.specs.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

fn to_resolved(
    account: &AccountId,
    asset: &AssetId,
    entry: Result<TradeSpec, SpecError>,
) -> Result<TradeSpec, ResolveError> {
    entry.map_err(|source| ResolveError::Invalid {
        account: account.clone(),
        asset: asset.clone(),
        source,
    })
}

#[async_trait]
impl TradeSpecResolver for StaticSpecResolver {
    async fn resolve(&self, account: &AccountId, asset: &AssetId) -> Result<TradeSpec, ResolveError> {
        let (_, _, entry) = self
            .snapshot()
            .into_iter()
            .find(|(a, s, _)| a == account && s == asset)
            .ok_or_else(|| ResolveError::NotFound {
                account: account.clone(),
                asset: asset.clone(),
            })?;
        to_resolved(account, asset, entry)
    }

    async fn resolve_all(
        &self,
        account: &AccountId,
    ) -> Result<Vec<ResolvedAllocation>, ResolveError> {
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|(a, _, _)| a == account)
            .map(|(a, asset, entry)| ResolvedAllocation {
                spec: to_resolved(&a, &asset, entry),
                asset,
            })
            .collect())
    }
}
