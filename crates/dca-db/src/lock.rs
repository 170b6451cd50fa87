//! Per-key serialization primitive.
//!
//! The store has no row locks we can hold across the staging body, so each
//! (account, asset) pair gets a counter row. Every staging transaction for the
//! pair reads the counter and, on success, writes it back incremented. Two
//! concurrent transactions on the same pair therefore both read and write the
//! same row and the store's conflict detection forces one of them to retry.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

use crate::{AccountId, AssetId, LedgerTxn, StoreError};

/// Deterministic, case-sensitive lock key for a pair.
///
/// `.` is not in the base64url alphabet, so the encoding is injective even
/// when identifiers contain separators.
pub fn order_lock_key(account: &AccountId, asset: &AssetId) -> String {
    format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(account.as_str()),
        URL_SAFE_NO_PAD.encode(asset.as_str())
    )
}

/// Handle for an acquired key. Consumed by [`KeyLock::release`].
///
/// Dropping the handle without releasing leaves the counter untouched; the
/// read still participates in conflict detection.
#[derive(Debug)]
#[must_use = "release the lock inside the same transaction once the protected work succeeds"]
pub struct KeyLock {
    key: String,
    counter: i64,
}

impl KeyLock {
    pub async fn acquire<T: LedgerTxn>(key: String, txn: &mut T) -> Result<Self, StoreError> {
        let counter = txn.read_lock_counter(&key).await?;
        Ok(Self { key, counter })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Counter value observed at acquire time.
    pub fn counter(&self) -> i64 {
        self.counter
    }

    pub async fn release<T: LedgerTxn>(self, txn: &mut T) -> Result<(), StoreError> {
        let next = self
            .counter
            .checked_add(1)
            .ok_or_else(|| StoreError::Backend(format!("lock counter overflow: {}", self.key)))?;
        txn.write_lock_counter(&self.key, next).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(a: &str, b: &str) -> String {
        order_lock_key(&AccountId::new(a), &AssetId::new(b))
    }

    #[test]
    fn key_is_deterministic() {
        assert_eq!(key("acct-1", "BTC-USD"), key("acct-1", "BTC-USD"));
    }

    #[test]
    fn key_is_case_sensitive() {
        assert_ne!(key("acct-1", "BTC-USD"), key("acct-1", "btc-usd"));
    }

    #[test]
    fn separator_inside_ids_does_not_collide() {
        // A naive "account:asset" join maps both of these to "a:b:c".
        assert_ne!(key("a:b", "c"), key("a", "b:c"));
    }

    #[test]
    fn key_uses_url_safe_alphabet() {
        let k = key("acct/+?", "BTC-USD");
        assert!(k
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'));
        assert_eq!(k.matches('.').count(), 1);
    }
}
