//! In-memory ledger backend with optimistic concurrency control.
//!
//! Every transaction records the version of each lock row and each
//! (account, asset) record set it reads. Commit re-checks those versions under
//! the state mutex and fails with [`StoreError::Conflict`] if any changed,
//! which is the same contract the Postgres backend gets from `SERIALIZABLE`.
//!
//! Each operation yields to the scheduler first so concurrent transactions in
//! tests genuinely interleave between reads and commit.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::status::{apply_resolution, check_resolution, TransitionCheck};
use crate::{
    AccountId, AssetId, IdempotencyToken, LedgerStore, LedgerTxn, NewOrderRecord, OrderId,
    OrderRecord, OrderStatus, Resolution, StagedCursor, StoreError,
};

/// Time source for the in-memory store.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

type PairKey = (AccountId, AssetId);

#[derive(Debug, Default)]
struct MemState {
    /// lock key -> (counter, version)
    locks: HashMap<String, (i64, u64)>,
    orders: BTreeMap<OrderId, OrderRecord>,
    /// Bumped every time a record is added for the pair.
    pair_versions: HashMap<PairKey, u64>,
    tokens: HashSet<IdempotencyToken>,
    stats: MemStats,
}

/// Transaction counters, for asserting how much work a caller did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemStats {
    pub transactions_begun: u64,
    pub commits: u64,
    pub commit_conflicts: u64,
}

impl MemState {
    fn lock_version(&self, key: &str) -> u64 {
        self.locks.get(key).map(|(_, v)| *v).unwrap_or(0)
    }

    fn pair_version(&self, pair: &PairKey) -> u64 {
        self.pair_versions.get(pair).copied().unwrap_or(0)
    }

    fn pair_orders(&self, account: &AccountId, asset: &AssetId, limit: usize) -> Vec<OrderRecord> {
        let mut out: Vec<OrderRecord> = self
            .orders
            .values()
            .filter(|r| &r.account == account && &r.asset == asset)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at_utc.cmp(&a.created_at_utc));
        out.truncate(limit);
        out
    }
}

/// Shared in-memory ledger. Clones share state.
#[derive(Clone)]
pub struct MemLedgerStore {
    state: Arc<Mutex<MemState>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemLedgerStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemState::default())),
            clock,
        }
    }

    /// Every record, oldest first.
    pub fn snapshot(&self) -> Result<Vec<OrderRecord>, StoreError> {
        let st = lock_state(&self.state)?;
        let mut out: Vec<OrderRecord> = st.orders.values().cloned().collect();
        out.sort_by(|a, b| a.created_at_utc.cmp(&b.created_at_utc));
        Ok(out)
    }

    pub fn stats(&self) -> Result<MemStats, StoreError> {
        Ok(lock_state(&self.state)?.stats)
    }

    pub fn lock_counter(&self, key: &str) -> Result<i64, StoreError> {
        let st = lock_state(&self.state)?;
        Ok(st.locks.get(key).map(|(c, _)| *c).unwrap_or(0))
    }
}

fn lock_state(state: &Mutex<MemState>) -> Result<MutexGuard<'_, MemState>, StoreError> {
    state
        .lock()
        .map_err(|_| StoreError::Backend("in-memory ledger mutex poisoned".to_string()))
}

#[async_trait]
impl LedgerStore for MemLedgerStore {
    type Txn = MemLedgerTxn;

    async fn begin(&self) -> Result<MemLedgerTxn, StoreError> {
        tokio::task::yield_now().await;
        lock_state(&self.state)?.stats.transactions_begun += 1;
        Ok(MemLedgerTxn {
            state: Arc::clone(&self.state),
            started_at: self.clock.now(),
            lock_reads: HashMap::new(),
            pair_reads: HashMap::new(),
            lock_writes: HashMap::new(),
            new_orders: Vec::new(),
        })
    }

    async fn resolve(
        &self,
        order_id: OrderId,
        resolution: &Resolution,
    ) -> Result<OrderRecord, StoreError> {
        tokio::task::yield_now().await;
        let now = self.clock.now();
        let mut st = lock_state(&self.state)?;
        let record = st
            .orders
            .get_mut(&order_id)
            .ok_or(StoreError::NotFound(order_id))?;

        match check_resolution(record, resolution)? {
            TransitionCheck::Apply => apply_resolution(record, resolution, now),
            TransitionCheck::AlreadyApplied => {}
        }
        Ok(record.clone())
    }

    async fn fetch_order(&self, order_id: OrderId) -> Result<Option<OrderRecord>, StoreError> {
        tokio::task::yield_now().await;
        let st = lock_state(&self.state)?;
        Ok(st.orders.get(&order_id).cloned())
    }

    async fn list_orders(
        &self,
        account: &AccountId,
        asset: &AssetId,
        limit: usize,
    ) -> Result<Vec<OrderRecord>, StoreError> {
        tokio::task::yield_now().await;
        let st = lock_state(&self.state)?;
        Ok(st.pair_orders(account, asset, limit))
    }

    async fn list_staged_before(
        &self,
        cutoff: DateTime<Utc>,
        after: Option<StagedCursor>,
        limit: usize,
    ) -> Result<Vec<OrderRecord>, StoreError> {
        tokio::task::yield_now().await;
        let st = lock_state(&self.state)?;
        let mut out: Vec<OrderRecord> = st
            .orders
            .values()
            .filter(|r| r.status == OrderStatus::Staged && r.created_at_utc < cutoff)
            .filter(|r| after.map_or(true, |c| StagedCursor::of(r) > c))
            .cloned()
            .collect();
        out.sort_by_key(StagedCursor::of);
        out.truncate(limit);
        Ok(out)
    }
}

/// Transaction over [`MemLedgerStore`]. Writes are buffered until commit.
pub struct MemLedgerTxn {
    state: Arc<Mutex<MemState>>,
    started_at: DateTime<Utc>,
    lock_reads: HashMap<String, u64>,
    pair_reads: HashMap<PairKey, u64>,
    lock_writes: HashMap<String, i64>,
    new_orders: Vec<NewOrderRecord>,
}

impl MemLedgerTxn {
    fn stale_read(&self, st: &MemState) -> Option<StoreError> {
        for (key, seen) in &self.lock_reads {
            if st.lock_version(key) != *seen {
                return Some(StoreError::Conflict(format!("lock {key} changed")));
            }
        }
        for (pair, seen) in &self.pair_reads {
            if st.pair_version(pair) != *seen {
                return Some(StoreError::Conflict(format!(
                    "records for {}/{} changed",
                    pair.0, pair.1
                )));
            }
        }
        None
    }
}

#[async_trait]
impl LedgerTxn for MemLedgerTxn {
    async fn server_time(&mut self) -> Result<DateTime<Utc>, StoreError> {
        Ok(self.started_at)
    }

    async fn read_lock_counter(&mut self, key: &str) -> Result<i64, StoreError> {
        tokio::task::yield_now().await;
        if let Some(v) = self.lock_writes.get(key) {
            return Ok(*v);
        }
        let st = lock_state(&self.state)?;
        let (counter, version) = st.locks.get(key).copied().unwrap_or((0, 0));
        self.lock_reads.entry(key.to_string()).or_insert(version);
        Ok(counter)
    }

    async fn write_lock_counter(&mut self, key: &str, value: i64) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        if !self.lock_reads.contains_key(key) {
            // Blind writes still conflict with concurrent writers.
            let st = lock_state(&self.state)?;
            let version = st.lock_version(key);
            self.lock_reads.insert(key.to_string(), version);
        }
        self.lock_writes.insert(key.to_string(), value);
        Ok(())
    }

    async fn recent_orders(
        &mut self,
        account: &AccountId,
        asset: &AssetId,
        limit: usize,
    ) -> Result<Vec<OrderRecord>, StoreError> {
        tokio::task::yield_now().await;
        let pair = (account.clone(), asset.clone());
        let st = lock_state(&self.state)?;
        let version = st.pair_version(&pair);
        let committed = st.pair_orders(account, asset, limit);
        drop(st);
        self.pair_reads.entry(pair).or_insert(version);

        // Own uncommitted inserts are visible to the transaction.
        let mut out: Vec<OrderRecord> = self
            .new_orders
            .iter()
            .filter(|r| &r.account == account && &r.asset == asset)
            .map(|r| staged_record(r, self.started_at))
            .collect();
        out.extend(committed);
        out.sort_by(|a, b| b.created_at_utc.cmp(&a.created_at_utc));
        out.truncate(limit);
        Ok(out)
    }

    async fn create_order(&mut self, record: NewOrderRecord) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        if record.quote_micros <= 0 {
            return Err(StoreError::Backend(format!(
                "quote amount must be positive (got {})",
                record.quote_micros
            )));
        }
        self.new_orders.push(record);
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        let mut st = lock_state(&self.state)?;

        if let Some(conflict) = self.stale_read(&st) {
            st.stats.commit_conflicts += 1;
            return Err(conflict);
        }
        for rec in &self.new_orders {
            if st.tokens.contains(&rec.idempotency_token) || st.orders.contains_key(&rec.order_id) {
                return Err(StoreError::Backend(format!(
                    "duplicate order {} / token {}",
                    rec.order_id, rec.idempotency_token
                )));
            }
        }

        for (key, value) in self.lock_writes {
            let entry = st.locks.entry(key).or_insert((0, 0));
            entry.0 = value;
            entry.1 += 1;
        }
        for rec in self.new_orders {
            let full = staged_record(&rec, self.started_at);
            *st.pair_versions
                .entry((rec.account.clone(), rec.asset.clone()))
                .or_insert(0) += 1;
            st.tokens.insert(rec.idempotency_token);
            st.orders.insert(rec.order_id, full);
        }
        st.stats.commits += 1;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}

fn staged_record(rec: &NewOrderRecord, created_at: DateTime<Utc>) -> OrderRecord {
    OrderRecord {
        order_id: rec.order_id,
        account: rec.account.clone(),
        asset: rec.asset.clone(),
        quote_micros: rec.quote_micros,
        idempotency_token: rec.idempotency_token,
        created_at_utc: created_at,
        status: OrderStatus::Staged,
        venue_order_id: None,
        rejection_reason: None,
        resolved_at_utc: None,
    }
}
