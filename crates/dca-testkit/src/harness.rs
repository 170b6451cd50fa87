use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use dca_db::{AccountId, MemLedgerStore, TxnPolicy};
use dca_execution::{OrderPlacer, PlacementConfig};
use dca_limits::TradeSpec;

use crate::{FakeExchange, ManualClock, RecordingPublisher, StaticSpecResolver};

/// A placer wired to in-memory parts, with handles to each part.
pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemLedgerStore>,
    pub exchange: Arc<FakeExchange>,
    pub publisher: Arc<RecordingPublisher>,
    pub resolver: Arc<StaticSpecResolver>,
    pub placer: OrderPlacer<MemLedgerStore>,
}

impl Harness {
    /// 2026-10-19 09:00 UTC, accept-everything venue, 200ms submit timeout,
    /// 50ms notify timeout.
    pub fn new() -> Self {
        Self::build(FakeExchange::new(), RecordingPublisher::new())
    }

    pub fn build(exchange: FakeExchange, publisher: RecordingPublisher) -> Self {
        let config = PlacementConfig {
            submit_timeout: Duration::from_millis(200),
            notify_timeout: Duration::from_millis(50),
            txn_policy: TxnPolicy {
                max_attempts: 10,
                backoff_base: Duration::from_millis(1),
            },
            ..PlacementConfig::default()
        };
        Self::build_with(exchange, publisher, config)
    }

    pub fn build_with(
        exchange: FakeExchange,
        publisher: RecordingPublisher,
        config: PlacementConfig,
    ) -> Self {
        let clock = Arc::new(ManualClock::at(Self::start_time()));
        let store = Arc::new(MemLedgerStore::with_clock(clock.clone()));
        let exchange = Arc::new(exchange);
        let publisher = Arc::new(publisher);
        let resolver = Arc::new(StaticSpecResolver::new());
        let placer = OrderPlacer::new(
            store.clone(),
            exchange.clone(),
            publisher.clone(),
            resolver.clone(),
            config,
        );
        Self {
            clock,
            store,
            exchange,
            publisher,
            resolver,
            placer,
        }
    }

    pub fn start_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    pub fn allocate(&self, account: &AccountId, spec: TradeSpec) -> &Self {
        self.resolver.set(account, spec);
        self
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
