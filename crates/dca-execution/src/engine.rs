//! Order placement engine.
//!
//! `OrderPlacer` is the only entry point that moves money. Per call:
//!
//! 1. resolve the pair's [`TradeSpec`](dca_limits::TradeSpec)
//! 2. stage a record inside a store transaction ([`crate::stage`])
//! 3. submit to the exchange outside the transaction, bounded by a timeout,
//!    always forwarding the staged idempotency token
//! 4. reconcile the record to `ACCEPTED` or `REJECTED`
//!
//! Unrecognized submission faults are not retried here. The record stays
//! `STAGED` and the fault is returned as [`SubmissionFailure`]; the staged
//! sweep settles it later by token lookup.

use std::sync::Arc;
use std::time::Duration;

use dca_db::{AccountId, AssetId, LedgerStore, OrderId, StoreError, TxnPolicy};
use dca_limits::{ReasonCode, TradeSpec};
use tracing::{error, info, warn};

use crate::exchange::INSUFFICIENT_FUNDS_REASON;
use crate::notify::insufficient_funds_payload;
use crate::reconcile::{accept, reject};
use crate::{
    stage, ExchangeClient, ExchangeError, MarketBuyRequest, NotificationPublisher,
    PlacementOutcome, ResolveError, ResolvedAllocation, StageError, StagedOrder, SubmitOutcome,
    TradeSpecResolver,
};

pub const DEFAULT_INSUFFICIENT_FUNDS_TOPIC: &str = "insufficient-funds";

#[derive(Debug, Clone)]
pub struct PlacementConfig {
    pub submit_timeout: Duration,
    pub txn_policy: TxnPolicy,
    pub insufficient_funds_topic: String,
    /// Bound on the insufficient-funds publish.
    pub notify_timeout: Duration,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            submit_timeout: Duration::from_secs(10),
            txn_policy: TxnPolicy::default(),
            insufficient_funds_topic: DEFAULT_INSUFFICIENT_FUNDS_TOPIC.to_string(),
            notify_timeout: Duration::from_secs(2),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SubmissionFault {
    #[error("no response within {0:?}")]
    TimedOut(Duration),

    #[error(transparent)]
    Exchange(ExchangeError),
}

/// An unrecognized exchange fault after staging. The record is still `STAGED`.
#[derive(Debug, thiserror::Error)]
#[error("submission for {account}/{asset} (order {order_id}) failed: {fault}")]
pub struct SubmissionFailure {
    pub account: AccountId,
    pub asset: AssetId,
    pub order_id: OrderId,
    #[source]
    pub fault: SubmissionFault,
}

#[derive(Debug, thiserror::Error)]
pub enum PlaceOrderError {
    /// Today's spend already meets the target. Expected; skip this pair.
    #[error("daily target deposit reached for {asset}")]
    DailyTargetDepositReached {
        asset: AssetId,
        todays_total_micros: i64,
        daily_target_micros: i64,
    },

    /// Ledger history for the pair cannot be trusted (negative amount or overflow).
    #[error("ledger history for {asset} failed validation; refusing to stage")]
    LedgerInvalid { asset: AssetId },

    #[error(transparent)]
    Submission(#[from] SubmissionFailure),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PlaceOrderError {
    pub fn is_daily_target_reached(&self) -> bool {
        matches!(self, PlaceOrderError::DailyTargetDepositReached { .. })
    }
}

// ---------------------------------------------------------------------------
// Batch report
// ---------------------------------------------------------------------------

/// Per-asset results of [`OrderPlacer::place_all`].
#[derive(Debug, Default)]
pub struct PlaceAllReport {
    pub placed: Vec<PlacementOutcome>,
    pub skipped: Vec<AssetId>,
    pub failed: Vec<(AssetId, PlaceOrderError)>,
}

// ---------------------------------------------------------------------------
// OrderPlacer
// ---------------------------------------------------------------------------

/// Explicitly constructed placement context.
pub struct OrderPlacer<S: LedgerStore> {
    store: Arc<S>,
    exchange: Arc<dyn ExchangeClient>,
    publisher: Arc<dyn NotificationPublisher>,
    resolver: Arc<dyn TradeSpecResolver>,
    config: PlacementConfig,
}

impl<S: LedgerStore> OrderPlacer<S> {
    pub fn new(
        store: Arc<S>,
        exchange: Arc<dyn ExchangeClient>,
        publisher: Arc<dyn NotificationPublisher>,
        resolver: Arc<dyn TradeSpecResolver>,
        config: PlacementConfig,
    ) -> Self {
        Self {
            store,
            exchange,
            publisher,
            resolver,
            config,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    /// Place one purchase for `(account, asset)` if today's limit allows it.
    pub async fn place_order(
        &self,
        account: &AccountId,
        asset: &AssetId,
    ) -> Result<PlacementOutcome, PlaceOrderError> {
        let spec = self.resolver.resolve(account, asset).await?;
        self.place_with_spec(account, &spec).await
    }

    /// Place one purchase for every allocation of `account`.
    ///
    /// Denials are logged and skipped; other failures, including allocations
    /// that fail validation, are collected so one pair cannot block the rest.
    pub async fn place_all(&self, account: &AccountId) -> Result<PlaceAllReport, PlaceOrderError> {
        let allocations = self.resolver.resolve_all(account).await?;
        let mut report = PlaceAllReport::default();

        for ResolvedAllocation { asset, spec } in allocations {
            let spec = match spec {
                Ok(spec) => spec,
                Err(e) => {
                    warn!(
                        account = %account,
                        asset = %asset,
                        error = %e,
                        "skipping invalid allocation"
                    );
                    report.failed.push((asset, e.into()));
                    continue;
                }
            };
            match self.place_with_spec(account, &spec).await {
                Ok(outcome) => report.placed.push(outcome),
                Err(e) if e.is_daily_target_reached() => report.skipped.push(asset),
                Err(e) => report.failed.push((asset, e)),
            }
        }
        Ok(report)
    }

    async fn place_with_spec(
        &self,
        account: &AccountId,
        spec: &TradeSpec,
    ) -> Result<PlacementOutcome, PlaceOrderError> {
        let staged = match stage(self.store.as_ref(), &self.config.txn_policy, account, spec).await
        {
            Ok(s) => s,
            Err(StageError::Denied { decision, .. }) => {
                let asset = AssetId::new(spec.asset());
                return Err(match decision.reason {
                    ReasonCode::BadInput => {
                        error!(account = %account, asset = %asset, "ledger history failed validation");
                        PlaceOrderError::LedgerInvalid { asset }
                    }
                    _ => {
                        info!(
                            account = %account,
                            asset = %asset,
                            todays_total_micros = decision.todays_total_micros,
                            "daily target deposit reached; skipping"
                        );
                        PlaceOrderError::DailyTargetDepositReached {
                            asset,
                            todays_total_micros: decision.todays_total_micros,
                            daily_target_micros: spec.daily_target_micros(),
                        }
                    }
                });
            }
            Err(StageError::Store(e)) => return Err(e.into()),
        };

        info!(
            account = %staged.account,
            asset = %staged.asset,
            order_id = %staged.order_id,
            quote_micros = staged.quote_micros,
            "order staged"
        );
        self.submit_and_reconcile(staged).await
    }

    async fn submit_and_reconcile(
        &self,
        staged: StagedOrder,
    ) -> Result<PlacementOutcome, PlaceOrderError> {
        let request = MarketBuyRequest::new(
            staged.asset.clone(),
            staged.quote_micros,
            staged.idempotency_token,
        );

        let submitted = tokio::time::timeout(
            self.config.submit_timeout,
            self.exchange.place_market_buy(&request),
        )
        .await;

        let store = self.store.as_ref();
        match submitted {
            Ok(Ok(SubmitOutcome::Accepted { venue_order_id })) => {
                let record = accept(store, staged.order_id, &venue_order_id).await?;
                Ok(PlacementOutcome::Accepted(record))
            }
            Ok(Ok(SubmitOutcome::Rejected { reason })) => {
                warn!(
                    account = %staged.account,
                    asset = %staged.asset,
                    order_id = %staged.order_id,
                    response = %reason,
                    "exchange response carried no order id"
                );
                let record = reject(store, staged.order_id, &reason).await?;
                Ok(PlacementOutcome::Rejected(record))
            }
            Ok(Err(e)) if e.is_insufficient_funds() => {
                warn!(
                    account = %staged.account,
                    asset = %staged.asset,
                    order_id = %staged.order_id,
                    "insufficient funds"
                );
                let record = reject(store, staged.order_id, INSUFFICIENT_FUNDS_REASON).await?;
                self.notify_insufficient_funds(&staged).await;
                Ok(PlacementOutcome::Rejected(record))
            }
            Ok(Err(e)) => Err(self.unresolved(&staged, SubmissionFault::Exchange(e))),
            Err(_elapsed) => Err(self.unresolved(
                &staged,
                SubmissionFault::TimedOut(self.config.submit_timeout),
            )),
        }
    }

    fn unresolved(&self, staged: &StagedOrder, fault: SubmissionFault) -> PlaceOrderError {
        error!(
            account = %staged.account,
            asset = %staged.asset,
            order_id = %staged.order_id,
            token = %staged.idempotency_token,
            error = %fault,
            "submission failed; record left STAGED"
        );
        PlaceOrderError::Submission(SubmissionFailure {
            account: staged.account.clone(),
            asset: staged.asset.clone(),
            order_id: staged.order_id,
            fault,
        })
    }

    async fn notify_insufficient_funds(&self, staged: &StagedOrder) {
        let topic = &self.config.insufficient_funds_topic;
        let payload = insufficient_funds_payload(&staged.account, &staged.asset);
        let published = tokio::time::timeout(
            self.config.notify_timeout,
            self.publisher.publish(topic, payload),
        )
        .await;
        match published {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(
                account = %staged.account,
                topic = %topic,
                error = %e,
                "insufficient-funds notification failed; ignoring"
            ),
            Err(_elapsed) => warn!(
                account = %staged.account,
                topic = %topic,
                timeout = ?self.config.notify_timeout,
                "insufficient-funds notification timed out; ignoring"
            ),
        }
    }
}
