//! dca-execution
//!
//! Recurring-purchase placement:
//! - staging transaction: limit check + `STAGED` record, serialized per pair
//! - exchange submission with an idempotency token, bounded by a timeout
//! - reconciliation of the record to `ACCEPTED` / `REJECTED`
//!
//! Collaborators (exchange, notifications, allocations) are traits so the
//! engine can be driven by real adapters or by the fakes in `dca-testkit`.

mod engine;
mod exchange;
mod notify;
mod prices;
pub mod reconcile;
mod resolver;
mod staging;
mod types;

pub use engine::{
    OrderPlacer, PlaceAllReport, PlaceOrderError, PlacementConfig, SubmissionFailure,
    SubmissionFault, DEFAULT_INSUFFICIENT_FUNDS_TOPIC,
};
pub use exchange::{ExchangeClient, ExchangeError, INSUFFICIENT_FUNDS_REASON};
pub use notify::{insufficient_funds_payload, NotificationPublisher, PublishError, TracingPublisher};
pub use prices::{format_micros, parse_decimal_to_micros, PricingError, MICROS_PER_UNIT};
pub use resolver::{
    trade_spec_from_row, PgTradeSpecResolver, ResolveError, ResolvedAllocation, TradeSpecResolver,
};
pub use staging::{stage, utc_day_id, StageError};
pub use types::{
    MarketBuyRequest, OrderLookup, PlacementOutcome, Side, StagedOrder, SubmitOutcome,
};
