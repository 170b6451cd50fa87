//! dca-exchange-coinbase
//!
//! Coinbase Exchange REST adapter implementing
//! [`dca_execution::ExchangeClient`].
//!
//! - market buys sized in quote currency (`funds`), `client_oid` = idempotency token
//! - lookup by client order id for the staged sweep
//! - HMAC-SHA256 request signing (`CB-ACCESS-*` headers)
//!
//! Response interpretation is pure (see [`interpret_submit_response`]) so the
//! venue contract is testable without a network.

mod auth;
mod client;
mod response;

pub use auth::{sign_request, CoinbaseCredentials};
pub use client::{CoinbaseExchange, OrderBody};
pub use response::{interpret_lookup_response, interpret_submit_response};
