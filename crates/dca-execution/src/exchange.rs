//! Exchange adapter boundary.
//!
//! Adapters translate venue responses into [`SubmitOutcome`] /
//! [`ExchangeError`] so the placement engine never parses venue payloads.
//! The only rejection the engine treats as a business outcome is
//! [`ExchangeError::InsufficientFunds`]; every other error is an
//! unrecognized fault.

use async_trait::async_trait;
use dca_db::IdempotencyToken;

use crate::{MarketBuyRequest, OrderLookup, SubmitOutcome};

/// Rejection reason stored when the venue reports insufficient funds.
pub const INSUFFICIENT_FUNDS_REASON: &str = "Insufficient funds";

#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("insufficient funds: {message}")]
    InsufficientFunds { message: String },

    #[error("exchange request timed out")]
    Timeout,

    #[error("exchange returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("exchange transport error: {0}")]
    Transport(String),

    #[error("exchange response could not be decoded: {0}")]
    Decode(String),
}

impl ExchangeError {
    pub fn is_insufficient_funds(&self) -> bool {
        matches!(self, ExchangeError::InsufficientFunds { .. })
    }
}

#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Submit a market buy. Must forward `request.idempotency_token` unchanged.
    async fn place_market_buy(
        &self,
        request: &MarketBuyRequest,
    ) -> Result<SubmitOutcome, ExchangeError>;

    /// Look up an order by the token it was submitted with.
    async fn lookup_by_token(&self, token: &IdempotencyToken)
        -> Result<OrderLookup, ExchangeError>;
}
