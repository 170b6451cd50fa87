use std::fmt;

use dca_db::{AccountId, AssetId, IdempotencyToken, OrderId, OrderRecord};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    Buy,
}

impl Side {
    /// Lowercase wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Venue-agnostic market order sized in quote currency.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarketBuyRequest {
    pub asset: AssetId,
    pub side: Side,
    pub quote_micros: i64,
    /// Forwarded as the venue's client order id so a replayed submit is deduped.
    pub idempotency_token: IdempotencyToken,
}

impl MarketBuyRequest {
    pub fn new(asset: AssetId, quote_micros: i64, idempotency_token: IdempotencyToken) -> Self {
        Self {
            asset,
            side: Side::Buy,
            quote_micros,
            idempotency_token,
        }
    }
}

/// Tagged venue result, produced at the adapter boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted { venue_order_id: String },
    /// The venue answered but returned no order id; `reason` carries the raw response.
    Rejected { reason: String },
}

/// Result of looking an order up at the venue by idempotency token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrderLookup {
    Found { venue_order_id: String },
    NotFound,
}

/// A record that passed the limit check and was durably staged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedOrder {
    pub order_id: OrderId,
    pub account: AccountId,
    pub asset: AssetId,
    pub quote_micros: i64,
    pub idempotency_token: IdempotencyToken,
    /// Today's spend before this order.
    pub todays_total_micros: i64,
}

/// Normal (non-error) end states of [`crate::OrderPlacer::place_order`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlacementOutcome {
    Accepted(OrderRecord),
    /// Recognized venue rejection; the record is `REJECTED`.
    Rejected(OrderRecord),
}

impl PlacementOutcome {
    pub fn record(&self) -> &OrderRecord {
        match self {
            PlacementOutcome::Accepted(r) | PlacementOutcome::Rejected(r) => r,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, PlacementOutcome::Accepted(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_display_is_the_wire_form() {
        assert_eq!(Side::Buy.to_string(), Side::Buy.as_str());
        assert_eq!(format!("{}", Side::Buy), "buy");
    }
}
