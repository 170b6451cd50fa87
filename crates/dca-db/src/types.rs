use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable opaque account (profile) identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tradable instrument identifier (e.g. "BTC-USD").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque ledger record key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub Uuid);

impl OrderId {
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-attempt idempotency token forwarded to the venue as the client order id.
///
/// Generated once at staging time and never regenerated for the same record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyToken(pub Uuid);

impl IdempotencyToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for IdempotencyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Staged,
    Accepted,
    Rejected,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Staged => "STAGED",
            OrderStatus::Accepted => "ACCEPTED",
            OrderStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "STAGED" => Ok(OrderStatus::Staged),
            "ACCEPTED" => Ok(OrderStatus::Accepted),
            "REJECTED" => Ok(OrderStatus::Rejected),
            other => Err(anyhow!("invalid order status: {}", other)),
        }
    }

    /// Returns `true` if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Accepted | OrderStatus::Rejected)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the spend ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: OrderId,
    pub account: AccountId,
    pub asset: AssetId,
    pub quote_micros: i64,
    pub idempotency_token: IdempotencyToken,
    /// Assigned by the store at write time.
    pub created_at_utc: DateTime<Utc>,
    pub status: OrderStatus,
    /// Set only when `status == ACCEPTED`.
    pub venue_order_id: Option<String>,
    /// Set only when `status == REJECTED`.
    pub rejection_reason: Option<String>,
    pub resolved_at_utc: Option<DateTime<Utc>>,
}

/// Keyset position in the `(created_at_utc, order_id)` ordering of staged
/// records. Listing resumes strictly after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct StagedCursor {
    pub created_at_utc: DateTime<Utc>,
    pub order_id: OrderId,
}

impl StagedCursor {
    pub fn of(record: &OrderRecord) -> Self {
        Self {
            created_at_utc: record.created_at_utc,
            order_id: record.order_id,
        }
    }
}

/// Fields supplied by the staging transaction; the store fills in
/// `created_at_utc` and the initial `STAGED` status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderRecord {
    pub order_id: OrderId,
    pub account: AccountId,
    pub asset: AssetId,
    pub quote_micros: i64,
    pub idempotency_token: IdempotencyToken,
}

/// Terminal outcome written by reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Accepted { venue_order_id: String },
    Rejected { reason: String },
}

impl Resolution {
    pub fn status(&self) -> OrderStatus {
        match self {
            Resolution::Accepted { .. } => OrderStatus::Accepted,
            Resolution::Rejected { .. } => OrderStatus::Rejected,
        }
    }
}

/// Stored allocation for one (account, asset) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeSpecRow {
    pub account: AccountId,
    pub asset: AssetId,
    pub daily_target_micros: i64,
    pub daily_frequency: i32,
    pub updated_at_utc: DateTime<Utc>,
}
