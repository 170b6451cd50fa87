//! Order record status transitions.
//!
//! ```text
//!   STAGED ──► ACCEPTED (term.)
//!      │
//!      └─────► REJECTED (term.)
//! ```
//!
//! Both backends route every terminal write through [`check_resolution`] so
//! the rules live in one place:
//!
//! 1. `STAGED` may move to either terminal state.
//! 2. Re-applying the exact terminal state already stored (same venue id or
//!    same reason) is a no-op.
//! 3. Anything else is a [`TransitionError`].

use crate::{OrderRecord, OrderStatus, Resolution};

/// Outcome of checking a resolution against the stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionCheck {
    /// Record is `STAGED`; write the resolution.
    Apply,
    /// Record already carries this exact resolution; leave it untouched.
    AlreadyApplied,
}

/// Returned when a resolution conflicts with the stored terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "illegal order transition: {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for TransitionError {}

pub fn check_resolution(
    current: &OrderRecord,
    resolution: &Resolution,
) -> Result<TransitionCheck, TransitionError> {
    let illegal = TransitionError {
        from: current.status,
        to: resolution.status(),
    };

    match (current.status, resolution) {
        (OrderStatus::Staged, _) => Ok(TransitionCheck::Apply),
        (OrderStatus::Accepted, Resolution::Accepted { venue_order_id }) => {
            if current.venue_order_id.as_deref() == Some(venue_order_id.as_str()) {
                Ok(TransitionCheck::AlreadyApplied)
            } else {
                Err(illegal)
            }
        }
        (OrderStatus::Rejected, Resolution::Rejected { reason }) => {
            if current.rejection_reason.as_deref() == Some(reason.as_str()) {
                Ok(TransitionCheck::AlreadyApplied)
            } else {
                Err(illegal)
            }
        }
        _ => Err(illegal),
    }
}

/// Apply a resolution to an in-memory copy of the record.
pub fn apply_resolution(
    record: &mut OrderRecord,
    resolution: &Resolution,
    at: chrono::DateTime<chrono::Utc>,
) {
    match resolution {
        Resolution::Accepted { venue_order_id } => {
            record.status = OrderStatus::Accepted;
            record.venue_order_id = Some(venue_order_id.clone());
        }
        Resolution::Rejected { reason } => {
            record.status = OrderStatus::Rejected;
            record.rejection_reason = Some(reason.clone());
        }
    }
    record.resolved_at_utc = Some(at);
}
