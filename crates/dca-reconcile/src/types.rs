use std::time::Duration;

/// Rejection reason written when the venue has no order for the token.
pub const NOT_FOUND_REASON: &str = "not found at venue after grace period";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SweepConfig {
    /// Records younger than this are left alone (a placement may still be in flight).
    pub staged_grace: Duration,
    /// Max records settled per sweep. Also the listing page size.
    pub batch_limit: usize,
    /// Bound on each venue lookup.
    pub lookup_timeout: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            staged_grace: Duration::from_secs(900),
            batch_limit: 100,
            lookup_timeout: Duration::from_secs(10),
        }
    }
}

/// What the sweep does with one stale record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SweepAction {
    Accept { venue_order_id: String },
    Reject { reason: String },
    /// Lookup failed; try again next sweep.
    LeaveStaged { cause: String },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub inspected: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub unresolved: usize,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.unresolved == 0
    }

    /// Records moved to a terminal state.
    pub fn settled(&self) -> usize {
        self.accepted + self.rejected
    }
}
