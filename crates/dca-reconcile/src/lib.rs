//! dca-reconcile
//!
//! Staged-record sweep.
//!
//! A crash or an unrecognized exchange fault between submit and reconcile
//! leaves a record `STAGED`. Once a record is older than the grace period the
//! sweep asks the venue about its idempotency token and settles it:
//! - found at the venue: `ACCEPTED` with the venue order id
//! - not found: `REJECTED` (the venue never took the order)
//! - lookup failed: left `STAGED` for the next sweep
//!
//! `classify` is pure; `sweep_staged` is the IO driver.

mod engine;
mod types;

pub use engine::{classify, sweep_staged};
pub use types::*;
