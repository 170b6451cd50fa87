//! dca-limits
//!
//! Daily spend-limit evaluation for recurring purchases.
//!
//! - `TradeSpec`: one (account, asset) allocation, amounts in integer micros
//! - `evaluate`: ALLOW / DENY a new purchase given today's recorded spend
//!
//! Deterministic, pure logic. No IO, no clock, no exchange calls. Callers
//! supply the day id and the recent records.

mod engine;
mod types;

pub use engine::{evaluate, todays_total, validate_entry};
pub use types::*;
