use crate::{LimitAction, LimitDecision, LimitInput, ReasonCode, SpendEntry, TradeSpec};

// ---------------------------------------------------------------------------
// Sanity clamps
// ---------------------------------------------------------------------------

/// Guard: recorded amounts must be ≥ 0.
///
/// A negative amount would silently lower today's total and let a new order
/// through, so it is treated as bad input that denies deterministically.
pub fn validate_entry(entry: &SpendEntry) -> Option<LimitDecision> {
    if entry.quote_micros < 0 {
        return Some(bad_input());
    }
    None
}

fn bad_input() -> LimitDecision {
    LimitDecision {
        action: LimitAction::Deny,
        reason: ReasonCode::BadInput,
        todays_total_micros: 0,
        remaining_micros: 0,
    }
}

// ---------------------------------------------------------------------------
// Core evaluator
// ---------------------------------------------------------------------------

/// Sum of amounts recorded on `today`.
///
/// Returns `None` on a negative amount or i64 overflow; callers fail closed.
pub fn todays_total(today: u32, recent: &[SpendEntry]) -> Option<i64> {
    recent
        .iter()
        .filter(|e| e.day_id == today)
        .try_fold(0i64, |acc, e| {
            if e.quote_micros < 0 {
                return None;
            }
            acc.checked_add(e.quote_micros)
        })
}

/// Decide whether one more purchase may be staged today.
///
/// Pessimistic: every record created today counts, whatever its final status.
/// Deny when `todays_total >= daily_target`; the order that would cross the
/// limit is denied outright, never shrunk to fit.
pub fn evaluate(spec: &TradeSpec, inp: &LimitInput<'_>) -> LimitDecision {
    // 0) Sanity clamp on every entry, including those from previous days.
    for entry in inp.recent {
        if let Some(bad) = validate_entry(entry) {
            return bad;
        }
    }

    let total = match todays_total(inp.today, inp.recent) {
        Some(t) => t,
        None => return bad_input(),
    };

    let target = spec.daily_target_micros();
    let remaining = target.saturating_sub(total).max(0);

    if total >= target {
        return LimitDecision {
            action: LimitAction::Deny,
            reason: ReasonCode::DailyTargetDepositReached,
            todays_total_micros: total,
            remaining_micros: remaining,
        };
    }

    LimitDecision {
        action: LimitAction::Allow,
        reason: ReasonCode::Allowed,
        todays_total_micros: total,
        remaining_micros: remaining,
    }
}
