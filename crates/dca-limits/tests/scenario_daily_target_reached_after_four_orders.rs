//! Scenario: target=100, frequency=4 ⇒ four 25.0 purchases fit, the fifth is denied.
//!
//! # Invariants under test
//! 1. Per-order amount is 25.0.
//! 2. Each of the first four evaluations allows, with `remaining` shrinking by 25.0.
//! 3. The fifth evaluation (total == target) denies with DailyTargetDepositReached.
//! 4. The staged sum never exceeds the target.
//!
//! Pure in-process; no DB or network required.

use dca_limits::*;

const M: i64 = MICROS_SCALE;
const TODAY: u32 = 20261019;

#[test]
fn scenario_four_orders_allowed_fifth_denied() {
    let spec = TradeSpec::new("BTC-USD", 4, 100 * M).unwrap();
    assert_eq!(spec.per_order_micros(), 25 * M);

    // Most-recent-first, like the ledger query.
    let mut recent: Vec<SpendEntry> = Vec::new();

    for i in 0..4 {
        let d = evaluate(
            &spec,
            &LimitInput {
                today: TODAY,
                recent: &recent,
            },
        );
        assert_eq!(d.action, LimitAction::Allow, "order {} must be allowed", i + 1);
        assert_eq!(d.todays_total_micros, i * 25 * M);
        assert_eq!(d.remaining_micros, 100 * M - i * 25 * M);

        recent.insert(0, SpendEntry::new(TODAY, spec.per_order_micros()));
    }

    let d5 = evaluate(
        &spec,
        &LimitInput {
            today: TODAY,
            recent: &recent,
        },
    );
    assert_eq!(d5.action, LimitAction::Deny);
    assert_eq!(d5.reason, ReasonCode::DailyTargetDepositReached);
    assert_eq!(d5.todays_total_micros, 100 * M);

    let staged: i64 = recent.iter().map(|e| e.quote_micros).sum();
    assert!(staged <= spec.daily_target_micros());
}

#[test]
fn scenario_rounded_amounts_overshoot_by_at_most_one_order() {
    // 10 / 3 = 3.333.. -> 3.3 per order; 3 orders = 9.9 < 10, so a 4th is
    // allowed and the day closes at 13.2: over target, but by less than one
    // per-order increment beyond the point the limit was last checked.
    let spec = TradeSpec::new("ETH-USD", 3, 10 * M).unwrap();
    let per = spec.per_order_micros();
    assert_eq!(per, 3_300_000);

    let mut recent: Vec<SpendEntry> = Vec::new();
    let mut allowed = 0;
    loop {
        let d = evaluate(
            &spec,
            &LimitInput {
                today: TODAY,
                recent: &recent,
            },
        );
        if !d.is_allowed() {
            assert_eq!(d.reason, ReasonCode::DailyTargetDepositReached);
            break;
        }
        allowed += 1;
        recent.insert(0, SpendEntry::new(TODAY, per));
        assert!(allowed < 100, "evaluator never denied");
    }

    assert_eq!(allowed, 4);
    let staged: i64 = recent.iter().map(|e| e.quote_micros).sum();
    assert!(staged < spec.daily_target_micros() + per);
}
