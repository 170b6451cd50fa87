/// 1e-6 fixed-point scale for quote-currency amounts.
pub const MICROS_SCALE: i64 = 1_000_000;

/// Per-order amounts are rounded to one decimal place (0.1 quote units).
const TENTH_MICROS: i64 = MICROS_SCALE / 10;

/// Minimum number of most-recent records fetched per daily order slot.
///
/// Fetching `2 × daily_frequency` rows keeps today's records inside the window
/// even right after the frequency was raised.
pub const RECENT_WINDOW_PER_SLOT: usize = 2;

// ---------------------------------------------------------------------------
// SpecError
// ---------------------------------------------------------------------------

/// Reasons a [`TradeSpec`] cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    EmptyAsset,
    ZeroFrequency,
    NonPositiveTarget { daily_target_micros: i64 },
    /// `daily_target / daily_frequency` rounds to 0.0.
    PerOrderAmountZero {
        daily_target_micros: i64,
        daily_frequency: u32,
    },
}

impl std::fmt::Display for SpecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpecError::EmptyAsset => write!(f, "trade spec: asset id is empty"),
            SpecError::ZeroFrequency => write!(f, "trade spec: daily_frequency must be > 0"),
            SpecError::NonPositiveTarget {
                daily_target_micros,
            } => write!(
                f,
                "trade spec: daily target must be > 0 (got {daily_target_micros} micros)"
            ),
            SpecError::PerOrderAmountZero {
                daily_target_micros,
                daily_frequency,
            } => write!(
                f,
                "trade spec: per-order amount rounds to zero \
                 (target={daily_target_micros} micros, frequency={daily_frequency})"
            ),
        }
    }
}

impl std::error::Error for SpecError {}

// ---------------------------------------------------------------------------
// TradeSpec
// ---------------------------------------------------------------------------

/// One recurring purchase allocation for an (account, asset) pair.
///
/// Immutable once built; every constructor path goes through [`TradeSpec::new`]
/// so `daily_frequency > 0` always holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TradeSpec {
    asset: String,
    daily_frequency: u32,
    daily_target_micros: i64,
}

impl TradeSpec {
    pub fn new(
        asset: impl Into<String>,
        daily_frequency: u32,
        daily_target_micros: i64,
    ) -> Result<Self, SpecError> {
        let asset = asset.into();
        if asset.trim().is_empty() {
            return Err(SpecError::EmptyAsset);
        }
        if daily_frequency == 0 {
            return Err(SpecError::ZeroFrequency);
        }
        if daily_target_micros <= 0 {
            return Err(SpecError::NonPositiveTarget {
                daily_target_micros,
            });
        }
        if per_order_micros(daily_target_micros, daily_frequency) == 0 {
            return Err(SpecError::PerOrderAmountZero {
                daily_target_micros,
                daily_frequency,
            });
        }
        Ok(Self {
            asset,
            daily_frequency,
            daily_target_micros,
        })
    }

    pub fn asset(&self) -> &str {
        &self.asset
    }

    pub fn daily_frequency(&self) -> u32 {
        self.daily_frequency
    }

    /// Daily spend cap in quote-currency micros.
    pub fn daily_target_micros(&self) -> i64 {
        self.daily_target_micros
    }

    /// Quote amount of a single purchase, rounded to one decimal place.
    pub fn per_order_micros(&self) -> i64 {
        per_order_micros(self.daily_target_micros, self.daily_frequency)
    }

    /// How many most-recent records the staging query must fetch.
    pub fn recent_window(&self) -> usize {
        RECENT_WINDOW_PER_SLOT.saturating_mul(self.daily_frequency as usize)
    }
}

/// `round(target / frequency, 1 decimal)` in exact integer arithmetic.
///
/// Exact halves round to the even tenth (2.25 -> 2.2, 2.35 -> 2.4), the same
/// as Python's `round`. Inputs are validated positive by the caller; the
/// computation is widened to i128 so no intermediate can overflow.
fn per_order_micros(daily_target_micros: i64, daily_frequency: u32) -> i64 {
    if daily_frequency == 0 {
        return 0;
    }
    let target = i128::from(daily_target_micros);
    let denom = i128::from(daily_frequency) * i128::from(TENTH_MICROS);
    let mut tenths = target.div_euclid(denom);
    let twice_rem = 2 * target.rem_euclid(denom);
    if twice_rem > denom || (twice_rem == denom && tenths % 2 != 0) {
        tenths += 1;
    }
    (tenths * i128::from(TENTH_MICROS)) as i64
}

// ---------------------------------------------------------------------------
// Evaluator input / output
// ---------------------------------------------------------------------------

/// One previously recorded purchase, as seen by the evaluator.
///
/// `day_id` is the UTC calendar day of the record's creation time
/// (`YYYYMMDD`), supplied by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpendEntry {
    pub day_id: u32,
    pub quote_micros: i64,
}

impl SpendEntry {
    pub fn new(day_id: u32, quote_micros: i64) -> Self {
        Self {
            day_id,
            quote_micros,
        }
    }
}

/// Inputs for one limit evaluation.
#[derive(Clone, Copy, Debug)]
pub struct LimitInput<'a> {
    /// Deterministic day id (`YYYYMMDD`) of "now", provided by the caller.
    pub today: u32,
    /// Recent records for the pair, most-recent-first.
    pub recent: &'a [SpendEntry],
}

/// Actions the evaluator can mandate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LimitAction {
    Allow,
    Deny,
}

/// Reason codes for decisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReasonCode {
    Allowed,
    DailyTargetDepositReached,
    /// A recorded amount was negative or the running total overflowed.
    BadInput,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::Allowed => "ALLOWED",
            ReasonCode::DailyTargetDepositReached => "DAILY_TARGET_DEPOSIT_REACHED",
            ReasonCode::BadInput => "BAD_INPUT",
        }
    }
}

/// Evaluator output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LimitDecision {
    pub action: LimitAction,
    pub reason: ReasonCode,
    /// Sum of today's recorded amounts (0 when the input was rejected).
    pub todays_total_micros: i64,
    /// `daily_target - todays_total`, floored at 0.
    pub remaining_micros: i64,
}

impl LimitDecision {
    pub fn is_allowed(&self) -> bool {
        self.action == LimitAction::Allow
    }
}
