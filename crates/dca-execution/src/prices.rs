//! Integer-micros quote amounts at the wire boundary.
//!
//! Amounts stay `i64` micros (1 unit = 1_000_000 micros) everywhere inside the
//! engine. Conversion to and from decimal strings is exact; no `f64` is
//! involved, so "33.3" never becomes 33.299999.

/// Scale factor: 1 quote unit = 1_000_000 micros (6 decimal places).
pub const MICROS_PER_UNIT: i64 = 1_000_000;

const MAX_FRACTION_DIGITS: usize = 6;

/// Errors returned by [`parse_decimal_to_micros`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// Not a plain decimal number (`123`, `12.5`, `-0.25`).
    Malformed(String),
    /// More than six fractional digits.
    TooPrecise(String),
    /// Does not fit in `i64` micros.
    OutOfRange(String),
}

impl std::fmt::Display for PricingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PricingError::Malformed(s) => write!(f, "not a decimal amount: {s:?}"),
            PricingError::TooPrecise(s) => {
                write!(f, "amount {s:?} has more than {MAX_FRACTION_DIGITS} decimal places")
            }
            PricingError::OutOfRange(s) => write!(f, "amount {s:?} out of range"),
        }
    }
}

impl std::error::Error for PricingError {}

/// Render micros as a decimal string with at least one fractional digit.
///
/// `25_000_000 -> "25.0"`, `33_300_000 -> "33.3"`, `1_234_567 -> "1.234567"`.
pub fn format_micros(micros: i64) -> String {
    let sign = if micros < 0 { "-" } else { "" };
    let abs = micros.unsigned_abs();
    let scale = MICROS_PER_UNIT.unsigned_abs();
    let whole = abs / scale;
    let frac = abs % scale;

    let mut frac_str = format!("{frac:06}");
    while frac_str.len() > 1 && frac_str.ends_with('0') {
        frac_str.pop();
    }
    format!("{sign}{whole}.{frac_str}")
}

/// Parse a decimal string into micros exactly.
pub fn parse_decimal_to_micros(input: &str) -> Result<i64, PricingError> {
    let s = input.trim();
    let malformed = || PricingError::Malformed(input.to_string());
    let out_of_range = || PricingError::OutOfRange(input.to_string());

    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };

    let (whole, frac) = match body.split_once('.') {
        Some((w, f)) => (w, f),
        None => (body, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(malformed());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(malformed());
    }
    if frac.len() > MAX_FRACTION_DIGITS {
        return Err(PricingError::TooPrecise(input.to_string()));
    }

    let whole_val: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| out_of_range())?
    };
    let frac_val: i64 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{frac:0<width$}", width = MAX_FRACTION_DIGITS);
        padded.parse().map_err(|_| malformed())?
    };

    let micros = whole_val
        .checked_mul(MICROS_PER_UNIT)
        .and_then(|w| w.checked_add(frac_val))
        .ok_or_else(out_of_range)?;

    Ok(if negative { -micros } else { micros })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_keeps_one_decimal_for_whole_amounts() {
        assert_eq!(format_micros(25_000_000), "25.0");
        assert_eq!(format_micros(0), "0.0");
    }

    #[test]
    fn format_trims_trailing_zeros() {
        assert_eq!(format_micros(33_300_000), "33.3");
        assert_eq!(format_micros(1_234_567), "1.234567");
        assert_eq!(format_micros(500_000), "0.5");
    }

    #[test]
    fn format_negative() {
        assert_eq!(format_micros(-1_500_000), "-1.5");
    }

    #[test]
    fn parse_plain_and_fractional() {
        assert_eq!(parse_decimal_to_micros("100").unwrap(), 100_000_000);
        assert_eq!(parse_decimal_to_micros("12.5").unwrap(), 12_500_000);
        assert_eq!(parse_decimal_to_micros(".25").unwrap(), 250_000);
        assert_eq!(parse_decimal_to_micros("0.000001").unwrap(), 1);
        assert_eq!(parse_decimal_to_micros(" 7. ").unwrap(), 7_000_000);
        assert_eq!(parse_decimal_to_micros("-2.5").unwrap(), -2_500_000);
    }

    #[test]
    fn parse_rejects_garbage() {
        for bad in ["", ".", "abc", "1.2.3", "1e5", "--1", "1,5"] {
            assert!(
                matches!(parse_decimal_to_micros(bad), Err(PricingError::Malformed(_))),
                "{bad:?} should be malformed"
            );
        }
    }

    #[test]
    fn parse_rejects_excess_precision() {
        assert!(matches!(
            parse_decimal_to_micros("0.0000001"),
            Err(PricingError::TooPrecise(_))
        ));
    }

    #[test]
    fn parse_rejects_overflow() {
        assert!(matches!(
            parse_decimal_to_micros("9223372036854775807"),
            Err(PricingError::OutOfRange(_))
        ));
    }
}
