// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/mr-prefilter)

//! Interval literals and their conversion to fixed widths.
//!
//! Window bounds on timestamp columns are written as SQL interval literals
//! (`INTERVAL '30' MINUTE`). Bucketing needs the bound as a fixed number of
//! seconds, so intervals are normalized to microseconds first. Month and
//! year intervals are ambiguous (28-31 days, leap years) and have no fixed
//! width; conversion returns `None` for them.

use std::fmt;

/// Microseconds per second.
pub const MICROS_PER_SECOND: i64 = 1_000_000;

/// Microseconds per minute.
pub const MICROS_PER_MINUTE: i64 = 60 * MICROS_PER_SECOND;

/// Microseconds per hour.
pub const MICROS_PER_HOUR: i64 = 60 * MICROS_PER_MINUTE;

/// Microseconds per day (`24 * 60 * 60 * 1_000_000`).
pub const MICROS_PER_DAY: i64 = 24 * MICROS_PER_HOUR;

/// Unit of an interval literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalUnit {
    /// `YEAR`
    Year,
    /// `MONTH`
    Month,
    /// `DAY`
    Day,
    /// `HOUR`
    Hour,
    /// `MINUTE`
    Minute,
    /// `SECOND`
    Second,
}

impl IntervalUnit {
    /// Parses a unit keyword, singular or plural, case-insensitive.
    ///
    /// Returns `None` for unrecognized units.
    #[must_use]
    pub fn parse_unit_str(s: &str) -> Option<Self> {
        let lower = s.to_ascii_lowercase();
        let singular = lower.strip_suffix('s').unwrap_or(&lower);
        match singular {
            "year" => Some(Self::Year),
            "month" => Some(Self::Month),
            "day" => Some(Self::Day),
            "hour" => Some(Self::Hour),
            "minute" => Some(Self::Minute),
            "second" => Some(Self::Second),
            _ => None,
        }
    }

    /// Microseconds in one unit, or `None` for calendar units.
    #[must_use]
    pub const fn micros(self) -> Option<i64> {
        match self {
            Self::Year | Self::Month => None,
            Self::Day => Some(MICROS_PER_DAY),
            Self::Hour => Some(MICROS_PER_HOUR),
            Self::Minute => Some(MICROS_PER_MINUTE),
            Self::Second => Some(MICROS_PER_SECOND),
        }
    }

    const fn keyword(self) -> &'static str {
        match self {
            Self::Year => "YEAR",
            Self::Month => "MONTH",
            Self::Day => "DAY",
            Self::Hour => "HOUR",
            Self::Minute => "MINUTE",
            Self::Second => "SECOND",
        }
    }
}

/// An `INTERVAL '<amount>' <unit>` literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalLiteral {
    /// Amount as written, optionally signed and fractional (`30`, `-1.5`).
    pub amount: String,
    /// Unit keyword.
    pub unit: IntervalUnit,
}

impl IntervalLiteral {
    /// Creates an interval literal.
    #[must_use]
    pub fn new(amount: impl Into<String>, unit: IntervalUnit) -> Self {
        Self {
            amount: amount.into(),
            unit,
        }
    }

    /// Returns the interval length in microseconds.
    ///
    /// Returns `None` for month/year intervals, malformed amounts, or values
    /// that overflow `i64`. Sub-microsecond fractions are truncated.
    #[must_use]
    pub fn to_micros(&self) -> Option<i64> {
        decimal_to_micros(&self.amount, self.unit.micros()?)
    }
}

impl fmt::Display for IntervalLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "INTERVAL '{}' {}", self.amount, self.unit.keyword())
    }
}

/// Scales a decimal string like `"1.5"` by `unit_micros` without going
/// through floating point.
fn decimal_to_micros(amount: &str, unit_micros: i64) -> Option<i64> {
    let (negative, digits) = match amount.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, amount.strip_prefix('+').unwrap_or(amount)),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let whole: i128 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().ok()?
    };
    let mut micros = whole.checked_mul(i128::from(unit_micros))?;
    if !frac_part.is_empty() {
        // Up to 18 fractional digits keeps 10^n within i128 comfortably
        let frac_digits = &frac_part[..frac_part.len().min(18)];
        let frac: i128 = frac_digits.parse().ok()?;
        let scale = 10_i128.checked_pow(frac_digits.len() as u32)?;
        micros = micros.checked_add(frac.checked_mul(i128::from(unit_micros))? / scale)?;
    }
    if negative {
        micros = -micros;
    }
    i64::try_from(micros).ok()
}

/// Renders a microsecond count as a decimal number of seconds (`1800`, `1.5`).
#[must_use]
pub fn format_seconds(micros: i64) -> String {
    let sign = if micros < 0 { "-" } else { "" };
    let abs = micros.unsigned_abs();
    let per_second = MICROS_PER_SECOND.unsigned_abs();
    let whole = abs / per_second;
    let frac = abs % per_second;
    if frac == 0 {
        format!("{sign}{whole}")
    } else {
        let frac = format!("{frac:06}");
        format!("{sign}{whole}.{}", frac.trim_end_matches('0'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minutes_to_micros() {
        // 30 minutes = 30 * 60 * 1_000_000 = 1_800_000_000 microseconds
        let iv = IntervalLiteral::new("30", IntervalUnit::Minute);
        assert_eq!(iv.to_micros(), Some(1_800_000_000));
    }

    #[test]
    fn test_days_to_micros() {
        let iv = IntervalLiteral::new("1", IntervalUnit::Day);
        assert_eq!(iv.to_micros(), Some(MICROS_PER_DAY));
    }

    #[test]
    fn test_fractional_hours() {
        let iv = IntervalLiteral::new("1.5", IntervalUnit::Hour);
        assert_eq!(iv.to_micros(), Some(MICROS_PER_HOUR + MICROS_PER_HOUR / 2));
    }

    #[test]
    fn test_leading_dot_fraction() {
        let iv = IntervalLiteral::new(".5", IntervalUnit::Second);
        assert_eq!(iv.to_micros(), Some(500_000));
    }

    #[test]
    fn test_rejects_months_and_years() {
        assert_eq!(IntervalLiteral::new("1", IntervalUnit::Month).to_micros(), None);
        assert_eq!(IntervalLiteral::new("12", IntervalUnit::Month).to_micros(), None);
        assert_eq!(IntervalLiteral::new("1", IntervalUnit::Year).to_micros(), None);
    }

    #[test]
    fn test_zero() {
        assert_eq!(IntervalLiteral::new("0", IntervalUnit::Second).to_micros(), Some(0));
    }

    #[test]
    fn test_negative() {
        let iv = IntervalLiteral::new("-1", IntervalUnit::Second);
        assert_eq!(iv.to_micros(), Some(-1_000_000));
    }

    #[test]
    fn test_malformed_amounts() {
        for amount in ["", ".", "abc", "1.2.3", "1e3", "--1"] {
            let iv = IntervalLiteral::new(amount, IntervalUnit::Second);
            assert_eq!(iv.to_micros(), None, "amount {amount:?}");
        }
    }

    #[test]
    fn test_overflow_days() {
        // i64::MAX micros is about 106_751_991 days
        let iv = IntervalLiteral::new("200000000", IntervalUnit::Day);
        assert_eq!(iv.to_micros(), None);
    }

    #[test]
    fn test_unit_parsing() {
        assert_eq!(IntervalUnit::parse_unit_str("MINUTE"), Some(IntervalUnit::Minute));
        assert_eq!(IntervalUnit::parse_unit_str("minutes"), Some(IntervalUnit::Minute));
        assert_eq!(IntervalUnit::parse_unit_str("Hours"), Some(IntervalUnit::Hour));
        assert_eq!(IntervalUnit::parse_unit_str("fortnight"), None);
    }

    #[test]
    fn test_display_canonical_form() {
        let iv = IntervalLiteral::new("30", IntervalUnit::Minute);
        assert_eq!(iv.to_string(), "INTERVAL '30' MINUTE");
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(1_800_000_000), "1800");
        assert_eq!(format_seconds(1_500_000), "1.5");
        assert_eq!(format_seconds(1_000_001), "1.000001");
        assert_eq!(format_seconds(-2_000_000), "-2");
        assert_eq!(format_seconds(0), "0");
    }
}
