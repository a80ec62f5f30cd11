//! Recognition of date, time and timestamp strings.
//!
//! Accepted shapes, none of which carry a timezone:
//!
//! ```text
//! YYYY-MM-DD                          date
//! HH:MM | HH:MM:SS[.fffffffff]        time
//! YYYY-MM-DD[T| ]HH[:MM[:SS[.fff]]]   timestamp
//! ```
//!
//! The number of fractional digits picks the unit: none is seconds, up to 3
//! milliseconds, up to 6 microseconds, up to 10 nanoseconds. Anything longer
//! is rejected rather than truncated.

use crate::error::TemporalParseError;
use arrow::datatypes::TimeUnit;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Longest fractional-seconds field accepted.
pub const MAX_FRACTION_DIGITS: usize = 10;

static DATE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").unwrap()
});

static TIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2}):(\d{2})(?::(\d{2})(?:\.(\d+))?)?$").unwrap()
});

static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2})[T ](\d{2})(?::(\d{2})(?::(\d{2})(?:\.(\d+))?)?)?$")
        .unwrap()
});

/// Outcome of classifying one string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Temporal {
    NotTemporal,
    Date,
    Time(TimeUnit),
    Timestamp(TimeUnit),
}

/// Classify a string value as a date, time or timestamp.
pub fn classify(value: &str) -> Result<Temporal, TemporalParseError> {
    let len = value.len();

    // Every accepted shape starts with two digits and is at least 5 bytes
    if !(5..=40).contains(&len) || !value.as_bytes()[0].is_ascii_digit() {
        return Ok(Temporal::NotTemporal);
    }

    if len == 10 {
        if let Some(caps) = DATE_REGEX.captures(value) {
            check_date(&caps, 1)?;
            return Ok(Temporal::Date);
        }
    }

    if len > 10 && value.as_bytes()[4] == b'-' {
        if let Some(caps) = TIMESTAMP_REGEX.captures(value) {
            check_date(&caps, 1)?;
            check_clock(&caps, 4)?;
            let unit = fraction_unit(caps.get(7).map(|m| m.as_str()))?;
            return Ok(Temporal::Timestamp(unit));
        }
        return Ok(Temporal::NotTemporal);
    }

    if value.as_bytes()[2] == b':' {
        if let Some(caps) = TIME_REGEX.captures(value) {
            check_clock(&caps, 1)?;
            let unit = fraction_unit(caps.get(4).map(|m| m.as_str()))?;
            return Ok(Temporal::Time(unit));
        }
    }

    Ok(Temporal::NotTemporal)
}

/// Hour-only timestamps (`YYYY-MM-DDTHH`) with zero minutes appended.
///
/// Arrow's timestamp parser needs at least `HH:MM`, so materialization
/// completes these before decoding. Returns `None` for every other string.
pub fn complete_hour_only(value: &str) -> Option<String> {
    if value.len() == 13 && TIMESTAMP_REGEX.is_match(value) {
        Some(format!("{}:00", value))
    } else {
        None
    }
}

/// Unit needed to hold a fractional-seconds field without truncation.
fn fraction_unit(fraction: Option<&str>) -> Result<TimeUnit, TemporalParseError> {
    let digits = fraction.map_or(0, str::len);
    match digits {
        0 => Ok(TimeUnit::Second),
        1..=3 => Ok(TimeUnit::Millisecond),
        4..=6 => Ok(TimeUnit::Microsecond),
        7..=MAX_FRACTION_DIGITS => Ok(TimeUnit::Nanosecond),
        _ => Err(TemporalParseError::FractionTooLong {
            digits,
            max: MAX_FRACTION_DIGITS,
        }),
    }
}

fn component(caps: &Captures, index: usize) -> Option<u32> {
    caps.get(index).and_then(|m| m.as_str().parse().ok())
}

fn check_range(
    component_name: &'static str,
    value: Option<u32>,
    min: u32,
    max: u32,
) -> Result<(), TemporalParseError> {
    match value {
        Some(v) if v < min || v > max => Err(TemporalParseError::OutOfRange {
            component: component_name,
            value: v,
        }),
        _ => Ok(()),
    }
}

fn check_date(caps: &Captures, first: usize) -> Result<(), TemporalParseError> {
    check_range("month", component(caps, first + 1), 1, 12)?;
    check_range("day", component(caps, first + 2), 1, 31)
}

fn check_clock(caps: &Captures, first: usize) -> Result<(), TemporalParseError> {
    check_range("hour", component(caps, first), 0, 23)?;
    check_range("minute", component(caps, first + 1), 0, 59)?;
    check_range("second", component(caps, first + 2), 0, 59)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date() {
        assert_eq!(classify("2021-01-01"), Ok(Temporal::Date));
        assert_eq!(classify("2021-12-31"), Ok(Temporal::Date));
    }

    #[test]
    fn test_time_precision() {
        assert_eq!(classify("12:30"), Ok(Temporal::Time(TimeUnit::Second)));
        assert_eq!(classify("12:30:15"), Ok(Temporal::Time(TimeUnit::Second)));
        assert_eq!(classify("12:30:15.123"), Ok(Temporal::Time(TimeUnit::Millisecond)));
        assert_eq!(classify("12:30:15.1234"), Ok(Temporal::Time(TimeUnit::Microsecond)));
        assert_eq!(
            classify("12:30:15.1234567890"),
            Ok(Temporal::Time(TimeUnit::Nanosecond))
        );
    }

    #[test]
    fn test_fraction_too_long() {
        assert_eq!(
            classify("12:30:15.12345678901"),
            Err(TemporalParseError::FractionTooLong { digits: 11, max: 10 })
        );
    }

    #[test]
    fn test_timestamp_shapes() {
        assert_eq!(classify("2024-03-01T09"), Ok(Temporal::Timestamp(TimeUnit::Second)));
        assert_eq!(classify("2024-03-01T09:15"), Ok(Temporal::Timestamp(TimeUnit::Second)));
        assert_eq!(classify("2024-03-01 09:15:30"), Ok(Temporal::Timestamp(TimeUnit::Second)));
        assert_eq!(
            classify("2024-03-01T09:15:30.000001"),
            Ok(Temporal::Timestamp(TimeUnit::Microsecond))
        );
    }

    #[test]
    fn test_timezone_not_accepted() {
        assert_eq!(classify("2024-03-01T09:15:30Z"), Ok(Temporal::NotTemporal));
        assert_eq!(classify("2024-03-01T09:15:30+02:00"), Ok(Temporal::NotTemporal));
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(
            classify("2024-13-01"),
            Err(TemporalParseError::OutOfRange { component: "month", value: 13 })
        );
        assert_eq!(
            classify("25:00"),
            Err(TemporalParseError::OutOfRange { component: "hour", value: 25 })
        );
    }

    #[test]
    fn test_not_temporal() {
        assert_eq!(classify("hello"), Ok(Temporal::NotTemporal));
        assert_eq!(classify("1234567"), Ok(Temporal::NotTemporal));
        assert_eq!(classify(""), Ok(Temporal::NotTemporal));
        assert_eq!(classify("alice@example.com"), Ok(Temporal::NotTemporal));
    }

    #[test]
    fn test_complete_hour_only() {
        assert_eq!(complete_hour_only("2024-03-01T09"), Some("2024-03-01T09:00".to_string()));
        assert_eq!(complete_hour_only("2024-03-01 23"), Some("2024-03-01 23:00".to_string()));
        assert_eq!(complete_hour_only("2024-03-01T09:30"), None);
        assert_eq!(complete_hour_only("2024-03-01"), None);
        assert_eq!(complete_hour_only("not a timestamp"), None);
    }
}
