//! Human readable durations such as `15m`, `7 days` or `1.5h`.
//!
//! Token lifetimes are configured with these strings. A bare number is read
//! as milliseconds.

use chrono::Duration;
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

const MS_PER_SECOND: f64 = 1000.0;
const MS_PER_MINUTE: f64 = MS_PER_SECOND * 60.0;
const MS_PER_HOUR: f64 = MS_PER_MINUTE * 60.0;
const MS_PER_DAY: f64 = MS_PER_HOUR * 24.0;
const MS_PER_WEEK: f64 = MS_PER_DAY * 7.0;
const MS_PER_MONTH: f64 = MS_PER_DAY * 30.4375;
const MS_PER_YEAR: f64 = MS_PER_DAY * 365.25;

lazy_static! {
    static ref DURATION_REGEX: Regex = Regex::new(
        r"(?i)^(?P<value>-?(?:\d+)?\.?\d+)\s*(?P<unit>milliseconds?|msecs?|ms|seconds?|secs?|s|minutes?|mins?|mns?|m|hours?|hrs?|h|days?|d|weeks?|w|months?|mo|mth|years?|yrs?|y)?$"
    )
    .expect("duration regex is valid");
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationError {
    #[error("duration must be between 1 and 99 characters long")]
    Length,
    #[error("invalid duration: {0:?}")]
    Invalid(String),
}

fn unit_millis(unit: &str) -> Option<f64> {
    let millis = match unit.to_ascii_lowercase().as_str() {
        "years" | "year" | "yrs" | "yr" | "y" => MS_PER_YEAR,
        "months" | "month" | "mth" | "mo" => MS_PER_MONTH,
        "weeks" | "week" | "w" => MS_PER_WEEK,
        "days" | "day" | "d" => MS_PER_DAY,
        "hours" | "hour" | "hrs" | "hr" | "h" => MS_PER_HOUR,
        "minutes" | "minute" | "mins" | "min" | "mns" | "mn" | "m" => MS_PER_MINUTE,
        "seconds" | "second" | "secs" | "sec" | "s" => MS_PER_SECOND,
        "milliseconds" | "millisecond" | "msecs" | "msec" | "ms" | "" => 1.0,
        _ => return None,
    };
    Some(millis)
}

/// Parses a duration string into a `chrono::Duration`, truncated to whole milliseconds.
///
/// Negative values are accepted here; callers that need a positive lifetime check for it.
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    if input.is_empty() || input.len() >= 100 {
        return Err(DurationError::Length);
    }

    let invalid = || DurationError::Invalid(input.to_string());
    let captures = DURATION_REGEX.captures(input).ok_or_else(invalid)?;
    let value: f64 = captures["value"].parse().map_err(|_| invalid())?;
    let unit = captures.name("unit").map_or("", |m| m.as_str());
    let millis = value * unit_millis(unit).ok_or_else(invalid)?;

    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return Err(invalid());
    }
    Duration::try_milliseconds(millis as i64).ok_or_else(invalid)
}
