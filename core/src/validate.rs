//! Parameter checks run before any request is built.
//!
//! Each check either returns the normalised value or a `ValidationError`
//! naming the parameter, the offending value, and the constraint.

use std::fmt::Display;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::ValidationError;

/// Maximum length, in characters, of a status update or direct message.
pub const MAX_TEXT_CHARS: usize = 140;

/// Upper bound for `count`-style parameters.
pub const MAX_COUNT: u64 = 20;

const NAIVE_DATETIME_PATTERNS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Layout the service uses for `created_at`.
const SERVICE_DATETIME_PATTERN: &str = "%a %b %d %H:%M:%S %z %Y";

pub fn non_negative_integer<T>(name: &str, value: T) -> Result<u64, ValidationError>
where
    T: TryInto<u64> + Display + Copy,
{
    value.try_into().map_err(|_| {
        ValidationError::new(name, value.to_string(), "must be a non-negative integer")
    })
}

/// Checks `value <= max`.
pub fn at_most(name: &str, value: u64, max: u64) -> Result<u64, ValidationError> {
    if value > max {
        return Err(ValidationError::new(
            name,
            value.to_string(),
            format!("must be <= {max}"),
        ));
    }
    Ok(value)
}

/// Parses a date string into an absolute point in time (UTC when the input
/// carries no offset).
pub fn date(name: &str, value: &str) -> Result<DateTime<Utc>, ValidationError> {
    let trimmed = value.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(trimmed, SERVICE_DATETIME_PATTERN) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for pattern in NAIVE_DATETIME_PATTERNS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, pattern) {
            return Ok(parsed.and_utc());
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }

    Err(ValidationError::new(name, value, "must be a valid date string"))
}

/// Lower-cases `value` and checks it against `allowed`. The error lists the
/// allowed set.
pub fn one_of(name: &str, value: &str, allowed: &[&str]) -> Result<String, ValidationError> {
    let lowered = value.to_lowercase();
    if allowed.contains(&lowered.as_str()) {
        return Ok(lowered);
    }
    Err(ValidationError::new(
        name,
        lowered,
        format!("valid options include: {}", allowed.join(", ")),
    ))
}

/// Checks that `value` is at most `max` characters long.
pub fn max_chars(name: &str, value: &str, max: usize) -> Result<(), ValidationError> {
    let length = value.chars().count();
    if length > max {
        return Err(ValidationError::new(
            name,
            value,
            format!("may not exceed {max} characters (got {length})"),
        ));
    }
    Ok(())
}

/// Renders a date the way the service expects it in `since` parameters.
pub fn service_date(value: &DateTime<Utc>) -> String {
    value.format("%a %-d %b %Y %-H:%M:%S GMT").to_string()
}
