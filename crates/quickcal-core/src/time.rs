//! Parsing of user-entered times and durations.
//!
//! Timestamps are accepted either as RFC 3339 (`2025-01-02T09:00:00Z`) or as
//! a local wall-clock time (`2025-01-02 09:00`). Durations accept bare
//! minutes (`90`) or unit suffixes (`15m`, `1h`, `1h30m`).

use chrono::{DateTime, Duration, Local, LocalResult, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

/// Errors from parsing times and durations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeParseError {
    #[error("invalid date/time '{0}': expected RFC 3339 or 'YYYY-MM-DD HH:MM'")]
    InvalidDateTime(String),

    #[error("'{0}' does not exist in the local time zone")]
    NonexistentLocalTime(String),

    #[error("invalid duration '{0}': expected minutes or a value like 1h30m")]
    InvalidDuration(String),
}

const LOCAL_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
];

/// Parses a timestamp, interpreting zone-less input in the local time zone.
pub fn parse_when(input: &str) -> Result<DateTime<Utc>, TimeParseError> {
    parse_when_in(input, &Local)
}

/// Parses a timestamp, interpreting zone-less input in `tz`.
pub fn parse_when_in<Tz: TimeZone>(input: &str, tz: &Tz) -> Result<DateTime<Utc>, TimeParseError> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .ok_or_else(|| TimeParseError::InvalidDateTime(input.to_string()))?;

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        // Ambiguous during a DST fall-back: take the earlier instant.
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => Err(TimeParseError::NonexistentLocalTime(input.to_string())),
    }
}

/// Parses a duration such as `45`, `45m`, `2h` or `1h30m`.
pub fn parse_duration(input: &str) -> Result<Duration, TimeParseError> {
    let trimmed = input.trim().to_ascii_lowercase();
    let invalid = || TimeParseError::InvalidDuration(input.trim().to_string());

    if trimmed.is_empty() {
        return Err(invalid());
    }

    if let Ok(minutes) = trimmed.parse::<i64>() {
        return Duration::try_minutes(minutes).ok_or_else(invalid);
    }

    let mut total = Duration::zero();
    let mut digits = String::new();
    for c in trimmed.chars() {
        match c {
            '0'..='9' => digits.push(c),
            'h' | 'm' | 's' => {
                let value: i64 = digits.parse().map_err(|_| invalid())?;
                digits.clear();
                let part = match c {
                    'h' => Duration::try_hours(value),
                    'm' => Duration::try_minutes(value),
                    _ => Duration::try_seconds(value),
                }
                .ok_or_else(invalid)?;
                total = total.checked_add(&part).ok_or_else(invalid)?;
            }
            ' ' => {}
            _ => return Err(invalid()),
        }
    }

    if !digits.is_empty() {
        return Err(invalid());
    }
    Ok(total)
}
