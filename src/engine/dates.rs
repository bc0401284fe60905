//! Date primitives: flexible parsing and calendar-day normalization.
//!
//! Every stored date is reduced to a plain calendar day (`NaiveDate`) at the
//! deserialization boundary, so the engine compares and subtracts days without
//! any timezone noise.

use super::error::DateError;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use serde::{de, Deserialize, Deserializer};

/// The primary layout for dates typed by users.
pub const DMY_FORMAT: &str = "%d/%m/%Y";

/// Parses a date string.
///
/// `DD/MM/YYYY` wins only when it reproduces the input exactly; anything else
/// goes through the general fallbacks (ISO date, RFC 3339, naive ISO
/// date-time, `MM/DD/YYYY`).
///
/// # Errors
/// Returns `DateError::Unparseable` when no layout matches.
pub fn parse_flexible(input: &str) -> Result<NaiveDate, DateError> {
    if let Ok(date) = NaiveDate::parse_from_str(input, DMY_FORMAT) {
        if date.format(DMY_FORMAT).to_string() == input {
            return Ok(date);
        }
    }
    parse_general(input.trim()).ok_or_else(|| DateError::Unparseable(input.to_string()))
}

fn parse_general(input: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(stamp) = DateTime::parse_from_rfc3339(input) {
        return Some(normalize_day(&stamp));
    }
    if let Ok(stamp) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(stamp.date());
    }
    NaiveDate::parse_from_str(input, "%m/%d/%Y").ok()
}

/// Pins a timestamp to its local calendar day.
#[must_use]
pub fn normalize_day<Tz: TimeZone>(stamp: &DateTime<Tz>) -> NaiveDate {
    stamp.with_timezone(&Local).date_naive()
}

/// Converts epoch milliseconds to the local calendar day.
///
/// # Errors
/// Returns `DateError::OutOfRange` for timestamps chrono cannot represent.
pub fn from_epoch_millis(millis: i64) -> Result<NaiveDate, DateError> {
    DateTime::from_timestamp_millis(millis)
        .map(|stamp| normalize_day(&stamp))
        .ok_or(DateError::OutOfRange(millis))
}

/// The current local calendar day.
#[must_use]
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDate {
    Millis(i64),
    Text(String),
}

/// Serde adapter for optional date fields.
///
/// Null, missing and empty strings all read as `None`.
///
/// # Errors
/// Fails deserialization when a non-empty value cannot be parsed.
pub fn deserialize_flexible<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawDate>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawDate::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(RawDate::Text(text)) => parse_flexible(&text).map(Some).map_err(de::Error::custom),
        Some(RawDate::Millis(millis)) => from_epoch_millis(millis).map(Some).map_err(de::Error::custom),
    }
}
