//! Duration Calculator: elapsed working time between two calendar days.

use super::calendar::WorkCalendar;
use chrono::{Days, NaiveDate};
use std::fmt;
use std::str::FromStr;

pub const HOURS_PER_DAY: f64 = 8.0;
pub const DAYS_PER_MONTH: f64 = 30.0;

/// Unit a project expresses durations in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationUnit {
    Hours,
    Days,
    Months,
}

impl DurationUnit {
    /// Converts a count of working days into this unit.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn express_days(self, days: i64) -> f64 {
        let days = days as f64;
        match self {
            Self::Hours => days * HOURS_PER_DAY,
            Self::Days => days,
            Self::Months => round_half_up(days / DAYS_PER_MONTH, 2),
        }
    }
}

impl FromStr for DurationUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hours" => Ok(Self::Hours),
            "days" => Ok(Self::Days),
            "months" => Ok(Self::Months),
            other => Err(format!("unknown duration unit '{other}'")),
        }
    }
}

impl fmt::Display for DurationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hours => write!(f, "hours"),
            Self::Days => write!(f, "days"),
            Self::Months => write!(f, "months"),
        }
    }
}

/// Inclusive count of working days from `start` to `end`.
///
/// The start day itself is always counted; every later day up to and
/// including `end` is dropped when it is a holiday or a week-off. Returns
/// `None` when `end` is before `start`.
#[must_use]
pub fn working_days(start: NaiveDate, end: NaiveDate, calendar: &WorkCalendar) -> Option<i64> {
    let raw_diff = end.signed_duration_since(start).num_days();
    if raw_diff < 0 {
        return None;
    }
    let excluded = (1..=raw_diff.unsigned_abs())
        .filter_map(|step| start.checked_add_days(Days::new(step)))
        .filter(|day| !calendar.is_working_day(*day))
        .count();
    let excluded = i64::try_from(excluded).unwrap_or(raw_diff);
    Some(raw_diff - excluded + 1)
}

/// Working duration in `unit`, or `None` when either side is missing or the range is reversed.
#[must_use]
pub fn duration_between(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    calendar: &WorkCalendar,
    unit: DurationUnit,
) -> Option<f64> {
    let (start, end) = (start?, end?);
    working_days(start, end, calendar).map(|days| unit.express_days(days))
}

/// Rounds half up to `places` decimals.
#[must_use]
pub fn round_half_up(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale + 0.5).floor() / scale
}
