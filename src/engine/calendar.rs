//! Working Calendar: which days count toward a duration.

use super::types::ProjectCalendar;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeSet;
use tracing::warn;

/// Non-working weekdays and holidays of one project.
///
/// Weekdays are stored as ordinals, 0 = Sunday through 6 = Saturday.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkCalendar {
    week_offs: BTreeSet<u32>,
    holidays: BTreeSet<NaiveDate>,
}

impl WorkCalendar {
    /// A calendar where every day is a working day.
    #[must_use]
    pub fn all_working() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn new(week_offs: impl IntoIterator<Item = u32>, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            week_offs: week_offs.into_iter().filter(|d| *d < 7).collect(),
            holidays: holidays.into_iter().collect(),
        }
    }

    /// Resolves a project calendar. Unknown weekday names are ignored.
    #[must_use]
    pub fn from_project(calendar: &ProjectCalendar) -> Self {
        let week_offs = calendar.weekends.iter().filter_map(|name| {
            let ordinal = weekday_ordinal(name);
            if ordinal.is_none() {
                warn!(weekday = %name, "ignoring unknown weekday name in project calendar");
            }
            ordinal
        });
        let holidays = calendar.holiday_events.iter().filter_map(|e| e.start_date);
        Self::new(week_offs, holidays)
    }

    /// Builds from an optional calendar; absence means nothing is excluded.
    #[must_use]
    pub fn from_optional(calendar: Option<&ProjectCalendar>) -> Self {
        calendar.map_or_else(Self::all_working, Self::from_project)
    }

    #[must_use]
    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    #[must_use]
    pub fn is_week_off(&self, date: NaiveDate) -> bool {
        self.week_offs.contains(&date.weekday().num_days_from_sunday())
    }

    #[must_use]
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        !self.is_holiday(date) && !self.is_week_off(date)
    }
}

/// Maps an English weekday name to its Sunday-based ordinal.
#[must_use]
pub fn weekday_ordinal(name: &str) -> Option<u32> {
    match name {
        "Sunday" => Some(0),
        "Monday" => Some(1),
        "Tuesday" => Some(2),
        "Wednesday" => Some(3),
        "Thursday" => Some(4),
        "Friday" => Some(5),
        "Saturday" => Some(6),
        _ => None,
    }
}
