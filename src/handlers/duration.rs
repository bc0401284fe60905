//! Handler for the `duration` command.

use anyhow::{Context, Result};
use colored::Colorize;
use wbs_rollup::engine::calendar::WorkCalendar;
use wbs_rollup::engine::dates::parse_flexible;
use wbs_rollup::engine::duration::{duration_between, DurationUnit};
use wbs_rollup::engine::types::{HolidayEvent, ProjectCalendar};

/// Prints the working duration between two dates.
///
/// # Errors
/// Returns error if a date or holiday cannot be parsed.
pub fn handle(
    from: &str,
    to: &str,
    unit: DurationUnit,
    week_offs: &[String],
    holidays: &[String],
) -> Result<()> {
    let start = parse_flexible(from).with_context(|| format!("invalid start date '{from}'"))?;
    let end = parse_flexible(to).with_context(|| format!("invalid end date '{to}'"))?;

    let holiday_events = holidays
        .iter()
        .map(|h| {
            parse_flexible(h)
                .map(|d| HolidayEvent { start_date: Some(d) })
                .with_context(|| format!("invalid holiday '{h}'"))
        })
        .collect::<Result<Vec<_>>>()?;
    let calendar = WorkCalendar::from_project(&ProjectCalendar {
        weekends: week_offs.to_vec(),
        holiday_events,
    });

    match duration_between(Some(start), Some(end), &calendar, unit) {
        Some(value) => println!("{value} {unit}"),
        None => println!("{} end date is before start date; no duration", "✗".red()),
    }
    Ok(())
}
