//! Human-readable tree output for aggregated records.

use chrono::NaiveDate;
use colored::{ColoredString, Colorize};
use wbs_rollup::engine::status::StatusIndex;
use wbs_rollup::engine::types::{AnalyticsRecord, StatusCategory, WorkbookRecord};

/// Prints a workbook as an indented tree, one block per leveled record.
pub fn print_workbook(records: &[WorkbookRecord], index: &StatusIndex) {
    println!("{} Workbook roll-up ({} records)", "📊".cyan(), records.len());

    for record in records {
        let Some(level) = record.level else {
            continue;
        };
        let indent = "  ".repeat(level.saturating_sub(1));
        let status = record.status.as_deref().unwrap_or("-");

        println!(
            "{indent}{} [{}] {} ({})",
            status_icon(index.category_of(status)),
            record.order_id.as_deref().unwrap_or("?").yellow(),
            record.id,
            status.dimmed()
        );
        println!(
            "{indent}    planned {} → {} {}   actual {} → {} {}",
            fmt_date(record.planned_from),
            fmt_date(record.planned_to),
            fmt_duration(record.planned_duration),
            fmt_date(record.started_on),
            fmt_date(record.completed_on),
            fmt_duration(record.actual_duration),
        );
        println!(
            "{indent}    {}",
            format!(
                "effort {:.2}/{:.2}  weightage {:.2}/{:.2}  points {:.2}/{:.2}  active {:.2}%",
                record.actual_effort,
                record.planned_effort,
                record.actual_weightage,
                record.planned_weightage,
                record.actual_storypoint,
                record.planned_storypoint,
                record.active_percentage,
            )
            .dimmed()
        );
    }
}

/// Prints an analytics tree with progress per node.
pub fn print_analytics(records: &[AnalyticsRecord], index: &StatusIndex) {
    println!("{} Analytics roll-up ({} records)", "📈".cyan(), records.len());

    for record in records {
        let Some(level) = record.level else {
            continue;
        };
        let indent = "  ".repeat(level.saturating_sub(1));
        let status = record.status.first().map_or("-", |s| s.id.as_str());
        let progress = record
            .progress
            .map_or_else(|| "--".to_string(), |p| format!("{p:.0}%"));

        println!(
            "{indent}{} [{}] {} ({})  {}  {}",
            status_icon(index.category_of(status)),
            record.wbs.as_deref().unwrap_or("?").yellow(),
            record.id,
            status.dimmed(),
            progress.bold(),
            format!(
                "weightage {:.2}/{:.2}",
                record.actual_weightage, record.planned_weightage
            )
            .dimmed()
        );
    }
}

fn status_icon(category: Option<StatusCategory>) -> ColoredString {
    match category {
        Some(StatusCategory::New) => "○".dimmed(),
        Some(StatusCategory::Active) => "⚡".yellow(),
        Some(StatusCategory::Completed) => "✓".green(),
        Some(StatusCategory::Approved) => "✓".blue(),
        Some(StatusCategory::Other) | None => "?".normal(),
    }
}

fn fmt_date(date: Option<NaiveDate>) -> String {
    date.map_or_else(|| "--".to_string(), |d| d.format("%d/%m/%Y").to_string())
}

fn fmt_duration(duration: Option<f64>) -> String {
    duration.map_or_else(String::new, |d| format!("({d})"))
}
