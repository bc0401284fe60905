//! Handler for the `workbook` command.

use std::path::Path;

use anyhow::Result;
use wbs_rollup::engine::dates;
use wbs_rollup::engine::level::depth;
use wbs_rollup::engine::types::{StatusEntry, WorkbookRecord};
use wbs_rollup::engine::workbook::{aggregate_workbook_with, WorkbookSettings, SYNTHETIC_LEVELS};

use super::input::{emit_json, load_index, load_project_info, read_json};
use super::render::print_workbook;
use crate::config::Config;

/// Rolls a workbook up and prints or writes the updated records.
///
/// # Errors
/// Returns error if an input cannot be loaded or the status vocabulary lacks a needed category.
pub fn handle(
    records_path: &Path,
    statuses_path: &Path,
    project_info_path: Option<&Path>,
    max_level: Option<usize>,
    json: bool,
    output: Option<&Path>,
    config: &Config,
) -> Result<()> {
    let records: Vec<WorkbookRecord> = read_json(records_path)?;
    let vocabulary: Vec<StatusEntry> = read_json(statuses_path)?;
    let info = load_project_info(project_info_path)?;
    let index = load_index(&vocabulary, config)?;
    let settings = WorkbookSettings::from_project(&info, dates::today());

    let max_level = max_level
        .or(config.max_level)
        .unwrap_or_else(|| nominal_depth(&records));

    let records = aggregate_workbook_with(records, &index, &settings, max_level)?;

    if json || output.is_some() {
        return emit_json(&records, output);
    }
    print_workbook(&records, &index);
    Ok(())
}

/// Task depth below the phase and sub-phase levels.
fn nominal_depth(records: &[WorkbookRecord]) -> usize {
    records
        .iter()
        .filter_map(|r| r.order_id.as_deref())
        .map(depth)
        .max()
        .unwrap_or(0)
        .saturating_sub(SYNTHETIC_LEVELS)
}
