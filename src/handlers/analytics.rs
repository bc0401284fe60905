//! Handler for the `analytics` command.

use std::path::Path;

use anyhow::Result;
use wbs_rollup::engine::analytics::aggregate_analytics_with_index;
use wbs_rollup::engine::level::depth;
use wbs_rollup::engine::types::{AnalyticsRecord, StatusEntry};

use super::input::{emit_json, load_index, read_json};
use super::render::print_analytics;
use crate::config::Config;

/// Rolls an analytics tree up and prints or writes the updated records.
///
/// # Errors
/// Returns error if an input cannot be loaded or the status vocabulary lacks a needed category.
pub fn handle(
    records_path: &Path,
    statuses_path: &Path,
    max_level: Option<usize>,
    json: bool,
    output: Option<&Path>,
    config: &Config,
) -> Result<()> {
    let records: Vec<AnalyticsRecord> = read_json(records_path)?;
    let vocabulary: Vec<StatusEntry> = read_json(statuses_path)?;
    let index = load_index(&vocabulary, config)?;

    let max_level = max_level.or(config.max_level).unwrap_or_else(|| {
        records
            .iter()
            .filter_map(|r| r.wbs.as_deref())
            .map(depth)
            .max()
            .unwrap_or(0)
    });

    let records = aggregate_analytics_with_index(records, &vocabulary, &index, max_level)?;

    if json || output.is_some() {
        return emit_json(&records, output);
    }
    print_analytics(&records, &index);
    Ok(())
}
