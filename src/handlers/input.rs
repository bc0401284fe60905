//! Reading inputs and writing results as JSON.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use wbs_rollup::engine::status::StatusIndex;
use wbs_rollup::engine::types::{ProjectInfo, ProjectInfoEntry, StatusEntry};

use crate::config::Config;

/// Reads and deserializes a JSON file.
///
/// # Errors
/// Returns error if the file cannot be read or does not match `T`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}

/// Loads the project-info array; no file means no settings and no calendar.
///
/// # Errors
/// Returns error if the file is given but unreadable or malformed.
pub fn load_project_info(path: Option<&Path>) -> Result<ProjectInfo> {
    let Some(path) = path else {
        return Ok(ProjectInfo::default());
    };
    let entries: Vec<Option<ProjectInfoEntry>> = read_json(path)?;
    Ok(ProjectInfo::from_entries(entries))
}

/// Classifies the vocabulary and applies configured canonical ids.
///
/// # Errors
/// Returns error if a configured canonical id is not in its category.
pub fn load_index(vocabulary: &[StatusEntry], config: &Config) -> Result<StatusIndex> {
    config
        .canonical
        .apply(StatusIndex::from_vocabulary(vocabulary))
        .context("invalid [canonical] configuration")
}

/// Writes `value` as pretty JSON to `output`, or to stdout.
///
/// # Errors
/// Returns error if serialization or the write fails.
pub fn emit_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => fs::write(path, text + "\n")
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            println!("{text}");
            Ok(())
        }
    }
}
