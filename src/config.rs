//! wbs-rollup configuration.
//!
//! Loaded from `--config <path>`, or from `./wbs-rollup.toml` when that file
//! exists. Without either, defaults apply.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use wbs_rollup::engine::status::StatusIndex;
use wbs_rollup::engine::types::StatusCategory;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_FILE: &str = "wbs-rollup.toml";

/// wbs-rollup configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Nominal depth used when `--max-level` is omitted.
    pub max_level: Option<usize>,
    /// Pinned canonical status per category.
    #[serde(default)]
    pub canonical: CanonicalStatuses,
}

/// Status ids that override "first status of the category".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CanonicalStatuses {
    pub new: Option<String>,
    pub active: Option<String>,
    pub completed: Option<String>,
    pub approved: Option<String>,
}

impl CanonicalStatuses {
    /// Pins every configured category on `index`.
    ///
    /// # Errors
    /// Returns an error if a configured id is not a status of its category.
    pub fn apply(&self, mut index: StatusIndex) -> Result<StatusIndex> {
        let pins = [
            (StatusCategory::New, &self.new),
            (StatusCategory::Active, &self.active),
            (StatusCategory::Completed, &self.completed),
            (StatusCategory::Approved, &self.approved),
        ];
        for (category, id) in pins {
            if let Some(id) = id {
                index = index.with_canonical(category, id)?;
            }
        }
        Ok(index)
    }
}

impl Config {
    /// Load config from `explicit`, or from `./wbs-rollup.toml` if present.
    ///
    /// # Errors
    /// Returns an error if an explicit file is missing, or any file is unreadable or invalid.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    bail!("no config file found at {}", path.display());
                }
                path
            }
            None => {
                let fallback = Path::new(DEFAULT_FILE);
                if !fallback.exists() {
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid config at {}", path.display()))
    }

    /// Parses TOML config text.
    ///
    /// # Errors
    /// Returns an error on malformed TOML or unknown keys.
    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}
