//! Core engine modules for wbs-rollup.

pub mod accumulator;
pub mod analytics;
pub mod calendar;
pub mod dates;
pub mod duration;
pub mod error;
pub mod level;
pub mod status;
pub mod types;
pub mod workbook;

pub use analytics::aggregate_analytics;
pub use error::{DateError, RollupError};
pub use workbook::aggregate_workbook;
