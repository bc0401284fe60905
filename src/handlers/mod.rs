//! Command handlers for the `wbs-rollup` binary.

pub mod analytics;
pub mod duration;
pub mod input;
pub mod render;
pub mod workbook;
