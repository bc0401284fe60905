//! Status, date, effort and duration roll-up over a project work-breakdown structure.
//!
//! The library is the `engine`; the `wbs-rollup` binary is a thin JSON front end.

pub mod engine;
