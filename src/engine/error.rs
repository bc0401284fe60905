//! Error types for the roll-up engine.

use super::types::StatusCategory;

/// Fatal conditions raised while aggregating.
///
/// Everything else (missing dates, zero divisors, unresolved parents) falls
/// back silently to an empty or zero value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RollupError {
    #[error("no {0} status is configured for the Task work item")]
    MissingCanonicalStatus(StatusCategory),

    #[error("status '{id}' is not a {category} status and cannot be its canonical id")]
    UnknownCanonicalStatus { category: StatusCategory, id: String },
}

/// A date value that none of the accepted layouts could read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateError {
    #[error("unparseable date: '{0}'")]
    Unparseable(String),

    #[error("timestamp out of range: {0}")]
    OutOfRange(i64),
}

pub type Result<T> = core::result::Result<T, RollupError>;
