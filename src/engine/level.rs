//! Level Assignment: depth of a record from its dotted position key.

use super::types::{AnalyticsRecord, WorkbookRecord};

/// A record addressed by a dot-separated position key such as `"1.2.3"`.
///
/// Workbook records are positioned by `orderID`, analytics records by their
/// `$wbs` path.
pub trait Positioned {
    fn position_key(&self) -> Option<&str>;
    fn level(&self) -> Option<usize>;
    fn set_level(&mut self, level: Option<usize>);
}

impl Positioned for WorkbookRecord {
    fn position_key(&self) -> Option<&str> {
        self.order_id.as_deref()
    }

    fn level(&self) -> Option<usize> {
        self.level
    }

    fn set_level(&mut self, level: Option<usize>) {
        self.level = level;
    }
}

impl Positioned for AnalyticsRecord {
    fn position_key(&self) -> Option<&str> {
        self.wbs.as_deref()
    }

    fn level(&self) -> Option<usize> {
        self.level
    }

    fn set_level(&mut self, level: Option<usize>) {
        self.level = level;
    }
}

/// Number of segments in a position key: one more than its dots.
#[must_use]
pub fn depth(position_key: &str) -> usize {
    position_key.matches('.').count() + 1
}

/// The key of the enclosing node, or `None` for a top-level key.
#[must_use]
pub fn parent_position(position_key: &str) -> Option<&str> {
    position_key.rsplit_once('.').map(|(parent, _)| parent)
}

/// Sets every record's level from its position key.
///
/// Records without a key get no level and drop out of every level pass.
#[must_use]
pub fn assign_levels<T: Positioned>(mut records: Vec<T>) -> Vec<T> {
    for record in &mut records {
        let level = record.position_key().map(depth);
        record.set_level(level);
    }
    records
}

/// Deepest level present.
#[must_use]
pub fn max_level<T: Positioned>(records: &[T]) -> Option<usize> {
    records.iter().filter_map(Positioned::level).max()
}

/// Indices of the records sitting at `level`, in collection order.
#[must_use]
pub fn indices_at<T: Positioned>(records: &[T], level: usize) -> Vec<usize> {
    records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.level() == Some(level))
        .map(|(i, _)| i)
        .collect()
}
