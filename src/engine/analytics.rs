//! Analytics Roll-up: status, weightage and progress over an explicit-parent tree.

use super::duration::round_half_up;
use super::error::Result;
use super::level::{assign_levels, indices_at, max_level as deepest_level};
use super::status::{expand_status, rollup_status, StatusIndex};
use super::types::{AnalyticsRecord, StatusCategory, StatusEntry};
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, info_span};

/// Parent-to-child edges between record indices, resolved through `parent` ids.
pub struct AnalyticsTree {
    graph: DiGraphMap<usize, ()>,
}

impl AnalyticsTree {
    /// Links every record to the record(s) whose id matches its `parent`.
    ///
    /// References to ids outside the collection are ignored.
    #[must_use]
    pub fn build(records: &[AnalyticsRecord]) -> Self {
        let mut graph = DiGraphMap::new();
        let mut by_id: HashMap<&str, Vec<usize>> = HashMap::new();

        for (idx, record) in records.iter().enumerate() {
            graph.add_node(idx);
            by_id.entry(record.id.as_str()).or_default().push(idx);
        }

        for (child, record) in records.iter().enumerate() {
            let Some(parent) = record.parent.as_deref() else {
                continue;
            };
            for &idx in by_id.get(parent).map(Vec::as_slice).unwrap_or_default() {
                graph.add_edge(idx, child, ());
            }
        }

        Self { graph }
    }

    /// Direct children of the record at `idx`.
    pub fn children(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.graph.neighbors_directed(idx, Direction::Outgoing)
    }
}

/// Rolls status and weightage up an analytics tree.
///
/// Levels `max_level - 1` down to `1` are rewritten from their children;
/// records at `max_level` keep their own values.
///
/// # Errors
/// Returns `MissingCanonicalStatus` when a needed category has no status.
pub fn aggregate_analytics(
    records: Vec<AnalyticsRecord>,
    vocabulary: &[StatusEntry],
    max_level: usize,
) -> Result<Vec<AnalyticsRecord>> {
    let index = StatusIndex::from_vocabulary(vocabulary);
    aggregate_analytics_with_index(records, vocabulary, &index, max_level)
}

/// Same as [`aggregate_analytics`] with a prepared (possibly re-canonicalized) index.
///
/// # Errors
/// Returns `MissingCanonicalStatus` when a needed category has no status.
pub fn aggregate_analytics_with_index(
    records: Vec<AnalyticsRecord>,
    vocabulary: &[StatusEntry],
    index: &StatusIndex,
    max_level: usize,
) -> Result<Vec<AnalyticsRecord>> {
    let started = Instant::now();
    let mut records = assign_levels(records);
    let top = max_level.min(deepest_level(&records).map_or(0, |d| d.saturating_add(1)));
    let span = info_span!("aggregate_analytics", records = records.len(), max_level = top);
    let _guard = span.enter();

    let tree = AnalyticsTree::build(&records);

    for level in (1..top).rev() {
        let at_level = indices_at(&records, level);
        debug!(level, records = at_level.len(), "rolling up analytics level");

        let mut updates = Vec::with_capacity(at_level.len());
        for idx in at_level {
            updates.push((idx, roll_up_node(idx, &records, &tree, vocabulary, index)?));
        }
        for (idx, record) in updates {
            records[idx] = record;
        }
    }

    info!(
        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        "analytics roll-up finished"
    );
    Ok(records)
}

fn roll_up_node(
    idx: usize,
    records: &[AnalyticsRecord],
    tree: &AnalyticsTree,
    vocabulary: &[StatusEntry],
    index: &StatusIndex,
) -> Result<AnalyticsRecord> {
    let node = &records[idx];
    let mut statuses = Vec::new();
    let mut planned_weightage = 0.0;
    let mut actual_weightage = 0.0;
    let mut has_children = false;

    for child in tree.children(idx).map(|c| &records[c]) {
        has_children = true;
        let status = match child.status.first() {
            Some(entry) => entry.id.clone(),
            None => index.canonical(StatusCategory::New)?.to_string(),
        };
        statuses.push(status);
        planned_weightage += child.planned_weightage;
        actual_weightage += child.actual_weightage;
    }

    if !has_children {
        statuses.extend(node.status.first().map(|entry| entry.id.clone()));
    }

    let status_id = rollup_status(&statuses, index)?;

    Ok(AnalyticsRecord {
        status: expand_status(&status_id, vocabulary),
        planned_weightage,
        actual_weightage,
        progress: Some(progress(actual_weightage, planned_weightage)),
        ..node.clone()
    })
}

/// Whole-number percentage of planned weightage achieved; 0 when nothing is planned.
#[must_use]
pub fn progress(actual_weightage: f64, planned_weightage: f64) -> f64 {
    if planned_weightage.abs() < f64::EPSILON {
        return 0.0;
    }
    let pct = round_half_up(100.0 * actual_weightage / planned_weightage, 0);
    if pct.is_finite() {
        pct
    } else {
        0.0
    }
}
