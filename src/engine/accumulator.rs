//! Roll-up accumulators: what a node's children have pushed up to it.
//!
//! Every node owns one inbound slot, keyed by the node's id. Children write
//! into it at deeper levels; the node reads it exactly once when its own level
//! is walked. After that read the slot is sealed.

use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Aggregated child data for one parent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Accumulator {
    pub statuses: Vec<String>,
    pub started_on: Vec<NaiveDate>,
    pub completed_on: Vec<NaiveDate>,
    pub planned_from: Vec<NaiveDate>,
    pub planned_to: Vec<NaiveDate>,
    pub metrics: Metrics,
    pub active_percentage: f64,
    pub child_count: usize,
}

/// Planned and actual effort, weightage and story points.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Metrics {
    pub planned_effort: f64,
    pub actual_effort: f64,
    pub planned_weightage: f64,
    pub actual_weightage: f64,
    pub planned_storypoint: f64,
    pub actual_storypoint: f64,
}

impl std::ops::AddAssign for Metrics {
    fn add_assign(&mut self, rhs: Self) {
        self.planned_effort += rhs.planned_effort;
        self.actual_effort += rhs.actual_effort;
        self.planned_weightage += rhs.planned_weightage;
        self.actual_weightage += rhs.actual_weightage;
        self.planned_storypoint += rhs.planned_storypoint;
        self.actual_storypoint += rhs.actual_storypoint;
    }
}

/// One child's finalized values, ready to be pushed to its parent.
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    pub status: String,
    pub started_on: Option<NaiveDate>,
    pub completed_on: Option<NaiveDate>,
    pub planned_from: Option<NaiveDate>,
    pub planned_to: Option<NaiveDate>,
    pub metrics: Metrics,
    pub active_percentage: f64,
}

impl Accumulator {
    /// Folds one child into this accumulator.
    pub fn absorb(&mut self, child: Contribution) {
        self.statuses.push(child.status);
        self.started_on.extend(child.started_on);
        self.completed_on.extend(child.completed_on);
        self.planned_from.extend(child.planned_from);
        self.planned_to.extend(child.planned_to);
        self.metrics += child.metrics;
        self.active_percentage += child.active_percentage;
        self.child_count += 1;
    }

    #[must_use]
    pub fn earliest_start(&self) -> Option<NaiveDate> {
        self.started_on.iter().min().copied()
    }

    #[must_use]
    pub fn latest_completion(&self) -> Option<NaiveDate> {
        self.completed_on.iter().max().copied()
    }

    #[must_use]
    pub fn earliest_planned_from(&self) -> Option<NaiveDate> {
        self.planned_from.iter().min().copied()
    }

    #[must_use]
    pub fn latest_planned_to(&self) -> Option<NaiveDate> {
        self.planned_to.iter().max().copied()
    }

    /// Mean active-percentage over the children, 0 with no children.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_active_percentage(&self) -> f64 {
        if self.child_count == 0 {
            return 0.0;
        }
        self.active_percentage / self.child_count as f64
    }
}

/// Inbound slots of every node touched during one aggregation run.
#[derive(Debug, Default)]
pub struct AccumulatorMap {
    slots: HashMap<String, Accumulator>,
    sealed: HashSet<String>,
}

impl AccumulatorMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a child's values into its parent's slot.
    ///
    /// Pushes into a slot that has already been read are dropped.
    pub fn push(&mut self, parent_id: &str, child: Contribution) {
        if self.sealed.contains(parent_id) {
            warn!(parent = parent_id, "parent already rolled up; dropping late child");
            return;
        }
        self.slots.entry(parent_id.to_string()).or_default().absorb(child);
    }

    /// Reads and seals a node's slot. `None` means no child ever pushed to it.
    pub fn take(&mut self, id: &str) -> Option<Accumulator> {
        self.sealed.insert(id.to_string());
        self.slots.remove(id)
    }

    /// Slots still waiting for their owner (e.g. phases above the walked levels).
    #[must_use]
    pub fn pending(&self) -> usize {
        self.slots.len()
    }
}
