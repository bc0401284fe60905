//! Workbook Roll-up: the full status, date, effort and duration pass.
//!
//! A workbook has two synthetic levels above its tasks (phase and sub-phase),
//! so a caller's nominal depth `n` is walked from level `n + 2` down to 3.
//! Each record is either a leaf, initialized from its own raw fields, or an
//! internal node, rolled up from the accumulator its children filled. Both
//! kinds then push their finalized values into their parent's accumulator.
//!
//! Re-running the pass over its own output is not guaranteed to be idempotent:
//! active and finished leaves that had no actual dates are stamped with the
//! day of the run, and that stamp is then carried as if it were user input.

use super::accumulator::{Accumulator, AccumulatorMap, Contribution, Metrics};
use super::calendar::WorkCalendar;
use super::dates;
use super::duration::{duration_between, round_half_up, DurationUnit};
use super::error::Result;
use super::level::{assign_levels, indices_at, max_level as deepest_level, parent_position};
use super::status::{rollup_status, StatusIndex};
use super::types::{ProjectInfo, StatusCategory, StatusEntry, WorkbookRecord};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use std::time::Instant;
use tracing::{debug, info, info_span, warn};

/// Levels stacked above the caller's task depth: phase and sub-phase.
pub const SYNTHETIC_LEVELS: usize = 2;

/// The first level the walk processes; phases and sub-phases are only fed.
pub const LOWEST_WALKED_LEVEL: usize = 3;

/// Project-wide inputs resolved once per run.
#[derive(Debug, Clone)]
pub struct WorkbookSettings {
    pub calendar: WorkCalendar,
    /// `None` leaves every duration empty.
    pub unit: Option<DurationUnit>,
    pub default_active_percentage: f64,
    /// Active leaves use their own active-percentage for weightage and story
    /// points instead of the project default.
    pub use_task_active_percentage: bool,
    /// Stamped onto active and finished leaves missing an actual date.
    pub today: NaiveDate,
}

impl WorkbookSettings {
    #[must_use]
    pub fn from_project(info: &ProjectInfo, today: NaiveDate) -> Self {
        let settings = info.settings.as_ref();
        let unit = settings.and_then(|s| s.duration.as_deref()).and_then(|raw| {
            raw.parse::<DurationUnit>()
                .map_err(|e| warn!(error = %e, "durations disabled"))
                .ok()
        });

        Self {
            calendar: WorkCalendar::from_optional(info.calendar.as_ref()),
            unit,
            default_active_percentage: settings.map_or(0.0, |s| s.active_percentage),
            use_task_active_percentage: settings.is_some_and(|s| s.active_task_progress_metric),
            today,
        }
    }
}

/// Finds the id of a record's parent.
///
/// An explicit `refTask`, then `subPhase`, then the record whose `orderID` is
/// this one's minus its last segment.
pub struct ParentResolver {
    by_position: HashMap<String, String>,
}

impl ParentResolver {
    #[must_use]
    pub fn build(records: &[WorkbookRecord]) -> Self {
        let mut by_position = HashMap::new();
        for record in records {
            if let Some(order_id) = &record.order_id {
                by_position
                    .entry(order_id.clone())
                    .or_insert_with(|| record.id.to_string());
            }
        }
        Self { by_position }
    }

    #[must_use]
    pub fn parent_of(&self, record: &WorkbookRecord) -> Option<String> {
        non_empty(record.ref_task.as_deref())
            .or_else(|| non_empty(record.sub_phase.as_deref()))
            .map(str::to_string)
            .or_else(|| {
                record
                    .order_id
                    .as_deref()
                    .and_then(parent_position)
                    .and_then(|position| self.by_position.get(position).cloned())
            })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Rolls a workbook up from its tasks to its sub-phases.
///
/// `max_level` is the nominal task depth, not counting phase and sub-phase.
///
/// # Errors
/// Returns `MissingCanonicalStatus` when a needed category has no status.
pub fn aggregate_workbook(
    records: Vec<WorkbookRecord>,
    vocabulary: &[StatusEntry],
    info: &ProjectInfo,
    max_level: usize,
) -> Result<Vec<WorkbookRecord>> {
    let index = StatusIndex::from_vocabulary(vocabulary);
    let settings = WorkbookSettings::from_project(info, dates::today());
    aggregate_workbook_with(records, &index, &settings, max_level)
}

/// Same as [`aggregate_workbook`] with a prepared index and resolved settings.
///
/// # Errors
/// Returns `MissingCanonicalStatus` when a needed category has no status.
pub fn aggregate_workbook_with(
    records: Vec<WorkbookRecord>,
    index: &StatusIndex,
    settings: &WorkbookSettings,
    max_level: usize,
) -> Result<Vec<WorkbookRecord>> {
    let started = Instant::now();
    let mut records = assign_levels(records);
    // Levels past the deepest record are empty; never walk them.
    let deepest = max_level
        .saturating_add(SYNTHETIC_LEVELS)
        .min(deepest_level(&records).unwrap_or(0));
    let span = info_span!("aggregate_workbook", records = records.len(), max_level = deepest);
    let _guard = span.enter();

    let resolver = ParentResolver::build(&records);
    let pass = Pass { index, settings };
    let mut slots = AccumulatorMap::new();

    for level in (LOWEST_WALKED_LEVEL..=deepest).rev() {
        let at_level = indices_at(&records, level);
        debug!(level, records = at_level.len(), "rolling up workbook level");

        for idx in at_level {
            let Some(parent_id) = resolver.parent_of(&records[idx]) else {
                warn!(id = %records[idx].id, "no parent found; record left as is");
                continue;
            };
            let updated = match slots.take(records[idx].id.as_str()) {
                Some(acc) => pass.roll_up(&records[idx], &acc)?,
                None => pass.init_leaf(&records[idx])?,
            };
            slots.push(&parent_id, contribution(&updated));
            records[idx] = updated;
        }
    }

    info!(
        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        unconsumed = slots.pending(),
        "workbook roll-up finished"
    );
    Ok(records)
}

struct Pass<'a> {
    index: &'a StatusIndex,
    settings: &'a WorkbookSettings,
}

impl Pass<'_> {
    /// Internal node: everything comes from the children.
    fn roll_up(&self, node: &WorkbookRecord, acc: &Accumulator) -> Result<WorkbookRecord> {
        let status = rollup_status(&acc.statuses, self.index)?;

        let distinct: BTreeSet<&str> = acc.statuses.iter().map(String::as_str).collect();
        let still_open = [StatusCategory::Active, StatusCategory::New]
            .into_iter()
            .filter_map(|c| self.index.canonical_opt(c))
            .any(|id| distinct.contains(id));

        let mut updated = WorkbookRecord {
            status: Some(status),
            started_on: acc.earliest_start(),
            completed_on: if still_open { None } else { acc.latest_completion() },
            planned_from: acc.earliest_planned_from(),
            planned_to: acc.latest_planned_to(),
            active_percentage: round_half_up(acc.mean_active_percentage(), 5),
            ..node.clone()
        };
        set_metrics(&mut updated, acc.metrics);
        self.apply_durations(&mut updated);
        Ok(updated)
    }

    /// Leaf task: actuals follow from the status category.
    fn init_leaf(&self, node: &WorkbookRecord) -> Result<WorkbookRecord> {
        let status = match non_empty(node.status.as_deref()) {
            Some(own) => own.to_string(),
            None => self.index.canonical(StatusCategory::New)?.to_string(),
        };
        let today = self.settings.today;
        let mut leaf = WorkbookRecord {
            status: Some(status.clone()),
            ..node.clone()
        };

        match self.index.category_of(&status) {
            Some(StatusCategory::New) => {
                leaf.started_on = None;
                leaf.completed_on = None;
                leaf.actual_effort = 0.0;
                leaf.actual_weightage = 0.0;
                leaf.actual_storypoint = 0.0;
                leaf.active_percentage = 0.0;
            }
            Some(StatusCategory::Active) => {
                leaf.completed_on = None;
                leaf.started_on = leaf.started_on.or(Some(today));
                let own = leaf.active_percentage;
                let share = if self.settings.use_task_active_percentage {
                    own
                } else {
                    self.settings.default_active_percentage
                };
                leaf.actual_effort = leaf.planned_effort * own / 100.0;
                leaf.actual_weightage = leaf.planned_weightage * share / 100.0;
                leaf.actual_storypoint = leaf.planned_storypoint * share / 100.0;
            }
            Some(StatusCategory::Completed | StatusCategory::Approved) => {
                leaf.started_on = leaf.started_on.or(Some(today));
                leaf.completed_on = leaf.completed_on.or(Some(today));
                leaf.actual_effort = leaf.planned_effort;
                leaf.actual_weightage = leaf.planned_weightage;
                leaf.actual_storypoint = leaf.planned_storypoint;
                leaf.active_percentage = 100.0;
            }
            // Uncategorized: dates are already day-normalized, metrics stay as given.
            Some(StatusCategory::Other) | None => {}
        }

        self.apply_durations(&mut leaf);
        Ok(leaf)
    }

    fn apply_durations(&self, record: &mut WorkbookRecord) {
        let calendar = &self.settings.calendar;
        let (planned, actual) = match self.settings.unit {
            Some(unit) => (
                duration_between(record.planned_from, record.planned_to, calendar, unit),
                duration_between(record.started_on, record.completed_on, calendar, unit),
            ),
            None => (None, None),
        };
        record.planned_duration = planned;
        record.actual_duration = actual;
    }
}

fn set_metrics(record: &mut WorkbookRecord, metrics: Metrics) {
    record.planned_effort = metrics.planned_effort;
    record.actual_effort = metrics.actual_effort;
    record.planned_weightage = metrics.planned_weightage;
    record.actual_weightage = metrics.actual_weightage;
    record.planned_storypoint = metrics.planned_storypoint;
    record.actual_storypoint = metrics.actual_storypoint;
}

fn contribution(record: &WorkbookRecord) -> Contribution {
    Contribution {
        status: record.status.clone().unwrap_or_default(),
        started_on: record.started_on,
        completed_on: record.completed_on,
        planned_from: record.planned_from,
        planned_to: record.planned_to,
        metrics: Metrics {
            planned_effort: record.planned_effort,
            actual_effort: record.actual_effort,
            planned_weightage: record.planned_weightage,
            actual_weightage: record.actual_weightage,
            planned_storypoint: record.planned_storypoint,
            actual_storypoint: record.actual_storypoint,
        },
        active_percentage: record.active_percentage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{ProjectCalendar, ProjectSettings};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn make_index() -> StatusIndex {
        StatusIndex::from_vocabulary(&[
            StatusEntry::task("new", StatusCategory::New),
            StatusEntry::task("doing", StatusCategory::Active),
            StatusEntry::task("done", StatusCategory::Completed),
            StatusEntry::task("signed", StatusCategory::Approved),
            StatusEntry::task("parked", StatusCategory::Other),
        ])
    }

    fn make_settings(unit: Option<DurationUnit>) -> WorkbookSettings {
        WorkbookSettings {
            calendar: WorkCalendar::all_working(),
            unit,
            default_active_percentage: 25.0,
            use_task_active_percentage: false,
            today: ymd(2024, 7, 1),
        }
    }

    fn make_task(id: &str, order_id: &str, status: Option<&str>) -> WorkbookRecord {
        WorkbookRecord {
            id: id.into(),
            order_id: Some(order_id.to_string()),
            status: status.map(str::to_string),
            planned_effort: 10.0,
            planned_weightage: 20.0,
            planned_storypoint: 4.0,
            ..WorkbookRecord::default()
        }
    }

    fn leaf(record: &WorkbookRecord, settings: &WorkbookSettings) -> WorkbookRecord {
        let index = make_index();
        Pass { index: &index, settings }.init_leaf(record).unwrap()
    }

    #[test]
    fn test_settings_from_project() {
        let info = ProjectInfo {
            settings: Some(ProjectSettings {
                duration: Some("weeks".to_string()),
                active_percentage: 30.0,
                active_task_progress_metric: true,
            }),
            calendar: Some(ProjectCalendar {
                weekends: vec!["Sunday".to_string()],
                holiday_events: vec![],
            }),
        };
        let settings = WorkbookSettings::from_project(&info, ymd(2024, 1, 1));
        assert_eq!(settings.unit, None);
        assert!((settings.default_active_percentage - 30.0).abs() < f64::EPSILON);
        assert!(settings.use_task_active_percentage);
        assert!(!settings.calendar.is_working_day(ymd(2024, 6, 9)));

        let bare = WorkbookSettings::from_project(&ProjectInfo::default(), ymd(2024, 1, 1));
        assert_eq!(bare.unit, None);
        assert!(bare.default_active_percentage.abs() < f64::EPSILON);
    }

    #[test]
    fn test_parent_resolution_order() {
        let phase = make_task("sp", "1.1", None);
        let mut task = make_task("t", "1.1.1", None);
        let resolver = ParentResolver::build(&[phase, task.clone()]);
        assert_eq!(resolver.parent_of(&task).as_deref(), Some("sp"));

        task.sub_phase = Some("sub".to_string());
        assert_eq!(resolver.parent_of(&task).as_deref(), Some("sub"));

        task.ref_task = Some("ref".to_string());
        assert_eq!(resolver.parent_of(&task).as_deref(), Some("ref"));

        let orphan = make_task("o", "9.9.9", None);
        assert_eq!(resolver.parent_of(&orphan), None);
    }

    #[test]
    fn test_new_leaf_clears_actuals() {
        let mut task = make_task("t", "1.1.1", None);
        task.started_on = Some(ymd(2024, 1, 2));
        task.actual_effort = 3.0;
        task.active_percentage = 60.0;

        let out = leaf(&task, &make_settings(None));
        assert_eq!(out.status.as_deref(), Some("new"));
        assert_eq!(out.started_on, None);
        assert!(out.actual_effort.abs() < f64::EPSILON);
        assert!(out.active_percentage.abs() < f64::EPSILON);
    }

    #[test]
    fn test_active_leaf_uses_project_default_share() {
        let mut task = make_task("t", "1.1.1", Some("doing"));
        task.active_percentage = 50.0;
        task.completed_on = Some(ymd(2024, 2, 2));

        let out = leaf(&task, &make_settings(None));
        assert_eq!(out.started_on, Some(ymd(2024, 7, 1)));
        assert_eq!(out.completed_on, None);
        assert!((out.actual_effort - 5.0).abs() < f64::EPSILON);
        assert!((out.actual_weightage - 5.0).abs() < f64::EPSILON);
        assert!((out.actual_storypoint - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_active_leaf_uses_own_share_when_flagged() {
        let mut task = make_task("t", "1.1.1", Some("doing"));
        task.active_percentage = 50.0;
        task.started_on = Some(ymd(2024, 3, 1));
        let mut settings = make_settings(None);
        settings.use_task_active_percentage = true;

        let out = leaf(&task, &settings);
        assert_eq!(out.started_on, Some(ymd(2024, 3, 1)));
        assert!((out.actual_weightage - 10.0).abs() < f64::EPSILON);
        assert!((out.actual_storypoint - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_finished_leaf_takes_planned() {
        let task = make_task("t", "1.1.1", Some("signed"));
        let out = leaf(&task, &make_settings(Some(DurationUnit::Days)));
        assert_eq!(out.started_on, Some(ymd(2024, 7, 1)));
        assert_eq!(out.completed_on, Some(ymd(2024, 7, 1)));
        assert!((out.actual_weightage - 20.0).abs() < f64::EPSILON);
        assert!((out.active_percentage - 100.0).abs() < f64::EPSILON);
        assert_eq!(out.actual_duration, Some(1.0));
        assert_eq!(out.planned_duration, None);
    }

    #[test]
    fn test_uncategorized_leaf_untouched() {
        let mut task = make_task("t", "1.1.1", Some("parked"));
        task.started_on = Some(ymd(2024, 3, 1));
        task.actual_effort = 7.0;
        task.active_percentage = 12.0;

        let out = leaf(&task, &make_settings(None));
        assert_eq!(out.status.as_deref(), Some("parked"));
        assert_eq!(out.started_on, Some(ymd(2024, 3, 1)));
        assert!((out.actual_effort - 7.0).abs() < f64::EPSILON);
        assert!((out.active_percentage - 12.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_internal_node_stays_open_while_children_active() {
        let index = make_index();
        let settings = make_settings(Some(DurationUnit::Days));
        let mut acc = Accumulator::default();
        acc.absorb(Contribution {
            status: "done".to_string(),
            started_on: Some(ymd(2024, 5, 6)),
            completed_on: Some(ymd(2024, 5, 10)),
            planned_from: Some(ymd(2024, 5, 6)),
            planned_to: Some(ymd(2024, 5, 8)),
            metrics: Metrics::default(),
            active_percentage: 100.0,
        });
        acc.absorb(Contribution {
            status: "doing".to_string(),
            started_on: Some(ymd(2024, 5, 3)),
            completed_on: None,
            planned_from: Some(ymd(2024, 5, 2)),
            planned_to: Some(ymd(2024, 5, 12)),
            metrics: Metrics::default(),
            active_percentage: 0.0,
        });

        let node = make_task("n", "1.1.1", None);
        let out = Pass { index: &index, settings: &settings }.roll_up(&node, &acc).unwrap();
        assert_eq!(out.status.as_deref(), Some("doing"));
        assert_eq!(out.started_on, Some(ymd(2024, 5, 3)));
        assert_eq!(out.completed_on, None);
        assert_eq!(out.planned_from, Some(ymd(2024, 5, 2)));
        assert_eq!(out.planned_to, Some(ymd(2024, 5, 12)));
        assert!((out.active_percentage - 50.0).abs() < f64::EPSILON);
        assert_eq!(out.planned_duration, Some(11.0));
        assert_eq!(out.actual_duration, None);
    }

    #[test]
    fn test_oversized_max_level_stops_at_deepest_record() {
        let index = make_index();
        let settings = make_settings(Some(DurationUnit::Days));
        let records = vec![
            make_task("sp", "1.1", None),
            make_task("g", "1.1.1", None),
            make_task("a", "1.1.1.1", Some("done")),
            make_task("b", "1.1.1.2", Some("signed")),
        ];

        let huge = aggregate_workbook_with(records.clone(), &index, &settings, usize::MAX).unwrap();
        let bounded = aggregate_workbook_with(records, &index, &settings, 2).unwrap();
        assert_eq!(huge, bounded);
        assert_eq!(huge[1].status.as_deref(), Some("done"));
        assert!((huge[1].planned_weightage - 40.0).abs() < f64::EPSILON);
    }
}
