//! Core types for the roll-up engine.
//!
//! Records mirror the JSON documents project-management applications store:
//! unknown fields ride along in `extra` so an aggregated record serializes back
//! with everything it came in with.

use super::dates::deserialize_flexible;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// The work-item kind whose statuses drive roll-up.
pub const TASK_WORK_ITEM: &str = "Task";

/// Category bucket a status belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatusCategory {
    New,
    Active,
    Completed,
    Approved,
    #[serde(other)]
    Other,
}

impl StatusCategory {
    /// The four categories that take part in roll-up, in bucket order.
    pub const ROLLUP: [Self; 4] = [Self::New, Self::Active, Self::Completed, Self::Approved];
}

impl fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "New"),
            Self::Active => write!(f, "Active"),
            Self::Completed => write!(f, "Completed"),
            Self::Approved => write!(f, "Approved"),
            Self::Other => write!(f, "Other"),
        }
    }
}

/// One status definable for a work-item kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEntry {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub work_item: String,
    pub category: StatusCategory,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StatusEntry {
    #[must_use]
    pub fn new(id: &str, work_item: &str, category: StatusCategory) -> Self {
        Self {
            id: id.to_string(),
            work_item: work_item.to_string(),
            category,
            extra: serde_json::Map::new(),
        }
    }

    /// Shorthand for a `Task` status.
    #[must_use]
    pub fn task(id: &str, category: StatusCategory) -> Self {
        Self::new(id, TASK_WORK_ITEM, category)
    }
}

/// A document id, written back under the key (`_id` or `id`) it was read from.
///
/// When a document carries both keys, `_id` is the id and both are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRecordId")]
pub struct RecordId {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    underscored: Option<String>,
    #[serde(rename = "id", skip_serializing_if = "Option::is_none")]
    plain: Option<String>,
}

impl RecordId {
    /// An id stored under `_id`.
    #[must_use]
    pub fn underscored(id: &str) -> Self {
        Self {
            underscored: Some(id.to_string()),
            plain: None,
        }
    }

    /// An id stored under `id`.
    #[must_use]
    pub fn plain(id: &str) -> Self {
        Self {
            underscored: None,
            plain: Some(id.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.underscored
            .as_deref()
            .or(self.plain.as_deref())
            .unwrap_or_default()
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::underscored(id)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq<str> for RecordId {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for RecordId {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

#[derive(Deserialize)]
struct RawRecordId {
    #[serde(rename = "_id", default)]
    underscored: Option<String>,
    #[serde(rename = "id", default)]
    plain: Option<String>,
}

impl TryFrom<RawRecordId> for RecordId {
    type Error = String;

    fn try_from(raw: RawRecordId) -> Result<Self, Self::Error> {
        if raw.underscored.is_none() && raw.plain.is_none() {
            return Err("record has neither `_id` nor `id`".to_string());
        }
        Ok(Self {
            underscored: raw.underscored,
            plain: raw.plain,
        })
    }
}

/// A node of the analytics tree. Parent linkage is explicit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsRecord {
    #[serde(flatten)]
    pub id: RecordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(rename = "$wbs", default, skip_serializing_if = "Option::is_none")]
    pub wbs: Option<String>,
    #[serde(default)]
    pub level: Option<usize>,
    /// Resolved status entities; only the first one is consulted.
    #[serde(default)]
    pub status: Vec<StatusEntry>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub planned_weightage: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub actual_weightage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A node of the workbook tree: phases, sub-phases and tasks addressed by `orderID`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkbookRecord {
    #[serde(flatten)]
    pub id: RecordId,
    #[serde(rename = "orderID", default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_phase: Option<String>,
    #[serde(default)]
    pub level: Option<usize>,
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default, deserialize_with = "deserialize_flexible")]
    pub planned_from: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_flexible")]
    pub planned_to: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_flexible")]
    pub started_on: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_flexible")]
    pub completed_on: Option<NaiveDate>,

    #[serde(default, deserialize_with = "lenient_number")]
    pub planned_effort: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub actual_effort: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub planned_weightage: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub actual_weightage: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub planned_storypoint: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub actual_storypoint: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub active_percentage: f64,

    #[serde(default)]
    pub planned_duration: Option<f64>,
    #[serde(default)]
    pub actual_duration: Option<f64>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Project-wide knobs from the "Project Settings" entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSettings {
    /// Raw unit label: `hours`, `days` or `months`.
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(rename = "activepercentage", default, deserialize_with = "lenient_number")]
    pub active_percentage: f64,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub active_task_progress_metric: bool,
}

/// A holiday; only its first day is excluded from working time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolidayEvent {
    #[serde(default, deserialize_with = "deserialize_flexible")]
    pub start_date: Option<NaiveDate>,
}

/// Non-working days from the "Project Calendar" entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCalendar {
    /// Weekday names such as `"Saturday"`.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub weekends: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub holiday_events: Vec<HolidayEvent>,
}

/// One entry of the project-info collection, discriminated by its title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "title")]
pub enum ProjectInfoEntry {
    #[serde(rename = "Project Settings")]
    Settings(ProjectSettings),
    #[serde(rename = "Project Calendar")]
    Calendar(ProjectCalendar),
    #[serde(other)]
    Other,
}

/// The settings and calendar that apply to one aggregation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectInfo {
    pub settings: Option<ProjectSettings>,
    pub calendar: Option<ProjectCalendar>,
}

impl ProjectInfo {
    /// Picks the first settings and first calendar entry; nulls and other titles are ignored.
    #[must_use]
    pub fn from_entries(entries: Vec<Option<ProjectInfoEntry>>) -> Self {
        let mut info = Self::default();
        for entry in entries.into_iter().flatten() {
            match entry {
                ProjectInfoEntry::Settings(s) if info.settings.is_none() => info.settings = Some(s),
                ProjectInfoEntry::Calendar(c) if info.calendar.is_none() => info.calendar = Some(c),
                _ => {}
            }
        }
        info
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

/// Reads a metric as a number; numeric strings parse, anything else is 0.
fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Option::<RawNumber>::deserialize(deserializer)? {
        Some(RawNumber::Number(n)) => n,
        Some(RawNumber::Text(s)) => s.trim().parse().unwrap_or(0.0),
        Some(RawNumber::Other(_)) | None => 0.0,
    };
    Ok(if value.is_finite() { value } else { 0.0 })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBool {
    Bool(bool),
    Text(String),
    Other(serde_json::Value),
}

/// Reads a flag; `"true"` counts, null and anything else is `false`.
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawBool>::deserialize(deserializer)? {
        Some(RawBool::Bool(flag)) => flag,
        Some(RawBool::Text(s)) => s.trim().eq_ignore_ascii_case("true"),
        Some(RawBool::Other(_)) | None => false,
    })
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_entry_keeps_extra_fields() {
        let json = r##"{"_id":"s1","workItem":"Task","category":"Active","title":"Doing","color":"#0f0"}"##;
        let entry: StatusEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.id, "s1");
        assert_eq!(entry.category, StatusCategory::Active);
        assert_eq!(entry.extra["title"], "Doing");

        let back = serde_json::to_value(&entry).unwrap();
        assert_eq!(back["color"], "#0f0");
        assert_eq!(back["_id"], "s1");
    }

    #[test]
    fn test_unknown_category_is_other() {
        let json = r#"{"_id":"s9","workItem":"Task","category":"Blocked"}"#;
        let entry: StatusEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.category, StatusCategory::Other);
    }

    #[test]
    fn test_workbook_record_lenient_fields() {
        let json = r#"{
            "_id": "t1",
            "orderID": "1.1.2",
            "status": "s1",
            "plannedFrom": "01/04/2024",
            "plannedTo": "",
            "plannedEffort": "12.5",
            "plannedWeightage": null,
            "activePercentage": "abc",
            "owner": "kim"
        }"#;
        let r: WorkbookRecord = serde_json::from_str(json).unwrap();
        assert_eq!(r.order_id.as_deref(), Some("1.1.2"));
        assert_eq!(r.planned_from, NaiveDate::from_ymd_opt(2024, 4, 1));
        assert_eq!(r.planned_to, None);
        assert!((r.planned_effort - 12.5).abs() < f64::EPSILON);
        assert!(r.planned_weightage.abs() < f64::EPSILON);
        assert!(r.active_percentage.abs() < f64::EPSILON);
        assert_eq!(r.extra["owner"], "kim");
    }

    #[test]
    fn test_analytics_record_reads_wbs_path() {
        let json = r#"{"id":"a","parent":"root","$wbs":"1.2","plannedWeightage":3}"#;
        let r: AnalyticsRecord = serde_json::from_str(json).unwrap();
        assert_eq!(r.wbs.as_deref(), Some("1.2"));
        assert!(r.status.is_empty());
        assert!((r.planned_weightage - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_project_info_takes_first_of_each() {
        let json = r#"[
            null,
            {"title": "Project Team"},
            {"title": "Project Settings", "duration": "hours", "activepercentage": 40, "activeTaskProgressMetric": true},
            {"title": "Project Calendar", "weekends": ["Sunday"], "holidayEvents": [{"startDate": "2024-12-25"}, {}]},
            {"title": "Project Settings", "duration": "months"}
        ]"#;
        let entries: Vec<Option<ProjectInfoEntry>> = serde_json::from_str(json).unwrap();
        let info = ProjectInfo::from_entries(entries);

        let settings = info.settings.unwrap();
        assert_eq!(settings.duration.as_deref(), Some("hours"));
        assert!((settings.active_percentage - 40.0).abs() < f64::EPSILON);
        assert!(settings.active_task_progress_metric);

        let calendar = info.calendar.unwrap();
        assert_eq!(calendar.weekends, vec!["Sunday".to_string()]);
        assert_eq!(calendar.holiday_events.len(), 2);
        assert_eq!(calendar.holiday_events[1].start_date, None);
    }

    #[test]
    fn test_project_info_tolerates_nulls() {
        let json = r#"[
            {"title": "Project Settings", "duration": "days", "activepercentage": null, "activeTaskProgressMetric": null},
            {"title": "Project Calendar", "weekends": null, "holidayEvents": null}
        ]"#;
        let entries: Vec<Option<ProjectInfoEntry>> = serde_json::from_str(json).unwrap();
        let info = ProjectInfo::from_entries(entries);

        let settings = info.settings.unwrap();
        assert_eq!(settings.duration.as_deref(), Some("days"));
        assert!(!settings.active_task_progress_metric);
        assert!(settings.active_percentage.abs() < f64::EPSILON);

        let calendar = info.calendar.unwrap();
        assert!(calendar.weekends.is_empty());
        assert!(calendar.holiday_events.is_empty());
    }

    #[test]
    fn test_progress_flag_reads_text() {
        let json = r#"{"activeTaskProgressMetric": "true"}"#;
        let settings: ProjectSettings = serde_json::from_str(json).unwrap();
        assert!(settings.active_task_progress_metric);
    }

    #[test]
    fn test_record_id_keeps_its_key() {
        let plain: AnalyticsRecord = serde_json::from_str(r#"{"id":"a","$wbs":"1"}"#).unwrap();
        let underscored: AnalyticsRecord = serde_json::from_str(r#"{"_id":"b","$wbs":"1"}"#).unwrap();
        assert_eq!(plain.id, "a");
        assert_eq!(underscored.id, "b");

        let back = serde_json::to_value(&underscored).unwrap();
        assert_eq!(back["_id"], "b");
        assert!(back.get("id").is_none());
        assert!(back.get("parent").is_none());
        assert!(back.get("progress").is_none());

        let back = serde_json::to_value(&plain).unwrap();
        assert_eq!(back["id"], "a");
        assert!(back.get("_id").is_none());
    }

    #[test]
    fn test_record_without_id_rejected() {
        assert!(serde_json::from_str::<WorkbookRecord>(r#"{"orderID":"1"}"#).is_err());
    }
}
