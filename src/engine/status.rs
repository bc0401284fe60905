//! Status Classification and Roll-up.
//!
//! The vocabulary is split once per run into four category buckets. A parent's
//! status is derived from the distinct set of its children's statuses, falling
//! back to the canonical id of a category when the children disagree.

use super::error::{Result, RollupError};
use super::types::{StatusCategory, StatusEntry, TASK_WORK_ITEM};
use std::collections::{BTreeMap, BTreeSet};

/// Task status ids grouped by category, plus one canonical id per category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusIndex {
    buckets: BTreeMap<StatusCategory, Vec<String>>,
    canonical: BTreeMap<StatusCategory, String>,
}

impl StatusIndex {
    /// Classifies the `Task` entries of a vocabulary, keeping vocabulary order.
    ///
    /// The first id of each bucket becomes that category's canonical id.
    #[must_use]
    pub fn from_vocabulary(vocabulary: &[StatusEntry]) -> Self {
        let mut buckets: BTreeMap<StatusCategory, Vec<String>> = StatusCategory::ROLLUP
            .iter()
            .map(|c| (*c, Vec::new()))
            .collect();

        for entry in vocabulary.iter().filter(|e| e.work_item == TASK_WORK_ITEM) {
            if let Some(bucket) = buckets.get_mut(&entry.category) {
                bucket.push(entry.id.clone());
            }
        }

        let canonical = buckets
            .iter()
            .filter_map(|(category, ids)| ids.first().map(|id| (*category, id.clone())))
            .collect();

        Self { buckets, canonical }
    }

    /// Pins the canonical id of a category to a specific member of its bucket.
    ///
    /// # Errors
    /// Returns `UnknownCanonicalStatus` if `id` is not in that category.
    pub fn with_canonical(mut self, category: StatusCategory, id: &str) -> Result<Self> {
        if !self.bucket(category).iter().any(|s| s == id) {
            return Err(RollupError::UnknownCanonicalStatus {
                category,
                id: id.to_string(),
            });
        }
        self.canonical.insert(category, id.to_string());
        Ok(self)
    }

    /// All ids of a category, in vocabulary order.
    #[must_use]
    pub fn bucket(&self, category: StatusCategory) -> &[String] {
        self.buckets.get(&category).map(Vec::as_slice).unwrap_or_default()
    }

    /// The canonical id of a category, if the category has any status.
    #[must_use]
    pub fn canonical_opt(&self, category: StatusCategory) -> Option<&str> {
        self.canonical.get(&category).map(String::as_str)
    }

    /// The canonical id of a category.
    ///
    /// # Errors
    /// Returns `MissingCanonicalStatus` when no status is configured for it.
    pub fn canonical(&self, category: StatusCategory) -> Result<&str> {
        self.canonical_opt(category)
            .ok_or(RollupError::MissingCanonicalStatus(category))
    }

    /// The roll-up category of a status id, if it has one.
    #[must_use]
    pub fn category_of(&self, id: &str) -> Option<StatusCategory> {
        self.buckets
            .iter()
            .find(|(_, ids)| ids.iter().any(|s| s == id))
            .map(|(category, _)| *category)
    }
}

/// Derives one parent status from its children's statuses.
///
/// - several distinct statuses: exactly {Completed, Approved} gives Completed,
///   anything else gives Active
/// - one distinct status: that status
/// - none: New
///
/// # Errors
/// Returns `MissingCanonicalStatus` if the chosen category has no status.
pub fn rollup_status<S: AsRef<str>>(children: &[S], index: &StatusIndex) -> Result<String> {
    let distinct: BTreeSet<&str> = children.iter().map(|s| s.as_ref()).collect();

    match distinct.len() {
        0 => index.canonical(StatusCategory::New).map(str::to_string),
        1 => Ok(distinct.into_iter().next().unwrap_or_default().to_string()),
        _ => {
            if is_completed_approved_pair(&distinct, index) {
                index.canonical(StatusCategory::Completed).map(str::to_string)
            } else {
                index.canonical(StatusCategory::Active).map(str::to_string)
            }
        }
    }
}

fn is_completed_approved_pair(distinct: &BTreeSet<&str>, index: &StatusIndex) -> bool {
    let (Some(completed), Some(approved)) = (
        index.canonical_opt(StatusCategory::Completed),
        index.canonical_opt(StatusCategory::Approved),
    ) else {
        return false;
    };
    distinct.len() == 2 && distinct.contains(completed) && distinct.contains(approved)
}

/// Every vocabulary entry carrying `id`, in vocabulary order.
#[must_use]
pub fn expand_status(id: &str, vocabulary: &[StatusEntry]) -> Vec<StatusEntry> {
    vocabulary.iter().filter(|e| e.id == id).cloned().collect()
}
