//! Records, remote list views and the diff/patch types exchanged with the
//! list store.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tier::RiskTier;

/// A user's current risk classification as reported by the risk source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskRecord {
    /// Stable user handle (typically an email address).
    pub identifier: String,
    /// Current classification.
    pub tier: RiskTier,
    /// Number of risk events observed. Carried through, not used for reconciliation.
    #[serde(default)]
    pub event_count: u64,
    /// Timestamp of the most recent risk event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_event: Option<DateTime<Utc>>,
}

/// One page of a paginated collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based index of this page.
    pub current_page: u32,
    /// Total number of pages the source reports.
    pub total_pages: u32,
}

impl<T> Page<T> {
    /// Whether the source reports no further pages after this one.
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.current_page >= self.total_pages
    }
}

/// A page of risk records.
pub type RiskPage = Page<RiskRecord>;

/// A page of remote list items.
pub type ListPage = Page<RemoteListItem>;

/// An item as held by the remote list store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteListItem {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Remote list membership, fetched fresh for every comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteListState {
    pub list_id: String,
    pub items: Vec<RemoteListItem>,
}

impl RemoteListState {
    #[must_use]
    pub fn new(list_id: impl Into<String>, items: Vec<RemoteListItem>) -> Self {
        Self {
            list_id: list_id.into(),
            items,
        }
    }

    /// Member identifiers with set semantics.
    #[must_use]
    pub fn identifiers(&self) -> BTreeSet<String> {
        self.items.iter().map(|item| item.value.clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Set difference between expected and actual membership.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListDiff {
    /// `expected - actual`, sorted.
    pub to_add: Vec<String>,
    /// `actual - expected`, sorted.
    pub to_remove: Vec<String>,
}

impl ListDiff {
    /// Compute `to_add = expected - actual` and `to_remove = actual - expected`.
    #[must_use]
    pub fn compute(expected: &BTreeSet<String>, actual: &BTreeSet<String>) -> Self {
        Self {
            to_add: expected.difference(actual).cloned().collect(),
            to_remove: actual.difference(expected).cloned().collect(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Apply the diff to a membership set, returning the resulting set.
    #[must_use]
    pub fn apply_to(&self, actual: &BTreeSet<String>) -> BTreeSet<String> {
        let mut result = actual.clone();
        for value in &self.to_remove {
            result.remove(value);
        }
        result.extend(self.to_add.iter().cloned());
        result
    }
}

/// An item to append to a remote list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchItem {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Incremental mutation: only the delta is sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPatch {
    pub append: Vec<PatchItem>,
    pub remove: Vec<String>,
}

impl ListPatch {
    /// Build a patch from a diff, describing every appended item with `description`.
    #[must_use]
    pub fn from_diff(diff: &ListDiff, description: &str) -> Self {
        Self {
            append: diff
                .to_add
                .iter()
                .map(|value| PatchItem {
                    value: value.clone(),
                    description: Some(description.to_string()),
                })
                .collect(),
            remove: diff.to_remove.clone(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.append.is_empty() && self.remove.is_empty()
    }
}

/// Full-replace body for the secondary resync path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListReplacement {
    pub name: String,
    pub description: String,
    pub items: Vec<PatchItem>,
}
