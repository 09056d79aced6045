//! Data models for survey responses.
//!
//! This module contains the core data structures shared by the store
//! adapters, the aggregator and the report views.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Store-assigned identifier of a response document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wraps an identifier handed out by a store.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server-assigned creation time of a response.
///
/// A freshly written document is visible before the store has resolved its
/// timestamp, so readers have to handle the pending state explicitly.
/// On the wire this is `null` while pending and an RFC 3339 string once
/// resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<DateTime<Utc>>", into = "Option<DateTime<Utc>>")]
pub enum CreatedAt {
    /// Not yet resolved by the store.
    #[default]
    Pending,
    /// Resolved creation time.
    Resolved(DateTime<Utc>),
}

impl CreatedAt {
    pub fn is_pending(&self) -> bool {
        matches!(self, CreatedAt::Pending)
    }

    /// Returns the resolved timestamp, if any.
    pub fn resolved(&self) -> Option<DateTime<Utc>> {
        match self {
            CreatedAt::Pending => None,
            CreatedAt::Resolved(ts) => Some(*ts),
        }
    }
}

impl From<Option<DateTime<Utc>>> for CreatedAt {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map_or(CreatedAt::Pending, CreatedAt::Resolved)
    }
}

impl From<CreatedAt> for Option<DateTime<Utc>> {
    fn from(value: CreatedAt) -> Self {
        value.resolved()
    }
}

impl fmt::Display for CreatedAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreatedAt::Pending => write!(f, "pending"),
            CreatedAt::Resolved(ts) => write!(f, "{}", ts.format("%H:%M - %Y-%m-%d")),
        }
    }
}

/// A stored survey response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    /// Identifier assigned by the store.
    pub id: RecordId,
    /// Name the respondent goes by.
    pub display_name: String,
    /// Group or unit the respondent belongs to.
    pub group: String,
    /// Phone-like contact string.
    pub contact: String,
    /// Interest category label. Missing values are tolerated on read and
    /// treated like any other label outside the known set.
    #[serde(default)]
    pub category: Option<String>,
    /// Creation time, pending until the store resolves it.
    #[serde(default)]
    pub created_at: CreatedAt,
}

/// A validated submission, ready to be appended to a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewResponse {
    pub display_name: String,
    pub group: String,
    pub contact: String,
    pub category: String,
}

impl NewResponse {
    /// Turns the submission into a stored record with store-assigned fields.
    pub fn into_record(self, id: RecordId, created_at: CreatedAt) -> ResponseRecord {
        ResponseRecord {
            id,
            display_name: self.display_name,
            group: self.group,
            contact: self.contact,
            category: Some(self.category),
            created_at,
        }
    }
}

/// The full current member set of a collection.
///
/// `version` increases with every delivery from the same subscription.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub version: u64,
    pub records: Vec<ResponseRecord>,
}

impl Snapshot {
    pub fn new(version: u64, records: Vec<ResponseRecord>) -> Self {
        Self { version, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Why a list of category labels was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CategorySetError {
    #[error("at least one category must be configured")]
    Empty,
    #[error("category labels must not be blank")]
    Blank,
    #[error("duplicate category label: {0}")]
    Duplicate(String),
}

/// The fixed, ordered set of categories the dashboards report on.
///
/// The order is the display order of every per-category output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySet(Vec<String>);

impl CategorySet {
    /// Builds a category set, rejecting empty, blank or duplicate labels.
    pub fn new<I, S>(labels: I) -> Result<Self, CategorySetError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen: Vec<String> = Vec::new();

        for label in labels {
            let label = label.into();
            if label.trim().is_empty() {
                return Err(CategorySetError::Blank);
            }
            if seen.contains(&label) {
                return Err(CategorySetError::Duplicate(label));
            }
            seen.push(label);
        }

        if seen.is_empty() {
            return Err(CategorySetError::Empty);
        }

        Ok(Self(seen))
    }

    /// Iterates labels in configured order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.iter().any(|known| known == label)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Count and percentage for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStats {
    pub category: String,
    pub count: usize,
    pub percentage: f64,
}

/// Aggregate statistics over one snapshot.
///
/// Both maps always hold every known category, in configured order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateStats {
    /// Number of records in the snapshot, including unknown categories.
    pub total: usize,
    /// Occurrences of each known category.
    pub count_by_category: IndexMap<String, usize>,
    /// Share of each known category in percent, rounded.
    pub percentage_by_category: IndexMap<String, f64>,
}

impl AggregateStats {
    pub fn count(&self, category: &str) -> usize {
        self.count_by_category.get(category).copied().unwrap_or(0)
    }

    pub fn percentage(&self, category: &str) -> f64 {
        self.percentage_by_category
            .get(category)
            .copied()
            .unwrap_or(0.0)
    }

    /// Records counted in some known category.
    pub fn accounted(&self) -> usize {
        self.count_by_category.values().sum()
    }

    /// Records whose category is missing or outside the known set.
    pub fn unaccounted(&self) -> usize {
        self.total - self.accounted()
    }

    /// Per-category rows in configured order.
    pub fn breakdown(&self) -> Vec<CategoryStats> {
        self.count_by_category
            .iter()
            .map(|(category, &count)| CategoryStats {
                category: category.clone(),
                count,
                percentage: self.percentage(category),
            })
            .collect()
    }
}
