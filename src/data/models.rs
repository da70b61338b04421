//! Data models mirroring the dashboard's benchmark history layout.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Characters of the commit hash shown in tables
const SHORT_ID_LEN: usize = 7;

/// Largest integer an f64 holds exactly (2^53)
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Full benchmark history of one repository, as persisted in `data.js`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkData {
    /// Epoch milliseconds of the newest entry across all suites; realigned to
    /// that date when loaded into a store
    pub last_update: i64,
    pub repo_url: String,
    /// Entries per suite, in insertion order
    pub entries: BTreeMap<String, Vec<Entry>>,
}

impl BenchmarkData {
    /// Create an empty history for a repository
    pub fn new(repo_url: impl Into<String>) -> Self {
        BenchmarkData {
            last_update: 0,
            repo_url: repo_url.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Total number of entries across all suites
    pub fn entry_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// The newest capture date over all entries, if any
    pub fn max_entry_date(&self) -> Option<i64> {
        self.entries.values().flatten().map(|e| e.date).max()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.last_update)
    }
}

/// A Git identity as reported by the hosting service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitUser {
    pub email: String,
    pub name: String,
    pub username: String,
}

/// Commit a benchmark run was produced from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub author: GitUser,
    pub committer: GitUser,
    pub distinct: bool,
    pub id: String,
    pub message: String,
    /// ISO 8601, kept verbatim so the offset survives a rewrite
    pub timestamp: String,
    pub tree_id: String,
    pub url: String,
}

impl CommitInfo {
    /// Parsed commit timestamp, `None` when the stored string is malformed
    pub fn committed_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    }

    /// Abbreviated hash for display
    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(SHORT_ID_LEN) {
            Some((idx, _)) => &self.id[..idx],
            None => &self.id,
        }
    }

    /// First line of the commit message
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or_default().trim_end()
    }
}

/// One benchmark run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub commit: CommitInfo,
    /// Capture date in epoch milliseconds
    pub date: i64,
    /// Tool that produced the measurements (e.g. "cargo")
    pub tool: String,
    pub benches: Vec<Measurement>,
}

impl Entry {
    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.date)
    }

    /// Measurement with the given name, if this run recorded one
    pub fn bench(&self, name: &str) -> Option<&Measurement> {
        self.benches.iter().find(|m| m.name == name)
    }
}

/// A single named metric value from one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub name: String,
    #[serde(serialize_with = "serialize_value")]
    pub value: f64,
    /// Display-formatted uncertainty, e.g. "± 23495"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
}

impl Measurement {
    pub fn new(name: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Measurement {
            name: name.into(),
            value,
            range: None,
            unit: unit.into(),
            extra: None,
        }
    }

    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = Some(range.into());
        self
    }

    /// Numeric half-width of the display range ("± 23495" -> 23495.0)
    pub fn range_value(&self) -> Option<f64> {
        let range = self.range.as_deref()?;
        let number = range
            .trim()
            .trim_start_matches('±')
            .trim_start_matches("+/-")
            .trim()
            .replace(',', "");
        number.parse::<f64>().ok()
    }

    /// Timing values must be finite and non-negative
    pub fn is_valid(&self) -> bool {
        self.value.is_finite() && self.value >= 0.0
    }
}

/// Write integral values as JSON integers, matching the dashboard's own files
fn serialize_value<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < MAX_EXACT_INTEGER {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

/// One point of a benchmark's history, yielded by queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryPoint<'a> {
    /// Capture date of the entry in epoch milliseconds
    pub timestamp: i64,
    pub value: f64,
    pub unit: &'a str,
    pub commit_id: &'a str,
}
