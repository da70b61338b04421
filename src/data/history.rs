//! In-memory benchmark history store.
//!
//! Holds one [`BenchmarkData`] per repository URL. Entries are append-only and
//! each suite stays ordered by capture date; query and regression checks are
//! read-side aggregations over that log.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::error::{HistoryError, Result};
use super::models::{BenchmarkData, Entry, HistoryPoint};
use super::regression::{self, RegressionReport};

/// Append-only benchmark history for any number of repositories
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryStore {
    repos: BTreeMap<String, BenchmarkData>,
}

impl HistoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a previously persisted repository history, replacing any in memory.
    ///
    /// Every suite must already be in capture order with valid measurements.
    /// `last_update` is reset to the newest entry date; a history with no
    /// entries keeps the stored value.
    pub fn insert_repository(&mut self, mut data: BenchmarkData) -> Result<()> {
        for (suite, entries) in &data.entries {
            for pair in entries.windows(2) {
                if pair[1].date < pair[0].date {
                    return Err(HistoryError::invalid(format!(
                        "suite {suite:?} of {} is out of order at commit {}",
                        data.repo_url, pair[1].commit.id
                    )));
                }
            }
            for entry in entries {
                validate_measurements(entry)?;
            }
        }

        if let Some(max_date) = data.max_entry_date() {
            if max_date != data.last_update {
                debug!(
                    repo = %data.repo_url,
                    stored = data.last_update,
                    newest = max_date,
                    "realigned last update with newest entry"
                );
            }
            data.last_update = max_date;
        }

        debug!(
            repo = %data.repo_url,
            entries = data.entry_count(),
            "loaded repository history"
        );
        self.repos.insert(data.repo_url.clone(), data);
        Ok(())
    }

    /// Append `entry` to the end of `(repo_url, suite)`, creating either if absent.
    ///
    /// Rejects entries captured before the suite's newest entry, entries
    /// carrying NaN, infinite or negative values, and entries naming the same
    /// benchmark twice. A rejected append leaves the store untouched.
    pub fn append(&mut self, repo_url: &str, suite: &str, entry: Entry) -> Result<()> {
        if let Err(err) = self.check_append(repo_url, suite, &entry) {
            warn!(repo = repo_url, suite, commit = %entry.commit.id, %err, "rejected entry");
            return Err(err);
        }

        let data = self
            .repos
            .entry(repo_url.to_string())
            .or_insert_with(|| BenchmarkData::new(repo_url));
        data.last_update = data.last_update.max(entry.date);

        debug!(
            repo = repo_url,
            suite,
            commit = %entry.commit.id,
            date = entry.date,
            benches = entry.benches.len(),
            "appended entry"
        );
        data.entries.entry(suite.to_string()).or_default().push(entry);
        Ok(())
    }

    fn check_append(&self, repo_url: &str, suite: &str, entry: &Entry) -> Result<()> {
        validate_measurements(entry)?;

        if let Some(last) = self.latest(repo_url, suite) {
            if entry.date < last.date {
                return Err(HistoryError::invalid(format!(
                    "captured at {} but suite {suite:?} was last updated at {}",
                    entry.date, last.date
                )));
            }
        }
        Ok(())
    }

    /// History of `bench` across all entries of a suite, in insertion order.
    ///
    /// Unknown repositories, suites or benchmarks yield an empty sequence. The
    /// returned iterator can be cloned to restart it.
    pub fn query<'a>(
        &'a self,
        repo_url: &str,
        suite: &str,
        bench: &'a str,
    ) -> impl Iterator<Item = HistoryPoint<'a>> + Clone + 'a {
        self.suite_entries(repo_url, suite)
            .iter()
            .filter_map(move |entry| {
                entry.bench(bench).map(move |m| HistoryPoint {
                    timestamp: entry.date,
                    value: m.value,
                    unit: &m.unit,
                    commit_id: &entry.commit.id,
                })
            })
    }

    /// The most recently appended entry of a suite
    pub fn latest(&self, repo_url: &str, suite: &str) -> Option<&Entry> {
        self.suite_entries(repo_url, suite).last()
    }

    /// Whether the latest `bench` value exceeds `(1 + threshold_ratio)` times
    /// the mean of all prior values
    pub fn detect_regression(
        &self,
        repo_url: &str,
        suite: &str,
        bench: &str,
        threshold_ratio: f64,
    ) -> Result<bool> {
        self.assess_regression(repo_url, suite, bench, threshold_ratio)
            .map(|report| report.regressed)
    }

    /// Full regression report for the latest `bench` value
    pub fn assess_regression(
        &self,
        repo_url: &str,
        suite: &str,
        bench: &str,
        threshold_ratio: f64,
    ) -> Result<RegressionReport> {
        regression::assess(bench, self.query(repo_url, suite, bench), threshold_ratio)
    }

    pub fn repository(&self, repo_url: &str) -> Option<&BenchmarkData> {
        self.repos.get(repo_url)
    }

    /// All repositories, ordered by URL
    pub fn repositories(&self) -> impl Iterator<Item = &BenchmarkData> {
        self.repos.values()
    }

    /// Suite names of a repository
    pub fn suites<'a>(&'a self, repo_url: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.repos
            .get(repo_url)
            .into_iter()
            .flat_map(|data| data.entries.keys().map(String::as_str))
    }

    /// Distinct benchmark names of a suite, in first-seen order
    pub fn benchmark_names(&self, repo_url: &str, suite: &str) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for m in self.suite_entries(repo_url, suite).iter().flat_map(|e| &e.benches) {
            if !names.contains(&m.name.as_str()) {
                names.push(&m.name);
            }
        }
        names
    }

    /// Consume the store, yielding each repository's persisted form
    pub fn into_repositories(self) -> impl Iterator<Item = BenchmarkData> {
        self.repos.into_values()
    }

    fn suite_entries(&self, repo_url: &str, suite: &str) -> &[Entry] {
        self.repos
            .get(repo_url)
            .and_then(|data| data.entries.get(suite))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Each measurement must hold a valid value and a name unique within the entry
fn validate_measurements(entry: &Entry) -> Result<()> {
    for (idx, m) in entry.benches.iter().enumerate() {
        if !m.is_valid() {
            return Err(HistoryError::invalid(format!(
                "measurement {:?} of commit {} has invalid value {}",
                m.name, entry.commit.id, m.value
            )));
        }
        if entry.benches[..idx].iter().any(|prev| prev.name == m.name) {
            return Err(HistoryError::invalid(format!(
                "measurement {:?} appears more than once in commit {}",
                m.name, entry.commit.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::data::models::{CommitInfo, GitUser, Measurement};

    const REPO: &str = "https://github.com/MystenLabs/sui";
    const SUITE: &str = "Benchmark";

    fn user(name: &str) -> GitUser {
        GitUser {
            email: format!("{name}@example.com"),
            name: name.to_string(),
            username: name.to_lowercase(),
        }
    }

    fn make_entry(id: &str, date: i64, benches: &[(&str, f64)]) -> Entry {
        Entry {
            commit: CommitInfo {
                author: user("Author"),
                committer: user("Committer"),
                distinct: true,
                id: id.to_string(),
                message: format!("commit {id}"),
                timestamp: "2023-11-28T14:35:57-08:00".to_string(),
                tree_id: format!("tree-{id}"),
                url: format!("{REPO}/commit/{id}"),
            },
            date,
            tool: "cargo".to_string(),
            benches: benches
                .iter()
                .map(|&(name, value)| Measurement::new(name, value, "ns/iter"))
                .collect(),
        }
    }

    fn values(store: &HistoryStore, bench: &str) -> Vec<f64> {
        store.query(REPO, SUITE, bench).map(|p| p.value).collect()
    }

    #[test]
    fn test_latest_is_last_appended() {
        let mut store = HistoryStore::new();
        assert!(store.latest(REPO, SUITE).is_none());

        for (i, date) in [10, 20, 20, 35].into_iter().enumerate() {
            let entry = make_entry(&format!("c{i}"), date, &[("get_checkpoint", 1.0)]);
            store.append(REPO, SUITE, entry.clone()).unwrap();
            assert_eq!(store.latest(REPO, SUITE), Some(&entry));
        }
        assert_eq!(store.repository(REPO).unwrap().last_update, 35);
    }

    #[test]
    fn test_out_of_order_append_is_rejected() {
        let mut store = HistoryStore::new();
        store
            .append(REPO, SUITE, make_entry("a", 100, &[("get_checkpoint", 1.0)]))
            .unwrap();
        let before = store.clone();

        let err = store
            .append(REPO, SUITE, make_entry("b", 99, &[("get_checkpoint", 2.0)]))
            .unwrap_err();

        assert!(matches!(err, HistoryError::InvalidEntry { .. }));
        assert_eq!(store, before);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut store = HistoryStore::new();
        for value in [f64::NAN, f64::INFINITY, -1.0] {
            let err = store
                .append(REPO, SUITE, make_entry("a", 1, &[("ok", 1.0), ("bad", value)]))
                .unwrap_err();
            assert!(matches!(err, HistoryError::InvalidEntry { .. }));
        }
        assert_eq!(store, HistoryStore::new());
    }

    #[test]
    fn test_query_unknown_is_empty() {
        let mut store = HistoryStore::new();
        assert_eq!(store.query(REPO, SUITE, "get_checkpoint").count(), 0);

        store
            .append(REPO, SUITE, make_entry("a", 1, &[("get_checkpoint", 1.0)]))
            .unwrap();
        assert_eq!(store.query(REPO, SUITE, "missing").count(), 0);
        assert_eq!(store.query(REPO, "Other", "get_checkpoint").count(), 0);
        assert_eq!(store.query("https://example.com/x", SUITE, "get_checkpoint").count(), 0);
    }

    #[test]
    fn test_query_is_ordered_and_restartable() {
        let mut store = HistoryStore::new();
        store.append(REPO, SUITE, make_entry("a", 1, &[("x", 3.0), ("y", 9.0)])).unwrap();
        store.append(REPO, SUITE, make_entry("b", 2, &[("y", 8.0)])).unwrap();
        store.append(REPO, SUITE, make_entry("c", 3, &[("x", 1.0)])).unwrap();

        let query = store.query(REPO, SUITE, "x");
        let first: Vec<(i64, f64, &str)> = query.clone().map(|p| (p.timestamp, p.value, p.commit_id)).collect();
        let second: Vec<(i64, f64, &str)> = query.map(|p| (p.timestamp, p.value, p.commit_id)).collect();

        assert_eq!(first, vec![(1, 3.0, "a"), (3, 1.0, "c")]);
        assert_eq!(first, second);
        assert_eq!(values(&store, "y"), vec![9.0, 8.0]);
        assert_eq!(store.benchmark_names(REPO, SUITE), vec!["x", "y"]);
    }

    #[test]
    fn test_suites_are_independent() {
        let mut store = HistoryStore::new();
        store.append(REPO, "Fast", make_entry("a", 100, &[("x", 1.0)])).unwrap();
        store.append(REPO, "Slow", make_entry("b", 50, &[("x", 2.0)])).unwrap();

        let suites: Vec<&str> = store.suites(REPO).collect();
        assert_eq!(suites, vec!["Fast", "Slow"]);
        // last update tracks the newest entry across suites
        assert_eq!(store.repository(REPO).unwrap().last_update, 100);
    }

    #[test]
    fn test_get_checkpoint_regression() {
        let mut store = HistoryStore::new();
        store
            .append(REPO, SUITE, make_entry("a", 1, &[("get_checkpoint", 393857.0)]))
            .unwrap();
        store
            .append(REPO, SUITE, make_entry("b", 2, &[("get_checkpoint", 377622.0)]))
            .unwrap();

        let err = store
            .detect_regression(REPO, SUITE, "get_checkpoint", 0.0)
            .unwrap_err();
        assert_eq!(
            err,
            HistoryError::InsufficientHistory {
                benchmark: "get_checkpoint".to_string(),
                priors: 1,
            }
        );

        store
            .append(REPO, SUITE, make_entry("c", 3, &[("get_checkpoint", 500000.0)]))
            .unwrap();
        assert!(store.detect_regression(REPO, SUITE, "get_checkpoint", 0.1).unwrap());

        let report = store
            .assess_regression(REPO, SUITE, "get_checkpoint", 0.1)
            .unwrap();
        assert_eq!(report.commit, "c");
        assert_eq!(report.unit, "ns/iter");
    }

    #[test]
    fn test_insert_repository_rejects_unordered_history() {
        let mut data = BenchmarkData::new(REPO);
        data.entries.insert(
            SUITE.to_string(),
            vec![make_entry("a", 2, &[("x", 1.0)]), make_entry("b", 1, &[("x", 1.0)])],
        );

        let mut store = HistoryStore::new();
        assert!(matches!(
            store.insert_repository(data),
            Err(HistoryError::InvalidEntry { .. })
        ));
        assert!(store.repository(REPO).is_none());
    }

    #[test]
    fn test_duplicate_measurement_names_are_rejected() {
        let mut store = HistoryStore::new();
        let err = store
            .append(REPO, SUITE, make_entry("a", 1, &[("x", 1.0), ("y", 3.0), ("x", 2.0)]))
            .unwrap_err();
        assert!(matches!(err, HistoryError::InvalidEntry { .. }));
        assert_eq!(store.query(REPO, SUITE, "x").count(), 0);

        let mut data = BenchmarkData::new(REPO);
        data.entries.insert(
            SUITE.to_string(),
            vec![make_entry("a", 1, &[("x", 1.0), ("x", 2.0)])],
        );
        assert!(store.insert_repository(data).is_err());
    }

    #[test]
    fn test_loaded_last_update_tracks_newest_entry() {
        let mut data = BenchmarkData::new(REPO);
        data.last_update = 1701211399136;
        data.entries.insert(
            SUITE.to_string(),
            vec![make_entry("a", 1701211394019, &[("get_checkpoint", 393857.0)])],
        );

        let mut store = HistoryStore::new();
        store.insert_repository(data).unwrap();
        assert_eq!(store.repository(REPO).unwrap().last_update, 1701211394019);

        // lands between the stored entry and the file's original last update
        store
            .append(REPO, SUITE, make_entry("b", 1701211396000, &[("get_checkpoint", 377622.0)]))
            .unwrap();
        let data = store.repository(REPO).unwrap();
        assert_eq!(data.last_update, 1701211396000);
        assert_eq!(data.max_entry_date(), Some(data.last_update));

        let restored: Vec<BenchmarkData> = store.into_repositories().collect();
        assert_eq!(restored[0].entries[SUITE].len(), 2);
    }

    #[test]
    fn test_empty_repository_keeps_stored_last_update() {
        let mut data = BenchmarkData::new(REPO);
        data.last_update = 42;

        let mut store = HistoryStore::new();
        store.insert_repository(data.clone()).unwrap();
        assert_eq!(store.repository(REPO), Some(&data));
    }
}
