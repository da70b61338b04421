//! Command execution for the bench-history binary.

use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use bench_history::data::{
    compare_entries, BenchComparison, Entry, HistoryPoint, HistoryStore, RegressionReport,
    Sidebar, Storage,
};
use chrono::DateTime;
use tracing::info;

use crate::cli::{AppConfig, Commands};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Exit status when `check` finds a regression
pub const REGRESSION_STATUS: u8 = 1;

/// Exit status when a command fails (bad input, corrupt history, I/O)
pub const ERROR_STATUS: u8 = 2;

/// How a successful command finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Regression,
}

/// Process exit status for a command result
pub fn exit_status(result: &Result<Outcome>) -> u8 {
    match result {
        Ok(Outcome::Success) => 0,
        Ok(Outcome::Regression) => REGRESSION_STATUS,
        Err(_) => ERROR_STATUS,
    }
}

/// Run a single command against the configured data directory
pub fn run(config: &AppConfig, command: Commands) -> Result<Outcome> {
    let storage = Storage::new(config.data_dir.clone());
    let mut out = io::stdout().lock();

    match command {
        Commands::List => list(&storage, &mut out)?,
        Commands::Append { repo, suite, entry } => {
            let entry = read_entry(&entry)?;
            append(&storage, &repo, &suite, entry, &mut out)?;
        }
        Commands::Query { repo, suite, bench } => {
            let store = load_repo_store(&storage, &repo)?;
            write_history(&mut out, store.query(&repo, &suite, &bench))?;
        }
        Commands::Latest { repo, suite } => {
            let store = load_repo_store(&storage, &repo)?;
            match store.latest(&repo, &suite) {
                Some(entry) => write_entry(&mut out, entry)?,
                None => writeln!(out, "No entries recorded for {repo} [{suite}]")?,
            }
        }
        Commands::Check {
            repo,
            suite,
            bench,
            threshold,
        } => return check(&storage, &repo, &suite, &bench, threshold, &mut out),
        Commands::Sidebar { file } => {
            let sidebar = load_sidebar(&file)?;
            write!(out, "{}", sidebar.outline())?;
        }
    }

    Ok(Outcome::Success)
}

fn check(
    storage: &Storage,
    repo: &str,
    suite: &str,
    bench: &str,
    threshold: f64,
    out: &mut impl Write,
) -> Result<Outcome> {
    let store = load_repo_store(storage, repo)?;
    let report = store
        .assess_regression(repo, suite, bench, threshold)
        .with_context(|| format!("Cannot check {bench} in {repo} [{suite}]"))?;
    write_report(out, &report)?;

    if report.regressed {
        Ok(Outcome::Regression)
    } else {
        Ok(Outcome::Success)
    }
}

/// Load a single repository's history into a fresh store (empty if none saved)
fn load_repo_store(storage: &Storage, repo: &str) -> Result<HistoryStore> {
    let mut store = HistoryStore::new();
    if let Some(data) = storage.load_repository(repo)? {
        store
            .insert_repository(data)
            .with_context(|| format!("Corrupt history for {repo}"))?;
    }
    Ok(store)
}

fn read_entry(source: &str) -> Result<Entry> {
    let json = if source == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read entry from stdin")?;
        buf
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read entry file: {source}"))?
    };
    serde_json::from_str(&json).with_context(|| format!("Invalid entry JSON in {source}"))
}

fn load_sidebar(path: &Path) -> Result<Sidebar> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read sidebar: {path:?}"))?;
    Sidebar::from_json(&json).with_context(|| format!("Invalid sidebar: {path:?}"))
}

fn list(storage: &Storage, out: &mut impl Write) -> Result<()> {
    let repos = storage.list_repositories()?;
    if repos.is_empty() {
        writeln!(out, "No histories in {:?}", storage.data_dir())?;
        return Ok(());
    }

    writeln!(out, "{:<24} {:>8}  REPOSITORY", "LAST UPDATE", "ENTRIES")?;
    for data in repos {
        let last = data
            .last_updated()
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        writeln!(out, "{last:<24} {:>8}  {}", data.entry_count(), data.repo_url)?;
    }
    Ok(())
}

fn append(
    storage: &Storage,
    repo: &str,
    suite: &str,
    entry: Entry,
    out: &mut impl Write,
) -> Result<()> {
    let mut store = load_repo_store(storage, repo)?;
    let previous = store.latest(repo, suite).cloned();

    store
        .append(repo, suite, entry)
        .with_context(|| format!("Cannot append to {repo} [{suite}]"))?;

    let data = store
        .repository(repo)
        .context("Repository missing after append")?;
    let path = storage.save_repository(data)?;
    info!(repo, suite, path = ?path, "history updated");

    if let Some(latest) = store.latest(repo, suite) {
        writeln!(
            out,
            "Recorded {} ({} benchmarks) in {repo} [{suite}]",
            latest.commit.short_id(),
            latest.benches.len()
        )?;
        write_comparison(out, compare_entries(previous.as_ref(), latest))?;
    }
    Ok(())
}

fn write_history<'a>(
    out: &mut impl Write,
    points: impl Iterator<Item = HistoryPoint<'a>>,
) -> Result<()> {
    let mut count = 0;
    for point in points {
        if count == 0 {
            writeln!(out, "{:<24} {:<8} {:>14}  UNIT", "DATE", "COMMIT", "VALUE")?;
        }
        writeln!(
            out,
            "{:<24} {:<8} {:>14}  {}",
            format_date(point.timestamp),
            short(point.commit_id),
            format_value(point.value),
            point.unit
        )?;
        count += 1;
    }
    if count == 0 {
        writeln!(out, "No history recorded")?;
    }
    Ok(())
}

fn write_entry(out: &mut impl Write, entry: &Entry) -> Result<()> {
    writeln!(out, "commit  {}", entry.commit.id)?;
    writeln!(
        out,
        "author  {} <{}>",
        entry.commit.author.name, entry.commit.author.email
    )?;
    writeln!(out, "date    {}", format_date(entry.date))?;
    writeln!(out, "tool    {}", entry.tool)?;
    writeln!(out, "\n    {}\n", entry.commit.summary())?;
    for bench in &entry.benches {
        let range = bench.range.as_deref().unwrap_or("");
        writeln!(
            out,
            "{:<40} {:>14} {:<12} {}",
            bench.name,
            format_value(bench.value),
            range,
            bench.unit
        )?;
    }
    Ok(())
}

fn write_comparison<'a>(
    out: &mut impl Write,
    rows: impl Iterator<Item = BenchComparison<'a>>,
) -> Result<()> {
    for row in rows {
        let previous = row
            .previous
            .map(format_value)
            .unwrap_or_else(|| "-".to_string());
        let ratio = row
            .ratio()
            .map(|r| format!("{r:.2}x"))
            .unwrap_or_else(|| "new".to_string());
        writeln!(
            out,
            "{:<40} {:>14} -> {:>14} {:<8} {}",
            row.name,
            previous,
            format_value(row.current),
            ratio,
            row.unit
        )?;
    }
    Ok(())
}

fn write_report(out: &mut impl Write, report: &RegressionReport) -> Result<()> {
    let change = report
        .change_ratio
        .map(|r| format!("{:+.2}%", r * 100.0))
        .unwrap_or_else(|| "n/a".to_string());
    writeln!(out, "benchmark  {}", report.benchmark)?;
    writeln!(out, "commit     {}", short(&report.commit))?;
    writeln!(out, "latest     {} {}", format_value(report.latest), report.unit)?;
    writeln!(
        out,
        "baseline   {} {} (mean of {} runs)",
        format_value(report.baseline),
        report.unit,
        report.priors
    )?;
    writeln!(out, "change     {change} (threshold {:+.2}%)", report.threshold * 100.0)?;
    writeln!(
        out,
        "verdict    {}",
        if report.regressed { "REGRESSION" } else { "ok" }
    )?;
    Ok(())
}

fn short(commit_id: &str) -> &str {
    commit_id.get(..7).unwrap_or(commit_id)
}

fn format_date(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else if value.abs() < 0.001 || value.abs() >= 1e6 {
        format!("{value:.3e}")
    } else {
        format!("{value:.4}")
    }
}
