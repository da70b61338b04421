//! File storage layer for benchmark history.
//!
//! Layout:
//! - One directory per repository under the data directory, named by a slug of
//!   the repository URL
//! - Each holds a `data.js` file in the dashboard's format:
//!   `window.BENCHMARK_DATA = { "lastUpdate": .., "repoUrl": .., "entries": {..} }`

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use super::history::HistoryStore;
use super::models::BenchmarkData;

/// Name of the history file inside a repository directory
pub const DATA_FILE: &str = "data.js";

/// Assignment prefix the dashboard expects in front of the JSON
pub const DATA_JS_PREFIX: &str = "window.BENCHMARK_DATA = ";

/// Parse `data.js` contents, accepting either the script form or bare JSON
pub fn parse_data_js(contents: &str) -> Result<BenchmarkData> {
    let trimmed = contents.trim();
    let json = trimmed
        .strip_prefix(DATA_JS_PREFIX.trim_end())
        .map(|rest| rest.trim_start())
        .unwrap_or(trimmed);
    // Some writers terminate the assignment with a semicolon
    let json = json.strip_suffix(';').unwrap_or(json);

    serde_json::from_str(json).context("Failed to parse benchmark data")
}

/// Render benchmark data in the dashboard's `data.js` script form.
///
/// The output ends at the closing brace, as the dashboard writes it.
pub fn render_data_js(data: &BenchmarkData) -> Result<String> {
    let json = serde_json::to_string_pretty(data).context("Failed to serialize benchmark data")?;
    Ok(format!("{DATA_JS_PREFIX}{json}"))
}

/// Directory-safe name for a repository URL
/// ("https://github.com/MystenLabs/sui" -> "github-com-MystenLabs-sui")
pub fn repo_slug(repo_url: &str) -> String {
    let without_scheme = repo_url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(repo_url);

    let mut slug = String::with_capacity(without_scheme.len());
    for c in without_scheme.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

/// Storage interface for benchmark history files
pub struct Storage {
    data_dir: PathBuf,
}

impl Storage {
    /// Create a new Storage instance rooted at the data directory
    pub fn new(data_dir: PathBuf) -> Self {
        Storage { data_dir }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get the path to a repository's history file
    pub fn repo_data_path(&self, repo_url: &str) -> PathBuf {
        self.data_dir.join(repo_slug(repo_url)).join(DATA_FILE)
    }

    /// Read and parse a single history file
    pub fn load_file(path: &Path) -> Result<BenchmarkData> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read history file: {path:?}"))?;
        parse_data_js(&contents).with_context(|| format!("Invalid history file: {path:?}"))
    }

    /// Load a repository's history, `None` if nothing was recorded yet
    pub fn load_repository(&self, repo_url: &str) -> Result<Option<BenchmarkData>> {
        let path = self.repo_data_path(repo_url);
        if !path.exists() {
            return Ok(None);
        }
        let data = Self::load_file(&path)?;
        if data.repo_url != repo_url {
            anyhow::bail!(
                "History file {path:?} belongs to {}, expected {repo_url}",
                data.repo_url
            );
        }
        Ok(Some(data))
    }

    /// Write a repository's history, replacing the previous file atomically
    pub fn save_repository(&self, data: &BenchmarkData) -> Result<PathBuf> {
        let path = self.repo_data_path(&data.repo_url);
        let dir = path
            .parent()
            .with_context(|| format!("History path has no parent: {path:?}"))?;
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {dir:?}"))?;

        let rendered = render_data_js(data)?;
        let tmp = path.with_extension("js.tmp");
        fs::write(&tmp, rendered).with_context(|| format!("Failed to write: {tmp:?}"))?;
        fs::rename(&tmp, &path).with_context(|| format!("Failed to replace: {path:?}"))?;

        debug!(repo = %data.repo_url, path = ?path, entries = data.entry_count(), "saved history");
        Ok(path)
    }

    /// List all stored repository histories, most recently updated first
    pub fn list_repositories(&self) -> Result<Vec<BenchmarkData>> {
        let mut repos = Vec::new();

        if !self.data_dir.exists() {
            return Ok(repos);
        }

        let entries = fs::read_dir(&self.data_dir)
            .with_context(|| format!("Failed to read directory: {:?}", self.data_dir))?;

        for entry in entries.flatten() {
            let path = entry.path().join(DATA_FILE);
            if path.is_file() {
                repos.push(Self::load_file(&path)?);
            }
        }

        repos.sort_by(|a, b| b.last_update.cmp(&a.last_update));
        Ok(repos)
    }

    /// Load every stored repository into a history store
    pub fn load_store(&self) -> Result<HistoryStore> {
        let mut store = HistoryStore::new();
        for data in self.list_repositories()? {
            let repo_url = data.repo_url.clone();
            store
                .insert_repository(data)
                .with_context(|| format!("Corrupt history for {repo_url}"))?;
        }
        Ok(store)
    }
}
