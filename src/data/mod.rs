//! Data layer for benchmark history.
//!
//! Handles the history models, the append-only store with its queries and
//! regression checks, file persistence, and the documentation sidebar tree.

mod comparison;
mod error;
mod history;
mod models;
mod regression;
mod sidebar;
mod storage;

pub use comparison::{compare_entries, BenchComparison};
pub use error::{HistoryError, Result};
pub use history::HistoryStore;
pub use models::{BenchmarkData, CommitInfo, Entry, GitUser, HistoryPoint, Measurement};
pub use regression::{RegressionReport, MIN_PRIORS};
pub use sidebar::{CategoryLink, Sidebar, SidebarItem, SidebarNode};
pub use storage::{parse_data_js, render_data_js, repo_slug, Storage, DATA_FILE};
