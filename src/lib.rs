//! bench-history: an append-only benchmark history store.
//!
//! Records benchmark runs per repository and suite in the layout consumed by
//! continuous-benchmarking dashboards, and answers history, latest-run and
//! regression queries over it.

pub mod data;

pub use data::{BenchmarkData, Entry, HistoryError, HistoryStore, Measurement, Storage};
