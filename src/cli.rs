//! Command-line interface argument parsing for bench-history.
//!
//! - `bench-history append --repo https://github.com/org/repo entry.json`
//! - `bench-history query --repo https://github.com/org/repo --bench get_checkpoint`
//! - `bench-history check --repo https://github.com/org/repo --bench get_checkpoint --threshold 0.2`

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use tracing::Level;

use crate::telemetry::level_from_verbosity;

/// Suite name used by the dashboard when none is configured
pub const DEFAULT_SUITE: &str = "Benchmark";

/// Default regression threshold ratio
pub const DEFAULT_THRESHOLD: f64 = 0.1;

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "BENCH_HISTORY_DIR";

/// Append-only benchmark history for continuous-benchmarking dashboards.
#[derive(Parser, Debug)]
#[command(name = "bench-history")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding repository histories.
    /// Defaults to $BENCH_HISTORY_DIR, then ~/.cache/bench-history/
    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List repositories with recorded history
    List,

    /// Append one benchmark run to a repository's history
    Append {
        /// Repository URL
        #[arg(short, long)]
        repo: String,

        /// Benchmark suite name
        #[arg(short, long, default_value = DEFAULT_SUITE)]
        suite: String,

        /// Path to the entry JSON, or "-" to read stdin
        entry: String,
    },

    /// Print the history of one benchmark
    Query {
        #[arg(short, long)]
        repo: String,

        #[arg(short, long, default_value = DEFAULT_SUITE)]
        suite: String,

        /// Benchmark name
        #[arg(short, long)]
        bench: String,
    },

    /// Show the most recent run of a suite
    Latest {
        #[arg(short, long)]
        repo: String,

        #[arg(short, long, default_value = DEFAULT_SUITE)]
        suite: String,
    },

    /// Check the latest value of a benchmark against its history.
    /// Exits with status 1 when a regression is detected
    Check {
        #[arg(short, long)]
        repo: String,

        #[arg(short, long, default_value = DEFAULT_SUITE)]
        suite: String,

        #[arg(short, long)]
        bench: String,

        /// Allowed ratio above the historical mean (0.1 = 10%)
        #[arg(short, long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: f64,
    },

    /// Print the outline of a documentation sidebar JSON file
    Sidebar {
        file: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

/// Configuration derived from CLI arguments and environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub log_level: Level,
    pub log_json: bool,
}

impl AppConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        AppConfig::new(
            cli.data_dir.clone(),
            std::env::var(DATA_DIR_ENV).ok(),
            cli.verbose,
            cli.log_json,
        )
    }

    /// Resolve the data directory: flag, then environment, then the user cache
    pub fn new(data_dir: Option<String>, env_dir: Option<String>, verbose: u8, log_json: bool) -> Self {
        let data_dir = data_dir
            .or(env_dir)
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".cache")
                    .join("bench-history")
            });

        AppConfig {
            data_dir,
            log_level: level_from_verbosity(verbose),
            log_json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::new(None, None, 0, false);
        assert!(config.data_dir.ends_with(".cache/bench-history"));
        assert_eq!(config.log_level, Level::WARN);
        assert!(!config.log_json);
    }

    #[test]
    fn test_flag_overrides_env() {
        let config = AppConfig::new(
            Some("/tmp/flag".to_string()),
            Some("/tmp/env".to_string()),
            2,
            true,
        );
        assert_eq!(config.data_dir, PathBuf::from("/tmp/flag"));
        assert_eq!(config.log_level, Level::DEBUG);

        let config = AppConfig::new(None, Some("/tmp/env".to_string()), 0, false);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/env"));
    }

    #[test]
    fn test_parse_check_defaults() {
        let cli = Cli::try_parse_from([
            "bench-history",
            "check",
            "--repo",
            "https://github.com/MystenLabs/sui",
            "--bench",
            "get_checkpoint",
        ])
        .unwrap();

        match cli.command {
            Commands::Check { suite, threshold, .. } => {
                assert_eq!(suite, DEFAULT_SUITE);
                assert_eq!(threshold, DEFAULT_THRESHOLD);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["bench-history", "list", "-vv", "--data-dir", "/tmp/x"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.data_dir.as_deref(), Some("/tmp/x"));
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
