//! Tracing setup for the command-line binary.
//!
//! Logs go to stderr so command output on stdout stays machine-readable.
//! Without `RUST_LOG`, only this crate logs at the `-v` level; dependencies
//! stay at `warn`.

use std::io;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::AppConfig;

/// Install the global subscriber for the resolved configuration.
///
/// Only the first call in a process has an effect.
pub fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(config.log_level)));
    let show_targets = matches!(config.log_level, Level::DEBUG | Level::TRACE);

    let json_layer = config.log_json.then(|| {
        fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_writer(io::stderr)
    });
    let text_layer = (!config.log_json).then(|| {
        fmt::layer()
            .compact()
            .with_target(show_targets)
            .with_writer(io::stderr)
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init();
}

/// Filter directives used when `RUST_LOG` is unset
pub fn default_directives(level: Level) -> String {
    format!("warn,bench_history={}", level.as_str().to_lowercase())
}

/// Map a `-v` count onto a log level
pub fn level_from_verbosity(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}
