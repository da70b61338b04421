//! bench-history: record and inspect benchmark history from the command line.
//!
//! Reads and writes the `data.js` files a continuous-benchmarking dashboard
//! renders, one per repository. `check` exits with 1 on a regression and 2 on
//! any error, so CI can tell them apart.

mod app;
mod cli;
mod telemetry;

use std::process::ExitCode;

use cli::{AppConfig, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    let config = AppConfig::from_cli(&cli);

    telemetry::init_tracing(&config);
    tracing::debug!(data_dir = ?config.data_dir, "starting");

    let result = app::run(&config, cli.command);
    if let Err(err) = &result {
        eprintln!("Error: {err:?}");
    }
    ExitCode::from(app::exit_status(&result))
}
