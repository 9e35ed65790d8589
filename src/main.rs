//! gitlite - a local, single-user version-control engine
//!
//! This is the main entry point for the gitlite command-line interface.

use std::process::ExitCode;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> ExitCode {
    let layer = fmt::layer().compact().with_writer(std::io::stderr);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .expect("default filter is valid");
    tracing_subscriber::registry().with(layer).with(filter).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    gitlite::cli::run(&args)
}
