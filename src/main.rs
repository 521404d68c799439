//! # Vendo CLI
//!
//! This is the binary entry point for the `vendo` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Initializing logging.
//! - Running the vendoring (or manifest update) pipeline and translating
//!   failures into user-friendly output.
//!
//! The core logic is defined in the `lib.rs` library crate, ensuring that
//! the binary is a thin wrapper around the reusable library functionality.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use env_logger::Env;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    cli.execute()
}
