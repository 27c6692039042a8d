//! Provides the main entry point to the chainplan program.
use chainplan::cli::{Cli, handle_run_command};
use clap::Parser;
use human_panic::setup_panic;
use std::process::ExitCode;

/// The main entry point to the program
fn main() -> ExitCode {
    setup_panic!();

    let cli = Cli::parse();
    if let Err(error) = handle_run_command(&cli) {
        eprintln!("Error: {error:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
