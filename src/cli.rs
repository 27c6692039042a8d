//! The command line interface for the planner.
use crate::input::read_tables;
use crate::log;
use crate::output::{create_output_directory, get_output_dir, write_results};
use crate::planner;
use crate::settings::Settings;
use ::log::info;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

/// The command line interface for the planner.
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// Path to the model input directory.
    pub input: PathBuf,
    /// Directory for output files.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// The log level to use.
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Run a full planning sweep from the command line arguments.
pub fn handle_run_command(cli: &Cli) -> Result<()> {
    // Load program settings
    let settings = Settings::load().context("Failed to load settings.")?;

    // The settings-file log level can be overridden by command-line argument
    let log_level = cli.log_level.as_deref().or(settings.log_level.as_deref());

    // Create output folder
    let output_path = match &cli.output {
        Some(path) => path.clone(),
        None => get_output_dir(&cli.input)?,
    };
    create_output_directory(&output_path).context("Failed to create output directory.")?;

    // Initialise program logger
    log::init(log_level, Some(output_path.as_path()))
        .context("Failed to initialise logging.")?;

    // Load the input tables
    let tables = read_tables(&cli.input).context("Failed to load input tables.")?;
    info!("Loaded model from {}", cli.input.display());
    info!("Output data will be written to {}", output_path.display());

    // Run the sweep and write the results
    let results = planner::run(tables)?;
    write_results(&results, &output_path)?;

    Ok(())
}
