//! Code for loading program settings and per-run solver settings.
use crate::error::PlanningError;
use crate::get_chainplan_config_dir;
use crate::table::Table;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAME: &str = "settings.toml";

/// Program settings from the config file.
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct Settings {
    /// The default program log level
    #[serde(default)]
    pub log_level: Option<String>,
}

/// Get the path to where the settings file will be read from
pub fn get_settings_file_path() -> PathBuf {
    let mut path = get_chainplan_config_dir();
    path.push(SETTINGS_FILE_NAME);

    path
}

impl Settings {
    /// Read the settings file from the program config directory.
    ///
    /// If the file is not present, default values for settings will be used.
    pub fn load() -> Result<Settings> {
        Self::load_from_path(&get_settings_file_path())
    }

    /// Read from the specified path, falling back to defaults if the file does not exist.
    fn load_from_path(file_path: &Path) -> Result<Settings> {
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        let contents = fs::read_to_string(file_path)
            .with_context(|| format!("Error reading {}", file_path.display()))?;
        toml::from_str(&contents).with_context(|| format!("Error reading {}", file_path.display()))
    }
}

/// Per-run solver settings, read from the single-row `parameters` table.
#[derive(Clone, Debug, PartialEq)]
pub struct SolverSettings {
    /// The solver time limit, in seconds
    pub max_run_time: f64,
    /// The relative MIP gap at which the solver may stop
    pub gap_limit: f64,
}

impl SolverSettings {
    /// Read the solver settings from the `parameters` table.
    pub fn from_parameters(parameters: &Table) -> Result<SolverSettings> {
        if parameters.is_empty() {
            return Err(PlanningError::InputStructural(
                "The parameters table has no rows".to_string(),
            )
            .into());
        }

        let max_run_time = parameters
            .cell_f64(0, parameters.column("Max Run Time")?)?
            .ok_or_else(|| {
                PlanningError::InputSemantic("Max Run Time must be set".to_string())
            })?;
        let gap_limit = parameters
            .cell_f64(0, parameters.column("Gap Limit")?)?
            .ok_or_else(|| PlanningError::InputSemantic("Gap Limit must be set".to_string()))?;

        if max_run_time <= 0.0 {
            return Err(PlanningError::InputSemantic(format!(
                "Max Run Time must be positive (got {max_run_time})"
            ))
            .into());
        }
        if !(0.0..=1.0).contains(&gap_limit) {
            return Err(PlanningError::InputSemantic(format!(
                "Gap Limit must be within [0, 1] (got {gap_limit})"
            ))
            .into());
        }

        Ok(SolverSettings {
            max_run_time,
            gap_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_settings_load_from_path_no_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME); // NB: doesn't exist
        assert_eq!(
            Settings::load_from_path(&file_path).unwrap(),
            Settings::default()
        );
    }

    #[test]
    fn test_settings_load_from_path() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME);

        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "log_level = \"warn\"").unwrap();
        }

        assert_eq!(
            Settings::load_from_path(&file_path).unwrap(),
            Settings {
                log_level: Some("warn".to_string()),
            }
        );
    }

    fn parameters_table(run_time: &str, gap: &str) -> Table {
        let mut table = Table::new("parameters", &["Max Run Time", "Gap Limit"]);
        table.push_row(vec![run_time.to_string(), gap.to_string()]);
        table
    }

    #[test]
    fn test_solver_settings_from_parameters() {
        let settings = SolverSettings::from_parameters(&parameters_table("60", "0.05")).unwrap();
        assert_eq!(
            settings,
            SolverSettings {
                max_run_time: 60.0,
                gap_limit: 0.05,
            }
        );
    }

    #[test]
    fn test_solver_settings_validation() {
        assert!(SolverSettings::from_parameters(&parameters_table("0", "0.05")).is_err());
        assert!(SolverSettings::from_parameters(&parameters_table("60", "1.5")).is_err());
        assert!(SolverSettings::from_parameters(&parameters_table("60", "-0.1")).is_err());
    }
}
