//! The module responsible for writing output data to disk.
use crate::results::ResultTables;
use anyhow::{Context, Result};
use indexmap::{IndexMap, IndexSet};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "chainplan_results";

/// The sheet-name length limit of workbook formats, applied uniformly so the written file
/// set is identical across writers.
const SHEET_NAME_LIMIT: usize = 31;

/// The default output directory for the model specified at `model_dir`.
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Get the model name from the dir path. This ends up being convoluted because we need to
    // check for all possible errors. Ugh.
    let model_dir = model_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to model")?;
    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create the output directory, with parents, if it does not already exist.
pub fn create_output_directory(output_dir: &Path) -> Result<()> {
    if output_dir.is_dir() {
        // already exists
        return Ok(());
    }

    fs::create_dir_all(output_dir)?;
    Ok(())
}

/// Truncate sheet names to the workbook limit, disambiguating collisions with a `~n` tail.
pub fn truncate_sheet_names<'a, I: IntoIterator<Item = &'a str>>(
    names: I,
) -> IndexMap<&'a str, String> {
    let mut taken = IndexSet::new();
    let mut truncated = IndexMap::new();
    for name in names {
        let mut candidate: String = name.chars().take(SHEET_NAME_LIMIT).collect();
        let mut suffix = 1;
        while !taken.insert(candidate.clone()) {
            let tail = format!("~{suffix}");
            let keep = SHEET_NAME_LIMIT - tail.len();
            candidate = name.chars().take(keep).collect();
            candidate.push_str(&tail);
            suffix += 1;
        }
        truncated.insert(name, candidate);
    }
    truncated
}

/// Write every result table as a CSV file in the output directory.
pub fn write_results(results: &ResultTables, output_dir: &Path) -> Result<()> {
    let names = truncate_sheet_names(results.keys().map(String::as_str));
    for (name, table) in results {
        let file_path = output_dir.join(format!("{}.csv", names[name.as_str()]));
        table.write_csv(&file_path)?;
    }
    info!(
        "Wrote {} result tables to {}",
        results.len(),
        output_dir.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_sheet_names_short_names_pass_through() {
        let names = truncate_sheet_names(["alpha", "beta"]);
        assert_eq!(names["alpha"], "alpha");
        assert_eq!(names["beta"], "beta");
    }

    #[test]
    fn test_truncate_sheet_names_limits_and_disambiguates() {
        let long_a = "ib_carried_volume_cost_by_product_time";
        let long_b = "ib_carried_volume_cost_by_product_extra";
        let names = truncate_sheet_names([long_a, long_b]);

        assert_eq!(names[long_a].len(), 31);
        assert_eq!(names[long_a], "ib_carried_volume_cost_by_produ");
        // The collision gets a disambiguating tail within the limit
        assert_eq!(names[long_b].len(), 31);
        assert_eq!(names[long_b], "ib_carried_volume_cost_by_pro~1");
        assert_ne!(names[long_a], names[long_b]);
    }
}
