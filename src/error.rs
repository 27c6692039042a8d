//! Error kinds for the planning pipeline.
//!
//! Adapter-level plumbing uses [`anyhow`] with file-path context throughout; the kinds here exist
//! so the pipeline driver can classify failures without string matching.
use std::fmt::Write;
use thiserror::Error;

/// A classified failure within the planning pipeline.
#[derive(Debug, Error)]
pub enum PlanningError {
    /// A required table or column is missing, or the network is structurally invalid.
    ///
    /// Fatal: nothing can be built from the input.
    #[error("invalid input structure: {0}")]
    InputStructural(String),

    /// A value is present but out of range or unparsable (negative capacity, gap outside
    /// `[0, 1]`, a period that is not a positive integer).
    ///
    /// Fatal for the scenario being prepared.
    #[error("invalid input value: {0}")]
    InputSemantic(String),

    /// The solver reported the model infeasible at some priority level.
    ///
    /// Non-fatal across scenarios; the scenario is reported via a `no_solution` row.
    #[error("scenario {scenario} has no feasible solution")]
    Infeasible {
        /// The scenario that could not be solved.
        scenario: String,
    },

    /// The solver hit its time limit without producing an incumbent.
    #[error("solver hit the time limit without an incumbent solution")]
    SolverTimeout,

    /// A reader, writer or solver adapter failed; the cause is preserved.
    #[error(transparent)]
    Adapter(#[from] anyhow::Error),
}

/// Collects validation problems for a single scenario so they can be reported together
/// instead of failing on the first.
#[derive(Default)]
pub struct ValidationReport {
    errors: Vec<String>,
}

impl ValidationReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a validation problem.
    pub fn push(&mut self, message: String) {
        self.errors.push(message);
    }

    /// Whether any problem has been recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Convert the report into a single [`PlanningError::InputSemantic`] listing every
    /// problem, or `Ok(())` if none were recorded.
    pub fn into_result(self) -> Result<(), PlanningError> {
        if self.errors.is_empty() {
            return Ok(());
        }

        let mut message = format!("{} validation error(s):", self.errors.len());
        for error in &self.errors {
            write!(&mut message, "\n  - {error}").unwrap();
        }
        Err(PlanningError::InputSemantic(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_report_empty() {
        assert!(ValidationReport::new().into_result().is_ok());
    }

    #[test]
    fn test_validation_report_collects_all() {
        let mut report = ValidationReport::new();
        report.push("first".to_string());
        report.push("second".to_string());
        let message = report.into_result().unwrap_err().to_string();
        assert!(message.contains("2 validation error(s)"));
        assert!(message.contains("first"));
        assert!(message.contains("second"));
    }
}
