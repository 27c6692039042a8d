//! The lexicographic solve driver.
//!
//! Objectives are grouped by ascending priority. Each level clones the base model, installs
//! the level's (summed) objective, solves, and — unless it is the last level — bolts a
//! relaxation constraint onto the base model bounding the objective just optimised before
//! moving on. Capacity-maximising levels first delete the demand equalities so demand
//! becomes an upper bound.
use crate::error::{PlanningError, ValidationReport};
use crate::milp::{LinearExpr, Model};
use crate::model::constraints::demand_equality_name;
use crate::model::objective::Objective;
use crate::model::variables::Variables;
use crate::network::NetworkSets;
use crate::settings::SolverSettings;
use crate::solver::{SolveOutcome, Valuation, solve};
use crate::table::Table;
use anyhow::Result;
use itertools::{Itertools, iproduct};
use log::{debug, info, warn};
use std::str::FromStr;

/// One row of the objectives table, after validation.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectiveEntry {
    /// The priority level; lower levels are optimised first
    pub priority: f64,
    /// The objective to optimise at this level
    pub objective: Objective,
    /// The admissible slack on the optimum, within `[0, 1]`
    pub relaxation: f64,
}

/// Parse and validate the objective entries of one scenario.
///
/// Problems across all rows are collected and reported together.
pub fn read_objective_entries(objectives: &Table) -> Result<Vec<ObjectiveEntry>> {
    let priority_column = objectives.column("Priority")?;
    let objective_column = objectives.column("Objective")?;
    let relaxation_column = objectives.column("Relaxation")?;

    let mut report = ValidationReport::new();
    let mut entries = Vec::new();
    for row in 0..objectives.len() {
        let label = objectives.cell(row, objective_column);
        let objective = match Objective::from_str(label) {
            Ok(objective) => objective,
            Err(_) => {
                report.push(format!("Unknown objective {label:?}"));
                continue;
            }
        };

        let priority = match objectives.cell_f64(row, priority_column) {
            Ok(Some(priority)) => priority,
            _ => {
                report.push(format!("Objective {label:?} has no numeric priority"));
                continue;
            }
        };

        let relaxation = match objectives.cell_f64(row, relaxation_column) {
            Ok(relaxation) => relaxation.unwrap_or(0.0),
            Err(_) => {
                report.push(format!("Objective {label:?} has a non-numeric relaxation"));
                continue;
            }
        };
        if !(0.0..=1.0).contains(&relaxation) {
            report.push(format!(
                "Objective {label:?} has relaxation {relaxation} outside [0, 1]"
            ));
            continue;
        }

        entries.push(ObjectiveEntry {
            priority,
            objective,
            relaxation,
        });
    }

    report.into_result()?;
    if entries.is_empty() {
        return Err(PlanningError::InputStructural(
            "The objectives table names no objectives".to_string(),
        )
        .into());
    }

    entries.sort_by(|a, b| a.priority.total_cmp(&b.priority));
    Ok(entries)
}

/// Run the lexicographic solve over the compiled base model.
///
/// Returns the final valuation, or `None` when some level is infeasible (or times out with
/// no incumbent), in which case the scenario has no solution.
pub fn solve_lexicographic(
    base: Model,
    entries: &[ObjectiveEntry],
    vars: &Variables,
    sets: &NetworkSets,
    settings: &SolverSettings,
) -> Result<Option<Valuation>> {
    let mut base = base;
    let levels: Vec<(f64, Vec<&ObjectiveEntry>)> = entries
        .iter()
        .chunk_by(|entry| entry.priority)
        .into_iter()
        .map(|(priority, group)| (priority, group.collect()))
        .collect();

    for (level_index, (priority, level)) in levels.iter().enumerate() {
        let is_last = level_index + 1 == levels.len();
        info!(
            "Solving objective level {} of {} (priority {priority}): {}",
            level_index + 1,
            levels.len(),
            level.iter().map(|entry| entry.objective).join(" + ")
        );

        // Capacity maximisation competes against demand, not up to it: the equalities go,
        // from this level onward
        if level
            .iter()
            .any(|entry| entry.objective == Objective::MaximizeCapacity)
        {
            let removed = base.remove_constraints(
                iproduct!(
                    sets.receiving_nodes.iter(),
                    sets.periods.labels().iter(),
                    sets.products.iter()
                )
                .map(|(d, t, p)| demand_equality_name(d, t, p)),
            );
            debug!("Removed {removed} demand equality constraints");
        }

        let mut working = base.clone();
        let mut combined = LinearExpr::new();
        for entry in level {
            combined.add_scaled(&entry.objective.solver_expression(vars, sets), 1.0);
        }
        working.set_objective(combined);

        let valuation = match solve(&working, settings)? {
            SolveOutcome::Optimal(valuation)
            | SolveOutcome::IncumbentAtTimeLimit(valuation) => valuation,
            SolveOutcome::Infeasible => {
                warn!("Objective level {} is infeasible", level_index + 1);
                return Ok(None);
            }
            SolveOutcome::TimeLimit => {
                warn!(
                    "Objective level {} hit the time limit with no incumbent",
                    level_index + 1
                );
                return Ok(None);
            }
            SolveOutcome::Unbounded => {
                warn!("Objective level {} is unbounded", level_index + 1);
                return Ok(None);
            }
        };

        if is_last {
            return Ok(Some(valuation));
        }

        // Bound each objective of this level before the next level re-optimises
        for entry in level {
            let measure = entry.objective.measure(vars, sets);
            let achieved = measure.value(&valuation.columns);
            let name = format!(
                "objective_relaxation_level{}_{}",
                level_index + 1,
                entry.objective
            );
            if entry.objective.is_maximisation() {
                base.add_ge(
                    name,
                    measure,
                    LinearExpr::constant(achieved * (1.0 - entry.relaxation)),
                );
            } else {
                base.add_le(
                    name,
                    measure,
                    LinearExpr::constant(achieved * (1.0 + entry.relaxation)),
                );
            }
        }
    }

    unreachable!("objective entries are validated non-empty")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn objectives_table(rows: &[(&str, &str, &str)]) -> Table {
        let mut table = Table::new(
            "objectives",
            &["Scenario", "Priority", "Objective", "Relaxation"],
        );
        for (priority, objective, relaxation) in rows {
            table.push_row(vec![
                "S1".to_string(),
                (*priority).to_string(),
                (*objective).to_string(),
                (*relaxation).to_string(),
            ]);
        }
        table
    }

    #[test]
    fn test_read_objective_entries_sorted() {
        let table = objectives_table(&[
            ("2", "Minimize Dropped Volume", "0"),
            ("1", "Minimize Cost", "0.1"),
        ]);
        let entries = read_objective_entries(&table).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].objective, Objective::MinimizeCost);
        assert_eq!(entries[0].relaxation, 0.1);
        assert_eq!(entries[1].objective, Objective::MinimizeDroppedVolume);
    }

    #[test]
    fn test_read_objective_entries_collects_errors() {
        let table = objectives_table(&[
            ("1", "Minimize Cost", "2.0"),
            ("2", "Minimize Nothing", "0"),
        ]);
        let message = read_objective_entries(&table).unwrap_err().to_string();
        assert!(message.contains("2 validation error(s)"));
        assert!(message.contains("Minimize Nothing"));
        assert!(message.contains("outside [0, 1]"));
    }

    #[test]
    fn test_read_objective_entries_empty() {
        assert!(read_objective_entries(&objectives_table(&[])).is_err());
    }
}
