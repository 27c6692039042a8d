//! Scenario handling: wildcard expansion and per-scenario filtering.
//!
//! Rows whose `Scenario` cell is `*` apply to every scenario. Before any model is built they
//! are expanded into explicit per-scenario copies; afterwards each table is filtered down to
//! the rows belonging to the scenario being planned.
use crate::error::PlanningError;
use crate::input::InputTables;
use crate::table::{Table, WILDCARD};
use anyhow::Result;
use log::info;
use std::rc::Rc;

/// The column marking scenario membership.
pub const SCENARIO_COLUMN: &str = "Scenario";

/// The distinct non-wildcard scenarios named by the objectives table, in appearance order.
///
/// If the objectives table only carries wildcard rows, the scenario list falls back to the
/// `scenarios` table. An empty result is a structural error: there is nothing to plan.
pub fn scenario_names(tables: &InputTables) -> Result<Vec<Rc<str>>> {
    let from_objectives = named_scenarios(&tables["objectives"])?;
    if !from_objectives.is_empty() {
        return Ok(from_objectives);
    }

    let from_scenarios = named_scenarios(&tables["scenarios"])?;
    if from_scenarios.is_empty() {
        return Err(PlanningError::InputStructural(
            "No scenario is named by the objectives or scenarios tables".to_string(),
        )
        .into());
    }
    Ok(from_scenarios)
}

/// The non-wildcard scenario names appearing in one table.
fn named_scenarios(table: &Table) -> Result<Vec<Rc<str>>> {
    let column = table.column(SCENARIO_COLUMN)?;
    Ok(table
        .distinct(column)
        .into_iter()
        .filter(|s| s != WILDCARD)
        .map(Rc::from)
        .collect())
}

/// Expand wildcard scenario rows in every table that has a `Scenario` column.
///
/// For each such table, rows with `Scenario = *` are replaced by one copy per scenario in
/// `scenarios`. The copies come before the static rows: parameter derivation lets later
/// rows win, so a scenario-specific row always overrides its broadcast counterpart. Tables
/// without wildcard rows pass through unchanged (expansion is an identity on them).
pub fn split_scenarios(tables: &mut InputTables, scenarios: &[Rc<str>]) {
    for table in tables.values_mut() {
        let Some(column) = table.maybe_column(SCENARIO_COLUMN) else {
            continue;
        };
        if !table.rows().iter().any(|row| row[column] == WILDCARD) {
            continue;
        }

        let mut split = table.filter_rows(|_| false);
        for scenario in scenarios {
            for row in table.rows() {
                if row[column] == WILDCARD {
                    let mut copy = row.clone();
                    copy[column] = scenario.to_string();
                    split.push_row(copy);
                }
            }
        }
        for row in table.rows() {
            if row[column] != WILDCARD {
                split.push_row(row.clone());
            }
        }
        info!(
            "Expanded wildcard rows in table {}: {} -> {} rows",
            table.name,
            table.len(),
            split.len()
        );
        *table = split;
    }
}

/// Filter every scenario-dependent table down to the rows for `scenario`.
///
/// Rows with a wildcard scenario are kept as broadcast rows; after [`split_scenarios`] none
/// remain, but the filter tolerates them for inputs assembled programmatically.
pub fn filter_for_scenario(tables: &InputTables, scenario: &str) -> InputTables {
    tables
        .iter()
        .map(|(name, table)| {
            let filtered = match table.maybe_column(SCENARIO_COLUMN) {
                Some(column) => table
                    .filter_rows(|row| row[column] == scenario || row[column] == WILDCARD),
                None => table.clone(),
            };
            (name.clone(), filtered)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn scenario_table(rows: &[(&str, &str)]) -> Table {
        let mut table = Table::new("demand", &["Scenario", "Demand"]);
        for (scenario, demand) in rows {
            table.push_row(vec![(*scenario).to_string(), (*demand).to_string()]);
        }
        table
    }

    fn tables_with(demand: Table) -> InputTables {
        let mut objectives = Table::new(
            "objectives",
            &["Scenario", "Priority", "Objective", "Relaxation"],
        );
        objectives.push_row(vec![
            "S1".to_string(),
            "1".to_string(),
            "Minimize Cost".to_string(),
            "0".to_string(),
        ]);
        objectives.push_row(vec![
            "S2".to_string(),
            "1".to_string(),
            "Minimize Cost".to_string(),
            "0".to_string(),
        ]);

        IndexMap::from([
            ("objectives".to_string(), objectives),
            ("scenarios".to_string(), Table::new("scenarios", &["Scenario"])),
            ("demand".to_string(), demand),
        ])
    }

    #[test]
    fn test_scenario_names() {
        let tables = tables_with(scenario_table(&[]));
        let names = scenario_names(&tables).unwrap();
        assert_eq!(names, vec![Rc::from("S1"), Rc::from("S2")]);
    }

    #[test]
    fn test_split_scenarios_expands_wildcards() {
        let mut tables = tables_with(scenario_table(&[("S1", "5"), ("*", "7")]));
        let scenarios = scenario_names(&tables).unwrap();
        split_scenarios(&mut tables, &scenarios);

        let demand = &tables["demand"];
        assert_eq!(demand.len(), 3);
        // Broadcast copies come first so static rows take precedence downstream
        let rows: Vec<(&str, &str)> = demand
            .rows()
            .iter()
            .map(|row| (row[0].as_str(), row[1].as_str()))
            .collect();
        assert_eq!(rows, vec![("S1", "7"), ("S2", "7"), ("S1", "5")]);
    }

    #[test]
    fn test_split_scenarios_is_identity_without_wildcards() {
        let demand = scenario_table(&[("S1", "5"), ("S2", "7")]);
        let mut tables = tables_with(demand.clone());
        let scenarios = scenario_names(&tables).unwrap();
        split_scenarios(&mut tables, &scenarios);
        assert_eq!(tables["demand"], demand);
    }

    #[test]
    fn test_filter_for_scenario() {
        let mut tables = tables_with(scenario_table(&[("S1", "5"), ("*", "7")]));
        let scenarios = scenario_names(&tables).unwrap();
        split_scenarios(&mut tables, &scenarios);

        let filtered = filter_for_scenario(&tables, "S2");
        let demand = &filtered["demand"];
        assert_eq!(demand.len(), 1);
        assert_eq!(demand.rows()[0], vec!["S2".to_string(), "7".to_string()]);
    }
}
