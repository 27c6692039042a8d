//! The scenario sweep: split, derive, index, compile, solve and extract, per scenario, with
//! results accumulated into one table set.
use crate::error::PlanningError;
use crate::input::InputTables;
use crate::model::compile;
use crate::network::NetworkSets;
use crate::params::Parameters;
use crate::results::{
    ResultTables, add_merged_tables, add_scenario_column, append_scenario_results,
    extract_results,
};
use crate::scenario::{filter_for_scenario, scenario_names, split_scenarios};
use crate::settings::SolverSettings;
use crate::solve::{read_objective_entries, solve_lexicographic};
use crate::table::Table;
use anyhow::Result;
use log::{error, info, warn};
use std::rc::Rc;

/// Run the full planning pipeline over every scenario.
///
/// Structural problems abort the run; value-level problems abort only their scenario; an
/// infeasible scenario contributes a `no_solution` row and the sweep continues.
pub fn run(tables: InputTables) -> Result<ResultTables> {
    let scenarios = scenario_names(&tables)?;
    info!("Planning {} scenario(s)", scenarios.len());

    let mut tables = tables;
    split_scenarios(&mut tables, &scenarios);

    let solver_settings = SolverSettings::from_parameters(&tables["parameters"])?;

    let mut results = ResultTables::new();
    let mut unsolved: Vec<Rc<str>> = Vec::new();
    let mut solved_any = false;
    for scenario in &scenarios {
        info!("Planning scenario {scenario}");
        match run_scenario(&tables, scenario, &solver_settings) {
            Ok(Some(scenario_results)) => {
                append_scenario_results(&mut results, scenario_results)?;
                solved_any = true;
            }
            Ok(None) => {
                warn!("Scenario {scenario} has no feasible solution");
                unsolved.push(Rc::clone(scenario));
            }
            Err(error) => {
                if is_structural(&error) {
                    return Err(error);
                }
                error!("Scenario {scenario} failed: {error:#}");
                unsolved.push(Rc::clone(scenario));
            }
        }
    }

    if solved_any {
        add_merged_tables(&mut results);
    }
    if !unsolved.is_empty() {
        let mut no_solution = Table::new("no_solution", &["scenario"]);
        for scenario in unsolved {
            no_solution.push_row(vec![scenario.to_string()]);
        }
        results.insert("no_solution".to_string(), no_solution);
    }

    Ok(results)
}

/// Plan one scenario end to end.
fn run_scenario(
    tables: &InputTables,
    scenario: &str,
    solver_settings: &SolverSettings,
) -> Result<Option<ResultTables>> {
    let filtered = filter_for_scenario(tables, scenario);

    let sets = NetworkSets::derive(&filtered)?;
    let params = Parameters::build(&filtered, &sets)?;
    let entries = read_objective_entries(&filtered["objectives"])?;

    let (model, vars) = compile(&sets, &params);
    let Some(valuation) = solve_lexicographic(model, &entries, &vars, &sets, solver_settings)?
    else {
        return Ok(None);
    };
    info!(
        "Scenario {scenario} solved; final objective value {:.6}",
        valuation.objective
    );

    let mut scenario_results = extract_results(&vars, &sets, &valuation);
    add_scenario_column(&mut scenario_results, scenario);
    Ok(Some(scenario_results))
}

/// Whether an error is structural and should halt the whole run.
fn is_structural(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<PlanningError>(),
        Some(PlanningError::InputStructural(_))
    )
}
