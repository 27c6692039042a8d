//! The result extractor: variable valuations back into relational tables.
//!
//! Every variable family's dimension signature is walked to enumerate its keys; rows whose
//! value is zero or unset are dropped, scalars always produce a single row. Per-scenario
//! tables gain a `Scenario` column and concatenate across scenarios; a final layer of merged
//! views joins related families on their shared dimensions.
use crate::model::variables::{VarTensor, Variables};
use crate::network::NetworkSets;
use crate::solver::Valuation;
use crate::table::Table;
use anyhow::Result;
use indexmap::IndexMap;

/// Result tables, keyed by sheet name.
pub type ResultTables = IndexMap<String, Table>;

/// Extract one scenario's valuation into a table per variable family.
pub fn extract_results(
    vars: &Variables,
    sets: &NetworkSets,
    valuation: &Valuation,
) -> ResultTables {
    let mut results = ResultTables::new();
    for tensor in vars.all() {
        results.insert(tensor.name().to_string(), tensor_table(tensor, sets, valuation));
    }
    results
}

/// One family's non-zero entries as rows `(k1, ..., kn, value)`.
fn tensor_table(tensor: &VarTensor, sets: &NetworkSets, valuation: &Valuation) -> Table {
    let mut columns: Vec<&str> = tensor.dims().iter().map(|d| d.column_name()).collect();
    columns.push(tensor.name());
    let mut table = Table::new(tensor.name(), &columns);

    if tensor.dims().is_empty() {
        let value = valuation.columns[tensor.scalar().index()];
        table.push_row(vec![format_value(value)]);
        return table;
    }

    let shape = tensor.shape();
    let mut index = vec![0usize; shape.len()];
    if shape.iter().any(|&extent| extent == 0) {
        return table;
    }
    loop {
        let value = valuation.columns[tensor.at(&index).index()];
        // Solver noise below the feasibility tolerance counts as zero
        if value.is_finite() && value.abs() > 1e-9 {
            let mut row: Vec<String> = tensor
                .dims()
                .iter()
                .zip(&index)
                .map(|(&dim, &i)| sets.members(dim)[i].to_string())
                .collect();
            row.push(format_value(value));
            table.push_row(row);
        }

        // Odometer increment over the dimension extents
        let mut position = shape.len();
        loop {
            if position == 0 {
                return table;
            }
            position -= 1;
            index[position] += 1;
            if index[position] < shape[position] {
                break;
            }
            index[position] = 0;
        }
    }
}

/// Format a solution value, collapsing near-integers for readability.
fn format_value(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{}", value.round() as i64)
    } else {
        format!("{value}")
    }
}

/// Prepend a `Scenario` column to every table.
pub fn add_scenario_column(results: &mut ResultTables, scenario: &str) {
    for table in results.values_mut() {
        let mut columns: Vec<&str> = vec!["Scenario"];
        let original: Vec<String> = table.columns().to_vec();
        columns.extend(original.iter().map(String::as_str));

        let mut with_scenario = Table::new(table.name.clone(), &columns);
        for row in table.rows() {
            let mut cells = vec![scenario.to_string()];
            cells.extend(row.iter().cloned());
            with_scenario.push_row(cells);
        }
        *table = with_scenario;
    }
}

/// Append one scenario's tables onto the accumulated results.
pub fn append_scenario_results(results: &mut ResultTables, scenario: ResultTables) -> Result<()> {
    for (name, table) in scenario {
        match results.get_mut(&name) {
            Some(existing) => existing.append(&table)?,
            None => {
                results.insert(name, table);
            }
        }
    }
    Ok(())
}

/// The enumerated merged views joining related variable tables on shared dimensions.
///
/// The plan-over-plan tables are renamed to their reporting columns first, as the merged
/// layer is also their public shape.
pub fn add_merged_tables(results: &mut ResultTables) {
    let pop_columns = [
        "Scenario",
        "period_1",
        "period_2",
        "product",
        "departing_node",
        "receiving_node",
    ];
    for (name, value_column) in [
        ("volume_moved", "volume_moved"),
        ("pop_cost", "plan_over_plan_change_cost"),
        ("num_destinations_moved", "number_of_destinations_moved"),
    ] {
        if let Some(table) = results.get_mut(name) {
            let mut columns: Vec<&str> = pop_columns.to_vec();
            columns.push(value_column);
            table.set_columns(&columns);
        }
    }

    let merged_views: &[(&str, &[&str])] = &[
        (
            "m_transportation_costs",
            &["variable_transportation_costs", "fixed_transportation_costs"],
        ),
        ("m_transportation_measures", &["departed_measures"]),
        ("m_transportation_volumes", &["vol_departed_by_age"]),
        ("m_loads", &["num_loads", "transportation_costs"]),
        (
            "m_arrived_processed_queued_dropped",
            &[
                "vol_arrived_by_age",
                "age_violation_cost",
                "demand_by_age",
                "vol_processed_by_age",
                "ib_vol_carried_over_by_age",
                "ib_carried_volume_cost",
                "ob_vol_carried_over_by_age",
                "ob_carried_volume_cost",
                "vol_dropped_by_age",
                "dropped_volume_cost",
            ],
        ),
        (
            "m_plan_over_plan_changes",
            &["volume_moved", "num_destinations_moved", "pop_cost"],
        ),
        (
            "m_node_launches_and_shutdowns",
            &[
                "is_launched",
                "total_launch_cost",
                "is_shut_down",
                "total_shut_down_cost",
            ],
        ),
        (
            "m_capacity_expansions",
            &[
                "use_carrying_capacity_option",
                "c_capacity_option_cost",
                "use_transportation_capacity_option",
                "t_capacity_option_cost",
            ],
        ),
        (
            "m_resources_assigned_added_removed",
            &[
                "resources_assigned",
                "resource_time_cost",
                "resources_added",
                "resource_add_cost",
                "resources_removed",
                "resource_remove_cost",
            ],
        ),
        ("m_node_resource_utilization", &["node_utilization"]),
    ];

    for (view_name, sources) in merged_views {
        let mut tables = sources.iter().filter_map(|name| results.get(*name));
        let Some(first) = tables.next() else { continue };
        let mut view = first.clone();
        view.name = (*view_name).to_string();
        for table in tables {
            view = view.outer_merge(table, view_name);
        }
        results.insert((*view_name).to_string(), view);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(10.0), "10");
        assert_eq!(format_value(10.000000000001), "10");
        assert_eq!(format_value(0.5), "0.5");
    }

    #[test]
    fn test_add_scenario_column() {
        let mut table = Table::new("demo", &["PERIODS", "demo"]);
        table.push_row(vec!["1".to_string(), "5".to_string()]);
        let mut results = ResultTables::from([("demo".to_string(), table)]);

        add_scenario_column(&mut results, "S1");
        let table = &results["demo"];
        assert_eq!(table.columns()[0], "Scenario");
        assert_eq!(table.rows()[0][0], "S1");
    }

    #[test]
    fn test_append_scenario_results() {
        let mut first = Table::new("demo", &["Scenario", "demo"]);
        first.push_row(vec!["S1".to_string(), "5".to_string()]);
        let mut results = ResultTables::from([("demo".to_string(), first)]);

        let mut second = Table::new("demo", &["Scenario", "demo"]);
        second.push_row(vec!["S2".to_string(), "7".to_string()]);
        append_scenario_results(
            &mut results,
            ResultTables::from([("demo".to_string(), second)]),
        )
        .unwrap();

        assert_eq!(results["demo"].len(), 2);
    }
}
