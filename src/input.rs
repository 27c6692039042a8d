//! The input adapter: reads a directory of CSV files into named relational tables.
//!
//! Each logical table lives in its own file (`nodes.csv`, `demand.csv`, …). Tables the model
//! directory does not provide are materialised empty with their canonical columns, so the rest
//! of the pipeline never needs to special-case absence. Missing *required* tables are fatal.
use crate::error::PlanningError;
use crate::table::Table;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use itertools::Itertools;
use log::info;
use std::path::Path;

/// The named tables of one planning run.
pub type InputTables = IndexMap<String, Table>;

/// Shape of one logical input table.
struct TableSpec {
    /// Logical table name, also the file stem
    name: &'static str,
    /// Whether a model without this table is an error
    required: bool,
    /// Canonical columns, used when the file is absent
    columns: &'static [&'static str],
}

/// Every table the planner understands, with its canonical columns.
///
/// Key columns follow the workbook layout of the established input format; the `Scenario`
/// column marks the tables subject to scenario splitting and filtering.
const TABLE_SPECS: &[TableSpec] = &[
    TableSpec {
        name: "parameters",
        required: true,
        columns: &["Max Run Time", "Gap Limit", "Max Launch Cost"],
    },
    TableSpec {
        name: "scenarios",
        required: false,
        columns: &["Scenario"],
    },
    TableSpec {
        name: "objectives",
        required: true,
        columns: &["Scenario", "Priority", "Objective", "Relaxation"],
    },
    TableSpec {
        name: "periods",
        required: true,
        columns: &["Period", "Weight"],
    },
    TableSpec {
        name: "products",
        required: true,
        columns: &["Product", "Measure", "Value"],
    },
    TableSpec {
        name: "product_transportation_groups",
        required: false,
        columns: &["Scenario", "Product", "Group", "value"],
    },
    TableSpec {
        name: "nodes",
        required: true,
        columns: &[
            "Scenario",
            "Name",
            "Node Type",
            "Origin Node",
            "Destination Node",
            "Intermediate Node",
            "Receive from Origins",
            "Receive from Intermediates",
            "Send to Destinations",
            "Send to Intermediates",
            "Min Launches",
            "Max Launches",
            "Min Operating Duration",
            "Max Operating Duration",
            "Min Shutdowns",
            "Max Shutdowns",
            "Min Shutdown Duration",
            "Max Shutdown Duration",
        ],
    },
    TableSpec {
        name: "node_shut_down_launch_hard_constraints",
        required: false,
        columns: &["Scenario", "Name", "Period", "Launch", "Shutdown"],
    },
    TableSpec {
        name: "node_types",
        required: false,
        columns: &["Scenario", "Period", "Node Type", "Min Count", "Max Count"],
    },
    TableSpec {
        name: "node_groups",
        required: false,
        columns: &["Scenario", "Node", "Group", "assigned"],
    },
    TableSpec {
        name: "flow",
        required: false,
        columns: &[
            "Scenario",
            "Node",
            "Downstream Node",
            "Product",
            "Period",
            "Mode",
            "Container",
            "Measure",
            "Node Group",
            "Downstream Node Group",
            "Min",
            "Max",
        ],
    },
    TableSpec {
        name: "processing_assembly_constraints",
        required: false,
        columns: &[
            "Scenario",
            "Period",
            "Node",
            "Node Group",
            "Product 1",
            "Product 2",
            "Product 1 Qty",
            "Product 2 Qty",
        ],
    },
    TableSpec {
        name: "shipping_assembly_constraints",
        required: false,
        columns: &[
            "Scenario",
            "Period",
            "Origin",
            "Destination",
            "Origin Node Group",
            "Destination Node Group",
            "Product 1",
            "Product 2",
            "Product 1 Qty",
            "Product 2 Qty",
        ],
    },
    TableSpec {
        name: "fixed_operating_costs",
        required: false,
        columns: &[
            "Scenario",
            "Period",
            "Name",
            "Node Group",
            "Fixed Cost",
            "Launch Cost",
            "Shut Down Cost",
        ],
    },
    TableSpec {
        name: "variable_operating_costs",
        required: false,
        columns: &[
            "Scenario",
            "Period",
            "Name",
            "Product",
            "Node Group",
            "Variable Cost",
            "Periods of Capacity Consumption",
            "Periods Delay",
        ],
    },
    TableSpec {
        name: "transportation_costs",
        required: false,
        columns: &[
            "Scenario",
            "Origin",
            "Destination",
            "Mode",
            "Container",
            "Measure",
            "Period",
            "Origin Node Group",
            "Destination Node Group",
            "Fixed Cost",
            "Cost per Unit of Distance",
            "Cost per Unit of Time",
            "Minimum Cost Regardless of Distance",
        ],
    },
    TableSpec {
        name: "transportation_constraints",
        required: false,
        columns: &[
            "Scenario",
            "Period",
            "Origin",
            "Destination",
            "Mode",
            "Container",
            "Measure",
            "Origin Node Group",
            "Destination Node Group",
            "Min",
            "Max",
        ],
    },
    TableSpec {
        name: "transportation_expansions",
        required: false,
        columns: &[
            "Scenario",
            "Period",
            "Origin",
            "Destination",
            "Incremental Capacity Label",
            "Cost",
            "Persisting Cost",
            "Min",
            "Max",
        ],
    },
    TableSpec {
        name: "transportation_expansion_capacities",
        required: false,
        columns: &[
            "Scenario",
            "Incremental Capacity Label",
            "Mode",
            "Container",
            "Measure",
            "Incremental Capacity",
        ],
    },
    TableSpec {
        name: "load_capacity",
        required: false,
        columns: &[
            "Scenario",
            "Period",
            "Origin",
            "Destination",
            "Mode",
            "Measure",
            "Origin Node Group",
            "Destination Node Group",
            "Capacity",
        ],
    },
    TableSpec {
        name: "pop_demand_change_constraints",
        required: false,
        columns: &[
            "Scenario",
            "Period 1",
            "Period 2",
            "Product",
            "Origin",
            "Destination",
            "Origin Node Group",
            "Destination Node Group",
            "Cost per Destination Move",
            "Cost per Volume Move",
            "Max Destinations Moved",
        ],
    },
    TableSpec {
        name: "resource_capacities",
        required: false,
        columns: &[
            "Scenario",
            "Period",
            "Node",
            "Resource",
            "Capacity Type",
            "Node Group",
            "Capacity per Resource",
        ],
    },
    TableSpec {
        name: "resource_capacity_types",
        required: false,
        columns: &["Capacity Type", "Parent Capacity Type", "Relative Rate"],
    },
    TableSpec {
        name: "node_resource_constraints",
        required: false,
        columns: &[
            "Scenario",
            "Period",
            "Node",
            "Resource",
            "Node Group",
            "Min Count",
            "Max Count",
            "Minimum Resources to Add",
            "Maximum Resources to Add",
            "Minimum Resources to Remove",
            "Maximum Resources to Remove",
        ],
    },
    TableSpec {
        name: "resource_attribute_constraints",
        required: false,
        columns: &[
            "Scenario",
            "Period",
            "Node",
            "Resource",
            "Node Group",
            "Resource Attribute",
            "Min",
            "Max",
        ],
    },
    TableSpec {
        name: "resource_attributes",
        required: false,
        columns: &[
            "Scenario",
            "Period",
            "Resource",
            "Resource Attribute",
            "Value per Resource",
        ],
    },
    TableSpec {
        name: "resource_initial_counts",
        required: false,
        columns: &["Scenario", "Node", "Resource", "Node Group", "Initial Count"],
    },
    TableSpec {
        name: "resource_costs",
        required: false,
        columns: &[
            "Scenario",
            "Period",
            "Node",
            "Resource",
            "Node Group",
            "Fixed Cost to Add Resource",
            "Resource Cost per Time Unit",
            "Fixed Cost to Remove Resource",
            "Add Resources in Units of",
            "Remove Resources in Units of",
        ],
    },
    TableSpec {
        name: "resource_capacity_consumption",
        required: false,
        columns: &[
            "Scenario",
            "Product",
            "Period",
            "Node Group",
            "Node",
            "Capacity Type",
            "Capacity Required per Unit",
            "Periods of Capacity Consumption",
        ],
    },
    TableSpec {
        name: "carrying_or_missed_demand_cost",
        required: false,
        columns: &[
            "Scenario",
            "Period",
            "Product",
            "Node",
            "Node Group",
            "Inbound Carrying Cost",
            "Outbound Carrying Cost",
            "Drop Cost",
        ],
    },
    TableSpec {
        name: "carrying_or_missed_demand_constraints",
        required: false,
        columns: &[
            "Scenario",
            "Period",
            "Product",
            "Node",
            "Node Group",
            "Max Inbound Carrying",
            "Max Outbound Carrying",
            "Max Dropped",
        ],
    },
    TableSpec {
        name: "carrying_capacity",
        required: false,
        columns: &[
            "Scenario",
            "Period",
            "Node",
            "Measure",
            "Node Group",
            "Inbound Capacity",
            "Outbound Capacity",
        ],
    },
    TableSpec {
        name: "carrying_expansions",
        required: false,
        columns: &[
            "Scenario",
            "Period",
            "Location",
            "Incremental Capacity Label",
            "Inbound Incremental Capacity",
            "Outbound Incremental Capacity",
            "Cost",
            "Persisting Cost",
        ],
    },
    TableSpec {
        name: "demand",
        required: false,
        columns: &["Scenario", "Period", "Product", "Destination", "Demand"],
    },
    TableSpec {
        name: "od_distances_and_transit_times",
        required: false,
        columns: &[
            "Origin",
            "Destination",
            "Mode",
            "Distance",
            "Transit Time",
            "Periods",
        ],
    },
    TableSpec {
        name: "max_transit_time_distance",
        required: false,
        columns: &[
            "Scenario",
            "Origin",
            "Period",
            "Mode",
            "Origin Node Group",
            "Destination",
            "Destination Node Group",
            "Max Distance",
            "Max Transit Time",
        ],
    },
    TableSpec {
        name: "age_constraints",
        required: false,
        columns: &[
            "Scenario",
            "Period",
            "Product",
            "Destination",
            "Age",
            "Destination Node Group",
            "Max Volume",
            "Cost per Unit to Violate",
        ],
    },
];

/// The tables that carry no `Scenario` column and apply to every scenario unchanged.
pub const SCENARIO_INDEPENDENT_TABLES: &[&str] = &[
    "parameters",
    "periods",
    "products",
    "od_distances_and_transit_times",
    "resource_capacity_types",
];

/// Read every input table from `model_dir`.
///
/// # Arguments
///
/// * `model_dir` - Folder containing one CSV file per logical table
///
/// # Returns
///
/// The complete table mapping, with absent optional tables empty, or an error if a required
/// table is missing or a file is malformed.
pub fn read_tables(model_dir: &Path) -> Result<InputTables> {
    let mut tables = InputTables::new();
    let mut missing = Vec::new();
    for spec in TABLE_SPECS {
        let file_path = model_dir.join(format!("{}.csv", spec.name));
        let table = if file_path.is_file() {
            Table::from_csv(spec.name, &file_path)?
        } else {
            if spec.required {
                missing.push(spec.name);
            }
            Table::new(spec.name, spec.columns)
        };
        tables.insert(spec.name.to_string(), table);
    }

    if !missing.is_empty() {
        return Err(PlanningError::InputStructural(format!(
            "Missing required table(s) in {}: {}",
            model_dir.display(),
            missing.iter().join(", ")
        ))
        .into());
    }

    info!(
        "Read {} tables from {}",
        tables.values().filter(|t| !t.is_empty()).count(),
        model_dir.display()
    );

    Ok(tables)
}

/// Look up a table that is known to exist (every name in [`TABLE_SPECS`] does after
/// [`read_tables`]).
pub fn get_table<'a>(tables: &'a InputTables, name: &str) -> Result<&'a Table> {
    tables
        .get(name)
        .with_context(|| format!("Unknown input table {name}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_required_tables(dir: &Path) {
        let contents = [
            ("parameters", "Max Run Time,Gap Limit\n60,0.01"),
            ("objectives", "Scenario,Priority,Objective,Relaxation\nS1,1,Minimize Cost,0"),
            ("periods", "Period,Weight\n1,1"),
            ("products", "Product,Measure,Value\nP,unit,1"),
            (
                "nodes",
                "Scenario,Name,Node Type,Origin Node,Destination Node,Intermediate Node,\
                 Receive from Origins,Receive from Intermediates,Send to Destinations,\
                 Send to Intermediates,Min Launches,Max Launches,Min Operating Duration,\
                 Max Operating Duration,Min Shutdowns,Max Shutdowns,Min Shutdown Duration,\
                 Max Shutdown Duration\n*,A,Plant,X,,,,,X,,,,,,,,,",
            ),
        ];
        for (name, body) in contents {
            let mut file = File::create(dir.join(format!("{name}.csv"))).unwrap();
            writeln!(file, "{body}").unwrap();
        }
    }

    #[test]
    fn test_read_tables() {
        let dir = tempdir().unwrap();
        write_required_tables(dir.path());

        let tables = read_tables(dir.path()).unwrap();
        assert_eq!(tables["nodes"].len(), 1);
        // Absent optional tables come back empty with canonical columns
        let demand = &tables["demand"];
        assert!(demand.is_empty());
        assert!(demand.maybe_column("Demand").is_some());
    }

    #[test]
    fn test_read_tables_missing_required() {
        let dir = tempdir().unwrap();
        // No files at all: every required table is reported at once
        let error = read_tables(dir.path()).unwrap_err().to_string();
        assert!(error.contains("parameters"));
        assert!(error.contains("nodes"));
    }
}
