//! Shared test fixtures: a minimal two-node, two-period network.
use crate::input::{InputTables, read_tables};
use crate::network::NetworkSets;
use crate::params::Parameters;
use crate::scenario::{filter_for_scenario, scenario_names, split_scenarios};
use rstest::fixture;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;

/// Write one CSV file into the model directory.
pub fn write_table(dir: &Path, name: &str, contents: &str) {
    let mut file = File::create(dir.join(format!("{name}.csv"))).unwrap();
    writeln!(file, "{contents}").unwrap();
}

/// A single-scenario model: origin `A` shipping product `P` to destination `B` over mode
/// `M`, two periods, demand of 10 in period 1.
#[fixture]
pub fn basic_tables() -> InputTables {
    let dir = tempdir().unwrap();
    write_table(dir.path(), "parameters", "Max Run Time,Gap Limit\n60,0");
    write_table(
        dir.path(),
        "objectives",
        "Scenario,Priority,Objective,Relaxation\nS1,1,Minimize Cost,0",
    );
    write_table(dir.path(), "periods", "Period,Weight\n1,1\n2,1");
    write_table(dir.path(), "products", "Product,Measure,Value\nP,unit,1");
    write_table(
        dir.path(),
        "nodes",
        "Scenario,Name,Node Type,Origin Node,Destination Node,Intermediate Node,\
         Receive from Origins,Receive from Intermediates,Send to Destinations,\
         Send to Intermediates,Min Launches,Max Launches,Min Operating Duration,\
         Max Operating Duration,Min Shutdowns,Max Shutdowns,Min Shutdown Duration,\
         Max Shutdown Duration\n\
         *,A,Plant,X,,,,,X,,,,,,,,,\n\
         *,B,Market,,X,,X,,,,,,,,,,,",
    );
    write_table(
        dir.path(),
        "node_groups",
        "Scenario,Node,Group,assigned\n*,A,All,1\n*,B,All,1",
    );
    write_table(
        dir.path(),
        "transportation_costs",
        "Scenario,Origin,Destination,Mode,Container,Measure,Period,Origin Node Group,\
         Destination Node Group,Fixed Cost,Cost per Unit of Distance,Cost per Unit of Time,\
         Minimum Cost Regardless of Distance\n\
         *,A,B,M,*,unit,*,All,All,0,0.01,0,0",
    );
    write_table(
        dir.path(),
        "od_distances_and_transit_times",
        "Origin,Destination,Mode,Distance,Transit Time,Periods\nA,B,M,100,1,0",
    );
    write_table(
        dir.path(),
        "demand",
        "Scenario,Period,Product,Destination,Demand\n*,1,P,B,10",
    );

    read_tables(dir.path()).unwrap()
}

/// The derived set family of [`basic_tables`], scenario `S1`.
#[fixture]
pub fn basic_sets(basic_tables: InputTables) -> NetworkSets {
    let mut tables = basic_tables;
    let scenarios = scenario_names(&tables).unwrap();
    split_scenarios(&mut tables, &scenarios);
    let filtered = filter_for_scenario(&tables, "S1");
    NetworkSets::derive(&filtered).unwrap()
}

/// The parameters of [`basic_tables`], scenario `S1`.
#[fixture]
pub fn basic_params(basic_tables: InputTables) -> Parameters {
    let mut tables = basic_tables;
    let scenarios = scenario_names(&tables).unwrap();
    split_scenarios(&mut tables, &scenarios);
    let filtered = filter_for_scenario(&tables, "S1");
    let sets = NetworkSets::derive(&filtered).unwrap();
    Parameters::build(&filtered, &sets).unwrap()
}
