//! End-to-end planning runs over small models, solved with the real solver.
use chainplan::input::read_tables;
use chainplan::planner;
use chainplan::results::ResultTables;
use float_cmp::assert_approx_eq;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tempfile::{TempDir, tempdir};

/// A model directory under construction.
struct ModelDir {
    dir: TempDir,
}

impl ModelDir {
    /// A single-scenario model: origin `A`, destination `B`, product `P`, mode `M`.
    ///
    /// The lane is 100 distance units long with the given transport lag; demand rows and a
    /// unit transport cost come from the caller. Dropping is forbidden by default.
    fn new(periods: usize, transit_periods: u32, demand_rows: &[(&str, u32)]) -> ModelDir {
        let model = ModelDir {
            dir: tempdir().unwrap(),
        };
        model.write("parameters", "Max Run Time,Gap Limit\n60,0");
        model.write(
            "objectives",
            "Scenario,Priority,Objective,Relaxation\nS1,1,Minimize Cost,0",
        );

        let mut period_rows = "Period,Weight".to_string();
        for t in 1..=periods {
            period_rows.push_str(&format!("\n{t},1"));
        }
        model.write("periods", &period_rows);

        model.write("products", "Product,Measure,Value\nP,unit,1");
        model.write(
            "nodes",
            "Scenario,Name,Node Type,Origin Node,Destination Node,Intermediate Node,\
             Receive from Origins,Receive from Intermediates,Send to Destinations,\
             Send to Intermediates,Min Launches,Max Launches,Min Operating Duration,\
             Max Operating Duration,Min Shutdowns,Max Shutdowns,Min Shutdown Duration,\
             Max Shutdown Duration\n\
             *,A,Plant,X,,,,,X,,,,,,,,,\n\
             *,B,Market,,X,,X,,,,,,,,,,,",
        );
        model.write(
            "node_groups",
            "Scenario,Node,Group,assigned\n*,A,All,1\n*,B,All,1",
        );
        model.write(
            "transportation_costs",
            "Scenario,Origin,Destination,Mode,Container,Measure,Period,Origin Node Group,\
             Destination Node Group,Fixed Cost,Cost per Unit of Distance,Cost per Unit of Time,\
             Minimum Cost Regardless of Distance\n\
             *,A,B,M,*,unit,*,All,All,0,1,0,0",
        );
        model.write(
            "od_distances_and_transit_times",
            &format!(
                "Origin,Destination,Mode,Distance,Transit Time,Periods\nA,B,M,100,1,{transit_periods}"
            ),
        );

        let mut demand = "Scenario,Period,Product,Destination,Demand".to_string();
        for (period, quantity) in demand_rows {
            demand.push_str(&format!("\n*,{period},P,B,{quantity}"));
        }
        model.write("demand", &demand);

        // Forbid dropping unless a test relaxes it
        model.write(
            "carrying_or_missed_demand_constraints",
            "Scenario,Period,Product,Node,Node Group,Max Inbound Carrying,\
             Max Outbound Carrying,Max Dropped\n*,*,P,B,All,,,0",
        );

        model
    }

    fn write(&self, name: &str, contents: &str) {
        let mut file = File::create(self.path().join(format!("{name}.csv"))).unwrap();
        writeln!(file, "{contents}").unwrap();
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn run(&self) -> ResultTables {
        planner::run(read_tables(self.path()).unwrap()).unwrap()
    }
}

/// The value cell of the row matching every `(column, value)` filter, if exactly one row
/// matches.
fn lookup(results: &ResultTables, table: &str, filters: &[(&str, &str)]) -> Option<f64> {
    let table = results.get(table)?;
    let filter_indices: Vec<(usize, &str)> = filters
        .iter()
        .map(|(column, value)| (table.column(column).unwrap(), *value))
        .collect();

    let mut matches = table.rows().iter().filter(|row| {
        filter_indices
            .iter()
            .all(|&(index, value)| row[index] == value)
    });
    let row = matches.next()?;
    assert!(matches.next().is_none(), "More than one matching row");
    row.last().map(|value| value.parse().unwrap())
}

/// A scalar result table's single value.
fn scalar(results: &ResultTables, table: &str, scenario: &str) -> f64 {
    lookup(results, table, &[("Scenario", scenario)]).unwrap()
}

#[test]
fn test_trivial_single_lane() {
    let model = ModelDir::new(1, 0, &[("1", 10)]);
    let results = model.run();

    assert!(results.get("no_solution").is_none());
    assert_approx_eq!(
        f64,
        lookup(
            &results,
            "departed_product",
            &[
                ("Scenario", "S1"),
                ("DEPARTING_NODES", "A"),
                ("RECEIVING_NODES", "B"),
                ("PRODUCTS", "P"),
                ("PERIODS", "1"),
            ],
        )
        .unwrap(),
        10.0
    );
    assert_approx_eq!(
        f64,
        lookup(
            &results,
            "arrived_and_completed_product",
            &[("Scenario", "S1"), ("RECEIVING_NODES", "B"), ("PERIODS", "1")],
        )
        .unwrap(),
        10.0
    );

    // 10 units, 100 distance units, 1 per unit-distance
    assert_approx_eq!(
        f64,
        scalar(&results, "grand_total_transportation_costs", "S1"),
        1000.0
    );

    // Everything moves at age zero in a single-period model
    assert_approx_eq!(
        f64,
        lookup(
            &results,
            "demand_by_age",
            &[("Scenario", "S1"), ("NODES", "B"), ("AGES", "0")],
        )
        .unwrap(),
        10.0
    );
    assert_approx_eq!(
        f64,
        lookup(
            &results,
            "vol_arrived_by_age",
            &[("Scenario", "S1"), ("RECEIVING_NODES", "B"), ("AGES", "0")],
        )
        .unwrap(),
        10.0
    );
}

#[test]
fn test_transit_lag_shifts_arrivals() {
    let model = ModelDir::new(2, 1, &[("2", 10)]);
    let results = model.run();

    assert!(results.get("no_solution").is_none());
    assert_approx_eq!(
        f64,
        lookup(
            &results,
            "departed_product",
            &[("Scenario", "S1"), ("DEPARTING_NODES", "A"), ("PERIODS", "1")],
        )
        .unwrap(),
        10.0
    );
    assert_approx_eq!(
        f64,
        lookup(
            &results,
            "arrived_product",
            &[("Scenario", "S1"), ("RECEIVING_NODES", "B"), ("PERIODS", "2")],
        )
        .unwrap(),
        10.0
    );

    // Mode decomposition holds in the extracted tables
    assert_approx_eq!(
        f64,
        lookup(
            &results,
            "departed_product_by_mode",
            &[("Scenario", "S1"), ("PERIODS", "1"), ("MODES", "M")],
        )
        .unwrap(),
        10.0
    );
}

#[test]
fn test_capacity_relief_by_drop() {
    let model = ModelDir::new(1, 0, &[("1", 10)]);
    // The lane only carries 7; up to 3 units of demand may be dropped, at a cost
    model.write(
        "load_capacity",
        "Scenario,Period,Origin,Destination,Mode,Measure,Origin Node Group,\
         Destination Node Group,Capacity\n*,*,A,B,M,unit,All,All,7",
    );
    model.write(
        "carrying_or_missed_demand_constraints",
        "Scenario,Period,Product,Node,Node Group,Max Inbound Carrying,\
         Max Outbound Carrying,Max Dropped\n*,*,P,B,All,,,3",
    );
    model.write(
        "carrying_or_missed_demand_cost",
        "Scenario,Period,Product,Node,Node Group,Inbound Carrying Cost,\
         Outbound Carrying Cost,Drop Cost\n*,*,P,B,All,0,0,5",
    );
    let results = model.run();

    assert!(results.get("no_solution").is_none());
    assert_approx_eq!(
        f64,
        lookup(
            &results,
            "dropped_demand",
            &[("Scenario", "S1"), ("NODES", "B"), ("PERIODS", "1")],
        )
        .unwrap(),
        3.0
    );
    assert_approx_eq!(
        f64,
        lookup(
            &results,
            "arrived_and_completed_product",
            &[("Scenario", "S1"), ("RECEIVING_NODES", "B")],
        )
        .unwrap(),
        7.0
    );

    // Dropping 3 units at 5 per unit
    assert_approx_eq!(f64, scalar(&results, "total_dropped_volume_cost", "S1"), 15.0);
}

#[test]
fn test_lexicographic_relaxation() {
    let model = ModelDir::new(1, 0, &[("1", 10)]);
    // Shipping costs 2 per unit (distance 1), dropping costs 1: pure cost minimisation
    // drops everything; the second level recovers volume within the relaxed cost budget
    model.write(
        "objectives",
        "Scenario,Priority,Objective,Relaxation\n\
         S1,1,Minimize Cost,0.10\nS1,2,Minimize Dropped Volume,0",
    );
    model.write(
        "od_distances_and_transit_times",
        "Origin,Destination,Mode,Distance,Transit Time,Periods\nA,B,M,1,1,0",
    );
    model.write(
        "transportation_costs",
        "Scenario,Origin,Destination,Mode,Container,Measure,Period,Origin Node Group,\
         Destination Node Group,Fixed Cost,Cost per Unit of Distance,Cost per Unit of Time,\
         Minimum Cost Regardless of Distance\n\
         *,A,B,M,*,unit,*,All,All,0,2,0,0",
    );
    model.write(
        "carrying_or_missed_demand_constraints",
        "Scenario,Period,Product,Node,Node Group,Max Inbound Carrying,\
         Max Outbound Carrying,Max Dropped\n*,*,P,B,All,,,",
    );
    model.write(
        "carrying_or_missed_demand_cost",
        "Scenario,Period,Product,Node,Node Group,Inbound Carrying Cost,\
         Outbound Carrying Cost,Drop Cost\n*,*,P,B,All,0,0,1",
    );
    let results = model.run();

    assert!(results.get("no_solution").is_none());
    // Cost floor is 10 (drop all); the 10% relaxation buys back exactly one shipped unit
    let dropped = lookup(
        &results,
        "dropped_demand",
        &[("Scenario", "S1"), ("NODES", "B")],
    )
    .unwrap();
    assert_approx_eq!(f64, dropped, 9.0);

    let total_cost = scalar(&results, "grand_total_transportation_costs", "S1")
        + scalar(&results, "grand_total_carried_and_dropped_volume_cost", "S1");
    assert!(total_cost <= 11.0 + 1e-6, "cost {total_cost} exceeds the relaxed bound");
}

#[test]
fn test_launch_and_shutdown_windows() {
    let model = ModelDir::new(5, 0, &[]);
    // Node A is forced to launch in period 1, may launch only once, must run at least 2
    // periods and at most 4
    model.write(
        "nodes",
        "Scenario,Name,Node Type,Origin Node,Destination Node,Intermediate Node,\
         Receive from Origins,Receive from Intermediates,Send to Destinations,\
         Send to Intermediates,Min Launches,Max Launches,Min Operating Duration,\
         Max Operating Duration,Min Shutdowns,Max Shutdowns,Min Shutdown Duration,\
         Max Shutdown Duration\n\
         *,A,Plant,X,,,,,X,,,1,2,4,,,,\n\
         *,B,Market,,X,,X,,,,,,,,,,,",
    );
    model.write(
        "node_shut_down_launch_hard_constraints",
        "Scenario,Name,Period,Launch,Shutdown\n*,A,1,1,",
    );
    let results = model.run();

    assert!(results.get("no_solution").is_none());
    assert_approx_eq!(
        f64,
        lookup(
            &results,
            "is_launched",
            &[("Scenario", "S1"), ("NODES", "A"), ("PERIODS", "1")],
        )
        .unwrap(),
        1.0
    );

    // Exactly one shutdown, after the minimum window and within the maximum window
    let shutdowns = &results["is_shut_down"];
    let node = shutdowns.column("NODES").unwrap();
    let period = shutdowns.column("PERIODS").unwrap();
    let periods: Vec<&str> = shutdowns
        .rows()
        .iter()
        .filter(|row| row[node] == "A")
        .map(|row| row[period].as_str())
        .collect();
    assert_eq!(periods.len(), 1, "expected exactly one shutdown, got {periods:?}");
    assert!(["3", "4", "5"].contains(&periods[0]), "shutdown at {}", periods[0]);
}

#[test]
fn test_scenario_broadcast_and_override() {
    let model = ModelDir::new(1, 0, &[]);
    model.write(
        "objectives",
        "Scenario,Priority,Objective,Relaxation\n\
         S1,1,Minimize Cost,0\nS2,1,Minimize Cost,0",
    );
    // S1 inherits the broadcast demand of 10; S2 overrides it to 20
    model.write(
        "demand",
        "Scenario,Period,Product,Destination,Demand\n*,1,P,B,10\nS2,1,P,B,20",
    );
    model.write(
        "carrying_or_missed_demand_constraints",
        "Scenario,Period,Product,Node,Node Group,Max Inbound Carrying,\
         Max Outbound Carrying,Max Dropped\n*,*,P,B,All,,,0",
    );
    let results = model.run();

    assert!(results.get("no_solution").is_none());
    assert_approx_eq!(
        f64,
        lookup(
            &results,
            "arrived_and_completed_product",
            &[("Scenario", "S1"), ("RECEIVING_NODES", "B")],
        )
        .unwrap(),
        10.0
    );
    assert_approx_eq!(
        f64,
        lookup(
            &results,
            "arrived_and_completed_product",
            &[("Scenario", "S2"), ("RECEIVING_NODES", "B")],
        )
        .unwrap(),
        20.0
    );

    // No literal wildcard survives the expansion
    let departed = &results["departed_product"];
    let scenario = departed.column("Scenario").unwrap();
    assert!(departed.rows().iter().all(|row| row[scenario] != "*"));
}

#[test]
fn test_maximize_capacity_pushes_to_demand() {
    let model = ModelDir::new(1, 0, &[("1", 10)]);
    model.write(
        "objectives",
        "Scenario,Priority,Objective,Relaxation\nS1,1,Maximize Capacity,0",
    );
    let results = model.run();

    assert!(results.get("no_solution").is_none());
    // With the demand equalities deleted, demand stays a ceiling the objective pushes to
    assert_approx_eq!(
        f64,
        scalar(&results, "total_arrived_and_completed_product", "S1"),
        10.0
    );
}

#[test]
fn test_infeasible_scenario_reports_no_solution() {
    let model = ModelDir::new(1, 0, &[("1", 10)]);
    // Demand must be met in full, but the lane cannot carry anything
    model.write(
        "load_capacity",
        "Scenario,Period,Origin,Destination,Mode,Measure,Origin Node Group,\
         Destination Node Group,Capacity\n*,*,A,B,M,unit,All,All,0",
    );
    let results = model.run();

    let no_solution = &results["no_solution"];
    assert_eq!(no_solution.len(), 1);
    assert_eq!(no_solution.rows()[0][0], "S1");
}
