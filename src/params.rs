//! The parameter indexer: tuple-keyed scalar maps with typed defaults.
//!
//! Every table whose rows are a functional dependency `keys -> value` becomes a [`Param`].
//! Lookups never fail: each parameter carries the default its role demands (zero for costs
//! and required quantities, [`BIG_M`] for soft upper bounds, one for multiplicative weights).
//! A `*` in any key cell broadcasts the row over the full corresponding set; a specific row
//! always overrides a broadcast row for the same key.
use crate::input::InputTables;
use crate::network::{IdSet, NetworkSets};
use crate::table::{Table, WILDCARD};
use anyhow::Result;
use indexmap::IndexMap;
use itertools::Itertools;
use std::rc::Rc;

/// The big-M constant used for disjunctive bounds and absent upper limits.
pub const BIG_M: f64 = 999_999_999.0;

/// A keyed parameter mapping with a default for absent keys.
#[derive(Clone, Debug, Default)]
pub struct Param {
    values: IndexMap<Vec<Rc<str>>, f64>,
    default: f64,
}

impl Param {
    /// A parameter with no entries, yielding `default` for every key.
    pub fn constant(default: f64) -> Param {
        Param {
            values: IndexMap::new(),
            default,
        }
    }

    /// The value for `key`, or the parameter's default.
    pub fn get(&self, key: &[Rc<str>]) -> f64 {
        self.values.get(key).copied().unwrap_or(self.default)
    }

    /// The value for `key` rounded to an integer (transit lags, durations).
    pub fn get_int(&self, key: &[Rc<str>]) -> i64 {
        self.get(key).round() as i64
    }

    /// Whether `key` is explicitly present (a present zero and an absent key look the same to
    /// [`Param::get`]; presence testing is a separate concern).
    pub fn contains(&self, key: &[Rc<str>]) -> bool {
        self.values.contains_key(key)
    }

    /// Whether the parameter has no explicit entries at all.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of explicit entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Iterate over the explicit `(key, value)` entries, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&[Rc<str>], f64)> {
        self.values.iter().map(|(key, &value)| (key.as_slice(), value))
    }
}

/// Build a [`Param`] from `table`, keyed by the named columns.
///
/// `keys` pairs each key column with the set its wildcard broadcasts over. Rows whose value
/// cell is empty are skipped (absent means default). Broadcast rows are inserted before
/// specific rows so that specific rows win.
pub fn keyed(
    table: &Table,
    keys: &[(&str, &IdSet)],
    value_column: &str,
    default: f64,
) -> Result<Param> {
    let key_columns: Vec<usize> = keys
        .iter()
        .map(|&(name, _)| table.column(name))
        .try_collect()?;
    let value_index = table.column(value_column)?;

    let mut param = Param::constant(default);
    // Broadcast rows first, then specific rows, so overlaps resolve to the specific value
    for broadcast_pass in [true, false] {
        for (row, cells) in table.rows().iter().enumerate() {
            let is_broadcast = key_columns.iter().any(|&c| cells[c] == WILDCARD);
            if is_broadcast != broadcast_pass {
                continue;
            }
            let Some(value) = table.cell_f64(row, value_index)? else {
                continue;
            };

            let candidates: Vec<Vec<Rc<str>>> = key_columns
                .iter()
                .zip(keys)
                .map(|(&column, (_, set))| {
                    if cells[column] == WILDCARD {
                        set.iter().cloned().collect()
                    } else {
                        vec![Rc::from(cells[column].as_str())]
                    }
                })
                .collect();
            for key in candidates.into_iter().multi_cartesian_product() {
                param.values.insert(key, value);
            }
        }
    }

    Ok(param)
}

/// The full parameter catalog of one scenario.
///
/// Field order follows the input tables they come from. Key orders are part of the contract
/// with the constraint builders and are listed per field.
#[derive(Clone, Debug)]
#[allow(missing_docs)]
pub struct Parameters {
    // node_groups: [node, group] -> 1 when the node is in the group
    pub node_in_nodegroup: Param,

    // od_distances_and_transit_times: [origin, destination, mode]
    pub distance: Param,
    pub transit_time: Param,
    pub transport_periods: Param,

    // demand: [period, product, destination]
    pub demand: Param,

    // age_constraints: [period, product, destination, age, destination group]
    pub max_vol_by_age: Param,
    pub age_violation_cost: Param,

    // flow: [origin, destination, product, period, mode, measure, origin group, destination group]
    pub flow_min: Param,
    pub flow_max: Param,

    // processing_assembly_constraints: [period, node, group, product 1, product 2]
    pub processing_assembly_p1_qty: Param,
    pub processing_assembly_p2_qty: Param,

    // shipping_assembly_constraints:
    // [period, origin, destination, origin group, destination group, product 1, product 2]
    pub shipping_assembly_p1_qty: Param,
    pub shipping_assembly_p2_qty: Param,

    // transportation_costs: [origin, destination, mode, measure, period, origin group,
    // destination group] (the container key column is collapsed; the cost variables carry no
    // container index)
    pub transportation_cost_fixed: Param,
    pub transportation_cost_variable_distance: Param,
    pub transportation_cost_variable_time: Param,
    pub transportation_cost_minimum: Param,

    // products: [product, measure]
    pub products_measures: Param,

    // variable_operating_costs: [period, node, product, group]
    pub operating_costs_variable: Param,
    pub capacity_consumption_periods: Param,
    pub delay_periods: Param,

    // load_capacity: [period, origin, destination, mode, measure, origin group, destination group]
    pub load_capacity: Param,

    // resource_capacity_types: [child type, parent type]
    pub capacity_type_hierarchy: Param,

    // transportation_constraints: [period, origin, destination, mode, measure, origin group,
    // destination group]; Max doubles as the per-load size for load counting
    pub transportation_constraints_min: Param,
    pub transportation_constraints_max: Param,

    // transportation_expansion_capacities: [label, mode, measure]
    pub transportation_expansion_capacity: Param,
    // transportation_expansions: [period, origin, destination, label]
    pub transportation_expansion_cost: Param,
    pub transportation_expansion_persisting_cost: Param,
    pub transportation_expansion_min_count: Param,
    pub transportation_expansion_max_count: Param,

    // carrying_expansions: [period, location, label]
    pub ib_carrying_expansion_capacity: Param,
    pub ob_carrying_expansion_capacity: Param,
    pub carrying_expansion_cost: Param,
    pub carrying_expansion_persisting_cost: Param,

    // pop_demand_change_constraints:
    // [period 1, period 2, product, origin, destination, origin group, destination group]
    pub pop_cost_per_move: Param,
    pub pop_cost_per_volume_moved: Param,
    pub pop_max_destinations_moved: Param,

    // max_transit_time_distance: [origin, period, mode, origin group, destination,
    // destination group]
    pub max_distance: Param,
    pub max_transit_time: Param,

    // fixed_operating_costs: [period, node, group]
    pub operating_costs_fixed: Param,
    pub launch_cost: Param,
    pub shut_down_cost: Param,

    // nodes: [node]
    pub min_launch_count: Param,
    pub max_launch_count: Param,
    pub min_operating_duration: Param,
    pub max_operating_duration: Param,
    pub min_shut_down_count: Param,
    pub max_shut_down_count: Param,
    pub min_shut_down_duration: Param,
    pub max_shut_down_duration: Param,

    // node_shut_down_launch_hard_constraints: [node, period]
    pub launch_hard_constraint: Param,
    pub shut_down_hard_constraint: Param,

    // carrying_or_missed_demand_cost: [period, product, node, group]
    pub ib_carrying_cost: Param,
    pub ob_carrying_cost: Param,
    pub dropping_cost: Param,

    // carrying_or_missed_demand_constraints: [period, product, node, group]
    pub ib_max_carried: Param,
    pub ob_max_carried: Param,
    pub max_dropped: Param,

    // carrying_capacity: [period, node, measure, group]
    pub ib_carrying_capacity: Param,
    pub ob_carrying_capacity: Param,

    // periods: [period]
    pub period_weight: Param,

    // product_transportation_groups: [product, group] -> 1 when the product is in the group
    pub transportation_group: Param,

    // node_types: [period, node type]
    pub node_types_min: Param,
    pub node_types_max: Param,

    // resource_costs: [period, node, resource, group]
    pub resource_fixed_add_cost: Param,
    pub resource_cost_per_time: Param,
    pub resource_fixed_remove_cost: Param,
    pub resource_add_cohort_count: Param,
    pub resource_remove_cohort_count: Param,

    // resource_capacities: [period, node, resource, capacity type, group]
    pub resource_capacity_by_type: Param,

    // node_resource_constraints: [period, node, resource, group]
    pub resource_node_min_count: Param,
    pub resource_node_max_count: Param,
    pub resource_min_to_add: Param,
    pub resource_max_to_add: Param,
    pub resource_min_to_remove: Param,
    pub resource_max_to_remove: Param,

    // resource_attribute_constraints: [period, node, resource, group, attribute]
    pub resource_attribute_min: Param,
    pub resource_attribute_max: Param,

    // resource_attributes: [period, resource, attribute]
    pub resource_attribute_consumption_per: Param,

    // resource_initial_counts: [node, resource, group]
    pub resource_node_initial_count: Param,

    // resource_capacity_consumption: [product, period, group, node, capacity type]
    pub resource_capacity_consumption: Param,
    pub resource_capacity_consumption_periods: Param,

    /// Upper bound on the grand total launch cost (single-row parameters table)
    pub max_launch_cost: f64,
}

impl Parameters {
    /// Build every parameter from the filtered tables of one scenario.
    pub fn build(tables: &InputTables, sets: &NetworkSets) -> Result<Parameters> {
        let periods = sets.periods.labels();
        let ages = sets.ages.labels();
        let nodes = &sets.node_names;
        let departing = &sets.departing_nodes;
        let receiving = &sets.receiving_nodes;
        let destinations = &sets.destinations;
        let groups = &sets.node_groups;
        let products = &sets.products;
        let measures = &sets.measures;
        let modes = &sets.modes;

        let geometry = &tables["od_distances_and_transit_times"];
        let geometry_key = [
            ("Origin", departing),
            ("Destination", receiving),
            ("Mode", modes),
        ];

        let age_key = [
            ("Period", periods),
            ("Product", products),
            ("Destination", destinations),
            ("Age", ages),
            ("Destination Node Group", groups),
        ];
        let age_table = &tables["age_constraints"];

        let flow_key = [
            ("Node", departing),
            ("Downstream Node", receiving),
            ("Product", products),
            ("Period", periods),
            ("Mode", modes),
            ("Measure", measures),
            ("Node Group", groups),
            ("Downstream Node Group", groups),
        ];
        let flow = &tables["flow"];

        let processing_assembly_key = [
            ("Period", periods),
            ("Node", nodes),
            ("Node Group", groups),
            ("Product 1", products),
            ("Product 2", products),
        ];
        let processing_assembly = &tables["processing_assembly_constraints"];
        let shipping_assembly_key = [
            ("Period", periods),
            ("Origin", departing),
            ("Destination", receiving),
            ("Origin Node Group", groups),
            ("Destination Node Group", groups),
            ("Product 1", products),
            ("Product 2", products),
        ];
        let shipping_assembly = &tables["shipping_assembly_constraints"];

        let transportation_cost_key = [
            ("Origin", departing),
            ("Destination", receiving),
            ("Mode", modes),
            ("Measure", measures),
            ("Period", periods),
            ("Origin Node Group", groups),
            ("Destination Node Group", groups),
        ];
        let transportation_costs = &tables["transportation_costs"];

        let operating_variable_key = [
            ("Period", periods),
            ("Name", nodes),
            ("Product", products),
            ("Node Group", groups),
        ];
        let variable_operating_costs = &tables["variable_operating_costs"];

        let lane_capacity_key = [
            ("Period", periods),
            ("Origin", departing),
            ("Destination", receiving),
            ("Mode", modes),
            ("Measure", measures),
            ("Origin Node Group", groups),
            ("Destination Node Group", groups),
        ];

        let transportation_expansion_key = [
            ("Period", periods),
            ("Origin", departing),
            ("Destination", receiving),
            ("Incremental Capacity Label", &sets.t_capacity_expansions),
        ];
        let transportation_expansions = &tables["transportation_expansions"];

        let carrying_expansion_key = [
            ("Period", periods),
            ("Location", nodes),
            ("Incremental Capacity Label", &sets.c_capacity_expansions),
        ];
        let carrying_expansions = &tables["carrying_expansions"];

        let pop_key = [
            ("Period 1", periods),
            ("Period 2", periods),
            ("Product", products),
            ("Origin", departing),
            ("Destination", receiving),
            ("Origin Node Group", groups),
            ("Destination Node Group", groups),
        ];
        let pop = &tables["pop_demand_change_constraints"];

        let lane_limit_key = [
            ("Origin", departing),
            ("Period", periods),
            ("Mode", modes),
            ("Origin Node Group", groups),
            ("Destination", receiving),
            ("Destination Node Group", groups),
        ];
        let lane_limits = &tables["max_transit_time_distance"];

        let operating_fixed_key = [("Period", periods), ("Name", nodes), ("Node Group", groups)];
        let fixed_operating_costs = &tables["fixed_operating_costs"];

        let node_key = [("Name", nodes)];
        let nodes_table = &tables["nodes"];

        let hard_key = [("Name", nodes), ("Period", periods)];
        let hard_constraints = &tables["node_shut_down_launch_hard_constraints"];

        let carrying_cost_key = [
            ("Period", periods),
            ("Product", products),
            ("Node", nodes),
            ("Node Group", groups),
        ];
        let carrying_costs = &tables["carrying_or_missed_demand_cost"];
        let carrying_limits = &tables["carrying_or_missed_demand_constraints"];

        let carrying_capacity_key = [
            ("Period", periods),
            ("Node", nodes),
            ("Measure", measures),
            ("Node Group", groups),
        ];
        let carrying_capacity = &tables["carrying_capacity"];

        let node_type_key = [("Period", periods), ("Node Type", &sets.node_types)];
        let node_types = &tables["node_types"];

        let resource_cost_key = [
            ("Period", periods),
            ("Node", nodes),
            ("Resource", &sets.resources),
            ("Node Group", groups),
        ];
        let resource_costs = &tables["resource_costs"];
        let node_resource_constraints = &tables["node_resource_constraints"];

        let resource_attribute_key = [
            ("Period", periods),
            ("Node", nodes),
            ("Resource", &sets.resources),
            ("Node Group", groups),
            ("Resource Attribute", &sets.resource_attributes),
        ];
        let resource_attribute_constraints = &tables["resource_attribute_constraints"];

        let consumption_key = [
            ("Product", products),
            ("Period", periods),
            ("Node Group", groups),
            ("Node", nodes),
            ("Capacity Type", &sets.resource_capacity_types),
        ];
        let consumption = &tables["resource_capacity_consumption"];

        let max_launch_cost = {
            let parameters = &tables["parameters"];
            match parameters.maybe_column("Max Launch Cost") {
                Some(column) if !parameters.is_empty() => {
                    parameters.cell_f64(0, column)?.unwrap_or(BIG_M)
                }
                _ => BIG_M,
            }
        };

        Ok(Parameters {
            node_in_nodegroup: keyed(
                &tables["node_groups"],
                &[("Node", nodes), ("Group", groups)],
                "assigned",
                0.0,
            )?,
            distance: keyed(geometry, &geometry_key, "Distance", 0.0)?,
            transit_time: keyed(geometry, &geometry_key, "Transit Time", 0.0)?,
            transport_periods: keyed(geometry, &geometry_key, "Periods", 0.0)?,
            demand: keyed(
                &tables["demand"],
                &[
                    ("Period", periods),
                    ("Product", products),
                    ("Destination", destinations),
                ],
                "Demand",
                0.0,
            )?,
            max_vol_by_age: keyed(age_table, &age_key, "Max Volume", BIG_M)?,
            age_violation_cost: keyed(age_table, &age_key, "Cost per Unit to Violate", 0.0)?,
            flow_min: keyed(flow, &flow_key, "Min", 0.0)?,
            flow_max: keyed(flow, &flow_key, "Max", BIG_M)?,
            processing_assembly_p1_qty: keyed(
                processing_assembly,
                &processing_assembly_key,
                "Product 1 Qty",
                0.0,
            )?,
            processing_assembly_p2_qty: keyed(
                processing_assembly,
                &processing_assembly_key,
                "Product 2 Qty",
                0.0,
            )?,
            shipping_assembly_p1_qty: keyed(
                shipping_assembly,
                &shipping_assembly_key,
                "Product 1 Qty",
                0.0,
            )?,
            shipping_assembly_p2_qty: keyed(
                shipping_assembly,
                &shipping_assembly_key,
                "Product 2 Qty",
                0.0,
            )?,
            transportation_cost_fixed: keyed(
                transportation_costs,
                &transportation_cost_key,
                "Fixed Cost",
                0.0,
            )?,
            transportation_cost_variable_distance: keyed(
                transportation_costs,
                &transportation_cost_key,
                "Cost per Unit of Distance",
                0.0,
            )?,
            transportation_cost_variable_time: keyed(
                transportation_costs,
                &transportation_cost_key,
                "Cost per Unit of Time",
                0.0,
            )?,
            transportation_cost_minimum: keyed(
                transportation_costs,
                &transportation_cost_key,
                "Minimum Cost Regardless of Distance",
                0.0,
            )?,
            products_measures: keyed(
                &tables["products"],
                &[("Product", products), ("Measure", measures)],
                "Value",
                0.0,
            )?,
            operating_costs_variable: keyed(
                variable_operating_costs,
                &operating_variable_key,
                "Variable Cost",
                0.0,
            )?,
            capacity_consumption_periods: keyed(
                variable_operating_costs,
                &operating_variable_key,
                "Periods of Capacity Consumption",
                0.0,
            )?,
            delay_periods: keyed(
                variable_operating_costs,
                &operating_variable_key,
                "Periods Delay",
                0.0,
            )?,
            load_capacity: keyed(
                &tables["load_capacity"],
                &lane_capacity_key,
                "Capacity",
                BIG_M,
            )?,
            capacity_type_hierarchy: keyed(
                &tables["resource_capacity_types"],
                &[
                    ("Capacity Type", &sets.resource_capacity_types),
                    ("Parent Capacity Type", &sets.resource_parent_capacity_types),
                ],
                "Relative Rate",
                0.0,
            )?,
            transportation_constraints_min: keyed(
                &tables["transportation_constraints"],
                &lane_capacity_key,
                "Min",
                0.0,
            )?,
            transportation_constraints_max: keyed(
                &tables["transportation_constraints"],
                &lane_capacity_key,
                "Max",
                BIG_M,
            )?,
            transportation_expansion_capacity: keyed(
                &tables["transportation_expansion_capacities"],
                &[
                    ("Incremental Capacity Label", &sets.t_capacity_expansions),
                    ("Mode", modes),
                    ("Measure", measures),
                ],
                "Incremental Capacity",
                0.0,
            )?,
            transportation_expansion_cost: keyed(
                transportation_expansions,
                &transportation_expansion_key,
                "Cost",
                0.0,
            )?,
            transportation_expansion_persisting_cost: keyed(
                transportation_expansions,
                &transportation_expansion_key,
                "Persisting Cost",
                0.0,
            )?,
            transportation_expansion_min_count: keyed(
                transportation_expansions,
                &transportation_expansion_key,
                "Min",
                0.0,
            )?,
            transportation_expansion_max_count: keyed(
                transportation_expansions,
                &transportation_expansion_key,
                "Max",
                BIG_M,
            )?,
            ib_carrying_expansion_capacity: keyed(
                carrying_expansions,
                &carrying_expansion_key,
                "Inbound Incremental Capacity",
                0.0,
            )?,
            ob_carrying_expansion_capacity: keyed(
                carrying_expansions,
                &carrying_expansion_key,
                "Outbound Incremental Capacity",
                0.0,
            )?,
            carrying_expansion_cost: keyed(
                carrying_expansions,
                &carrying_expansion_key,
                "Cost",
                0.0,
            )?,
            carrying_expansion_persisting_cost: keyed(
                carrying_expansions,
                &carrying_expansion_key,
                "Persisting Cost",
                0.0,
            )?,
            pop_cost_per_move: keyed(pop, &pop_key, "Cost per Destination Move", 0.0)?,
            pop_cost_per_volume_moved: keyed(pop, &pop_key, "Cost per Volume Move", 0.0)?,
            pop_max_destinations_moved: keyed(
                pop,
                &pop_key,
                "Max Destinations Moved",
                BIG_M,
            )?,
            max_distance: keyed(lane_limits, &lane_limit_key, "Max Distance", BIG_M)?,
            max_transit_time: keyed(lane_limits, &lane_limit_key, "Max Transit Time", BIG_M)?,
            operating_costs_fixed: keyed(
                fixed_operating_costs,
                &operating_fixed_key,
                "Fixed Cost",
                0.0,
            )?,
            launch_cost: keyed(fixed_operating_costs, &operating_fixed_key, "Launch Cost", 0.0)?,
            shut_down_cost: keyed(
                fixed_operating_costs,
                &operating_fixed_key,
                "Shut Down Cost",
                0.0,
            )?,
            min_launch_count: keyed(nodes_table, &node_key, "Min Launches", 0.0)?,
            max_launch_count: keyed(nodes_table, &node_key, "Max Launches", BIG_M)?,
            min_operating_duration: keyed(
                nodes_table,
                &node_key,
                "Min Operating Duration",
                0.0,
            )?,
            max_operating_duration: keyed(
                nodes_table,
                &node_key,
                "Max Operating Duration",
                BIG_M,
            )?,
            min_shut_down_count: keyed(nodes_table, &node_key, "Min Shutdowns", 0.0)?,
            // NB: the historical implementation read this bound from the "Max Launches"
            // column; the intended column is read here (see DESIGN.md)
            max_shut_down_count: keyed(nodes_table, &node_key, "Max Shutdowns", BIG_M)?,
            min_shut_down_duration: keyed(
                nodes_table,
                &node_key,
                "Min Shutdown Duration",
                0.0,
            )?,
            max_shut_down_duration: keyed(
                nodes_table,
                &node_key,
                "Max Shutdown Duration",
                BIG_M,
            )?,
            launch_hard_constraint: keyed(hard_constraints, &hard_key, "Launch", 0.0)?,
            shut_down_hard_constraint: keyed(hard_constraints, &hard_key, "Shutdown", 0.0)?,
            ib_carrying_cost: keyed(
                carrying_costs,
                &carrying_cost_key,
                "Inbound Carrying Cost",
                0.0,
            )?,
            ob_carrying_cost: keyed(
                carrying_costs,
                &carrying_cost_key,
                "Outbound Carrying Cost",
                0.0,
            )?,
            dropping_cost: keyed(carrying_costs, &carrying_cost_key, "Drop Cost", 0.0)?,
            ib_max_carried: keyed(
                carrying_limits,
                &carrying_cost_key,
                "Max Inbound Carrying",
                BIG_M,
            )?,
            ob_max_carried: keyed(
                carrying_limits,
                &carrying_cost_key,
                "Max Outbound Carrying",
                BIG_M,
            )?,
            max_dropped: keyed(carrying_limits, &carrying_cost_key, "Max Dropped", BIG_M)?,
            ib_carrying_capacity: keyed(
                carrying_capacity,
                &carrying_capacity_key,
                "Inbound Capacity",
                BIG_M,
            )?,
            ob_carrying_capacity: keyed(
                carrying_capacity,
                &carrying_capacity_key,
                "Outbound Capacity",
                BIG_M,
            )?,
            period_weight: keyed(&tables["periods"], &[("Period", periods)], "Weight", 1.0)?,
            transportation_group: keyed(
                &tables["product_transportation_groups"],
                &[
                    ("Product", products),
                    ("Group", &sets.transportation_groups),
                ],
                "value",
                0.0,
            )?,
            node_types_min: keyed(node_types, &node_type_key, "Min Count", 0.0)?,
            node_types_max: keyed(node_types, &node_type_key, "Max Count", BIG_M)?,
            resource_fixed_add_cost: keyed(
                resource_costs,
                &resource_cost_key,
                "Fixed Cost to Add Resource",
                0.0,
            )?,
            resource_cost_per_time: keyed(
                resource_costs,
                &resource_cost_key,
                "Resource Cost per Time Unit",
                0.0,
            )?,
            resource_fixed_remove_cost: keyed(
                resource_costs,
                &resource_cost_key,
                "Fixed Cost to Remove Resource",
                0.0,
            )?,
            resource_add_cohort_count: keyed(
                resource_costs,
                &resource_cost_key,
                "Add Resources in Units of",
                1.0,
            )?,
            resource_remove_cohort_count: keyed(
                resource_costs,
                &resource_cost_key,
                "Remove Resources in Units of",
                1.0,
            )?,
            resource_capacity_by_type: keyed(
                &tables["resource_capacities"],
                &[
                    ("Period", periods),
                    ("Node", nodes),
                    ("Resource", &sets.resources),
                    ("Capacity Type", &sets.resource_capacity_types),
                    ("Node Group", groups),
                ],
                "Capacity per Resource",
                0.0,
            )?,
            resource_node_min_count: keyed(
                node_resource_constraints,
                &resource_cost_key,
                "Min Count",
                0.0,
            )?,
            resource_node_max_count: keyed(
                node_resource_constraints,
                &resource_cost_key,
                "Max Count",
                BIG_M,
            )?,
            resource_min_to_add: keyed(
                node_resource_constraints,
                &resource_cost_key,
                "Minimum Resources to Add",
                0.0,
            )?,
            resource_max_to_add: keyed(
                node_resource_constraints,
                &resource_cost_key,
                "Maximum Resources to Add",
                BIG_M,
            )?,
            resource_min_to_remove: keyed(
                node_resource_constraints,
                &resource_cost_key,
                "Minimum Resources to Remove",
                0.0,
            )?,
            resource_max_to_remove: keyed(
                node_resource_constraints,
                &resource_cost_key,
                "Maximum Resources to Remove",
                BIG_M,
            )?,
            resource_attribute_min: keyed(
                resource_attribute_constraints,
                &resource_attribute_key,
                "Min",
                0.0,
            )?,
            resource_attribute_max: keyed(
                resource_attribute_constraints,
                &resource_attribute_key,
                "Max",
                BIG_M,
            )?,
            resource_attribute_consumption_per: keyed(
                &tables["resource_attributes"],
                &[
                    ("Period", periods),
                    ("Resource", &sets.resources),
                    ("Resource Attribute", &sets.resource_attributes),
                ],
                "Value per Resource",
                0.0,
            )?,
            resource_node_initial_count: keyed(
                &tables["resource_initial_counts"],
                &[
                    ("Node", nodes),
                    ("Resource", &sets.resources),
                    ("Node Group", groups),
                ],
                "Initial Count",
                0.0,
            )?,
            resource_capacity_consumption: keyed(
                consumption,
                &consumption_key,
                "Capacity Required per Unit",
                0.0,
            )?,
            resource_capacity_consumption_periods: keyed(
                consumption,
                &consumption_key,
                "Periods of Capacity Consumption",
                0.0,
            )?,
            max_launch_cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::basic_params;

    fn id_set(members: &[&str]) -> IdSet {
        members.iter().map(|m| Rc::from(*m)).collect()
    }

    fn key(parts: &[&str]) -> Vec<Rc<str>> {
        parts.iter().map(|p| Rc::from(*p)).collect()
    }

    #[test]
    fn test_keyed_defaults_and_lookup() {
        let mut table = Table::new("demand", &["Period", "Product", "Demand"]);
        table.push_row(vec!["1".into(), "P".into(), "10".into()]);
        table.push_row(vec!["2".into(), "P".into(), "".into()]); // empty cell means absent

        let periods = id_set(&["1", "2"]);
        let products = id_set(&["P"]);
        let param = keyed(
            &table,
            &[("Period", &periods), ("Product", &products)],
            "Demand",
            0.0,
        )
        .unwrap();

        assert_eq!(param.get(&key(&["1", "P"])), 10.0);
        assert_eq!(param.get(&key(&["2", "P"])), 0.0);
        assert!(param.contains(&key(&["1", "P"])));
        assert!(!param.contains(&key(&["2", "P"])));
    }

    #[test]
    fn test_keyed_wildcard_broadcast_with_override() {
        let mut table = Table::new("weights", &["Period", "Node", "Weight"]);
        table.push_row(vec!["*".into(), "A".into(), "2".into()]);
        table.push_row(vec!["2".into(), "A".into(), "5".into()]);

        let periods = id_set(&["1", "2", "3"]);
        let nodes = id_set(&["A"]);
        let param = keyed(
            &table,
            &[("Period", &periods), ("Node", &nodes)],
            "Weight",
            1.0,
        )
        .unwrap();

        // Broadcast value everywhere, specific row wins where present
        assert_eq!(param.get(&key(&["1", "A"])), 2.0);
        assert_eq!(param.get(&key(&["2", "A"])), 5.0);
        assert_eq!(param.get(&key(&["3", "A"])), 2.0);
        assert_eq!(param.len(), 3);
    }

    #[test]
    fn test_get_int() {
        let mut param = Param::constant(0.0);
        param.values.insert(key(&["1"]), 2.0);
        assert_eq!(param.get_int(&key(&["1"])), 2);
        assert_eq!(param.get_int(&key(&["9"])), 0);
    }

    #[rstest::rstest]
    fn test_build_parameters(basic_params: Parameters) {
        let params = basic_params;
        assert_eq!(params.demand.get(&key(&["1", "P", "B"])), 10.0);
        assert_eq!(params.distance.get(&key(&["A", "B", "M"])), 100.0);
        assert_eq!(params.transport_periods.get_int(&key(&["A", "B", "M"])), 0);
        assert_eq!(params.node_in_nodegroup.get(&key(&["A", "All"])), 1.0);
        // Defaults: absent weights are one, absent capacities are big-M
        assert_eq!(params.period_weight.get(&key(&["9"])), 1.0);
        assert_eq!(
            params.load_capacity.get(&key(&["1", "A", "B", "M", "unit", "All", "All"])),
            BIG_M
        );
        assert_eq!(params.max_launch_cost, BIG_M);
    }
}
