//! The decision-variable registry.
//!
//! Every variable family is a dense tensor over the cross product of its index sets, created
//! up front; feasibility sparsity emerges from the constraints, not from skipping columns.
//! Each tensor carries its ordered dimension signature, which the result extractor walks to
//! turn valuations back into relational rows.
use crate::milp::{BINARY, CONTINUOUS, INTEGER, Model, VarId, VariableDefinition};
use crate::network::{NetworkSets, SetKind};
use crate::params::BIG_M;

/// One family of decision variables: a dense tensor of columns.
#[derive(Clone, Debug)]
pub struct VarTensor {
    name: &'static str,
    dims: Vec<SetKind>,
    shape: Vec<usize>,
    start: usize,
}

impl VarTensor {
    /// The family name (also the result-table name).
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The ordered dimension signature.
    pub fn dims(&self) -> &[SetKind] {
        &self.dims
    }

    /// The member count along each dimension.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Total number of columns in the family.
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    /// Whether the family has no columns (some index set is empty).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The column holding the member at the given per-dimension positions.
    pub fn at(&self, index: &[usize]) -> VarId {
        debug_assert_eq!(index.len(), self.shape.len(), "Rank mismatch for {}", self.name);
        let mut flat = 0;
        for (position, extent) in index.iter().zip(&self.shape) {
            debug_assert!(position < extent, "Index out of range for {}", self.name);
            flat = flat * extent + position;
        }
        VarId::from_index(self.start + flat)
    }

    /// The single column of a scalar (zero-dimensional) family.
    pub fn scalar(&self) -> VarId {
        self.at(&[])
    }
}

/// Append one tensor's worth of columns to the model.
fn tensor(
    model: &mut Model,
    sets: &NetworkSets,
    name: &'static str,
    dims: &[SetKind],
    definition: VariableDefinition,
) -> VarTensor {
    let shape: Vec<usize> = dims.iter().map(|&kind| sets.members(kind).len()).collect();
    let count: usize = shape.iter().product();
    let start = model.num_variables();
    for _ in 0..count {
        model.add_variable(definition);
    }

    VarTensor {
        name,
        dims: dims.to_vec(),
        shape,
        start,
    }
}

/// A continuous variable capped at the big-M ceiling.
const CAPPED: VariableDefinition = VariableDefinition {
    min: 0.0,
    max: BIG_M,
    integer: false,
};

/// Every variable family of the planning model.
#[derive(Clone, Debug)]
#[allow(missing_docs)]
pub struct Variables {
    // Flow
    pub departed_product_by_mode: VarTensor,
    pub departed_product: VarTensor,
    pub processed_product: VarTensor,
    pub arrived_product: VarTensor,
    pub dropped_demand: VarTensor,
    pub ib_carried_over_demand: VarTensor,
    pub ob_carried_over_demand: VarTensor,
    pub arrived_and_completed_product: VarTensor,
    pub total_arrived_and_completed_product: VarTensor,

    // Capacity expansion options
    pub use_carrying_capacity_option: VarTensor,
    pub use_transportation_capacity_option: VarTensor,
    pub c_capacity_option_cost: VarTensor,
    pub t_capacity_option_cost: VarTensor,
    pub grand_total_c_capacity_option: VarTensor,
    pub grand_total_t_capacity_option: VarTensor,

    // Transportation costs
    pub variable_transportation_costs: VarTensor,
    pub fixed_transportation_costs: VarTensor,
    pub transportation_costs: VarTensor,
    pub od_transportation_costs: VarTensor,
    pub mode_transportation_costs: VarTensor,
    pub total_od_transportation_costs: VarTensor,
    pub total_mode_transportation_costs: VarTensor,
    pub total_time_transportation_costs: VarTensor,
    pub grand_total_transportation_costs: VarTensor,

    // Operating costs
    pub variable_operating_costs: VarTensor,
    pub fixed_operating_costs: VarTensor,
    pub operating_costs: VarTensor,
    pub operating_costs_by_origin: VarTensor,
    pub total_operating_costs: VarTensor,
    pub grand_total_operating_costs: VarTensor,

    // Resources
    pub resources_assigned: VarTensor,
    pub resources_added: VarTensor,
    pub resources_removed: VarTensor,
    pub resources_added_binary: VarTensor,
    pub resources_removed_binary: VarTensor,
    pub resource_cohorts_added: VarTensor,
    pub resource_cohorts_removed: VarTensor,
    pub resource_capacity: VarTensor,
    pub resource_attribute_consumption: VarTensor,
    pub resource_add_cost: VarTensor,
    pub resource_remove_cost: VarTensor,
    pub resource_time_cost: VarTensor,
    pub resource_grand_total_cost: VarTensor,

    // Loads and measures
    pub num_loads_by_group: VarTensor,
    pub num_loads: VarTensor,
    pub od_num_loads: VarTensor,
    pub mode_num_loads: VarTensor,
    pub total_od_num_loads: VarTensor,
    pub total_mode_num_loads: VarTensor,
    pub total_num_loads: VarTensor,
    pub grand_total_num_loads: VarTensor,
    pub departed_measures: VarTensor,

    // Age stratification
    pub vol_arrived_by_age: VarTensor,
    pub ib_vol_carried_over_by_age: VarTensor,
    pub ob_vol_carried_over_by_age: VarTensor,
    pub vol_processed_by_age: VarTensor,
    pub vol_dropped_by_age: VarTensor,
    pub demand_by_age: VarTensor,
    pub vol_departed_by_age: VarTensor,
    pub age_violation_cost: VarTensor,
    pub grand_total_age_violation_cost: VarTensor,
    pub max_age: VarTensor,
    pub is_age_received: VarTensor,

    // Launch and shutdown
    pub is_launched: VarTensor,
    pub is_shut_down: VarTensor,
    pub is_site_operating: VarTensor,
    pub total_launch_cost: VarTensor,
    pub launch_costs_by_period: VarTensor,
    pub grand_total_launch_cost: VarTensor,
    pub total_shut_down_cost: VarTensor,
    pub shut_down_costs_by_period: VarTensor,
    pub grand_total_shut_down_cost: VarTensor,

    // Plan-over-plan
    pub pop_cost: VarTensor,
    pub volume_moved: VarTensor,
    pub num_destinations_moved: VarTensor,
    pub total_volume_moved: VarTensor,
    pub total_num_destinations_moved: VarTensor,
    pub grand_total_pop_cost: VarTensor,
    pub binary_product_destination_assignment: VarTensor,
    pub is_destination_assigned_to_origin: VarTensor,

    // Carried and dropped volume costs
    pub dropped_volume_cost: VarTensor,
    pub ib_carried_volume_cost: VarTensor,
    pub ob_carried_volume_cost: VarTensor,
    pub dropped_volume_cost_by_period: VarTensor,
    pub ib_carried_volume_cost_by_period: VarTensor,
    pub ob_carried_volume_cost_by_period: VarTensor,
    pub dropped_volume_cost_by_product: VarTensor,
    pub ib_carried_volume_cost_by_product: VarTensor,
    pub ob_carried_volume_cost_by_product: VarTensor,
    pub dropped_volume_cost_by_node: VarTensor,
    pub ib_carried_volume_cost_by_node: VarTensor,
    pub ob_carried_volume_cost_by_node: VarTensor,
    pub ib_carried_volume_cost_by_node_time: VarTensor,
    pub ob_carried_volume_cost_by_node_time: VarTensor,
    pub dropped_volume_cost_by_product_time: VarTensor,
    pub ib_carried_volume_cost_by_product_time: VarTensor,
    pub ob_carried_volume_cost_by_product_time: VarTensor,
    pub total_dropped_volume_cost: VarTensor,
    pub total_ib_carried_volume_cost: VarTensor,
    pub total_ob_carried_volume_cost: VarTensor,
    pub grand_total_carried_and_dropped_volume_cost: VarTensor,

    // Metrics
    pub max_transit_distance: VarTensor,
    pub max_capacity_utilization: VarTensor,
    pub node_utilization: VarTensor,
}

impl Variables {
    /// Instantiate every variable family over the given set family.
    pub fn create(model: &mut Model, sets: &NetworkSets) -> Variables {
        use SetKind::*;

        let mut t = |name: &'static str, dims: &[SetKind], definition: VariableDefinition| {
            tensor(model, sets, name, dims, definition)
        };

        Variables {
            departed_product_by_mode: t(
                "departed_product_by_mode",
                &[DepartingNodes, ReceivingNodes, Products, Periods, Modes],
                INTEGER,
            ),
            departed_product: t(
                "departed_product",
                &[DepartingNodes, ReceivingNodes, Products, Periods],
                INTEGER,
            ),
            processed_product: t("processed_product", &[Nodes, Products, Periods], INTEGER),
            arrived_product: t(
                "arrived_product",
                &[ReceivingNodes, Products, Periods],
                CONTINUOUS,
            ),
            dropped_demand: t("dropped_demand", &[Nodes, Products, Periods], CONTINUOUS),
            ib_carried_over_demand: t(
                "ib_carried_over_demand",
                &[ReceivingNodes, Products, Periods],
                CONTINUOUS,
            ),
            ob_carried_over_demand: t(
                "ob_carried_over_demand",
                &[DepartingNodes, Products, Periods],
                CONTINUOUS,
            ),
            arrived_and_completed_product: t(
                "arrived_and_completed_product",
                &[Periods, Products, ReceivingNodes],
                CAPPED,
            ),
            total_arrived_and_completed_product: t(
                "total_arrived_and_completed_product",
                &[],
                CAPPED,
            ),

            use_carrying_capacity_option: t(
                "use_carrying_capacity_option",
                &[Nodes, CCapacityExpansions, Periods],
                INTEGER,
            ),
            use_transportation_capacity_option: t(
                "use_transportation_capacity_option",
                &[DepartingNodes, ReceivingNodes, TCapacityExpansions, Periods],
                INTEGER,
            ),
            c_capacity_option_cost: t(
                "c_capacity_option_cost",
                &[Nodes, CCapacityExpansions, Periods],
                CONTINUOUS,
            ),
            t_capacity_option_cost: t(
                "t_capacity_option_cost",
                &[DepartingNodes, ReceivingNodes, TCapacityExpansions, Periods],
                CONTINUOUS,
            ),
            grand_total_c_capacity_option: t("grand_total_c_capacity_option", &[], CONTINUOUS),
            grand_total_t_capacity_option: t("grand_total_t_capacity_option", &[], CONTINUOUS),

            variable_transportation_costs: t(
                "variable_transportation_costs",
                &[DepartingNodes, ReceivingNodes, Periods, Modes, Measures],
                CONTINUOUS,
            ),
            fixed_transportation_costs: t(
                "fixed_transportation_costs",
                &[DepartingNodes, ReceivingNodes, Periods, Modes, Measures],
                CONTINUOUS,
            ),
            transportation_costs: t(
                "transportation_costs",
                &[DepartingNodes, ReceivingNodes, Periods, Modes],
                CONTINUOUS,
            ),
            od_transportation_costs: t(
                "od_transportation_costs",
                &[DepartingNodes, ReceivingNodes, Periods],
                CONTINUOUS,
            ),
            mode_transportation_costs: t(
                "mode_transportation_costs",
                &[Periods, Modes],
                CONTINUOUS,
            ),
            total_od_transportation_costs: t(
                "total_od_transportation_costs",
                &[DepartingNodes, ReceivingNodes],
                CONTINUOUS,
            ),
            total_mode_transportation_costs: t(
                "total_mode_transportation_costs",
                &[Modes],
                CONTINUOUS,
            ),
            total_time_transportation_costs: t(
                "total_time_transportation_costs",
                &[Periods],
                CONTINUOUS,
            ),
            grand_total_transportation_costs: t(
                "grand_total_transportation_costs",
                &[],
                CONTINUOUS,
            ),

            variable_operating_costs: t(
                "variable_operating_costs",
                &[Nodes, Products, Periods],
                CONTINUOUS,
            ),
            fixed_operating_costs: t("fixed_operating_costs", &[Nodes, Periods], CONTINUOUS),
            operating_costs: t("operating_costs", &[Nodes, Periods], CONTINUOUS),
            operating_costs_by_origin: t("operating_costs_by_origin", &[Nodes], CONTINUOUS),
            total_operating_costs: t("total_operating_costs", &[Periods], CONTINUOUS),
            grand_total_operating_costs: t("grand_total_operating_costs", &[], CONTINUOUS),

            resources_assigned: t(
                "resources_assigned",
                &[Resources, Nodes, Periods],
                CONTINUOUS,
            ),
            resources_added: t("resources_added", &[Resources, Nodes, Periods], CONTINUOUS),
            resources_removed: t(
                "resources_removed",
                &[Resources, Nodes, Periods],
                CONTINUOUS,
            ),
            resources_added_binary: t(
                "resources_added_binary",
                &[Resources, Nodes, Periods],
                BINARY,
            ),
            resources_removed_binary: t(
                "resources_removed_binary",
                &[Resources, Nodes, Periods],
                BINARY,
            ),
            resource_cohorts_added: t(
                "resource_cohorts_added",
                &[Resources, Nodes, Periods],
                INTEGER,
            ),
            resource_cohorts_removed: t(
                "resource_cohorts_removed",
                &[Resources, Nodes, Periods],
                INTEGER,
            ),
            resource_capacity: t(
                "resource_capacity",
                &[Resources, Nodes, Periods, ResourceCapacityTypes],
                CONTINUOUS,
            ),
            resource_attribute_consumption: t(
                "resource_attribute_consumption",
                &[Resources, Periods, Nodes, ResourceAttributes],
                CONTINUOUS,
            ),
            resource_add_cost: t("resource_add_cost", &[Periods, Nodes, Resources], CONTINUOUS),
            resource_remove_cost: t(
                "resource_remove_cost",
                &[Periods, Nodes, Resources],
                CONTINUOUS,
            ),
            resource_time_cost: t(
                "resource_time_cost",
                &[Periods, Nodes, Resources],
                CONTINUOUS,
            ),
            resource_grand_total_cost: t("resource_grand_total_cost", &[], CONTINUOUS),

            num_loads_by_group: t(
                "num_loads_by_group",
                &[DepartingNodes, ReceivingNodes, Periods, Modes, TransportationGroups],
                INTEGER,
            ),
            num_loads: t(
                "num_loads",
                &[DepartingNodes, ReceivingNodes, Periods, Modes],
                CONTINUOUS,
            ),
            od_num_loads: t(
                "od_num_loads",
                &[DepartingNodes, ReceivingNodes, Periods],
                CONTINUOUS,
            ),
            mode_num_loads: t("mode_num_loads", &[Modes, Periods], CONTINUOUS),
            total_od_num_loads: t(
                "total_od_num_loads",
                &[DepartingNodes, ReceivingNodes],
                CONTINUOUS,
            ),
            total_mode_num_loads: t("total_mode_num_loads", &[Modes], CONTINUOUS),
            total_num_loads: t("total_num_loads", &[Periods], CONTINUOUS),
            grand_total_num_loads: t("grand_total_num_loads", &[], CONTINUOUS),
            departed_measures: t(
                "departed_measures",
                &[DepartingNodes, ReceivingNodes, Products, Periods, Modes, Measures],
                CONTINUOUS,
            ),

            vol_arrived_by_age: t(
                "vol_arrived_by_age",
                &[ReceivingNodes, Products, Periods, Ages],
                CONTINUOUS,
            ),
            ib_vol_carried_over_by_age: t(
                "ib_vol_carried_over_by_age",
                &[ReceivingNodes, Products, Periods, Ages],
                CONTINUOUS,
            ),
            ob_vol_carried_over_by_age: t(
                "ob_vol_carried_over_by_age",
                &[DepartingNodes, Products, Periods, Ages],
                CONTINUOUS,
            ),
            vol_processed_by_age: t(
                "vol_processed_by_age",
                &[Nodes, Products, Periods, Ages],
                CONTINUOUS,
            ),
            vol_dropped_by_age: t(
                "vol_dropped_by_age",
                &[Nodes, Products, Periods, Ages],
                CONTINUOUS,
            ),
            demand_by_age: t("demand_by_age", &[Nodes, Products, Periods, Ages], CONTINUOUS),
            vol_departed_by_age: t(
                "vol_departed_by_age",
                &[DepartingNodes, ReceivingNodes, Products, Periods, Ages, Modes],
                CONTINUOUS,
            ),
            age_violation_cost: t(
                "age_violation_cost",
                &[Nodes, Products, Periods, Ages],
                CONTINUOUS,
            ),
            grand_total_age_violation_cost: t(
                "grand_total_age_violation_cost",
                &[],
                CONTINUOUS,
            ),
            max_age: t("max_age", &[], INTEGER),
            is_age_received: t("is_age_received", &[Ages], BINARY),

            is_launched: t("is_launched", &[Nodes, Periods], BINARY),
            is_shut_down: t("is_shut_down", &[Nodes, Periods], BINARY),
            is_site_operating: t("is_site_operating", &[Nodes, Periods], BINARY),
            total_launch_cost: t("total_launch_cost", &[Nodes, Periods], CONTINUOUS),
            launch_costs_by_period: t("launch_costs_by_period", &[Periods], CONTINUOUS),
            grand_total_launch_cost: t("grand_total_launch_cost", &[], CONTINUOUS),
            total_shut_down_cost: t("total_shut_down_cost", &[Nodes, Periods], CONTINUOUS),
            shut_down_costs_by_period: t("shut_down_costs_by_period", &[Periods], CONTINUOUS),
            grand_total_shut_down_cost: t("grand_total_shut_down_cost", &[], CONTINUOUS),

            pop_cost: t(
                "pop_cost",
                &[Periods, Periods, Products, DepartingNodes, ReceivingNodes],
                CONTINUOUS,
            ),
            volume_moved: t(
                "volume_moved",
                &[Periods, Periods, Products, DepartingNodes, ReceivingNodes],
                CONTINUOUS,
            ),
            num_destinations_moved: t(
                "num_destinations_moved",
                &[Periods, Periods, Products, DepartingNodes, ReceivingNodes],
                CONTINUOUS,
            ),
            total_volume_moved: t("total_volume_moved", &[], CONTINUOUS),
            total_num_destinations_moved: t("total_num_destinations_moved", &[], CONTINUOUS),
            grand_total_pop_cost: t("grand_total_pop_cost", &[], CONTINUOUS),
            binary_product_destination_assignment: t(
                "binary_product_destination_assignment",
                &[DepartingNodes, Periods, Products, ReceivingNodes],
                BINARY,
            ),
            is_destination_assigned_to_origin: t(
                "is_destination_assigned_to_origin",
                &[DepartingNodes, ReceivingNodes, Periods],
                BINARY,
            ),

            dropped_volume_cost: t(
                "dropped_volume_cost",
                &[Nodes, Products, Periods, Ages],
                CONTINUOUS,
            ),
            ib_carried_volume_cost: t(
                "ib_carried_volume_cost",
                &[Nodes, Products, Periods, Ages],
                CONTINUOUS,
            ),
            ob_carried_volume_cost: t(
                "ob_carried_volume_cost",
                &[Nodes, Products, Periods, Ages],
                CONTINUOUS,
            ),
            dropped_volume_cost_by_period: t(
                "dropped_volume_cost_by_period",
                &[Periods],
                CONTINUOUS,
            ),
            ib_carried_volume_cost_by_period: t(
                "ib_carried_volume_cost_by_period",
                &[Periods],
                CONTINUOUS,
            ),
            ob_carried_volume_cost_by_period: t(
                "ob_carried_volume_cost_by_period",
                &[Periods],
                CONTINUOUS,
            ),
            dropped_volume_cost_by_product: t(
                "dropped_volume_cost_by_product",
                &[Products],
                CONTINUOUS,
            ),
            ib_carried_volume_cost_by_product: t(
                "ib_carried_volume_cost_by_product",
                &[Products],
                CONTINUOUS,
            ),
            ob_carried_volume_cost_by_product: t(
                "ob_carried_volume_cost_by_product",
                &[Products],
                CONTINUOUS,
            ),
            dropped_volume_cost_by_node: t("dropped_volume_cost_by_node", &[Nodes], CONTINUOUS),
            ib_carried_volume_cost_by_node: t(
                "ib_carried_volume_cost_by_node",
                &[Nodes],
                CONTINUOUS,
            ),
            ob_carried_volume_cost_by_node: t(
                "ob_carried_volume_cost_by_node",
                &[Nodes],
                CONTINUOUS,
            ),
            ib_carried_volume_cost_by_node_time: t(
                "ib_carried_volume_cost_by_node_time",
                &[Nodes, Periods],
                CONTINUOUS,
            ),
            ob_carried_volume_cost_by_node_time: t(
                "ob_carried_volume_cost_by_node_time",
                &[Nodes, Periods],
                CONTINUOUS,
            ),
            dropped_volume_cost_by_product_time: t(
                "dropped_volume_cost_by_product_time",
                &[Products, Periods],
                CONTINUOUS,
            ),
            ib_carried_volume_cost_by_product_time: t(
                "ib_carried_volume_cost_by_product_time",
                &[Products, Periods],
                CONTINUOUS,
            ),
            ob_carried_volume_cost_by_product_time: t(
                "ob_carried_volume_cost_by_product_time",
                &[Products, Periods],
                CONTINUOUS,
            ),
            total_dropped_volume_cost: t("total_dropped_volume_cost", &[], CONTINUOUS),
            total_ib_carried_volume_cost: t("total_ib_carried_volume_cost", &[], CONTINUOUS),
            total_ob_carried_volume_cost: t("total_ob_carried_volume_cost", &[], CONTINUOUS),
            grand_total_carried_and_dropped_volume_cost: t(
                "grand_total_carried_and_dropped_volume_cost",
                &[],
                CONTINUOUS,
            ),

            max_transit_distance: t("max_transit_distance", &[], CONTINUOUS),
            max_capacity_utilization: t("max_capacity_utilization", &[], CONTINUOUS),
            node_utilization: t(
                "node_utilization",
                &[Nodes, Periods, ResourceCapacityTypes],
                CONTINUOUS,
            ),
        }
    }

    /// Every variable family, in creation order.
    pub fn all(&self) -> Vec<&VarTensor> {
        vec![
            &self.departed_product_by_mode,
            &self.departed_product,
            &self.processed_product,
            &self.arrived_product,
            &self.dropped_demand,
            &self.ib_carried_over_demand,
            &self.ob_carried_over_demand,
            &self.arrived_and_completed_product,
            &self.total_arrived_and_completed_product,
            &self.use_carrying_capacity_option,
            &self.use_transportation_capacity_option,
            &self.c_capacity_option_cost,
            &self.t_capacity_option_cost,
            &self.grand_total_c_capacity_option,
            &self.grand_total_t_capacity_option,
            &self.variable_transportation_costs,
            &self.fixed_transportation_costs,
            &self.transportation_costs,
            &self.od_transportation_costs,
            &self.mode_transportation_costs,
            &self.total_od_transportation_costs,
            &self.total_mode_transportation_costs,
            &self.total_time_transportation_costs,
            &self.grand_total_transportation_costs,
            &self.variable_operating_costs,
            &self.fixed_operating_costs,
            &self.operating_costs,
            &self.operating_costs_by_origin,
            &self.total_operating_costs,
            &self.grand_total_operating_costs,
            &self.resources_assigned,
            &self.resources_added,
            &self.resources_removed,
            &self.resources_added_binary,
            &self.resources_removed_binary,
            &self.resource_cohorts_added,
            &self.resource_cohorts_removed,
            &self.resource_capacity,
            &self.resource_attribute_consumption,
            &self.resource_add_cost,
            &self.resource_remove_cost,
            &self.resource_time_cost,
            &self.resource_grand_total_cost,
            &self.num_loads_by_group,
            &self.num_loads,
            &self.od_num_loads,
            &self.mode_num_loads,
            &self.total_od_num_loads,
            &self.total_mode_num_loads,
            &self.total_num_loads,
            &self.grand_total_num_loads,
            &self.departed_measures,
            &self.vol_arrived_by_age,
            &self.ib_vol_carried_over_by_age,
            &self.ob_vol_carried_over_by_age,
            &self.vol_processed_by_age,
            &self.vol_dropped_by_age,
            &self.demand_by_age,
            &self.vol_departed_by_age,
            &self.age_violation_cost,
            &self.grand_total_age_violation_cost,
            &self.max_age,
            &self.is_age_received,
            &self.is_launched,
            &self.is_shut_down,
            &self.is_site_operating,
            &self.total_launch_cost,
            &self.launch_costs_by_period,
            &self.grand_total_launch_cost,
            &self.total_shut_down_cost,
            &self.shut_down_costs_by_period,
            &self.grand_total_shut_down_cost,
            &self.pop_cost,
            &self.volume_moved,
            &self.num_destinations_moved,
            &self.total_volume_moved,
            &self.total_num_destinations_moved,
            &self.grand_total_pop_cost,
            &self.binary_product_destination_assignment,
            &self.is_destination_assigned_to_origin,
            &self.dropped_volume_cost,
            &self.ib_carried_volume_cost,
            &self.ob_carried_volume_cost,
            &self.dropped_volume_cost_by_period,
            &self.ib_carried_volume_cost_by_period,
            &self.ob_carried_volume_cost_by_period,
            &self.dropped_volume_cost_by_product,
            &self.ib_carried_volume_cost_by_product,
            &self.ob_carried_volume_cost_by_product,
            &self.dropped_volume_cost_by_node,
            &self.ib_carried_volume_cost_by_node,
            &self.ob_carried_volume_cost_by_node,
            &self.ib_carried_volume_cost_by_node_time,
            &self.ob_carried_volume_cost_by_node_time,
            &self.dropped_volume_cost_by_product_time,
            &self.ib_carried_volume_cost_by_product_time,
            &self.ob_carried_volume_cost_by_product_time,
            &self.total_dropped_volume_cost,
            &self.total_ib_carried_volume_cost,
            &self.total_ob_carried_volume_cost,
            &self.grand_total_carried_and_dropped_volume_cost,
            &self.max_transit_distance,
            &self.max_capacity_utilization,
            &self.node_utilization,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::basic_sets;
    use rstest::rstest;

    #[rstest]
    fn test_tensor_indexing(basic_sets: NetworkSets) {
        let mut model = Model::new();
        let vars = Variables::create(&mut model, &basic_sets);

        // Column count matches the sum of tensor sizes
        let total: usize = vars.all().iter().map(|t| t.len()).sum();
        assert_eq!(model.num_variables(), total);

        // Distinct indices map to distinct columns
        let a = vars.departed_product.at(&[0, 0, 0, 0]);
        let b = vars.departed_product.at(&[0, 0, 0, 1]);
        assert_ne!(a, b);

        // Scalars are single columns
        assert_eq!(vars.max_age.len(), 1);
        let _ = vars.max_age.scalar();
    }

    #[rstest]
    fn test_integrality_assignments(basic_sets: NetworkSets) {
        let mut model = Model::new();
        let vars = Variables::create(&mut model, &basic_sets);

        assert!(model.columns()[vars.departed_product.at(&[0, 0, 0, 0]).index()].integer);
        assert!(!model.columns()[vars.arrived_product.at(&[0, 0, 0]).index()].integer);

        let launched = model.columns()[vars.is_launched.at(&[0, 0]).index()];
        assert!(launched.integer);
        assert_eq!(launched.max, 1.0);
    }
}
