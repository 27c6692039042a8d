//! The constraint families of the planning model.
//!
//! Each submodule mirrors one family of the constraint algebra: flow conservation, age
//! stratification, capacity, transportation, operating and inventory costs, launch/shutdown
//! state, plan-over-plan change and resource management. All builders hang off a shared
//! [`Builder`] holding the sets, parameters and variable registry.
use crate::milp::Model;
use crate::model::variables::Variables;
use crate::network::NetworkSets;
use crate::params::Parameters;
use std::rc::Rc;

mod age;
mod capacity;
mod cost;
mod flow;
mod launch;
mod pop;
mod resource;
mod transportation;

pub use flow::demand_equality_name;

/// Shared context for the constraint builders.
pub struct Builder<'a> {
    /// The scenario's index sets
    pub sets: &'a NetworkSets,
    /// The scenario's parameters
    pub params: &'a Parameters,
    /// The variable registry
    pub vars: &'a Variables,
}

impl Builder<'_> {
    /// Position of a node within the all-nodes set.
    ///
    /// Panics on unknown names: constraint builders only iterate derived sets.
    pub(crate) fn node(&self, name: &str) -> usize {
        self.sets
            .node_names
            .get_index_of(name)
            .expect("node in registry")
    }

    /// Position of a node within the receiving-nodes set.
    pub(crate) fn receiving(&self, name: &str) -> usize {
        self.sets
            .receiving_nodes
            .get_index_of(name)
            .expect("receiving node in registry")
    }

    /// Whether `node` belongs to node group `group`.
    pub(crate) fn in_group(&self, node: &Rc<str>, group: &Rc<str>) -> bool {
        self.params
            .node_in_nodegroup
            .get(&key(&[node, group]))
            == 1.0
    }
}

/// Clone key parts into a parameter lookup key.
pub(crate) fn key(parts: &[&Rc<str>]) -> Vec<Rc<str>> {
    parts.iter().map(|part| Rc::clone(part)).collect()
}

/// Add every constraint family to the model.
pub fn add_all(model: &mut Model, vars: &Variables, sets: &NetworkSets, params: &Parameters) {
    let builder = Builder { sets, params, vars };

    builder.add_flow_constraints(model);
    builder.add_age_constraints(model);
    builder.add_transportation_constraints(model);
    builder.add_resource_constraints(model);
    builder.add_capacity_constraints(model);
    builder.add_cost_constraints(model);
    builder.add_launch_constraints(model);
    builder.add_pop_constraints(model);
}
