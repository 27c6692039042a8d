//! Resource management: assignment balances, cohort-sized adds and removes gated by
//! binaries, derived capacity by type, attribute consumption with bounds, and the add,
//! remove and holding costs.
use super::{Builder, key};
use crate::milp::{LinearExpr, Model};
use crate::params::{BIG_M, Param};
use itertools::iproduct;
use std::rc::Rc;

impl Builder<'_> {
    pub(super) fn add_resource_constraints(&self, model: &mut Model) {
        self.add_assignment_balance(model);
        self.add_add_remove_gating(model);
        self.add_capacity_by_type(model);
        self.add_count_bounds(model);
        self.add_attribute_consumption(model);
        self.add_resource_costs(model);
    }

    /// A group-qualified parameter resolved through the node's group memberships; the first
    /// explicitly present entry wins.
    fn group_value(&self, param: &Param, prefix: &[&Rc<str>], node: &Rc<str>, default: f64) -> f64 {
        for g in self.sets.groups_of(node) {
            let mut parts: Vec<&Rc<str>> = prefix.to_vec();
            parts.push(g);
            let lookup = key(&parts);
            if param.contains(&lookup) {
                return param.get(&lookup);
            }
        }
        default
    }

    /// Assigned resources evolve by adds and removes from the initial count.
    fn add_assignment_balance(&self, model: &mut Model) {
        let sets = self.sets;
        for ((ri, r), (n_pos, n), (ti, t)) in iproduct!(
            sets.resources.iter().enumerate(),
            sets.node_names.iter().enumerate(),
            sets.periods.iter()
        ) {
            let mut change = LinearExpr::new()
                .plus(self.vars.resources_added.at(&[ri, n_pos, ti]), 1.0)
                .plus(self.vars.resources_removed.at(&[ri, n_pos, ti]), -1.0);
            match sets.periods.lagged(ti, 1) {
                Some(prev) => {
                    change.add_term(self.vars.resources_assigned.at(&[ri, n_pos, prev]), 1.0);
                }
                None => {
                    change.add_constant(self.group_value(
                        &self.params.resource_node_initial_count,
                        &[n, r],
                        n,
                        0.0,
                    ));
                }
            }
            model.add_eq(
                format!("resources_assigned_balance_{r}_{n}_{t}"),
                LinearExpr::variable(self.vars.resources_assigned.at(&[ri, n_pos, ti])),
                change,
            );
        }
    }

    /// Adds and removes only happen when their binary fires, in whole cohorts, within the
    /// configured quantity bands.
    fn add_add_remove_gating(&self, model: &mut Model) {
        let sets = self.sets;
        for ((ri, r), (n_pos, n), (ti, t)) in iproduct!(
            sets.resources.iter().enumerate(),
            sets.node_names.iter().enumerate(),
            sets.periods.iter()
        ) {
            let added = self.vars.resources_added.at(&[ri, n_pos, ti]);
            let removed = self.vars.resources_removed.at(&[ri, n_pos, ti]);
            let added_binary = self.vars.resources_added_binary.at(&[ri, n_pos, ti]);
            let removed_binary = self.vars.resources_removed_binary.at(&[ri, n_pos, ti]);

            model.add_le(
                format!("resources_added_binary_gate_{r}_{n}_{t}"),
                LinearExpr::variable(added),
                LinearExpr::new().plus(added_binary, BIG_M),
            );
            model.add_le(
                format!("resources_removed_binary_gate_{r}_{n}_{t}"),
                LinearExpr::variable(removed),
                LinearExpr::new().plus(removed_binary, BIG_M),
            );

            let add_cohort =
                self.group_value(&self.params.resource_add_cohort_count, &[t, n, r], n, 1.0);
            model.add_eq(
                format!("resources_added_cohorts_{r}_{n}_{t}"),
                LinearExpr::variable(added),
                LinearExpr::new()
                    .plus(self.vars.resource_cohorts_added.at(&[ri, n_pos, ti]), add_cohort),
            );
            let remove_cohort =
                self.group_value(&self.params.resource_remove_cohort_count, &[t, n, r], n, 1.0);
            model.add_eq(
                format!("resources_removed_cohorts_{r}_{n}_{t}"),
                LinearExpr::variable(removed),
                LinearExpr::new().plus(
                    self.vars.resource_cohorts_removed.at(&[ri, n_pos, ti]),
                    remove_cohort,
                ),
            );

            for g in sets.groups_of(n) {
                let band_key = key(&[t, n, r, g]);
                if self.params.resource_min_to_add.contains(&band_key) {
                    model.add_ge(
                        format!("resources_min_to_add_{r}_{n}_{t}_{g}"),
                        LinearExpr::variable(added),
                        LinearExpr::new().plus(
                            added_binary,
                            self.params.resource_min_to_add.get(&band_key),
                        ),
                    );
                }
                if self.params.resource_max_to_add.contains(&band_key) {
                    model.add_le(
                        format!("resources_max_to_add_{r}_{n}_{t}_{g}"),
                        LinearExpr::variable(added),
                        LinearExpr::constant(self.params.resource_max_to_add.get(&band_key)),
                    );
                }
                if self.params.resource_min_to_remove.contains(&band_key) {
                    model.add_ge(
                        format!("resources_min_to_remove_{r}_{n}_{t}_{g}"),
                        LinearExpr::variable(removed),
                        LinearExpr::new().plus(
                            removed_binary,
                            self.params.resource_min_to_remove.get(&band_key),
                        ),
                    );
                }
                if self.params.resource_max_to_remove.contains(&band_key) {
                    model.add_le(
                        format!("resources_max_to_remove_{r}_{n}_{t}_{g}"),
                        LinearExpr::variable(removed),
                        LinearExpr::constant(self.params.resource_max_to_remove.get(&band_key)),
                    );
                }
            }
        }
    }

    /// Capacity per type follows the assigned count at the per-resource rate.
    fn add_capacity_by_type(&self, model: &mut Model) {
        let sets = self.sets;
        for ((ri, r), (n_pos, n), (ti, t), (ci, c)) in iproduct!(
            sets.resources.iter().enumerate(),
            sets.node_names.iter().enumerate(),
            sets.periods.iter(),
            sets.resource_capacity_types.iter().enumerate()
        ) {
            let rate =
                self.group_value(&self.params.resource_capacity_by_type, &[t, n, r, c], n, 0.0);
            model.add_eq(
                format!("resource_capacity_{r}_{n}_{t}_{c}"),
                LinearExpr::variable(self.vars.resource_capacity.at(&[ri, n_pos, ti, ci])),
                LinearExpr::new()
                    .plus(self.vars.resources_assigned.at(&[ri, n_pos, ti]), rate),
            );
        }
    }

    /// Assigned counts stay within the per-node band.
    fn add_count_bounds(&self, model: &mut Model) {
        let sets = self.sets;
        for ((ri, r), (n_pos, n), (ti, t)) in iproduct!(
            sets.resources.iter().enumerate(),
            sets.node_names.iter().enumerate(),
            sets.periods.iter()
        ) {
            for g in sets.groups_of(n) {
                let band_key = key(&[t, n, r, g]);
                if self.params.resource_node_min_count.contains(&band_key) {
                    model.add_ge(
                        format!("resource_node_min_count_{r}_{n}_{t}_{g}"),
                        LinearExpr::variable(self.vars.resources_assigned.at(&[ri, n_pos, ti])),
                        LinearExpr::constant(
                            self.params.resource_node_min_count.get(&band_key),
                        ),
                    );
                }
                if self.params.resource_node_max_count.contains(&band_key) {
                    model.add_le(
                        format!("resource_node_max_count_{r}_{n}_{t}_{g}"),
                        LinearExpr::variable(self.vars.resources_assigned.at(&[ri, n_pos, ti])),
                        LinearExpr::constant(
                            self.params.resource_node_max_count.get(&band_key),
                        ),
                    );
                }
            }
        }
    }

    /// Attribute consumption follows the assigned count; per-group bands bound it.
    fn add_attribute_consumption(&self, model: &mut Model) {
        let sets = self.sets;
        for ((ri, r), (n_pos, n), (ti, t), (ai, a)) in iproduct!(
            sets.resources.iter().enumerate(),
            sets.node_names.iter().enumerate(),
            sets.periods.iter(),
            sets.resource_attributes.iter().enumerate()
        ) {
            let per_resource = self
                .params
                .resource_attribute_consumption_per
                .get(&key(&[t, r, a]));
            let consumption = self.vars.resource_attribute_consumption.at(&[ri, ti, n_pos, ai]);
            model.add_eq(
                format!("resource_attribute_consumption_{r}_{t}_{n}_{a}"),
                LinearExpr::variable(consumption),
                LinearExpr::new()
                    .plus(self.vars.resources_assigned.at(&[ri, n_pos, ti]), per_resource),
            );

            for g in sets.groups_of(n) {
                let band_key = key(&[t, n, r, g, a]);
                if self.params.resource_attribute_min.contains(&band_key) {
                    model.add_ge(
                        format!("resource_attribute_min_{r}_{t}_{n}_{a}_{g}"),
                        LinearExpr::variable(consumption),
                        LinearExpr::constant(self.params.resource_attribute_min.get(&band_key)),
                    );
                }
                if self.params.resource_attribute_max.contains(&band_key) {
                    model.add_le(
                        format!("resource_attribute_max_{r}_{t}_{n}_{a}_{g}"),
                        LinearExpr::variable(consumption),
                        LinearExpr::constant(self.params.resource_attribute_max.get(&band_key)),
                    );
                }
            }
        }
    }

    /// Per-period add, remove and holding costs and their grand total.
    fn add_resource_costs(&self, model: &mut Model) {
        let sets = self.sets;
        let mut grand = LinearExpr::new();
        for ((ti, t), (n_pos, n), (ri, r)) in iproduct!(
            sets.periods.iter(),
            sets.node_names.iter().enumerate(),
            sets.resources.iter().enumerate()
        ) {
            let weight = self.params.period_weight.get(&key(&[t]));

            let add_cost = self.vars.resource_add_cost.at(&[ti, n_pos, ri]);
            let remove_cost = self.vars.resource_remove_cost.at(&[ti, n_pos, ri]);
            let time_cost = self.vars.resource_time_cost.at(&[ti, n_pos, ri]);
            grand.add_term(add_cost, 1.0);
            grand.add_term(remove_cost, 1.0);
            grand.add_term(time_cost, 1.0);

            let add_rate =
                self.group_value(&self.params.resource_fixed_add_cost, &[t, n, r], n, 0.0);
            model.add_ge(
                format!("resource_add_cost_{t}_{n}_{r}"),
                LinearExpr::variable(add_cost),
                LinearExpr::new()
                    .plus(self.vars.resources_added.at(&[ri, n_pos, ti]), weight * add_rate),
            );

            let remove_rate =
                self.group_value(&self.params.resource_fixed_remove_cost, &[t, n, r], n, 0.0);
            model.add_ge(
                format!("resource_remove_cost_{t}_{n}_{r}"),
                LinearExpr::variable(remove_cost),
                LinearExpr::new().plus(
                    self.vars.resources_removed.at(&[ri, n_pos, ti]),
                    weight * remove_rate,
                ),
            );

            let time_rate =
                self.group_value(&self.params.resource_cost_per_time, &[t, n, r], n, 0.0);
            model.add_ge(
                format!("resource_time_cost_{t}_{n}_{r}"),
                LinearExpr::variable(time_cost),
                LinearExpr::new().plus(
                    self.vars.resources_assigned.at(&[ri, n_pos, ti]),
                    weight * time_rate,
                ),
            );
        }

        model.add_eq(
            "resource_grand_total_cost".to_string(),
            LinearExpr::variable(self.vars.resource_grand_total_cost.scalar()),
            grand,
        );
    }
}
