//! Capacity: resource-backed processing capacity (child and parent types), inbound and
//! outbound carrying capacity with installable expansions, carry/drop ceilings, lane load
//! capacity with installable expansions, expansion-option costs and the utilization metric.
use super::{Builder, key};
use crate::milp::{LinearExpr, Model, VarId};
use crate::params::Param;
use itertools::iproduct;
use std::rc::Rc;

impl Builder<'_> {
    pub(super) fn add_capacity_constraints(&self, model: &mut Model) {
        self.add_resource_capacity_limits(model);
        self.add_carrying_capacity(model);
        self.add_carry_and_drop_ceilings(model);
        self.add_transportation_capacity(model);
        self.add_expansion_option_costs(model);
        self.add_expansion_option_counts(model);
        self.add_max_utilization(model);
    }

    /// Capacity consumed by processing, in the current period plus the still-held
    /// consumption of prior periods, must fit within the assigned resource capacity.
    fn add_resource_capacity_limits(&self, model: &mut Model) {
        let sets = self.sets;
        for ((n_pos, n), (ti, t), (ci, c), g) in iproduct!(
            sets.node_names.iter().enumerate(),
            sets.periods.iter(),
            sets.resource_capacity_types.iter().enumerate(),
            sets.node_groups.iter()
        ) {
            if !self.in_group(n, g) {
                continue;
            }
            let is_child = sets.resource_child_capacity_types.contains(c);

            let mut consumed = LinearExpr::new();
            for ((pi, p), (t2i, t2)) in iproduct!(
                sets.products.iter().enumerate(),
                sets.periods.iter()
            ) {
                let in_window = |hold: i64| {
                    let t2n = sets.periods.number(t2i);
                    let tn = sets.periods.number(ti);
                    t2n == tn || (t2n >= tn - hold && t2n < tn)
                };

                if is_child {
                    let rate_key = key(&[p, t2, g, n, c]);
                    let rate = self.params.resource_capacity_consumption.get(&rate_key);
                    if rate == 0.0 {
                        continue;
                    }
                    let hold = self
                        .params
                        .resource_capacity_consumption_periods
                        .get_int(&rate_key);
                    if in_window(hold) {
                        consumed
                            .add_term(self.vars.processed_product.at(&[n_pos, pi, t2i]), rate);
                    }
                } else {
                    // Parent types accumulate their children's consumption at the
                    // hierarchy's relative rate
                    for c2 in &sets.resource_child_capacity_types {
                        let rate = self
                            .params
                            .resource_capacity_consumption
                            .get(&key(&[p, t2, g, n, c2]))
                            * self.params.capacity_type_hierarchy.get(&key(&[c2, c]));
                        if rate == 0.0 {
                            continue;
                        }
                        let hold = self
                            .params
                            .resource_capacity_consumption_periods
                            .get_int(&key(&[p, t2, g, n, c]));
                        if in_window(hold) {
                            consumed
                                .add_term(self.vars.processed_product.at(&[n_pos, pi, t2i]), rate);
                        }
                    }
                }
            }

            let capacity = LinearExpr::sum(
                (0..sets.resources.len())
                    .map(|ri| self.vars.resource_capacity.at(&[ri, n_pos, ti, ci])),
            );
            let family = if is_child {
                "capacity"
            } else {
                "parent_capacity"
            };
            model.add_le(format!("{family}_limit_{n}_{t}_{c}_{g}"), consumed, capacity);
        }
    }

    /// Carried-over volume, in every measure, fits the base carrying capacity plus installed
    /// expansions.
    fn add_carrying_capacity(&self, model: &mut Model) {
        let sets = self.sets;

        for ((di, d), (ti, t), (ui, u), g) in iproduct!(
            sets.receiving_nodes.iter().enumerate(),
            sets.periods.iter(),
            sets.measures.iter().enumerate(),
            sets.node_groups.iter()
        ) {
            let carried = self.carried_measure(
                |pi| self.vars.ib_carried_over_demand.at(&[di, pi, ti]),
                ui,
            );
            let capacity = self.expanded_carrying_capacity(
                d,
                ti,
                &key(&[t, d, u, g]),
                &self.params.ib_carrying_capacity,
                &self.params.ib_carrying_expansion_capacity,
            );
            model.add_le(format!("ib_carrying_capacity_{t}_{d}_{u}_{g}"), carried, capacity);
        }

        for ((oi, o), (ti, t), (ui, u), g) in iproduct!(
            sets.departing_nodes.iter().enumerate(),
            sets.periods.iter(),
            sets.measures.iter().enumerate(),
            sets.node_groups.iter()
        ) {
            let carried = self.carried_measure(
                |pi| self.vars.ob_carried_over_demand.at(&[oi, pi, ti]),
                ui,
            );
            let capacity = self.expanded_carrying_capacity(
                o,
                ti,
                &key(&[t, o, u, g]),
                &self.params.ob_carrying_capacity,
                &self.params.ob_carrying_expansion_capacity,
            );
            model.add_le(format!("ob_carrying_capacity_{t}_{o}_{u}_{g}"), carried, capacity);
        }
    }

    /// Carried volume converted into measure `ui`.
    fn carried_measure<F: Fn(usize) -> VarId>(
        &self,
        carried_var: F,
        ui: usize,
    ) -> LinearExpr {
        let u = self.sets.measures.get_index(ui).expect("measure in range");
        LinearExpr::weighted_sum(self.sets.products.iter().enumerate().filter_map(|(pi, p)| {
            let factor = self.params.products_measures.get(&key(&[p, u]));
            (factor != 0.0).then(|| (carried_var(pi), factor))
        }))
    }

    /// Base capacity plus every expansion unit installed in or before the period.
    fn expanded_carrying_capacity(
        &self,
        node: &Rc<str>,
        ti: usize,
        base_key: &[Rc<str>],
        base: &Param,
        expansion: &Param,
    ) -> LinearExpr {
        let sets = self.sets;
        let n_pos = self.node(node);
        let mut capacity = LinearExpr::constant(base.get(base_key));
        for ((ei, e), (t2i, t2)) in iproduct!(
            sets.c_capacity_expansions.iter().enumerate(),
            sets.periods.iter()
        ) {
            if t2i > ti {
                continue;
            }
            let increment = expansion.get(&key(&[t2, node, e]));
            if increment != 0.0 {
                capacity.add_term(
                    self.vars.use_carrying_capacity_option.at(&[n_pos, ei, t2i]),
                    increment,
                );
            }
        }
        capacity
    }

    /// Per-group ceilings on carried-over and dropped volume.
    fn add_carry_and_drop_ceilings(&self, model: &mut Model) {
        let sets = self.sets;
        for ((ti, t), (pi, p), g) in iproduct!(
            sets.periods.iter(),
            sets.products.iter().enumerate(),
            sets.node_groups.iter()
        ) {
            for (di, d) in sets.receiving_nodes.iter().enumerate() {
                let limit_key = key(&[t, p, d, g]);
                if self.in_group(d, g) && self.params.ib_max_carried.contains(&limit_key) {
                    model.add_le(
                        format!("ib_max_carried_{d}_{p}_{t}_{g}"),
                        LinearExpr::variable(self.vars.ib_carried_over_demand.at(&[di, pi, ti])),
                        LinearExpr::constant(self.params.ib_max_carried.get(&limit_key)),
                    );
                }
            }
            for (oi, o) in sets.departing_nodes.iter().enumerate() {
                let limit_key = key(&[t, p, o, g]);
                if self.in_group(o, g) && self.params.ob_max_carried.contains(&limit_key) {
                    model.add_le(
                        format!("ob_max_carried_{o}_{p}_{t}_{g}"),
                        LinearExpr::variable(self.vars.ob_carried_over_demand.at(&[oi, pi, ti])),
                        LinearExpr::constant(self.params.ob_max_carried.get(&limit_key)),
                    );
                }
            }
            for (n_pos, n) in sets.node_names.iter().enumerate() {
                let limit_key = key(&[t, p, n, g]);
                if self.in_group(n, g) && self.params.max_dropped.contains(&limit_key) {
                    model.add_le(
                        format!("max_dropped_{n}_{p}_{t}_{g}"),
                        LinearExpr::variable(self.vars.dropped_demand.at(&[n_pos, pi, ti])),
                        LinearExpr::constant(self.params.max_dropped.get(&limit_key)),
                    );
                }
            }
        }
    }

    /// Departed measures on a lane fit the base load capacity plus installed expansions.
    fn add_transportation_capacity(&self, model: &mut Model) {
        let sets = self.sets;
        for ((oi, o), (di, d), (ti, t), (mi, m), (ui, u), g_o, g_d) in iproduct!(
            sets.departing_nodes.iter().enumerate(),
            sets.receiving_nodes.iter().enumerate(),
            sets.periods.iter(),
            sets.modes.iter().enumerate(),
            sets.measures.iter().enumerate(),
            sets.node_groups.iter(),
            sets.node_groups.iter()
        ) {
            if !self.in_group(o, g_o) || !self.in_group(d, g_d) {
                continue;
            }

            let departed = LinearExpr::sum(
                (0..sets.products.len())
                    .map(|pi| self.vars.departed_measures.at(&[oi, di, pi, ti, mi, ui])),
            );

            let base = self
                .params
                .load_capacity
                .get(&key(&[t, o, d, m, u, g_o, g_d]));
            let mut capacity = LinearExpr::constant(base);
            for ((ei, e), (t2i, _)) in iproduct!(
                sets.t_capacity_expansions.iter().enumerate(),
                sets.periods.iter()
            ) {
                if t2i > ti {
                    continue;
                }
                let increment = self
                    .params
                    .transportation_expansion_capacity
                    .get(&key(&[e, m, u]));
                if increment != 0.0 {
                    capacity.add_term(
                        self.vars
                            .use_transportation_capacity_option
                            .at(&[oi, di, ei, t2i]),
                        increment,
                    );
                }
            }

            model.add_le(
                format!("transportation_capacity_{t}_{o}_{d}_{m}_{u}_{g_o}_{g_d}"),
                departed,
                capacity,
            );
        }
    }

    /// Installing an expansion option costs its one-off price in the period plus a
    /// persisting price for every unit already installed.
    fn add_expansion_option_costs(&self, model: &mut Model) {
        let sets = self.sets;

        let mut c_total = LinearExpr::new();
        for ((n_pos, n), (ei, e), (ti, t)) in iproduct!(
            sets.node_names.iter().enumerate(),
            sets.c_capacity_expansions.iter().enumerate(),
            sets.periods.iter()
        ) {
            let weight = self.params.period_weight.get(&key(&[t]));
            let cost_key = key(&[t, n, e]);
            let mut cost = LinearExpr::new().plus(
                self.vars.use_carrying_capacity_option.at(&[n_pos, ei, ti]),
                weight * self.params.carrying_expansion_cost.get(&cost_key),
            );
            let persisting = self.params.carrying_expansion_persisting_cost.get(&cost_key);
            if persisting != 0.0 {
                for t2i in 0..=ti {
                    cost.add_term(
                        self.vars.use_carrying_capacity_option.at(&[n_pos, ei, t2i]),
                        weight * persisting,
                    );
                }
            }
            let cost_var = self.vars.c_capacity_option_cost.at(&[n_pos, ei, ti]);
            c_total.add_term(cost_var, 1.0);
            model.add_ge(
                format!("c_capacity_option_cost_{n}_{e}_{t}"),
                LinearExpr::variable(cost_var),
                cost,
            );
        }
        model.add_eq(
            "grand_total_c_capacity_option".to_string(),
            LinearExpr::variable(self.vars.grand_total_c_capacity_option.scalar()),
            c_total,
        );

        let mut t_total = LinearExpr::new();
        for ((oi, o), (di, d), (ei, e), (ti, t)) in iproduct!(
            sets.departing_nodes.iter().enumerate(),
            sets.receiving_nodes.iter().enumerate(),
            sets.t_capacity_expansions.iter().enumerate(),
            sets.periods.iter()
        ) {
            let weight = self.params.period_weight.get(&key(&[t]));
            let cost_key = key(&[t, o, d, e]);
            let mut cost = LinearExpr::new().plus(
                self.vars
                    .use_transportation_capacity_option
                    .at(&[oi, di, ei, ti]),
                weight * self.params.transportation_expansion_cost.get(&cost_key),
            );
            let persisting = self
                .params
                .transportation_expansion_persisting_cost
                .get(&cost_key);
            if persisting != 0.0 {
                for t2i in 0..=ti {
                    cost.add_term(
                        self.vars
                            .use_transportation_capacity_option
                            .at(&[oi, di, ei, t2i]),
                        weight * persisting,
                    );
                }
            }
            let cost_var = self.vars.t_capacity_option_cost.at(&[oi, di, ei, ti]);
            t_total.add_term(cost_var, 1.0);
            model.add_ge(
                format!("t_capacity_option_cost_{o}_{d}_{e}_{t}"),
                LinearExpr::variable(cost_var),
                cost,
            );
        }
        model.add_eq(
            "grand_total_t_capacity_option".to_string(),
            LinearExpr::variable(self.vars.grand_total_t_capacity_option.scalar()),
            t_total,
        );
    }

    /// Explicit per-period bounds on how many transportation expansion units may be
    /// installed.
    fn add_expansion_option_counts(&self, model: &mut Model) {
        for (entry, minimum) in self.params.transportation_expansion_min_count.iter() {
            let Some((oi, di, ei, ti)) = self.expansion_entry(entry) else {
                continue;
            };
            let [t, o, d, e] = entry else { continue };
            model.add_ge(
                format!("t_capacity_option_min_{o}_{d}_{e}_{t}"),
                LinearExpr::variable(
                    self.vars
                        .use_transportation_capacity_option
                        .at(&[oi, di, ei, ti]),
                ),
                LinearExpr::constant(minimum),
            );
        }
        for (entry, maximum) in self.params.transportation_expansion_max_count.iter() {
            let Some((oi, di, ei, ti)) = self.expansion_entry(entry) else {
                continue;
            };
            let [t, o, d, e] = entry else { continue };
            model.add_le(
                format!("t_capacity_option_max_{o}_{d}_{e}_{t}"),
                LinearExpr::variable(
                    self.vars
                        .use_transportation_capacity_option
                        .at(&[oi, di, ei, ti]),
                ),
                LinearExpr::constant(maximum),
            );
        }
    }

    /// Resolve a `[period, origin, destination, label]` entry to tensor positions.
    fn expansion_entry(&self, entry: &[Rc<str>]) -> Option<(usize, usize, usize, usize)> {
        let [t, o, d, e] = entry else { return None };
        Some((
            self.sets.departing_nodes.get_index_of(o.as_ref())?,
            self.sets.receiving_nodes.get_index_of(d.as_ref())?,
            self.sets.t_capacity_expansions.get_index_of(e.as_ref())?,
            self.sets.periods.labels().get_index_of(t.as_ref())?,
        ))
    }

    /// The utilization metric dominates every node's per-type utilization.
    fn add_max_utilization(&self, model: &mut Model) {
        let sets = self.sets;
        for ((n_pos, n), (ti, t), (ci, c)) in iproduct!(
            sets.node_names.iter().enumerate(),
            sets.periods.iter(),
            sets.resource_capacity_types.iter().enumerate()
        ) {
            model.add_ge(
                format!("max_capacity_utilization_{n}_{t}_{c}"),
                LinearExpr::variable(self.vars.max_capacity_utilization.scalar()),
                LinearExpr::variable(self.vars.node_utilization.at(&[n_pos, ti, ci])),
            );
        }
    }
}
