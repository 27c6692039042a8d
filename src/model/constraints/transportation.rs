//! Transportation: measure conversion, lane costs (distance, time, fixed per load, minimum
//! floors), load counting, lane legality limits, per-lane flow bounds and the transit
//! distance metric, with the full aggregation chains.
use super::{Builder, key};
use crate::milp::{LinearExpr, Model};
use crate::params::{BIG_M, Param};
use itertools::iproduct;
use std::rc::Rc;

impl Builder<'_> {
    pub(super) fn add_transportation_constraints(&self, model: &mut Model) {
        self.add_departed_measures(model);
        self.add_variable_costs(model);
        self.add_fixed_costs(model);
        self.add_load_counts(model);
        self.add_cost_aggregations(model);
        self.add_load_aggregations(model);
        self.add_lane_flow_bounds(model);
        self.add_lane_legality(model);
        self.add_transit_distance_metric(model);
    }

    /// Departed volume converted into each measure.
    fn add_departed_measures(&self, model: &mut Model) {
        let sets = self.sets;
        for ((oi, o), (di, d), (pi, p), (ti, t), (mi, m), (ui, u)) in iproduct!(
            sets.departing_nodes.iter().enumerate(),
            sets.receiving_nodes.iter().enumerate(),
            sets.products.iter().enumerate(),
            sets.periods.iter(),
            sets.modes.iter().enumerate(),
            sets.measures.iter().enumerate()
        ) {
            let factor = self.params.products_measures.get(&key(&[p, u]));
            model.add_eq(
                format!("departed_measures_{o}_{d}_{p}_{t}_{m}_{u}"),
                LinearExpr::variable(self.vars.departed_measures.at(&[oi, di, pi, ti, mi, ui])),
                LinearExpr::new().plus(
                    self.vars.departed_product_by_mode.at(&[oi, di, pi, ti, mi]),
                    factor,
                ),
            );
        }
    }

    /// Distance- and time-proportional shipping cost per lane, mode and measure.
    fn add_variable_costs(&self, model: &mut Model) {
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
            let cost_key = key(&[o, d, m, u, t, g_o, g_d]);
            let per_unit = self
                .params
                .transportation_cost_variable_distance
                .get(&cost_key)
                * self.params.distance.get(&key(&[o, d, m]))
                + self.params.transportation_cost_variable_time.get(&cost_key)
                    * self.params.transit_time.get(&key(&[o, d, m]));
            if per_unit == 0.0 {
                continue;
            }
            let weight = self.params.period_weight.get(&key(&[t]));

            let cost = LinearExpr::weighted_sum((0..sets.products.len()).map(|pi| {
                (
                    self.vars.departed_product_by_mode.at(&[oi, di, pi, ti, mi]),
                    weight * per_unit,
                )
            }));
            model.add_ge(
                format!("variable_transportation_costs_{o}_{d}_{t}_{m}_{u}_{g_o}_{g_d}"),
                LinearExpr::variable(
                    self.vars.variable_transportation_costs.at(&[oi, di, ti, mi, ui]),
                ),
                cost,
            );
        }
    }

    /// Fixed shipping cost per load dispatched.
    fn add_fixed_costs(&self, model: &mut Model) {
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
            let per_load = self
                .params
                .transportation_cost_fixed
                .get(&key(&[o, d, m, u, t, g_o, g_d]));
            if per_load == 0.0 {
                continue;
            }
            let weight = self.params.period_weight.get(&key(&[t]));

            let cost =
                LinearExpr::weighted_sum((0..sets.transportation_groups.len()).map(|gi| {
                    (
                        self.vars.num_loads_by_group.at(&[oi, di, ti, mi, gi]),
                        weight * per_load,
                    )
                }));
            model.add_ge(
                format!("fixed_transportation_costs_{o}_{d}_{t}_{m}_{u}_{g_o}_{g_d}"),
                LinearExpr::variable(
                    self.vars.fixed_transportation_costs.at(&[oi, di, ti, mi, ui]),
                ),
                cost,
            );
        }
    }

    /// Loads per transportation group, sized by the per-load capacity of the lane.
    fn add_load_counts(&self, model: &mut Model) {
        let sets = self.sets;
        for ((oi, o), (di, d), (ti, t), (mi, m), (gi, tg), (ui, u), g_o, g_d) in iproduct!(
            sets.departing_nodes.iter().enumerate(),
            sets.receiving_nodes.iter().enumerate(),
            sets.periods.iter(),
            sets.modes.iter().enumerate(),
            sets.transportation_groups.iter().enumerate(),
            sets.measures.iter().enumerate(),
            sets.node_groups.iter(),
            sets.node_groups.iter()
        ) {
            if !self.in_group(o, g_o) || !self.in_group(d, g_d) {
                continue;
            }
            let size_key = key(&[t, o, d, m, u, g_o, g_d]);
            if !self.params.transportation_constraints_max.contains(&size_key) {
                continue;
            }
            let load_size = self.params.transportation_constraints_max.get(&size_key);
            if load_size <= 0.0 {
                continue;
            }

            // Loads must cover the group's departed measures at the per-load size
            let in_group_measures =
                LinearExpr::weighted_sum(sets.products.iter().enumerate().filter_map(
                    |(pi, p)| {
                        let member = self.params.transportation_group.get(&key(&[p, tg]));
                        (member == 1.0).then(|| {
                            (self.vars.departed_measures.at(&[oi, di, pi, ti, mi, ui]), 1.0)
                        })
                    },
                ));
            model.add_ge(
                format!("num_loads_by_group_{o}_{d}_{t}_{m}_{tg}_{u}_{g_o}_{g_d}"),
                LinearExpr::new().plus(
                    self.vars.num_loads_by_group.at(&[oi, di, ti, mi, gi]),
                    load_size,
                ),
                in_group_measures,
            );
        }
    }

    /// Per-lane cost roll-ups: by measure into mode, by mode into lane, and onward to
    /// per-period, per-mode and grand totals. A per-lane minimum cost floor applies.
    fn add_cost_aggregations(&self, model: &mut Model) {
        let sets = self.sets;
        let (n_modes, n_measures) = (sets.modes.len(), sets.measures.len());

        for ((oi, o), (di, d), (ti, t)) in iproduct!(
            sets.departing_nodes.iter().enumerate(),
            sets.receiving_nodes.iter().enumerate(),
            sets.periods.iter()
        ) {
            for (mi, m) in sets.modes.iter().enumerate() {
                let per_measure = LinearExpr::weighted_sum((0..n_measures).flat_map(|ui| {
                    [
                        (
                            self.vars.variable_transportation_costs.at(&[oi, di, ti, mi, ui]),
                            1.0,
                        ),
                        (
                            self.vars.fixed_transportation_costs.at(&[oi, di, ti, mi, ui]),
                            1.0,
                        ),
                    ]
                }));
                model.add_eq(
                    format!("transportation_costs_{o}_{d}_{t}_{m}"),
                    LinearExpr::variable(self.vars.transportation_costs.at(&[oi, di, ti, mi])),
                    per_measure,
                );
            }

            model.add_eq(
                format!("od_transportation_costs_{o}_{d}_{t}"),
                LinearExpr::variable(self.vars.od_transportation_costs.at(&[oi, di, ti])),
                LinearExpr::sum(
                    (0..n_modes).map(|mi| self.vars.transportation_costs.at(&[oi, di, ti, mi])),
                ),
            );

            // Minimum cost regardless of distance, when one is configured for the lane
            let floor = iproduct!(
                sets.modes.iter(),
                sets.measures.iter(),
                sets.node_groups.iter(),
                sets.node_groups.iter()
            )
            .filter(|(_, _, g_o, g_d)| self.in_group(o, g_o) && self.in_group(d, g_d))
            .map(|(m, u, g_o, g_d)| {
                self.params
                    .transportation_cost_minimum
                    .get(&key(&[o, d, m, u, t, g_o, g_d]))
            })
            .fold(0.0, f64::max);
            if floor > 0.0 {
                model.add_ge(
                    format!("minimum_transportation_cost_{o}_{d}_{t}"),
                    LinearExpr::variable(self.vars.od_transportation_costs.at(&[oi, di, ti])),
                    LinearExpr::constant(floor),
                );
            }
        }

        for ((ti, t), (mi, m)) in iproduct!(sets.periods.iter(), sets.modes.iter().enumerate()) {
            let lanes = LinearExpr::sum(
                iproduct!(0..sets.departing_nodes.len(), 0..sets.receiving_nodes.len())
                    .map(|(oi, di)| self.vars.transportation_costs.at(&[oi, di, ti, mi])),
            );
            model.add_eq(
                format!("mode_transportation_costs_{t}_{m}"),
                LinearExpr::variable(self.vars.mode_transportation_costs.at(&[ti, mi])),
                lanes,
            );
        }

        for ((oi, o), (di, d)) in iproduct!(
            sets.departing_nodes.iter().enumerate(),
            sets.receiving_nodes.iter().enumerate()
        ) {
            model.add_eq(
                format!("total_od_transportation_costs_{o}_{d}"),
                LinearExpr::variable(self.vars.total_od_transportation_costs.at(&[oi, di])),
                LinearExpr::sum(
                    (0..sets.periods.len())
                        .map(|ti| self.vars.od_transportation_costs.at(&[oi, di, ti])),
                ),
            );
        }

        for (mi, m) in sets.modes.iter().enumerate() {
            model.add_eq(
                format!("total_mode_transportation_costs_{m}"),
                LinearExpr::variable(self.vars.total_mode_transportation_costs.at(&[mi])),
                LinearExpr::sum(
                    (0..sets.periods.len())
                        .map(|ti| self.vars.mode_transportation_costs.at(&[ti, mi])),
                ),
            );
        }

        let mut grand = LinearExpr::new();
        for (ti, t) in sets.periods.iter() {
            let per_period = LinearExpr::sum(
                iproduct!(0..sets.departing_nodes.len(), 0..sets.receiving_nodes.len())
                    .map(|(oi, di)| self.vars.od_transportation_costs.at(&[oi, di, ti])),
            );
            let period_var = self.vars.total_time_transportation_costs.at(&[ti]);
            grand.add_term(period_var, 1.0);
            model.add_eq(
                format!("total_time_transportation_costs_{t}"),
                LinearExpr::variable(period_var),
                per_period,
            );
        }
        model.add_eq(
            "grand_total_transportation_costs".to_string(),
            LinearExpr::variable(self.vars.grand_total_transportation_costs.scalar()),
            grand,
        );
    }

    /// Load-count roll-ups mirroring the cost aggregations.
    fn add_load_aggregations(&self, model: &mut Model) {
        let sets = self.sets;

        for ((oi, o), (di, d), (ti, t)) in iproduct!(
            sets.departing_nodes.iter().enumerate(),
            sets.receiving_nodes.iter().enumerate(),
            sets.periods.iter()
        ) {
            for (mi, m) in sets.modes.iter().enumerate() {
                model.add_eq(
                    format!("num_loads_{o}_{d}_{t}_{m}"),
                    LinearExpr::variable(self.vars.num_loads.at(&[oi, di, ti, mi])),
                    LinearExpr::sum(
                        (0..sets.transportation_groups.len())
                            .map(|gi| self.vars.num_loads_by_group.at(&[oi, di, ti, mi, gi])),
                    ),
                );
            }
            model.add_eq(
                format!("od_num_loads_{o}_{d}_{t}"),
                LinearExpr::variable(self.vars.od_num_loads.at(&[oi, di, ti])),
                LinearExpr::sum(
                    (0..sets.modes.len()).map(|mi| self.vars.num_loads.at(&[oi, di, ti, mi])),
                ),
            );
        }

        for ((mi, m), (ti, t)) in iproduct!(sets.modes.iter().enumerate(), sets.periods.iter()) {
            model.add_eq(
                format!("mode_num_loads_{m}_{t}"),
                LinearExpr::variable(self.vars.mode_num_loads.at(&[mi, ti])),
                LinearExpr::sum(
                    iproduct!(0..sets.departing_nodes.len(), 0..sets.receiving_nodes.len())
                        .map(|(oi, di)| self.vars.num_loads.at(&[oi, di, ti, mi])),
                ),
            );
        }

        for ((oi, o), (di, d)) in iproduct!(
            sets.departing_nodes.iter().enumerate(),
            sets.receiving_nodes.iter().enumerate()
        ) {
            model.add_eq(
                format!("total_od_num_loads_{o}_{d}"),
                LinearExpr::variable(self.vars.total_od_num_loads.at(&[oi, di])),
                LinearExpr::sum(
                    (0..sets.periods.len()).map(|ti| self.vars.od_num_loads.at(&[oi, di, ti])),
                ),
            );
        }

        for (mi, m) in sets.modes.iter().enumerate() {
            model.add_eq(
                format!("total_mode_num_loads_{m}"),
                LinearExpr::variable(self.vars.total_mode_num_loads.at(&[mi])),
                LinearExpr::sum(
                    (0..sets.periods.len()).map(|ti| self.vars.mode_num_loads.at(&[mi, ti])),
                ),
            );
        }

        let mut grand = LinearExpr::new();
        for (ti, t) in sets.periods.iter() {
            let per_period = LinearExpr::sum(
                iproduct!(
                    0..sets.departing_nodes.len(),
                    0..sets.receiving_nodes.len(),
                    0..sets.modes.len()
                )
                .map(|(oi, di, mi)| self.vars.num_loads.at(&[oi, di, ti, mi])),
            );
            let period_var = self.vars.total_num_loads.at(&[ti]);
            grand.add_term(period_var, 1.0);
            model.add_eq(
                format!("total_num_loads_{t}"),
                LinearExpr::variable(period_var),
                per_period,
            );
        }
        model.add_eq(
            "grand_total_num_loads".to_string(),
            LinearExpr::variable(self.vars.grand_total_num_loads.scalar()),
            grand,
        );
    }

    /// Explicit per-lane flow bounds from the flow and transportation constraint tables.
    fn add_lane_flow_bounds(&self, model: &mut Model) {
        for (entry, bound) in self.params.flow_min.iter() {
            let [o, d, p, t, m, u, g_o, g_d] = entry else { continue };
            let Some(index) = self.measure_flow_index(o, d, p, t, m, u) else {
                continue;
            };
            if !self.in_group(o, g_o) || !self.in_group(d, g_d) {
                continue;
            }
            model.add_ge(
                format!("flow_min_{o}_{d}_{p}_{t}_{m}_{u}_{g_o}_{g_d}"),
                LinearExpr::variable(self.vars.departed_measures.at(&index)),
                LinearExpr::constant(bound),
            );
        }
        for (entry, bound) in self.params.flow_max.iter() {
            let [o, d, p, t, m, u, g_o, g_d] = entry else { continue };
            let Some(index) = self.measure_flow_index(o, d, p, t, m, u) else {
                continue;
            };
            if !self.in_group(o, g_o) || !self.in_group(d, g_d) {
                continue;
            }
            model.add_le(
                format!("flow_max_{o}_{d}_{p}_{t}_{m}_{u}_{g_o}_{g_d}"),
                LinearExpr::variable(self.vars.departed_measures.at(&index)),
                LinearExpr::constant(bound),
            );
        }

        // Lane-level minimum shipment, when configured
        for (entry, minimum) in self.params.transportation_constraints_min.iter() {
            let [t, o, d, m, u, g_o, g_d] = entry else { continue };
            if minimum <= 0.0 || !self.in_group(o, g_o) || !self.in_group(d, g_d) {
                continue;
            }
            let (Some(oi), Some(di), Some(ti), Some(mi), Some(ui)) = (
                self.sets.departing_nodes.get_index_of(o.as_ref()),
                self.sets.receiving_nodes.get_index_of(d.as_ref()),
                self.sets.periods.labels().get_index_of(t.as_ref()),
                self.sets.modes.get_index_of(m.as_ref()),
                self.sets.measures.get_index_of(u.as_ref()),
            ) else {
                continue;
            };
            model.add_ge(
                format!("transportation_min_{t}_{o}_{d}_{m}_{u}_{g_o}_{g_d}"),
                LinearExpr::sum((0..self.sets.products.len()).map(|pi| {
                    self.vars.departed_measures.at(&[oi, di, pi, ti, mi, ui])
                })),
                LinearExpr::constant(minimum),
            );
        }
    }

    /// Resolve a `[origin, destination, product, period, mode, measure]` key to tensor
    /// positions.
    fn measure_flow_index(
        &self,
        o: &Rc<str>,
        d: &Rc<str>,
        p: &Rc<str>,
        t: &Rc<str>,
        m: &Rc<str>,
        u: &Rc<str>,
    ) -> Option<[usize; 6]> {
        Some([
            self.sets.departing_nodes.get_index_of(o.as_ref())?,
            self.sets.receiving_nodes.get_index_of(d.as_ref())?,
            self.sets.products.get_index_of(p.as_ref())?,
            self.sets.periods.labels().get_index_of(t.as_ref())?,
            self.sets.modes.get_index_of(m.as_ref())?,
            self.sets.measures.get_index_of(u.as_ref())?,
        ])
    }

    /// Lanes whose geometry exceeds a configured distance or transit-time limit carry no
    /// flow in that period.
    fn add_lane_legality(&self, model: &mut Model) {
        let forbid = |family: &str, limits: &Param, geometry: &Param, model: &mut Model| {
            for (entry, limit) in limits.iter() {
                let [o, t, m, g_o, d, g_d] = entry else { continue };
                if limit >= BIG_M || !self.in_group(o, g_o) || !self.in_group(d, g_d) {
                    continue;
                }
                if geometry.get(&key(&[o, d, m])) <= limit {
                    continue;
                }
                let (Some(oi), Some(di), Some(ti), Some(mi)) = (
                    self.sets.departing_nodes.get_index_of(o.as_ref()),
                    self.sets.receiving_nodes.get_index_of(d.as_ref()),
                    self.sets.periods.labels().get_index_of(t.as_ref()),
                    self.sets.modes.get_index_of(m.as_ref()),
                ) else {
                    continue;
                };
                model.add_eq(
                    format!("{family}_{o}_{d}_{t}_{m}_{g_o}_{g_d}"),
                    LinearExpr::sum((0..self.sets.products.len()).map(|pi| {
                        self.vars.departed_product_by_mode.at(&[oi, di, pi, ti, mi])
                    })),
                    LinearExpr::constant(0.0),
                );
            }
        };

        forbid(
            "max_distance_exceeded",
            &self.params.max_distance,
            &self.params.distance,
            model,
        );
        forbid(
            "max_transit_time_exceeded",
            &self.params.max_transit_time,
            &self.params.transit_time,
            model,
        );
    }

    /// The transit-distance metric dominates the distance of every lane in use.
    fn add_transit_distance_metric(&self, model: &mut Model) {
        let sets = self.sets;
        for ((oi, o), (di, d), (ti, t)) in iproduct!(
            sets.departing_nodes.iter().enumerate(),
            sets.receiving_nodes.iter().enumerate(),
            sets.periods.iter()
        ) {
            let assigned = self.vars.is_destination_assigned_to_origin.at(&[oi, di, ti]);
            let departed = LinearExpr::sum(
                (0..sets.products.len())
                    .map(|pi| self.vars.departed_product.at(&[oi, di, pi, ti])),
            );
            model.add_ge(
                format!("destination_assigned_to_origin_{o}_{d}_{t}"),
                LinearExpr::new().plus(assigned, BIG_M),
                departed,
            );

            for m in &sets.modes {
                let lane_key = key(&[o, d, m]);
                if !self.params.distance.contains(&lane_key) {
                    continue;
                }
                let distance = self.params.distance.get(&lane_key);
                model.add_ge(
                    format!("max_transit_distance_{o}_{d}_{t}_{m}"),
                    LinearExpr::variable(self.vars.max_transit_distance.scalar()),
                    LinearExpr::new().plus(assigned, distance),
                );
            }
        }
    }
}
