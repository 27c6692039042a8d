//! Plan-over-plan change: assignment indicators per (origin, product, destination), the
//! volume and destination-count deltas between consecutive periods, their costs and the
//! change budget.
use super::{Builder, key};
use crate::milp::{LinearExpr, Model};
use crate::params::BIG_M;
use itertools::iproduct;

impl Builder<'_> {
    pub(super) fn add_pop_constraints(&self, model: &mut Model) {
        self.add_assignment_indicators(model);
        self.add_movement_tracking(model);
        self.add_pop_costs(model);
        self.add_totals(model);
    }

    /// The assignment binary is forced up by any departed volume and down by none.
    fn add_assignment_indicators(&self, model: &mut Model) {
        let sets = self.sets;
        for ((oi, o), (ti, t), (pi, p), (di, d)) in iproduct!(
            sets.departing_nodes.iter().enumerate(),
            sets.periods.iter(),
            sets.products.iter().enumerate(),
            sets.receiving_nodes.iter().enumerate()
        ) {
            let assigned = self.vars.binary_product_destination_assignment.at(&[oi, ti, pi, di]);
            let departed = self.vars.departed_product.at(&[oi, di, pi, ti]);

            model.add_ge(
                format!("binary_assignment_lower_{o}_{t}_{p}_{d}"),
                LinearExpr::new().plus(assigned, BIG_M),
                LinearExpr::variable(departed),
            );
            model.add_le(
                format!("binary_assignment_upper_{o}_{t}_{p}_{d}"),
                LinearExpr::variable(assigned),
                LinearExpr::variable(departed),
            );
        }
    }

    /// Volume and destination-count movement between consecutive periods, tight only when
    /// the destination is newly assigned.
    fn add_movement_tracking(&self, model: &mut Model) {
        let sets = self.sets;
        for ((oi, o), (ti, t), (pi, p), (di, d)) in iproduct!(
            sets.departing_nodes.iter().enumerate(),
            sets.periods.iter(),
            sets.products.iter().enumerate(),
            sets.receiving_nodes.iter().enumerate()
        ) {
            let Some(prev) = sets.periods.lagged(ti, 1) else {
                continue;
            };
            let assigned_now =
                self.vars.binary_product_destination_assignment.at(&[oi, ti, pi, di]);
            let assigned_before =
                self.vars.binary_product_destination_assignment.at(&[oi, prev, pi, di]);

            // departed + BIG_M * (assigned_now - assigned_before - 1)
            let mut newly_assigned_volume = LinearExpr::new()
                .plus(self.vars.departed_product.at(&[oi, di, pi, ti]), 1.0)
                .plus(assigned_now, BIG_M)
                .plus(assigned_before, -BIG_M);
            newly_assigned_volume.add_constant(-BIG_M);
            model.add_ge(
                format!("volume_moved_{o}_{t}_{p}_{d}"),
                LinearExpr::variable(self.vars.volume_moved.at(&[prev, ti, pi, oi, di])),
                newly_assigned_volume,
            );

            model.add_ge(
                format!("num_destinations_moved_{o}_{t}_{p}_{d}"),
                LinearExpr::variable(
                    self.vars.num_destinations_moved.at(&[prev, ti, pi, oi, di]),
                ),
                LinearExpr::new()
                    .plus(assigned_now, 1.0)
                    .plus(assigned_before, -1.0),
            );
        }
    }

    /// Per-move and per-volume change costs, and the cap on destinations moved.
    fn add_pop_costs(&self, model: &mut Model) {
        let sets = self.sets;
        let has_costs = !self.params.pop_cost_per_move.is_empty()
            || !self.params.pop_cost_per_volume_moved.is_empty();

        for ((oi, o), (ti, t), (pi, p), (di, d), g_o, g_d) in iproduct!(
            sets.departing_nodes.iter().enumerate(),
            sets.periods.iter(),
            sets.products.iter().enumerate(),
            sets.receiving_nodes.iter().enumerate(),
            sets.node_groups.iter(),
            sets.node_groups.iter()
        ) {
            let Some(prev) = sets.periods.lagged(ti, 1) else {
                continue;
            };
            if !self.in_group(o, g_o) || !self.in_group(d, g_d) {
                continue;
            }
            let t_prev = sets.periods.label(prev);
            let pop_key = key(&[t_prev, t, p, o, d, g_o, g_d]);
            let assigned_now =
                self.vars.binary_product_destination_assignment.at(&[oi, ti, pi, di]);
            let assigned_before =
                self.vars.binary_product_destination_assignment.at(&[oi, prev, pi, di]);

            if has_costs {
                let per_volume = self.params.pop_cost_per_volume_moved.get(&pop_key);
                let per_move = self.params.pop_cost_per_move.get(&pop_key);
                let cost = LinearExpr::new()
                    .plus(self.vars.volume_moved.at(&[prev, ti, pi, oi, di]), per_volume)
                    .plus(assigned_now, per_move)
                    .plus(assigned_before, -per_move);
                model.add_eq(
                    format!("pop_cost_{o}_{t}_{p}_{d}_{g_o}_{g_d}"),
                    LinearExpr::variable(self.vars.pop_cost.at(&[prev, ti, pi, oi, di])),
                    cost,
                );
            }

            model.add_le(
                format!("pop_max_destinations_moved_{o}_{t}_{p}_{d}_{g_o}_{g_d}"),
                LinearExpr::new()
                    .plus(assigned_now, 1.0)
                    .plus(assigned_before, -1.0),
                LinearExpr::constant(self.params.pop_max_destinations_moved.get(&pop_key)),
            );
        }
    }

    /// Totals over consecutive-period movement and the grand change cost.
    fn add_totals(&self, model: &mut Model) {
        let sets = self.sets;
        let mut moved = LinearExpr::new();
        let mut destinations = LinearExpr::new();
        let mut cost = LinearExpr::new();
        for ((ti, _), pi, oi, di) in iproduct!(
            sets.periods.iter(),
            0..sets.products.len(),
            0..sets.departing_nodes.len(),
            0..sets.receiving_nodes.len()
        ) {
            let Some(prev) = sets.periods.lagged(ti, 1) else {
                continue;
            };
            moved.add_term(self.vars.volume_moved.at(&[prev, ti, pi, oi, di]), 1.0);
            destinations
                .add_term(self.vars.num_destinations_moved.at(&[prev, ti, pi, oi, di]), 1.0);
            cost.add_term(self.vars.pop_cost.at(&[prev, ti, pi, oi, di]), 1.0);
        }

        model.add_ge(
            "total_volume_moved".to_string(),
            LinearExpr::variable(self.vars.total_volume_moved.scalar()),
            moved,
        );
        model.add_ge(
            "total_num_destinations_moved".to_string(),
            LinearExpr::variable(self.vars.total_num_destinations_moved.scalar()),
            destinations,
        );
        model.add_eq(
            "grand_total_pop_cost".to_string(),
            LinearExpr::variable(self.vars.grand_total_pop_cost.scalar()),
            cost,
        );
    }
}
