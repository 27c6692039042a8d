//! Flow conservation: mode decomposition, lagged arrivals, demand reconciliation and the
//! assembly couplings between products.
use super::{Builder, key};
use crate::milp::{LinearExpr, Model};
use itertools::iproduct;

/// The deletable demand-equality constraint name for one (receiving node, period, product).
///
/// The capacity-maximising objective removes this family so demand becomes an upper bound
/// the solver pushes against.
pub fn demand_equality_name(node: &str, period: &str, product: &str) -> String {
    format!("arrived_and_completed_product_equals_demand_{node}_{period}_{product}")
}

impl Builder<'_> {
    pub(super) fn add_flow_constraints(&self, model: &mut Model) {
        self.add_mode_decomposition(model);
        self.add_arrival_equalities(model);
        self.add_demand_reconciliation(model);
        self.add_processing_assembly(model);
        self.add_shipping_assembly(model);
    }

    /// `departed_product` is the sum of its per-mode components.
    fn add_mode_decomposition(&self, model: &mut Model) {
        let sets = self.sets;
        for ((oi, o), (di, d), (ti, t), (pi, p)) in iproduct!(
            sets.departing_nodes.iter().enumerate(),
            sets.receiving_nodes.iter().enumerate(),
            sets.periods.iter(),
            sets.products.iter().enumerate()
        ) {
            let by_mode = LinearExpr::sum(
                (0..sets.modes.len())
                    .map(|mi| self.vars.departed_product_by_mode.at(&[oi, di, pi, ti, mi])),
            );
            model.add_eq(
                format!("departed_product_mode_sum_{o}_{d}_{t}_{p}"),
                LinearExpr::variable(self.vars.departed_product.at(&[oi, di, pi, ti])),
                by_mode,
            );
        }
    }

    /// Arrivals equal departures lagged by the lane's transport periods.
    fn add_arrival_equalities(&self, model: &mut Model) {
        let sets = self.sets;
        for ((di, d), (ti, t), (pi, p)) in iproduct!(
            sets.receiving_nodes.iter().enumerate(),
            sets.periods.iter(),
            sets.products.iter().enumerate()
        ) {
            let mut departures = LinearExpr::new();
            for ((oi, o), (mi, m)) in iproduct!(
                sets.departing_nodes.iter().enumerate(),
                sets.modes.iter().enumerate()
            ) {
                let lag = self.params.transport_periods.get_int(&key(&[o, d, m]));
                if let Some(t2i) = sets.periods.lagged(ti, lag) {
                    departures.add_term(
                        self.vars.departed_product_by_mode.at(&[oi, di, pi, t2i, mi]),
                        1.0,
                    );
                }
            }
            model.add_eq(
                format!("arrived_equals_departed_{d}_{t}_{p}"),
                LinearExpr::variable(self.vars.arrived_product.at(&[di, pi, ti])),
                departures,
            );
        }
    }

    /// Completed demand plus dropped demand equals required demand (deletable), with a
    /// permanent demand ceiling, the age marginal of completed demand, and the grand total
    /// of completed volume.
    fn add_demand_reconciliation(&self, model: &mut Model) {
        let sets = self.sets;
        let mut total = LinearExpr::new();
        for ((di, d), (ti, t), (pi, p)) in iproduct!(
            sets.receiving_nodes.iter().enumerate(),
            sets.periods.iter(),
            sets.products.iter().enumerate()
        ) {
            let completed = self.vars.arrived_and_completed_product.at(&[ti, pi, di]);
            total.add_term(completed, 1.0);

            let ni = self.node(d);
            let required = LinearExpr::constant(self.params.demand.get(&key(&[t, p, d])));
            let served_or_dropped = LinearExpr::sum([
                completed,
                self.vars.dropped_demand.at(&[ni, pi, ti]),
            ]);

            model.add_eq(
                demand_equality_name(d, t, p),
                served_or_dropped.clone(),
                required.clone(),
            );
            // Kept when the equality is deleted, so demand stays an upper bound the
            // capacity-maximising objective pushes against
            model.add_le(
                format!("demand_ceiling_{d}_{t}_{p}"),
                served_or_dropped,
                required,
            );

            model.add_eq(
                format!("age_demand_equals_demand_volume_{d}_{p}_{t}"),
                LinearExpr::sum(
                    (0..sets.ages.len()).map(|ai| self.vars.demand_by_age.at(&[ni, pi, ti, ai])),
                ),
                LinearExpr::variable(completed),
            );
        }

        model.add_eq(
            "total_arrived_and_completed_product".to_string(),
            LinearExpr::variable(self.vars.total_arrived_and_completed_product.scalar()),
            total,
        );
    }

    /// Processing at a node keeps paired products in their required ratio.
    fn add_processing_assembly(&self, model: &mut Model) {
        for (entry, qty1) in self.params.processing_assembly_p1_qty.iter() {
            let [t, n, g, p1, p2] = entry else { continue };
            let qty2 = self.params.processing_assembly_p2_qty.get(entry);
            if qty1 == 0.0 || qty2 == 0.0 || !self.in_group(n, g) {
                continue;
            }
            let (Some(ti), Some(ni), Some(p1i), Some(p2i)) = (
                self.sets.periods.labels().get_index_of(t.as_ref()),
                self.sets.node_names.get_index_of(n.as_ref()),
                self.sets.products.get_index_of(p1.as_ref()),
                self.sets.products.get_index_of(p2.as_ref()),
            ) else {
                continue;
            };

            // qty2 units of product 1 move with qty1 units of product 2
            let lhs = LinearExpr::new().plus(self.vars.processed_product.at(&[ni, p1i, ti]), qty2);
            let rhs = LinearExpr::new().plus(self.vars.processed_product.at(&[ni, p2i, ti]), qty1);
            model.add_eq(
                format!("processing_assembly_{n}_{t}_{p1}_{p2}_{g}"),
                lhs,
                rhs,
            );
        }
    }

    /// Shipments on a lane keep paired products in their required ratio.
    fn add_shipping_assembly(&self, model: &mut Model) {
        for (entry, qty1) in self.params.shipping_assembly_p1_qty.iter() {
            let [t, o, d, g_o, g_d, p1, p2] = entry else { continue };
            let qty2 = self.params.shipping_assembly_p2_qty.get(entry);
            if qty1 == 0.0 || qty2 == 0.0 || !self.in_group(o, g_o) || !self.in_group(d, g_d) {
                continue;
            }
            let (Some(ti), Some(oi), Some(di), Some(p1i), Some(p2i)) = (
                self.sets.periods.labels().get_index_of(t.as_ref()),
                self.sets.departing_nodes.get_index_of(o.as_ref()),
                self.sets.receiving_nodes.get_index_of(d.as_ref()),
                self.sets.products.get_index_of(p1.as_ref()),
                self.sets.products.get_index_of(p2.as_ref()),
            ) else {
                continue;
            };

            let lhs =
                LinearExpr::new().plus(self.vars.departed_product.at(&[oi, di, p1i, ti]), qty2);
            let rhs =
                LinearExpr::new().plus(self.vars.departed_product.at(&[oi, di, p2i, ti]), qty1);
            model.add_eq(
                format!("shipping_assembly_{o}_{d}_{t}_{p1}_{p2}_{g_o}_{g_d}"),
                lhs,
                rhs,
            );
        }
    }
}
