//! Inventory and operating costs: per-age carried and dropped volume costs with their
//! aggregation pyramid, and fixed/variable operating costs gated by site activity.
use super::{Builder, key};
use crate::milp::{LinearExpr, Model, VarId};
use crate::model::variables::VarTensor;
use crate::params::BIG_M;
use itertools::iproduct;

impl Builder<'_> {
    pub(super) fn add_cost_constraints(&self, model: &mut Model) {
        self.add_carried_volume_costs(model);
        self.add_carried_volume_aggregations(model);
        self.add_operating_costs(model);
    }

    /// Carrying or dropping a unit at an age accrues the period-weighted unit cost.
    fn add_carried_volume_costs(&self, model: &mut Model) {
        let sets = self.sets;

        for ((di, d), (ti, t), (pi, p), g, (ai, a)) in iproduct!(
            sets.receiving_nodes.iter().enumerate(),
            sets.periods.iter(),
            sets.products.iter().enumerate(),
            sets.node_groups.iter(),
            sets.ages.iter()
        ) {
            let rate = self.params.period_weight.get(&key(&[t]))
                * self.params.ib_carrying_cost.get(&key(&[t, p, d, g]));
            if rate == 0.0 {
                continue;
            }
            let n_pos = self.node(d);
            model.add_ge(
                format!("ib_carried_volume_cost_{d}_{p}_{t}_{g}_{a}"),
                LinearExpr::variable(self.vars.ib_carried_volume_cost.at(&[n_pos, pi, ti, ai])),
                LinearExpr::new()
                    .plus(self.vars.ib_vol_carried_over_by_age.at(&[di, pi, ti, ai]), rate),
            );
        }

        for ((oi, o), (ti, t), (pi, p), g, (ai, a)) in iproduct!(
            sets.departing_nodes.iter().enumerate(),
            sets.periods.iter(),
            sets.products.iter().enumerate(),
            sets.node_groups.iter(),
            sets.ages.iter()
        ) {
            let rate = self.params.period_weight.get(&key(&[t]))
                * self.params.ob_carrying_cost.get(&key(&[t, p, o, g]));
            if rate == 0.0 {
                continue;
            }
            let n_pos = self.node(o);
            model.add_ge(
                format!("ob_carried_volume_cost_{o}_{p}_{t}_{g}_{a}"),
                LinearExpr::variable(self.vars.ob_carried_volume_cost.at(&[n_pos, pi, ti, ai])),
                LinearExpr::new()
                    .plus(self.vars.ob_vol_carried_over_by_age.at(&[oi, pi, ti, ai]), rate),
            );
        }

        for ((n_pos, n), (ti, t), (pi, p), g, (ai, a)) in iproduct!(
            sets.node_names.iter().enumerate(),
            sets.periods.iter(),
            sets.products.iter().enumerate(),
            sets.node_groups.iter(),
            sets.ages.iter()
        ) {
            let rate = self.params.period_weight.get(&key(&[t]))
                * self.params.dropping_cost.get(&key(&[t, p, n, g]));
            if rate == 0.0 {
                continue;
            }
            model.add_ge(
                format!("dropped_volume_cost_{n}_{p}_{t}_{g}_{a}"),
                LinearExpr::variable(self.vars.dropped_volume_cost.at(&[n_pos, pi, ti, ai])),
                LinearExpr::new()
                    .plus(self.vars.vol_dropped_by_age.at(&[n_pos, pi, ti, ai]), rate),
            );
        }
    }

    /// Roll the per-age cost variables up by period, product, node, node/time, product/time
    /// and into the grand total.
    fn add_carried_volume_aggregations(&self, model: &mut Model) {
        let sets = self.sets;
        let n_ages = sets.ages.len();
        let n_products = sets.products.len();
        let n_periods = sets.periods.len();

        // Positions of each family's nodes within the all-nodes set
        let ib_nodes: Vec<usize> =
            sets.receiving_nodes.iter().map(|n| self.node(n)).collect();
        let ob_nodes: Vec<usize> =
            sets.departing_nodes.iter().map(|n| self.node(n)).collect();
        let all_nodes: Vec<usize> = (0..sets.node_names.len()).collect();

        let cell = |tensor: &VarTensor,
                    n_pos: usize,
                    pi: usize,
                    ti: usize,
                    ai: usize| tensor.at(&[n_pos, pi, ti, ai]);

        struct Family<'v> {
            label: &'v str,
            tensor: &'v VarTensor,
            nodes: &'v [usize],
            by_period: &'v VarTensor,
            by_product: &'v VarTensor,
            by_node: &'v VarTensor,
            by_node_time: Option<&'v VarTensor>,
            by_product_time: &'v VarTensor,
            total: &'v VarTensor,
        }

        let families = [
            Family {
                label: "ib_carried_volume_cost",
                tensor: &self.vars.ib_carried_volume_cost,
                nodes: &ib_nodes,
                by_period: &self.vars.ib_carried_volume_cost_by_period,
                by_product: &self.vars.ib_carried_volume_cost_by_product,
                by_node: &self.vars.ib_carried_volume_cost_by_node,
                by_node_time: Some(&self.vars.ib_carried_volume_cost_by_node_time),
                by_product_time: &self.vars.ib_carried_volume_cost_by_product_time,
                total: &self.vars.total_ib_carried_volume_cost,
            },
            Family {
                label: "ob_carried_volume_cost",
                tensor: &self.vars.ob_carried_volume_cost,
                nodes: &ob_nodes,
                by_period: &self.vars.ob_carried_volume_cost_by_period,
                by_product: &self.vars.ob_carried_volume_cost_by_product,
                by_node: &self.vars.ob_carried_volume_cost_by_node,
                by_node_time: Some(&self.vars.ob_carried_volume_cost_by_node_time),
                by_product_time: &self.vars.ob_carried_volume_cost_by_product_time,
                total: &self.vars.total_ob_carried_volume_cost,
            },
            Family {
                label: "dropped_volume_cost",
                tensor: &self.vars.dropped_volume_cost,
                nodes: &all_nodes,
                by_period: &self.vars.dropped_volume_cost_by_period,
                by_product: &self.vars.dropped_volume_cost_by_product,
                by_node: &self.vars.dropped_volume_cost_by_node,
                by_node_time: None,
                by_product_time: &self.vars.dropped_volume_cost_by_product_time,
                total: &self.vars.total_dropped_volume_cost,
            },
        ];

        for family in &families {
            for (ti, t) in sets.periods.iter() {
                model.add_eq(
                    format!("{}_by_period_{t}", family.label),
                    LinearExpr::variable(family.by_period.at(&[ti])),
                    LinearExpr::sum(
                        iproduct!(family.nodes.iter(), 0..n_products, 0..n_ages)
                            .map(|(&n_pos, pi, ai)| cell(family.tensor, n_pos, pi, ti, ai)),
                    ),
                );
            }

            for (pi, p) in sets.products.iter().enumerate() {
                model.add_eq(
                    format!("{}_by_product_{p}", family.label),
                    LinearExpr::variable(family.by_product.at(&[pi])),
                    LinearExpr::sum(
                        iproduct!(family.nodes.iter(), 0..n_periods, 0..n_ages)
                            .map(|(&n_pos, ti, ai)| cell(family.tensor, n_pos, pi, ti, ai)),
                    ),
                );
            }

            for &n_pos in family.nodes {
                let n = sets.node_names.get_index(n_pos).expect("node in range");
                model.add_eq(
                    format!("{}_by_node_{n}", family.label),
                    LinearExpr::variable(family.by_node.at(&[n_pos])),
                    LinearExpr::sum(
                        iproduct!(0..n_products, 0..n_periods, 0..n_ages)
                            .map(|(pi, ti, ai)| cell(family.tensor, n_pos, pi, ti, ai)),
                    ),
                );
            }

            if let Some(by_node_time) = family.by_node_time {
                for (&n_pos, (ti, t)) in iproduct!(family.nodes.iter(), sets.periods.iter()) {
                    let n = sets.node_names.get_index(n_pos).expect("node in range");
                    model.add_eq(
                        format!("{}_by_node_time_{n}_{t}", family.label),
                        LinearExpr::variable(by_node_time.at(&[n_pos, ti])),
                        LinearExpr::sum(
                            iproduct!(0..n_products, 0..n_ages)
                                .map(|(pi, ai)| cell(family.tensor, n_pos, pi, ti, ai)),
                        ),
                    );
                }
            }

            for ((pi, p), (ti, t)) in
                iproduct!(sets.products.iter().enumerate(), sets.periods.iter())
            {
                model.add_eq(
                    format!("{}_by_product_time_{p}_{t}", family.label),
                    LinearExpr::variable(family.by_product_time.at(&[pi, ti])),
                    LinearExpr::sum(
                        iproduct!(family.nodes.iter(), 0..n_ages)
                            .map(|(&n_pos, ai)| cell(family.tensor, n_pos, pi, ti, ai)),
                    ),
                );
            }

            model.add_eq(
                format!("total_{}", family.label),
                LinearExpr::variable(family.total.scalar()),
                LinearExpr::sum(
                    iproduct!(family.nodes.iter(), 0..n_products, 0..n_periods, 0..n_ages)
                        .map(|(&n_pos, pi, ti, ai)| cell(family.tensor, n_pos, pi, ti, ai)),
                ),
            );
        }

        model.add_eq(
            "grand_total_carried_and_dropped_volume_cost".to_string(),
            LinearExpr::variable(
                self.vars.grand_total_carried_and_dropped_volume_cost.scalar(),
            ),
            LinearExpr::sum([
                self.vars.total_dropped_volume_cost.scalar(),
                self.vars.total_ib_carried_volume_cost.scalar(),
                self.vars.total_ob_carried_volume_cost.scalar(),
            ]),
        );
    }

    /// Variable costs follow processed volume; fixed costs follow the operating indicator;
    /// both roll up to node, period and grand totals.
    fn add_operating_costs(&self, model: &mut Model) {
        let sets = self.sets;

        for ((n_pos, n), (pi, p), (ti, t), g) in iproduct!(
            sets.node_names.iter().enumerate(),
            sets.products.iter().enumerate(),
            sets.periods.iter(),
            sets.node_groups.iter()
        ) {
            if !self.in_group(n, g) {
                continue;
            }
            let rate = self.params.period_weight.get(&key(&[t]))
                * self.params.operating_costs_variable.get(&key(&[t, n, p, g]));
            model.add_eq(
                format!("variable_operating_costs_{n}_{p}_{t}_{g}"),
                LinearExpr::variable(self.vars.variable_operating_costs.at(&[n_pos, pi, ti])),
                LinearExpr::new().plus(self.vars.processed_product.at(&[n_pos, pi, ti]), rate),
            );
        }

        for ((n_pos, n), (ti, t)) in
            iproduct!(sets.node_names.iter().enumerate(), sets.periods.iter())
        {
            // Any processing in the period marks the site as operating
            model.add_ge(
                format!("is_site_operating_{n}_{t}"),
                LinearExpr::new().plus(self.vars.is_site_operating.at(&[n_pos, ti]), BIG_M),
                LinearExpr::sum(
                    (0..sets.products.len())
                        .map(|pi| self.vars.processed_product.at(&[n_pos, pi, ti])),
                ),
            );

            for g in &sets.node_groups {
                if !self.in_group(n, g) {
                    continue;
                }
                let rate = self.params.period_weight.get(&key(&[t]))
                    * self.params.operating_costs_fixed.get(&key(&[t, n, g]));
                model.add_eq(
                    format!("fixed_operating_costs_{n}_{t}_{g}"),
                    LinearExpr::variable(self.vars.fixed_operating_costs.at(&[n_pos, ti])),
                    LinearExpr::new().plus(self.vars.is_site_operating.at(&[n_pos, ti]), rate),
                );
            }

            let mut components: Vec<VarId> =
                vec![self.vars.fixed_operating_costs.at(&[n_pos, ti])];
            components.extend(
                (0..sets.products.len())
                    .map(|pi| self.vars.variable_operating_costs.at(&[n_pos, pi, ti])),
            );
            model.add_eq(
                format!("operating_costs_{n}_{t}"),
                LinearExpr::variable(self.vars.operating_costs.at(&[n_pos, ti])),
                LinearExpr::sum(components),
            );
        }

        for (n_pos, n) in sets.node_names.iter().enumerate() {
            model.add_eq(
                format!("operating_costs_by_origin_{n}"),
                LinearExpr::variable(self.vars.operating_costs_by_origin.at(&[n_pos])),
                LinearExpr::sum(
                    (0..sets.periods.len()).map(|ti| self.vars.operating_costs.at(&[n_pos, ti])),
                ),
            );
        }

        let mut grand = LinearExpr::new();
        for (ti, t) in sets.periods.iter() {
            let period_var = self.vars.total_operating_costs.at(&[ti]);
            grand.add_term(period_var, 1.0);
            model.add_eq(
                format!("total_operating_costs_{t}"),
                LinearExpr::variable(period_var),
                LinearExpr::sum(
                    (0..sets.node_names.len())
                        .map(|n_pos| self.vars.operating_costs.at(&[n_pos, ti])),
                ),
            );
        }
        model.add_eq(
            "grand_total_operating_costs".to_string(),
            LinearExpr::variable(self.vars.grand_total_operating_costs.scalar()),
            grand,
        );
    }
}
