//! Age stratification: marginals tying the by-age slices to their aggregates, cohort
//! accounting through processing and departure, FIFO draining of departed volume, age-limit
//! penalties and the maximum observed age.
use super::{Builder, key};
use crate::milp::{LinearExpr, Model};
use crate::params::BIG_M;
use itertools::iproduct;

impl Builder<'_> {
    pub(super) fn add_age_constraints(&self, model: &mut Model) {
        self.add_receiving_by_age(model);
        self.add_age_marginals(model);
        self.add_processing_accounting(model);
        self.add_departure_accounting(model);
        self.add_departed_fifo(model);
        self.add_age_violations(model);
        self.add_max_age(model);
    }

    /// Volume arriving at an age equals the lagged departures of that age.
    fn add_receiving_by_age(&self, model: &mut Model) {
        let sets = self.sets;
        for ((di, d), (pi, p), (ti, t), (ai, a)) in iproduct!(
            sets.receiving_nodes.iter().enumerate(),
            sets.products.iter().enumerate(),
            sets.periods.iter(),
            sets.ages.iter()
        ) {
            let mut departures = LinearExpr::new();
            for ((oi, o), (mi, m)) in iproduct!(
                sets.departing_nodes.iter().enumerate(),
                sets.modes.iter().enumerate()
            ) {
                let lag = self.params.transport_periods.get_int(&key(&[o, d, m]));
                if let Some(t2i) = sets.periods.lagged(ti, lag) {
                    departures.add_term(
                        self.vars.vol_departed_by_age.at(&[oi, di, pi, t2i, ai, mi]),
                        1.0,
                    );
                }
            }
            model.add_eq(
                format!("age_receiving_departure_equality_{d}_{p}_{t}_{a}"),
                LinearExpr::variable(self.vars.vol_arrived_by_age.at(&[di, pi, ti, ai])),
                departures,
            );
        }
    }

    /// Every age-stratified family sums over ages to its aggregate counterpart.
    fn add_age_marginals(&self, model: &mut Model) {
        let sets = self.sets;
        let n_ages = sets.ages.len();

        for ((di, d), (pi, p), (ti, t)) in iproduct!(
            sets.receiving_nodes.iter().enumerate(),
            sets.products.iter().enumerate(),
            sets.periods.iter()
        ) {
            model.add_eq(
                format!("age_receiving_equals_arrived_volume_{d}_{p}_{t}"),
                LinearExpr::sum(
                    (0..n_ages).map(|ai| self.vars.vol_arrived_by_age.at(&[di, pi, ti, ai])),
                ),
                LinearExpr::variable(self.vars.arrived_product.at(&[di, pi, ti])),
            );
            model.add_eq(
                format!("age_ib_carried_over_equals_ib_carried_over_{d}_{p}_{t}"),
                LinearExpr::sum(
                    (0..n_ages)
                        .map(|ai| self.vars.ib_vol_carried_over_by_age.at(&[di, pi, ti, ai])),
                ),
                LinearExpr::variable(self.vars.ib_carried_over_demand.at(&[di, pi, ti])),
            );
        }

        for ((ni, n), (pi, p), (ti, t)) in iproduct!(
            sets.node_names.iter().enumerate(),
            sets.products.iter().enumerate(),
            sets.periods.iter()
        ) {
            model.add_eq(
                format!("age_processed_equals_processed_volume_{n}_{p}_{t}"),
                LinearExpr::sum(
                    (0..n_ages).map(|ai| self.vars.vol_processed_by_age.at(&[ni, pi, ti, ai])),
                ),
                LinearExpr::variable(self.vars.processed_product.at(&[ni, pi, ti])),
            );
            model.add_eq(
                format!("age_dropped_equals_dropped_volume_{n}_{p}_{t}"),
                LinearExpr::sum(
                    (0..n_ages).map(|ai| self.vars.vol_dropped_by_age.at(&[ni, pi, ti, ai])),
                ),
                LinearExpr::variable(self.vars.dropped_demand.at(&[ni, pi, ti])),
            );
        }

        for ((oi, o), (pi, p), (ti, t)) in iproduct!(
            sets.departing_nodes.iter().enumerate(),
            sets.products.iter().enumerate(),
            sets.periods.iter()
        ) {
            model.add_eq(
                format!("age_ob_carried_over_equals_ob_carried_over_{o}_{p}_{t}"),
                LinearExpr::sum(
                    (0..n_ages)
                        .map(|ai| self.vars.ob_vol_carried_over_by_age.at(&[oi, pi, ti, ai])),
                ),
                LinearExpr::variable(self.vars.ob_carried_over_demand.at(&[oi, pi, ti])),
            );

            for ((di, d), (mi, m)) in iproduct!(
                sets.receiving_nodes.iter().enumerate(),
                sets.modes.iter().enumerate()
            ) {
                model.add_eq(
                    format!("age_departing_equals_departed_volume_{o}_{d}_{p}_{t}_{m}"),
                    LinearExpr::sum(
                        (0..n_ages)
                            .map(|ai| self.vars.vol_departed_by_age.at(&[oi, di, pi, ti, ai, mi])),
                    ),
                    LinearExpr::variable(
                        self.vars.departed_product_by_mode.at(&[oi, di, pi, ti, mi]),
                    ),
                );
            }
        }
    }

    /// Processing at an age is fed by arrivals and inbound carryover of the previous age, or
    /// at origins by lag-shifted processing covering demand.
    fn add_processing_accounting(&self, model: &mut Model) {
        let sets = self.sets;
        for ((n_pos, n), (pi, p), (ti, t), (ai, a), g) in iproduct!(
            sets.node_names.iter().enumerate(),
            sets.products.iter().enumerate(),
            sets.periods.iter(),
            sets.ages.iter(),
            sets.node_groups.iter()
        ) {
            if !self.in_group(n, g) {
                continue;
            }

            let name = format!("processed_by_age_balance_{n}_{p}_{t}_{a}_{g}");
            if sets.is_origin(n) {
                // Lag-shifted processing must cover the demand served at this age
                let mut processed = LinearExpr::new();
                for (t2i, t2) in sets.periods.iter() {
                    let lag = self.params.delay_periods.get_int(&key(&[t2, n, p, g]))
                        + self
                            .params
                            .capacity_consumption_periods
                            .get_int(&key(&[t2, n, p, g]));
                    if sets.periods.number(t2i) + lag == sets.periods.number(ti) {
                        processed
                            .add_term(self.vars.vol_processed_by_age.at(&[n_pos, pi, t2i, ai]), 1.0);
                    }
                }
                let served = LinearExpr::new()
                    .plus(self.vars.demand_by_age.at(&[n_pos, pi, ti, ai]), 1.0)
                    .plus(self.vars.vol_dropped_by_age.at(&[n_pos, pi, ti, ai]), -1.0);
                model.add_ge(name, processed, served);
            } else {
                // Dropped demand never arrives, so it does not enter the physical balance
                let ri = self.receiving(n);
                let mut supply = LinearExpr::new()
                    .plus(self.vars.vol_arrived_by_age.at(&[ri, pi, ti, ai]), 1.0)
                    .plus(self.vars.demand_by_age.at(&[n_pos, pi, ti, ai]), -1.0)
                    .plus(self.vars.ib_vol_carried_over_by_age.at(&[ri, pi, ti, ai]), -1.0);
                if let (Some(t_prev), Some(a_prev)) =
                    (sets.periods.lagged(ti, 1), sets.ages.lagged(ai, 1))
                {
                    supply.add_term(
                        self.vars.ib_vol_carried_over_by_age.at(&[ri, pi, t_prev, a_prev]),
                        1.0,
                    );
                }
                model.add_le(
                    name,
                    LinearExpr::variable(self.vars.vol_processed_by_age.at(&[n_pos, pi, ti, ai])),
                    supply,
                );
            }
        }
    }

    /// Departures plus outbound carryover at an age are bounded by the previous-age carryover
    /// and the lag-shifted processed volume; origins first serve demand at the gate.
    fn add_departure_accounting(&self, model: &mut Model) {
        let sets = self.sets;
        for ((oi, o), (pi, p), (ti, t), (ai, a), g) in iproduct!(
            sets.departing_nodes.iter().enumerate(),
            sets.products.iter().enumerate(),
            sets.periods.iter(),
            sets.ages.iter(),
            sets.node_groups.iter()
        ) {
            if !self.in_group(o, g) {
                continue;
            }
            let n_pos = self.node(o);

            let mut departed = LinearExpr::new();
            for (di, mi) in iproduct!(0..sets.receiving_nodes.len(), 0..sets.modes.len()) {
                departed.add_term(self.vars.vol_departed_by_age.at(&[oi, di, pi, ti, ai, mi]), 1.0);
            }
            departed.add_term(self.vars.ob_vol_carried_over_by_age.at(&[oi, pi, ti, ai]), 1.0);

            let mut available = LinearExpr::new();
            for (t2i, t2) in sets.periods.iter() {
                let lag = self.params.delay_periods.get_int(&key(&[t2, o, p, g]))
                    + self
                        .params
                        .capacity_consumption_periods
                        .get_int(&key(&[t2, o, p, g]));
                if sets.periods.number(t2i) + lag == sets.periods.number(ti) {
                    available
                        .add_term(self.vars.vol_processed_by_age.at(&[n_pos, pi, t2i, ai]), 1.0);
                }
            }
            if let (Some(t_prev), Some(a_prev)) =
                (sets.periods.lagged(ti, 1), sets.ages.lagged(ai, 1))
            {
                available.add_term(
                    self.vars.ob_vol_carried_over_by_age.at(&[oi, pi, t_prev, a_prev]),
                    1.0,
                );
            }
            if sets.is_origin(o) {
                available.add_term(self.vars.demand_by_age.at(&[n_pos, pi, ti, ai]), -1.0);
            }

            model.add_le(
                format!("departed_by_age_balance_{o}_{p}_{t}_{a}_{g}"),
                departed,
                available,
            );
        }
    }

    /// Older departed cohorts must be drained before younger ones, per mode.
    fn add_departed_fifo(&self, model: &mut Model) {
        let sets = self.sets;
        let n_rec = sets.receiving_nodes.len();
        for ((oi, o), (pi, p), (ti, t), (ai, a), (mi, m)) in iproduct!(
            sets.departing_nodes.iter().enumerate(),
            sets.products.iter().enumerate(),
            sets.periods.iter(),
            sets.ages.iter(),
            sets.modes.iter().enumerate()
        ) {
            let this_age = LinearExpr::sum(
                (0..n_rec).map(|di| self.vars.vol_departed_by_age.at(&[oi, di, pi, ti, ai, mi])),
            );

            let mut headroom = LinearExpr::sum(
                (0..n_rec).map(|di| self.vars.departed_product_by_mode.at(&[oi, di, pi, ti, mi])),
            );
            // Ages are numerically ordered, so strictly-older cohorts sit above ai
            for (a2i, di) in iproduct!(ai + 1..sets.ages.len(), 0..n_rec) {
                headroom
                    .add_term(self.vars.vol_departed_by_age.at(&[oi, di, pi, ti, a2i, mi]), -1.0);
            }

            model.add_le(
                format!("departed_by_age_fifo_{o}_{p}_{t}_{a}_{m}"),
                this_age,
                headroom,
            );
        }
    }

    /// Demand served above the per-age volume limit accrues the violation penalty.
    fn add_age_violations(&self, model: &mut Model) {
        let sets = self.sets;
        let mut grand_total = LinearExpr::new();
        for (d, (pi, p), (ti, t), (ai, a)) in iproduct!(
            sets.destinations.iter(),
            sets.products.iter().enumerate(),
            sets.periods.iter(),
            sets.ages.iter()
        ) {
            let n_pos = self.node(d);
            grand_total.add_term(self.vars.age_violation_cost.at(&[n_pos, pi, ti, ai]), 1.0);

            for g in &sets.node_groups {
                if !self.in_group(d, g) {
                    continue;
                }
                let limit_key = key(&[t, p, d, a, g]);
                if !self.params.max_vol_by_age.contains(&limit_key) {
                    continue;
                }
                let limit = self.params.max_vol_by_age.get(&limit_key);
                let served = self.vars.demand_by_age.at(&[n_pos, pi, ti, ai]);

                model.add_le(
                    format!("max_volume_by_age_{d}_{p}_{t}_{a}_{g}"),
                    LinearExpr::variable(served),
                    LinearExpr::constant(limit),
                );

                if self.params.age_violation_cost.contains(&limit_key) {
                    let penalty = self.params.age_violation_cost.get(&limit_key);
                    let mut excess_cost = LinearExpr::new().plus(served, penalty);
                    excess_cost.add_constant(-limit * penalty);
                    model.add_le(
                        format!("max_volume_by_age_violation_cost_{d}_{p}_{t}_{a}_{g}"),
                        excess_cost,
                        LinearExpr::variable(
                            self.vars.age_violation_cost.at(&[n_pos, pi, ti, ai]),
                        ),
                    );
                }
            }
        }

        model.add_eq(
            "grand_total_age_violation_cost".to_string(),
            LinearExpr::variable(self.vars.grand_total_age_violation_cost.scalar()),
            grand_total,
        );
    }

    /// `max_age` dominates every age at which demand is served.
    fn add_max_age(&self, model: &mut Model) {
        let sets = self.sets;
        for (ai, a) in sets.ages.iter() {
            let received = self.vars.is_age_received.at(&[ai]);
            model.add_ge(
                format!("max_age_{a}"),
                LinearExpr::variable(self.vars.max_age.scalar()),
                LinearExpr::new().plus(received, sets.ages.number(ai) as f64),
            );

            let mut served = LinearExpr::new();
            for (d, pi, ti) in iproduct!(
                sets.destinations.iter(),
                0..sets.products.len(),
                0..sets.periods.len()
            ) {
                served.add_term(self.vars.demand_by_age.at(&[self.node(d), pi, ti, ai]), 1.0);
            }
            model.add_le(
                format!("binary_is_age_received_{a}"),
                served,
                LinearExpr::new().plus(received, BIG_M),
            );
        }
    }
}
