//! The launch/shutdown state machine: transition counts, hard transitions, state
//! feasibility, activity gating, duration windows, post-shutdown quiet, node-type counts
//! and the associated costs.
use super::{Builder, key};
use crate::milp::{LinearExpr, Model};
use crate::model::variables::VarTensor;
use crate::params::BIG_M;
use itertools::iproduct;

impl Builder<'_> {
    pub(super) fn add_launch_constraints(&self, model: &mut Model) {
        self.add_transition_counts(model);
        self.add_state_machine(model);
        self.add_duration_windows(model);
        self.add_node_type_counts(model);
        self.add_transition_costs(model);
    }

    /// The cumulative count of one transition family for a node, through `upto`.
    fn cum(&self, node_pos: usize, family: &VarTensor, upto: usize) -> LinearExpr {
        LinearExpr::sum((0..=upto).map(|ti| family.at(&[node_pos, ti])))
    }

    /// Total launches and shutdowns per node stay within their configured counts, and hard
    /// transitions are honoured.
    fn add_transition_counts(&self, model: &mut Model) {
        let sets = self.sets;
        let last = sets.periods.len() - 1;

        for (n_pos, n) in sets.node_names.iter().enumerate() {
            let launches = self.cum(n_pos, &self.vars.is_launched, last);
            model.add_le(
                format!("is_launched_{n}_max"),
                launches.clone(),
                LinearExpr::constant(self.params.max_launch_count.get(&key(&[n]))),
            );
            model.add_ge(
                format!("is_launched_{n}_min"),
                launches,
                LinearExpr::constant(self.params.min_launch_count.get(&key(&[n]))),
            );

            let shutdowns = self.cum(n_pos, &self.vars.is_shut_down, last);
            model.add_le(
                format!("is_shut_down_{n}_max"),
                shutdowns.clone(),
                LinearExpr::constant(self.params.max_shut_down_count.get(&key(&[n]))),
            );
            model.add_ge(
                format!("is_shut_down_{n}_min"),
                shutdowns,
                LinearExpr::constant(self.params.min_shut_down_count.get(&key(&[n]))),
            );

            for (ti, t) in sets.periods.iter() {
                model.add_ge(
                    format!("launch_hard_constraint_{n}_{t}"),
                    LinearExpr::variable(self.vars.is_launched.at(&[n_pos, ti])),
                    LinearExpr::constant(
                        self.params.launch_hard_constraint.get(&key(&[n, t])),
                    ),
                );
                model.add_ge(
                    format!("shut_down_hard_constraint_{n}_{t}"),
                    LinearExpr::variable(self.vars.is_shut_down.at(&[n_pos, ti])),
                    LinearExpr::constant(
                        self.params.shut_down_hard_constraint.get(&key(&[n, t])),
                    ),
                );
            }
        }
    }

    /// The running state stays within `{0, 1}`, activity forces the state up, shutdowns
    /// follow a launch, and nothing processes after a shutdown.
    fn add_state_machine(&self, model: &mut Model) {
        let sets = self.sets;
        for ((n_pos, n), (ti, t)) in
            iproduct!(sets.node_names.iter().enumerate(), sets.periods.iter())
        {
            let launches = self.cum(n_pos, &self.vars.is_launched, ti);
            let shutdowns = self.cum(n_pos, &self.vars.is_shut_down, ti);
            let mut state = launches.clone();
            state.add_scaled(&shutdowns, -1.0);

            model.add_le(
                format!("cannot_launch_twice_{n}_{t}"),
                state.clone(),
                LinearExpr::constant(1.0),
            );
            model.add_le(
                format!("cannot_shut_down_twice_{n}_{t}"),
                shutdowns.clone(),
                launches.clone(),
            );

            // Any processing in or after this period requires the node to be running now
            let processed_now = LinearExpr::sum(
                (0..sets.products.len())
                    .map(|pi| self.vars.processed_product.at(&[n_pos, pi, ti])),
            );
            let mut gate = LinearExpr::new();
            gate.add_scaled(&state, BIG_M);
            model.add_ge(format!("launch_volume_{n}_{t}"), gate, processed_now);

            // Once shut down, the node stays quiet for the rest of the horizon
            let processed_tail = LinearExpr::sum(
                iproduct!(0..sets.products.len(), ti..sets.periods.len())
                    .map(|(pi, t2i)| self.vars.processed_product.at(&[n_pos, pi, t2i])),
            );
            let mut quiet = LinearExpr::constant(BIG_M);
            quiet.add_scaled(&shutdowns, -BIG_M);
            model.add_ge(format!("shut_down_volume_{n}_{t}"), quiet, processed_tail);

            // A shutdown needs a launch strictly before it
            let prior_launches = match ti {
                0 => LinearExpr::new(),
                _ => self.cum(n_pos, &self.vars.is_launched, ti - 1),
            };
            model.add_le(
                format!("shut_down_after_launch_{n}_{t}"),
                LinearExpr::variable(self.vars.is_shut_down.at(&[n_pos, ti])),
                prior_launches,
            );

            model.add_le(
                format!("is_site_operating_shut_down_{n}_{t}"),
                LinearExpr::variable(self.vars.is_site_operating.at(&[n_pos, ti])),
                state,
            );
        }
    }

    /// Minimum and maximum operating and shutdown durations.
    fn add_duration_windows(&self, model: &mut Model) {
        let sets = self.sets;
        for ((n_pos, n), (ti, t)) in
            iproduct!(sets.node_names.iter().enumerate(), sets.periods.iter())
        {
            let t_num = sets.periods.number(ti);

            // No shutdown within the minimum operating window after a launch
            let min_operating = self.params.min_operating_duration.get_int(&key(&[n]));
            let recent_launches = LinearExpr::sum(
                sets.periods
                    .iter()
                    .filter(|&(t2i, _)| {
                        let t2 = sets.periods.number(t2i);
                        t2 > t_num - min_operating && t2 <= t_num
                    })
                    .map(|(t2i, _)| self.vars.is_launched.at(&[n_pos, t2i])),
            );
            let mut headroom = LinearExpr::constant(1.0);
            headroom.add_scaled(&recent_launches, -1.0);
            model.add_le(
                format!("min_operating_duration_{n}_{t}"),
                LinearExpr::variable(self.vars.is_shut_down.at(&[n_pos, ti])),
                headroom,
            );

            // No relaunch within the minimum shutdown window after a shutdown
            let min_shut_down = self.params.min_shut_down_duration.get_int(&key(&[n]));
            let recent_shutdowns = LinearExpr::sum(
                sets.periods
                    .iter()
                    .filter(|&(t2i, _)| {
                        let t2 = sets.periods.number(t2i);
                        t2 > t_num - min_shut_down && t2 <= t_num
                    })
                    .map(|(t2i, _)| self.vars.is_shut_down.at(&[n_pos, t2i])),
            );
            let mut headroom = LinearExpr::constant(1.0);
            headroom.add_scaled(&recent_shutdowns, -1.0);
            model.add_le(
                format!("min_shut_down_duration_{n}_{t}"),
                LinearExpr::variable(self.vars.is_launched.at(&[n_pos, ti])),
                headroom,
            );

            // Every launch must be followed by a shutdown within the maximum operating
            // window: by now, shutdowns must cover all launches that old
            let max_operating = self.params.max_operating_duration.get_int(&key(&[n]));
            if let Some(due) = sets.periods.position_at_or_before(t_num - max_operating) {
                model.add_ge(
                    format!("max_operating_duration_{n}_{t}"),
                    self.cum(n_pos, &self.vars.is_shut_down, ti),
                    self.cum(n_pos, &self.vars.is_launched, due),
                );
            }

            // Every shutdown must be followed by a relaunch within the maximum shutdown
            // window
            let max_shut_down = self.params.max_shut_down_duration.get_int(&key(&[n]));
            if let Some(due) = sets.periods.position_at_or_before(t_num - max_shut_down) {
                model.add_ge(
                    format!("max_shut_down_duration_{n}_{t}"),
                    self.cum(n_pos, &self.vars.is_launched, ti),
                    self.cum(n_pos, &self.vars.is_shut_down, due),
                );
            }
        }
    }

    /// The number of operating nodes of each type stays within the configured band.
    fn add_node_type_counts(&self, model: &mut Model) {
        let sets = self.sets;
        for ((ti, t), nt) in iproduct!(sets.periods.iter(), sets.node_types.iter()) {
            let mut operating = LinearExpr::new();
            for (n_pos, n) in sets.node_names.iter().enumerate() {
                if sets.nodes[n].node_type != *nt {
                    continue;
                }
                operating.add_scaled(&self.cum(n_pos, &self.vars.is_launched, ti), 1.0);
                operating.add_scaled(&self.cum(n_pos, &self.vars.is_shut_down, ti), -1.0);
            }

            model.add_le(
                format!("node_type_count_max_{t}_{nt}"),
                operating.clone(),
                LinearExpr::constant(self.params.node_types_max.get(&key(&[t, nt]))),
            );
            model.add_ge(
                format!("node_type_count_min_{t}_{nt}"),
                operating,
                LinearExpr::constant(self.params.node_types_min.get(&key(&[t, nt]))),
            );
        }
    }

    /// Launch and shutdown costs, their per-period sums, grand totals and the launch-cost
    /// budget.
    fn add_transition_costs(&self, model: &mut Model) {
        let sets = self.sets;

        for ((n_pos, n), (ti, t), g) in iproduct!(
            sets.node_names.iter().enumerate(),
            sets.periods.iter(),
            sets.node_groups.iter()
        ) {
            let launch_cost = self.params.launch_cost.get(&key(&[t, n, g]));
            if launch_cost != 0.0 {
                model.add_ge(
                    format!("total_launch_cost_{n}_{t}_{g}"),
                    LinearExpr::variable(self.vars.total_launch_cost.at(&[n_pos, ti])),
                    LinearExpr::new().plus(self.vars.is_launched.at(&[n_pos, ti]), launch_cost),
                );
            }

            let shut_down_cost = self.params.shut_down_cost.get(&key(&[t, n, g]));
            if shut_down_cost != 0.0 {
                model.add_ge(
                    format!("total_shut_down_cost_{n}_{t}_{g}"),
                    LinearExpr::variable(self.vars.total_shut_down_cost.at(&[n_pos, ti])),
                    LinearExpr::new()
                        .plus(self.vars.is_shut_down.at(&[n_pos, ti]), shut_down_cost),
                );
            }
        }

        let mut grand_launch = LinearExpr::new();
        let mut grand_shut_down = LinearExpr::new();
        for (ti, t) in sets.periods.iter() {
            let launches = LinearExpr::sum(
                (0..sets.node_names.len())
                    .map(|n_pos| self.vars.total_launch_cost.at(&[n_pos, ti])),
            );
            grand_launch.add_scaled(&launches, 1.0);
            model.add_eq(
                format!("launch_costs_by_period_{t}"),
                LinearExpr::variable(self.vars.launch_costs_by_period.at(&[ti])),
                launches,
            );

            let shutdowns = LinearExpr::sum(
                (0..sets.node_names.len())
                    .map(|n_pos| self.vars.total_shut_down_cost.at(&[n_pos, ti])),
            );
            grand_shut_down.add_scaled(&shutdowns, 1.0);
            model.add_eq(
                format!("shut_down_costs_by_period_{t}"),
                LinearExpr::variable(self.vars.shut_down_costs_by_period.at(&[ti])),
                shutdowns,
            );
        }

        model.add_eq(
            "grand_total_launch_cost".to_string(),
            LinearExpr::variable(self.vars.grand_total_launch_cost.scalar()),
            grand_launch,
        );
        model.add_le(
            "grand_total_launch_cost_budget".to_string(),
            LinearExpr::variable(self.vars.grand_total_launch_cost.scalar()),
            LinearExpr::constant(self.params.max_launch_cost),
        );
        model.add_eq(
            "grand_total_shut_down_cost".to_string(),
            LinearExpr::variable(self.vars.grand_total_shut_down_cost.scalar()),
            grand_shut_down,
        );
    }
}
