//! The objective library.
//!
//! Every objective is a linear expression over existing variables. The lexicographic driver
//! asks each objective for its *measured* expression (the positive quantity being driven),
//! derives the solver expression from it (negated for maximisations, since the model always
//! minimises) and bounds it between priority levels.
use super::variables::Variables;
use crate::milp::LinearExpr;
use crate::network::NetworkSets;
use itertools::iproduct;
use strum::{Display, EnumString};

/// One of the supported optimisation objectives.
#[derive(Clone, Copy, Debug, Display, EnumString, Eq, Hash, PartialEq)]
#[strum(ascii_case_insensitive)]
pub enum Objective {
    /// Minimise the sum of every grand-total cost
    #[strum(serialize = "Minimize Cost")]
    MinimizeCost,
    /// Minimise the total dropped volume
    #[strum(serialize = "Minimize Dropped Volume")]
    MinimizeDroppedVolume,
    /// Minimise the total inbound and outbound carryover
    #[strum(serialize = "Minimize Carried Over Volume")]
    MinimizeCarriedOverVolume,
    /// Minimise the volume moved between consecutive plans
    #[strum(serialize = "Minimize Plan-Over-Plan Change")]
    MinimizePlanOverPlanChange,
    /// Minimise the worst node utilization
    #[strum(serialize = "Minimize Maximum Utilization")]
    MinimizeMaximumUtilization,
    /// Minimise the longest lane distance in use
    #[strum(serialize = "Minimize Maximum Transit Distance")]
    MinimizeMaximumTransitDistance,
    /// Minimise the oldest age at which demand is served
    #[strum(serialize = "Minimize Maximum Age")]
    MinimizeMaximumAge,
    /// Maximise completed volume, with the demand equalities relaxed to upper bounds
    #[strum(serialize = "Maximize Capacity")]
    MaximizeCapacity,
}

impl Objective {
    /// Whether this objective maximises its measured expression.
    pub fn is_maximisation(self) -> bool {
        self == Objective::MaximizeCapacity
    }

    /// The measured quantity: always the positive expression the objective cares about.
    pub fn measure(self, vars: &Variables, sets: &NetworkSets) -> LinearExpr {
        match self {
            Objective::MinimizeCost => LinearExpr::sum([
                vars.grand_total_transportation_costs.scalar(),
                vars.grand_total_operating_costs.scalar(),
                vars.grand_total_t_capacity_option.scalar(),
                vars.grand_total_c_capacity_option.scalar(),
                vars.grand_total_carried_and_dropped_volume_cost.scalar(),
                vars.grand_total_launch_cost.scalar(),
                vars.grand_total_shut_down_cost.scalar(),
                vars.grand_total_pop_cost.scalar(),
                vars.grand_total_age_violation_cost.scalar(),
                vars.resource_grand_total_cost.scalar(),
            ]),
            Objective::MinimizeDroppedVolume => LinearExpr::sum(
                iproduct!(
                    0..sets.node_names.len(),
                    0..sets.products.len(),
                    0..sets.periods.len()
                )
                .map(|(ni, pi, ti)| vars.dropped_demand.at(&[ni, pi, ti])),
            ),
            Objective::MinimizeCarriedOverVolume => {
                let mut carried = LinearExpr::sum(
                    iproduct!(
                        0..sets.receiving_nodes.len(),
                        0..sets.products.len(),
                        0..sets.periods.len()
                    )
                    .map(|(di, pi, ti)| vars.ib_carried_over_demand.at(&[di, pi, ti])),
                );
                for (oi, pi, ti) in iproduct!(
                    0..sets.departing_nodes.len(),
                    0..sets.products.len(),
                    0..sets.periods.len()
                ) {
                    carried.add_term(vars.ob_carried_over_demand.at(&[oi, pi, ti]), 1.0);
                }
                carried
            }
            Objective::MinimizePlanOverPlanChange => {
                LinearExpr::variable(vars.total_volume_moved.scalar())
            }
            Objective::MinimizeMaximumUtilization => {
                LinearExpr::variable(vars.max_capacity_utilization.scalar())
            }
            Objective::MinimizeMaximumTransitDistance => {
                LinearExpr::variable(vars.max_transit_distance.scalar())
            }
            Objective::MinimizeMaximumAge => LinearExpr::variable(vars.max_age.scalar()),
            Objective::MaximizeCapacity => {
                LinearExpr::variable(vars.total_arrived_and_completed_product.scalar())
            }
        }
    }

    /// The expression handed to the (always-minimising) solver.
    pub fn solver_expression(self, vars: &Variables, sets: &NetworkSets) -> LinearExpr {
        let measure = self.measure(vars, sets);
        if self.is_maximisation() {
            let mut negated = LinearExpr::new();
            negated.add_scaled(&measure, -1.0);
            negated
        } else {
            measure
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_objective_labels_round_trip() {
        for objective in [
            Objective::MinimizeCost,
            Objective::MinimizeDroppedVolume,
            Objective::MinimizeCarriedOverVolume,
            Objective::MinimizePlanOverPlanChange,
            Objective::MinimizeMaximumUtilization,
            Objective::MinimizeMaximumTransitDistance,
            Objective::MinimizeMaximumAge,
            Objective::MaximizeCapacity,
        ] {
            assert_eq!(Objective::from_str(&objective.to_string()).unwrap(), objective);
        }

        // Labels match case-insensitively
        assert_eq!(
            Objective::from_str("minimize cost").unwrap(),
            Objective::MinimizeCost
        );
        assert!(Objective::from_str("Minimize Everything").is_err());
    }

    #[test]
    fn test_only_capacity_maximises() {
        assert!(Objective::MaximizeCapacity.is_maximisation());
        assert!(!Objective::MinimizeCost.is_maximisation());
    }
}
