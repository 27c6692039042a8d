//! The solver adapter: lowers the abstract model to HiGHS and classifies the outcome.
//!
//! The HiGHS handle lives only within [`solve`]; it is created per call and dropped on every
//! exit path.
use crate::milp::Model;
use crate::settings::SolverSettings;
use anyhow::{Result, anyhow};
use highs::{HighsModelStatus, RowProblem as Problem, Sense};
use log::{debug, warn};

/// The column values and objective value of one solve.
#[derive(Clone, Debug)]
pub struct Valuation {
    /// Value per column, in column order
    pub columns: Vec<f64>,
    /// The active objective's value
    pub objective: f64,
}

/// What the solver reported for one model.
#[derive(Debug)]
pub enum SolveOutcome {
    /// Solved to (gap-limited) optimality
    Optimal(Valuation),
    /// The time limit was hit but an incumbent was available
    IncumbentAtTimeLimit(Valuation),
    /// The time limit was hit with no usable incumbent
    TimeLimit,
    /// The model has no feasible solution
    Infeasible,
    /// The objective is unbounded
    Unbounded,
}

/// Solve the model with HiGHS under the configured time limit and relative MIP gap.
pub fn solve(model: &Model, settings: &SolverSettings) -> Result<SolveOutcome> {
    let mut problem = Problem::default();

    // Columns carry the objective coefficients
    let objective = model.objective().column_coefficients(model.num_variables());
    let mut columns = Vec::with_capacity(model.num_variables());
    for (definition, coeff) in model.columns().iter().zip(&objective) {
        let bounds = definition.min..=definition.max;
        let column = if definition.integer {
            problem.add_integer_column(*coeff, bounds)
        } else {
            problem.add_column(*coeff, bounds)
        };
        columns.push(column);
    }

    for (_, constraint) in model.iter_constraints() {
        problem.add_row(
            constraint.lower..=constraint.upper,
            constraint
                .terms
                .iter()
                .map(|&(var, coeff)| (columns[var.index()], coeff)),
        );
    }

    debug!(
        "Solving: {} columns, {} rows, time limit {}s, gap {}",
        model.num_variables(),
        model.num_constraints(),
        settings.max_run_time,
        settings.gap_limit
    );

    let mut solver_model = problem.optimise(Sense::Minimise);
    solver_model.set_option("output_flag", false);
    solver_model.set_option("time_limit", settings.max_run_time);
    solver_model.set_option("mip_rel_gap", settings.gap_limit);

    let solved = solver_model.solve();
    match solved.status() {
        HighsModelStatus::Optimal => {
            let columns = solved.get_solution().columns().to_vec();
            let objective = model.objective().value(&columns);
            Ok(SolveOutcome::Optimal(Valuation { columns, objective }))
        }
        HighsModelStatus::Infeasible => Ok(SolveOutcome::Infeasible),
        HighsModelStatus::Unbounded | HighsModelStatus::UnboundedOrInfeasible => {
            Ok(SolveOutcome::Unbounded)
        }
        HighsModelStatus::ReachedTimeLimit => {
            // The incumbent, if HiGHS found one, comes back as the solution vector
            let columns = solved.get_solution().columns().to_vec();
            if columns.len() == model.num_variables()
                && columns.iter().all(|v| v.is_finite())
            {
                warn!("Solver hit the time limit; using the best incumbent");
                let objective = model.objective().value(&columns);
                Ok(SolveOutcome::IncumbentAtTimeLimit(Valuation { columns, objective }))
            } else {
                Ok(SolveOutcome::TimeLimit)
            }
        }
        status => Err(anyhow!("Unexpected solver status: {status:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::milp::{CONTINUOUS, INTEGER, LinearExpr};
    use float_cmp::assert_approx_eq;

    fn settings() -> SolverSettings {
        SolverSettings {
            max_run_time: 10.0,
            gap_limit: 0.0,
        }
    }

    #[test]
    fn test_solve_small_lp() {
        // min x + 2y  s.t.  x + y >= 3, y >= 1
        let mut model = Model::new();
        let x = model.add_variable(CONTINUOUS);
        let y = model.add_variable(CONTINUOUS);
        model.add_ge(
            "cover".to_string(),
            LinearExpr::sum([x, y]),
            LinearExpr::constant(3.0),
        );
        model.add_ge(
            "floor".to_string(),
            LinearExpr::variable(y),
            LinearExpr::constant(1.0),
        );
        model.set_objective(LinearExpr::new().plus(x, 1.0).plus(y, 2.0));

        let SolveOutcome::Optimal(valuation) = solve(&model, &settings()).unwrap() else {
            panic!("expected optimal");
        };
        assert_approx_eq!(f64, valuation.columns[x.index()], 2.0);
        assert_approx_eq!(f64, valuation.columns[y.index()], 1.0);
        assert_approx_eq!(f64, valuation.objective, 4.0);
    }

    #[test]
    fn test_solve_integer_rounding() {
        // min x  s.t.  2x >= 3, x integer  ->  x = 2
        let mut model = Model::new();
        let x = model.add_variable(INTEGER);
        model.add_ge(
            "half".to_string(),
            LinearExpr::new().plus(x, 2.0),
            LinearExpr::constant(3.0),
        );
        model.set_objective(LinearExpr::variable(x));

        let SolveOutcome::Optimal(valuation) = solve(&model, &settings()).unwrap() else {
            panic!("expected optimal");
        };
        assert_approx_eq!(f64, valuation.columns[x.index()], 2.0);
    }

    #[test]
    fn test_solve_infeasible() {
        let mut model = Model::new();
        let x = model.add_variable(CONTINUOUS);
        model.add_le(
            "ceiling".to_string(),
            LinearExpr::variable(x),
            LinearExpr::constant(1.0),
        );
        model.add_ge(
            "floor".to_string(),
            LinearExpr::variable(x),
            LinearExpr::constant(2.0),
        );
        model.set_objective(LinearExpr::variable(x));

        assert!(matches!(
            solve(&model, &settings()).unwrap(),
            SolveOutcome::Infeasible
        ));
    }
}
