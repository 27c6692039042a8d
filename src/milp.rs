//! The abstract mixed-integer linear program.
//!
//! The compiler builds one [`Model`] per scenario: a list of column definitions, an ordered
//! map of *named* linear constraints and an active objective. Names matter — the
//! lexicographic driver deletes the demand equalities by name before a capacity-maximising
//! solve and appends relaxation constraints between priority levels. The model stays solver
//! agnostic; lowering to HiGHS lives in [`crate::solver`].
use indexmap::IndexMap;
use std::collections::HashSet;

/// A decision variable in the optimisation.
///
/// Note that this type does **not** include the value of the variable; it refers to a
/// particular column of the problem.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct VarId(usize);

impl VarId {
    /// The column position of this variable.
    pub fn index(self) -> usize {
        self.0
    }

    /// Refer to a column by position. Only the variable registry mints ids.
    pub(crate) fn from_index(index: usize) -> VarId {
        VarId(index)
    }
}

/// The definition of a variable to be optimised: its bounds and integrality.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VariableDefinition {
    /// The variable's minimum value
    pub min: f64,
    /// The variable's maximum value
    pub max: f64,
    /// Whether the variable must take an integer value
    pub integer: bool,
}

/// A non-negative continuous variable.
pub const CONTINUOUS: VariableDefinition = VariableDefinition {
    min: 0.0,
    max: f64::INFINITY,
    integer: false,
};

/// A non-negative integer variable.
pub const INTEGER: VariableDefinition = VariableDefinition {
    min: 0.0,
    max: f64::INFINITY,
    integer: true,
};

/// A 0/1 variable.
pub const BINARY: VariableDefinition = VariableDefinition {
    min: 0.0,
    max: 1.0,
    integer: true,
};

/// A linear expression over model variables plus a constant offset.
#[derive(Clone, Debug, Default)]
pub struct LinearExpr {
    terms: Vec<(VarId, f64)>,
    constant: f64,
}

impl LinearExpr {
    /// The empty expression.
    pub fn new() -> LinearExpr {
        LinearExpr::default()
    }

    /// An expression holding a single variable.
    pub fn variable(var: VarId) -> LinearExpr {
        LinearExpr::new().plus(var, 1.0)
    }

    /// A constant expression.
    pub fn constant(value: f64) -> LinearExpr {
        LinearExpr {
            terms: Vec::new(),
            constant: value,
        }
    }

    /// The sum of the given variables with coefficient one.
    pub fn sum<I: IntoIterator<Item = VarId>>(vars: I) -> LinearExpr {
        let mut expr = LinearExpr::new();
        for var in vars {
            expr.add_term(var, 1.0);
        }
        expr
    }

    /// The weighted sum of the given `(variable, coefficient)` pairs.
    pub fn weighted_sum<I: IntoIterator<Item = (VarId, f64)>>(terms: I) -> LinearExpr {
        let mut expr = LinearExpr::new();
        for (var, coeff) in terms {
            expr.add_term(var, coeff);
        }
        expr
    }

    /// Add `coeff * var` to the expression.
    pub fn add_term(&mut self, var: VarId, coeff: f64) {
        self.terms.push((var, coeff));
    }

    /// Add a constant to the expression.
    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    /// Append all of `other`, scaled by `factor`.
    pub fn add_scaled(&mut self, other: &LinearExpr, factor: f64) {
        for &(var, coeff) in &other.terms {
            self.terms.push((var, coeff * factor));
        }
        self.constant += other.constant * factor;
    }

    /// Builder-style [`LinearExpr::add_term`].
    pub fn plus(mut self, var: VarId, coeff: f64) -> LinearExpr {
        self.add_term(var, coeff);
        self
    }

    /// The constant offset.
    pub fn offset(&self) -> f64 {
        self.constant
    }

    /// The per-column coefficient vector of this expression, over `num_columns` columns.
    pub fn column_coefficients(&self, num_columns: usize) -> Vec<f64> {
        let mut coefficients = vec![0.0; num_columns];
        for &(var, coeff) in &self.terms {
            coefficients[var.index()] += coeff;
        }
        coefficients
    }

    /// The expression's value under a column valuation.
    pub fn value(&self, columns: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(var, coeff)| coeff * columns[var.index()])
            .sum::<f64>()
            + self.constant
    }

    /// The terms, with repeated variables combined and zero coefficients removed.
    fn combined_terms(&self) -> Vec<(VarId, f64)> {
        let mut terms = self.terms.clone();
        terms.sort_unstable_by_key(|&(var, _)| var.index());
        let mut combined: Vec<(VarId, f64)> = Vec::with_capacity(terms.len());
        for (var, coeff) in terms {
            match combined.last_mut() {
                Some(last) if last.0 == var => last.1 += coeff,
                _ => combined.push((var, coeff)),
            }
        }
        combined.retain(|&(_, coeff)| coeff != 0.0);
        combined
    }
}

/// A named linear constraint: `lower <= a1*x1 + a2*x2 + ... <= upper`.
#[derive(Clone, Debug, PartialEq)]
pub struct Constraint {
    /// The row's lower bound (may be `-inf`)
    pub lower: f64,
    /// The row's upper bound (may be `inf`)
    pub upper: f64,
    /// Per-variable coefficients, sorted by column with no repeats
    pub terms: Vec<(VarId, f64)>,
}

/// An abstract MILP with named constraints.
///
/// The objective sense is always minimisation; maximising objectives are expressed by
/// negating their expression.
#[derive(Clone, Debug, Default)]
pub struct Model {
    columns: Vec<VariableDefinition>,
    constraints: IndexMap<String, Constraint>,
    objective: LinearExpr,
}

impl Model {
    /// An empty model.
    pub fn new() -> Model {
        Model::default()
    }

    /// Add a variable and return its column id.
    pub fn add_variable(&mut self, definition: VariableDefinition) -> VarId {
        let id = VarId(self.columns.len());
        self.columns.push(definition);
        id
    }

    /// The column definitions, in column order.
    pub fn columns(&self) -> &[VariableDefinition] {
        &self.columns
    }

    /// Number of variables.
    pub fn num_variables(&self) -> usize {
        self.columns.len()
    }

    /// Number of constraints.
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Iterate over `(name, constraint)` pairs in insertion order.
    pub fn iter_constraints(&self) -> impl Iterator<Item = (&str, &Constraint)> {
        self.constraints.iter().map(|(name, c)| (name.as_str(), c))
    }

    /// Look up a constraint by name.
    pub fn constraint(&self, name: &str) -> Option<&Constraint> {
        self.constraints.get(name)
    }

    /// Add the constraint `lhs == rhs` under `name`.
    pub fn add_eq(&mut self, name: String, lhs: LinearExpr, rhs: LinearExpr) {
        self.add_normalised(name, lhs, rhs, true, true);
    }

    /// Add the constraint `lhs <= rhs` under `name`.
    pub fn add_le(&mut self, name: String, lhs: LinearExpr, rhs: LinearExpr) {
        self.add_normalised(name, lhs, rhs, false, true);
    }

    /// Add the constraint `lhs >= rhs` under `name`.
    pub fn add_ge(&mut self, name: String, lhs: LinearExpr, rhs: LinearExpr) {
        self.add_normalised(name, lhs, rhs, true, false);
    }

    /// Normalise `lhs (op) rhs` into a row with constant-free terms and insert it.
    fn add_normalised(
        &mut self,
        name: String,
        lhs: LinearExpr,
        rhs: LinearExpr,
        bound_below: bool,
        bound_above: bool,
    ) {
        let mut expr = lhs;
        expr.add_scaled(&rhs, -1.0);
        let rhs_value = -expr.constant;
        let constraint = Constraint {
            lower: if bound_below { rhs_value } else { f64::NEG_INFINITY },
            upper: if bound_above { rhs_value } else { f64::INFINITY },
            terms: expr.combined_terms(),
        };

        let existing = self.constraints.insert(name.clone(), constraint);
        assert!(existing.is_none(), "Duplicate constraint name {name}");
    }

    /// Remove every constraint whose name is in `names`. Returns how many were removed.
    pub fn remove_constraints<I: IntoIterator<Item = String>>(&mut self, names: I) -> usize {
        let names: HashSet<String> = names.into_iter().collect();
        let before = self.constraints.len();
        self.constraints.retain(|name, _| !names.contains(name));
        before - self.constraints.len()
    }

    /// Replace the active objective (always minimised).
    pub fn set_objective(&mut self, objective: LinearExpr) {
        self.objective = objective;
    }

    /// The active objective.
    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_expression_value() {
        let mut model = Model::new();
        let x = model.add_variable(CONTINUOUS);
        let y = model.add_variable(CONTINUOUS);

        let expr = LinearExpr::new().plus(x, 2.0).plus(y, -1.0);
        assert_approx_eq!(f64, expr.value(&[3.0, 4.0]), 2.0);
    }

    #[test]
    fn test_add_eq_normalises_terms() {
        let mut model = Model::new();
        let x = model.add_variable(CONTINUOUS);
        let y = model.add_variable(CONTINUOUS);

        // x + x + 1 == y + 3  ->  2x - y == 2
        let lhs = LinearExpr::new().plus(x, 1.0).plus(x, 1.0);
        let mut lhs = lhs;
        lhs.add_constant(1.0);
        let mut rhs = LinearExpr::variable(y);
        rhs.add_constant(3.0);
        model.add_eq("eq".to_string(), lhs, rhs);

        let constraint = model.constraint("eq").unwrap();
        assert_eq!(constraint.terms, vec![(x, 2.0), (y, -1.0)]);
        assert_approx_eq!(f64, constraint.lower, 2.0);
        assert_approx_eq!(f64, constraint.upper, 2.0);
    }

    #[test]
    fn test_add_le_and_ge_bounds() {
        let mut model = Model::new();
        let x = model.add_variable(CONTINUOUS);

        model.add_le(
            "le".to_string(),
            LinearExpr::variable(x),
            LinearExpr::constant(5.0),
        );
        model.add_ge(
            "ge".to_string(),
            LinearExpr::variable(x),
            LinearExpr::constant(1.0),
        );

        let le = model.constraint("le").unwrap();
        assert!(le.lower.is_infinite() && le.lower < 0.0);
        assert_approx_eq!(f64, le.upper, 5.0);

        let ge = model.constraint("ge").unwrap();
        assert_approx_eq!(f64, ge.lower, 1.0);
        assert!(ge.upper.is_infinite());
    }

    #[test]
    #[should_panic(expected = "Duplicate constraint name")]
    fn test_duplicate_constraint_name_panics() {
        let mut model = Model::new();
        let x = model.add_variable(CONTINUOUS);
        for _ in 0..2 {
            model.add_le(
                "dup".to_string(),
                LinearExpr::variable(x),
                LinearExpr::constant(1.0),
            );
        }
    }

    #[test]
    fn test_remove_constraints() {
        let mut model = Model::new();
        let x = model.add_variable(CONTINUOUS);
        for name in ["a", "b", "c"] {
            model.add_le(
                name.to_string(),
                LinearExpr::variable(x),
                LinearExpr::constant(1.0),
            );
        }

        let removed =
            model.remove_constraints(["a".to_string(), "c".to_string(), "zzz".to_string()]);
        assert_eq!(removed, 2);
        assert!(model.constraint("b").is_some());
        assert!(model.constraint("a").is_none());
    }
}
