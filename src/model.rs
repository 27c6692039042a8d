//! The model compiler: variables plus every constraint family over one scenario's sets and
//! parameters.
use crate::milp::Model;
use crate::network::NetworkSets;
use crate::params::Parameters;
use log::info;

pub mod constraints;
pub mod objective;
pub mod variables;

use variables::Variables;

/// Compile the full planning model for one scenario.
///
/// Instantiates every variable family over the derived sets, then adds every constraint
/// family. The result is the base model the lexicographic driver clones per priority level.
pub fn compile(sets: &NetworkSets, params: &Parameters) -> (Model, Variables) {
    let mut model = Model::new();
    let vars = Variables::create(&mut model, sets);
    info!("Created {} variables", model.num_variables());

    constraints::add_all(&mut model, &vars, sets, params);
    info!("Added {} constraints", model.num_constraints());

    (model, vars)
}
