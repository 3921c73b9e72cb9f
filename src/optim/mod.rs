//! Gradient transformations over parameter trees
//!
//! An optimizer is a pure transformation: given gradients, its current
//! state and the parameters, it returns additive updates and the next
//! state. State is an explicit value that can be inspected, serialized and
//! restored; nothing is hidden inside the transformation itself.

mod adam;
mod sgd;

pub use adam::Adam;
pub use sgd::Sgd;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::tree::{self, ParamTree};

/// Explicit optimizer state: a step counter plus named slot trees (momentum
/// traces, moment estimates) shaped like the parameters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizerState {
    pub step: u64,
    pub slots: IndexMap<String, ParamTree>,
}

/// A stateless rule turning gradients into additive parameter updates.
pub trait GradientTransformation {
    /// Initial state for the given parameters.
    fn init(&self, params: &ParamTree) -> OptimizerState;

    /// Compute updates and the successor state. Updates are deltas; the
    /// caller applies them with [`apply_updates`].
    fn update(
        &self,
        grads: &ParamTree,
        state: OptimizerState,
        params: &ParamTree,
    ) -> Result<(ParamTree, OptimizerState)>;
}

/// Add updates to parameters leafwise.
pub fn apply_updates(params: &ParamTree, updates: &ParamTree) -> Result<ParamTree> {
    tree::multimap(params, updates, |p, u| p + u)
}
