//! Trainable modules
//!
//! A module owns its parameter tensors. Cloned parameter handles share one
//! gradient cell, so gradients written by the backward pass are visible
//! through [`Module::gradients`] without any extra plumbing.

mod linear;

pub use linear::Linear;

use indexmap::IndexMap;

use crate::autograd::Tensor;
use crate::context::Inputs;
use crate::error::Result;
use crate::tree::ParamTree;

/// A differentiable function with named parameters.
pub trait Module {
    /// Run the forward pass. `training` selects train-time behavior for
    /// modules that have any (dropout, statistics updates); most ignore it.
    fn call(&self, x: &Inputs, training: bool) -> Result<Tensor>;

    /// Parameter handles by name. `trainable` selects the parameters the
    /// optimizer should touch; `false` yields non-trainable state.
    fn parameters(&self, trainable: bool) -> IndexMap<String, Tensor>;

    /// Replace parameter values. Keys and shapes must match the module's
    /// trainable parameters.
    fn set_parameters(&mut self, values: &ParamTree) -> Result<()>;

    /// Snapshot of the trainable parameter values.
    fn get_parameters(&self) -> ParamTree {
        self.parameters(true)
            .iter()
            .map(|(k, t)| (k.clone(), t.data().clone()))
            .collect()
    }

    /// Snapshot of the non-trainable state values.
    fn get_states(&self) -> ParamTree {
        self.parameters(false)
            .iter()
            .map(|(k, t)| (k.clone(), t.data().clone()))
            .collect()
    }

    /// Gradients of the trainable parameters, zeros where none were
    /// computed.
    fn gradients(&self) -> ParamTree {
        self.parameters(true)
            .iter()
            .map(|(k, t)| {
                let g = t
                    .grad()
                    .unwrap_or_else(|| ndarray::ArrayD::zeros(t.data().raw_dim()));
                (k.clone(), g)
            })
            .collect()
    }

    /// Clear accumulated gradients before a new backward pass.
    fn zero_grad(&self) {
        for tensor in self.parameters(true).values() {
            tensor.zero_grad();
        }
    }

    /// Auxiliary losses declared by the module itself (regularizers and the
    /// like), keyed by a name ending in `loss`. `None` when there are none.
    fn get_losses(&self) -> Option<IndexMap<String, Tensor>> {
        None
    }
}
