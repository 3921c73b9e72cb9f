//! Stochastic gradient descent with momentum

use indexmap::IndexMap;

use super::{GradientTransformation, OptimizerState};
use crate::error::{Error, Result};
use crate::tree::{self, ParamTree};

/// Gradient descent with an optional momentum trace.
///
/// With `momentum = 0` the trace equals the raw gradient and this reduces
/// to plain SGD.
#[derive(Clone, Debug)]
pub struct Sgd {
    lr: f32,
    momentum: f32,
}

impl Sgd {
    pub fn new(lr: f32) -> Self {
        Sgd { lr, momentum: 0.0 }
    }

    pub fn with_momentum(mut self, momentum: f32) -> Self {
        self.momentum = momentum;
        self
    }
}

impl GradientTransformation for Sgd {
    fn init(&self, params: &ParamTree) -> OptimizerState {
        OptimizerState {
            step: 0,
            slots: IndexMap::from([("trace".to_string(), tree::zeros_like(params))]),
        }
    }

    fn update(
        &self,
        grads: &ParamTree,
        state: OptimizerState,
        _params: &ParamTree,
    ) -> Result<(ParamTree, OptimizerState)> {
        let trace = state
            .slots
            .get("trace")
            .ok_or_else(|| Error::Config("sgd state is missing its trace slot".to_string()))?;

        let mu = self.momentum;
        let next_trace = tree::multimap(trace, grads, |t, g| t * mu + g)?;
        let updates = tree::map(&next_trace, |t| t * -self.lr);

        Ok((
            updates,
            OptimizerState {
                step: state.step + 1,
                slots: IndexMap::from([("trace".to_string(), next_trace)]),
            },
        ))
    }
}
