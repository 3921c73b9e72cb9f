//! Adam gradient transformation

use indexmap::IndexMap;

use super::{GradientTransformation, OptimizerState};
use crate::error::{Error, Result};
use crate::tree::{self, ParamTree};

/// Adam with bias-corrected moment estimates.
#[derive(Clone, Debug)]
pub struct Adam {
    lr: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
}

impl Adam {
    /// Adam with the conventional defaults for the moment decays.
    pub fn new(lr: f32) -> Self {
        Adam {
            lr,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }

    pub fn with_betas(mut self, beta1: f32, beta2: f32) -> Self {
        self.beta1 = beta1;
        self.beta2 = beta2;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon;
        self
    }
}

impl GradientTransformation for Adam {
    fn init(&self, params: &ParamTree) -> OptimizerState {
        OptimizerState {
            step: 0,
            slots: IndexMap::from([
                ("m".to_string(), tree::zeros_like(params)),
                ("v".to_string(), tree::zeros_like(params)),
            ]),
        }
    }

    fn update(
        &self,
        grads: &ParamTree,
        state: OptimizerState,
        _params: &ParamTree,
    ) -> Result<(ParamTree, OptimizerState)> {
        let m = state
            .slots
            .get("m")
            .ok_or_else(|| Error::Config("adam state is missing its m slot".to_string()))?;
        let v = state
            .slots
            .get("v")
            .ok_or_else(|| Error::Config("adam state is missing its v slot".to_string()))?;

        let (b1, b2) = (self.beta1, self.beta2);
        let next_m = tree::multimap(m, grads, |m, g| m * b1 + &(g * (1.0 - b1)))?;
        let next_v = tree::multimap(v, grads, |v, g| v * b2 + &(g.mapv(|x| x * x) * (1.0 - b2)))?;

        // Fold both bias corrections into the step size.
        let t = (state.step + 1) as i32;
        let lr_t = self.lr * (1.0 - b2.powi(t)).sqrt() / (1.0 - b1.powi(t));
        let eps = self.epsilon;
        let updates = tree::multimap(&next_m, &next_v, |m, v| {
            let denom = v.mapv(|x| x.sqrt() + eps);
            -lr_t * &(m / &denom)
        })?;

        Ok((
            updates,
            OptimizerState {
                step: state.step + 1,
                slots: IndexMap::from([("m".to_string(), next_m), ("v".to_string(), next_v)]),
            },
        ))
    }
}
