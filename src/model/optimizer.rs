//! Optimizer wrapper owning the transformation state

use crate::error::Result;
use crate::mode::ExecutionMode;
use crate::optim::{apply_updates, GradientTransformation, OptimizerState};
use crate::tree::ParamTree;

/// Pairs a [`GradientTransformation`] with its persisted state.
///
/// State is created lazily on the first step, once the parameter shapes are
/// known. An initializing step runs the full update to exercise the shapes
/// but discards the successor state, so real training starts from step
/// zero.
pub struct Optimizer {
    transform: Box<dyn GradientTransformation>,
    state: Option<OptimizerState>,
}

impl Optimizer {
    pub fn new(transform: impl GradientTransformation + 'static) -> Self {
        Optimizer {
            transform: Box::new(transform),
            state: None,
        }
    }

    /// Persisted state, if a non-initializing step has run.
    pub fn state(&self) -> Option<&OptimizerState> {
        self.state.as_ref()
    }

    /// Transform gradients and return the updated parameters.
    pub fn step(
        &mut self,
        params: &ParamTree,
        grads: &ParamTree,
        mode: ExecutionMode,
    ) -> Result<ParamTree> {
        let state = match self.state.clone() {
            Some(state) => state,
            None => self.transform.init(params),
        };
        let (updates, next_state) = self.transform.update(grads, state, params)?;
        let next_params = apply_updates(params, &updates)?;
        if !mode.is_initializing() {
            self.state = Some(next_state);
        }
        Ok(next_params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::Sgd;
    use approx::assert_relative_eq;
    use ndarray::arr1;

    fn tree(v: f32) -> ParamTree {
        ParamTree::from([("w".to_string(), arr1(&[v]).into_dyn())])
    }

    #[test]
    fn test_state_initializes_on_first_step() {
        let mut opt = Optimizer::new(Sgd::new(0.5));
        assert!(opt.state().is_none());

        let next = opt
            .step(&tree(1.0), &tree(1.0), ExecutionMode::Training)
            .unwrap();
        assert_relative_eq!(next["w"][[0]], 0.5, epsilon = 1e-6);
        assert_eq!(opt.state().map(|s| s.step), Some(1));
    }

    #[test]
    fn test_initializing_step_discards_state() {
        let mut opt = Optimizer::new(Sgd::new(0.5));
        let next = opt
            .step(&tree(1.0), &tree(1.0), ExecutionMode::Initializing)
            .unwrap();

        // Updates still come back so callers can validate shapes.
        assert_relative_eq!(next["w"][[0]], 0.5, epsilon = 1e-6);
        assert!(opt.state().is_none());
    }
}
