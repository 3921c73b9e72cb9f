//! Mean absolute error

use super::loss::{last_axis, weighted_reduce, Reduction};
use super::LossFn;
use crate::autograd::Tensor;
use crate::context::StepContext;
use crate::error::{Error, Result};
use crate::spec::LeafOutput;

/// `loss = mean(abs(y_pred - y_true), axis=-1)`
#[derive(Clone, Debug)]
pub struct MeanAbsoluteError {
    reduction: Reduction,
    weight: f32,
}

impl Default for MeanAbsoluteError {
    fn default() -> Self {
        Self::new()
    }
}

impl MeanAbsoluteError {
    pub fn new() -> Self {
        Self {
            reduction: Reduction::default(),
            weight: 1.0,
        }
    }

    pub fn with_reduction(mut self, reduction: Reduction) -> Self {
        self.reduction = reduction;
        self
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }
}

impl LossFn for MeanAbsoluteError {
    fn name(&self) -> &str {
        "mean_absolute_error"
    }

    fn call(&self, ctx: &StepContext<'_>) -> Result<LeafOutput<Tensor>> {
        let y_true = ctx.y_true()?;
        let pred = ctx.y_pred();
        let p = pred.data();
        if y_true.shape() != p.shape() {
            return Err(Error::shape_mismatch(
                format!("y_true of shape {:?}", p.shape()),
                format!("{:?}", y_true.shape()),
            ));
        }

        let diff = p - y_true;
        let (axis, f) = last_axis(p)?;
        let per_sample = diff
            .mapv(f32::abs)
            .mean_axis(axis)
            .ok_or_else(|| Error::shape_mismatch("non-empty last axis", "length 0"))?;
        // Subgradient: zero exactly at the kink.
        let jacobian = diff.mapv(|d| {
            if d > 0.0 {
                1.0 / f
            } else if d < 0.0 {
                -1.0 / f
            } else {
                0.0
            }
        });

        weighted_reduce(
            per_sample,
            jacobian,
            pred,
            ctx.sample_weight,
            self.reduction,
            self.weight,
        )
        .map(LeafOutput::Single)
    }
}
