//! Mean squared logarithmic error

use ndarray::ArrayD;

use super::loss::{last_axis, weighted_reduce, Reduction, EPSILON};
use super::LossFn;
use crate::autograd::Tensor;
use crate::context::StepContext;
use crate::error::{Error, Result};
use crate::spec::LeafOutput;

/// Computes the mean squared logarithmic error between labels and
/// predictions:
///
/// `loss = mean(square(log(y_true + 1) - log(y_pred + 1)), axis=-1)`
///
/// Inputs are floored at [`EPSILON`] before the logarithm. With the default
/// `SumOverBatchSize` reduction:
///
/// ```
/// use modelar::losses::MeanSquaredLogarithmicError;
/// use modelar::{Inputs, StepContext, Tensor};
/// use modelar::losses::LossFn;
/// use modelar::spec::LeafOutput;
/// use modelar::tree::ParamTree;
/// use ndarray::arr2;
///
/// let y_true = arr2(&[[0.0, 1.0], [0.0, 0.0]]).into_dyn();
/// let y_pred = Tensor::new(arr2(&[[1.0, 1.0], [1.0, 0.0]]).into_dyn(), false);
/// let x = Inputs::Single(y_true.clone());
/// let empty = ParamTree::new();
/// let ctx = StepContext {
///     x: &x,
///     y_true: Some(&y_true),
///     y_pred: &y_pred,
///     sample_weight: None,
///     class_weight: None,
///     training: false,
///     parameters: &empty,
///     states: &empty,
/// };
///
/// let msle = MeanSquaredLogarithmicError::new();
/// let LeafOutput::Single(value) = msle.call(&ctx).unwrap() else { unreachable!() };
/// assert!((value.scalar_value() - 0.24022643).abs() < 1e-6);
/// ```
#[derive(Clone, Debug)]
pub struct MeanSquaredLogarithmicError {
    reduction: Reduction,
    weight: f32,
}

impl Default for MeanSquaredLogarithmicError {
    fn default() -> Self {
        Self::new()
    }
}

impl MeanSquaredLogarithmicError {
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

    /// Weight of this loss's contribution to the total.
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }
}

impl LossFn for MeanSquaredLogarithmicError {
    fn name(&self) -> &str {
        "mean_squared_logarithmic_error"
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

        let log_true = y_true.mapv(|v| (v.max(EPSILON) + 1.0).ln());
        let log_pred = p.mapv(|v| (v.max(EPSILON) + 1.0).ln());
        let diff = &log_pred - &log_true;

        let (axis, f) = last_axis(p)?;
        let per_sample = diff
            .mapv(|d| d * d)
            .mean_axis(axis)
            .ok_or_else(|| Error::shape_mismatch("non-empty last axis", "length 0"))?;

        // ∂/∂p of mean((log(p') - log(t'))²) over the last axis; the floor
        // at EPSILON has zero gradient below the threshold.
        let floor_grad: ArrayD<f32> = p.mapv(|v| if v > EPSILON { 1.0 / (1.0 + v) } else { 0.0 });
        let jacobian = &(&diff * &floor_grad) * (2.0 / f);

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Inputs;
    use crate::tree::ParamTree;
    use approx::assert_relative_eq;
    use ndarray::{arr1, arr2, ArrayD};

    fn eval(
        loss: &MeanSquaredLogarithmicError,
        y_true: &ArrayD<f32>,
        y_pred: &Tensor,
        sample_weight: Option<&ArrayD<f32>>,
    ) -> Tensor {
        let x = Inputs::Single(y_true.clone());
        let empty = ParamTree::new();
        let ctx = StepContext {
            x: &x,
            y_true: Some(y_true),
            y_pred,
            sample_weight,
            class_weight: None,
            training: false,
            parameters: &empty,
            states: &empty,
        };
        match loss.call(&ctx).unwrap() {
            LeafOutput::Single(t) => t,
            LeafOutput::Named(_) => unreachable!(),
        }
    }

    fn fixtures() -> (ArrayD<f32>, Tensor) {
        let y_true = arr2(&[[0.0, 1.0], [0.0, 0.0]]).into_dyn();
        let y_pred = Tensor::new(arr2(&[[1.0, 1.0], [1.0, 0.0]]).into_dyn(), false);
        (y_true, y_pred)
    }

    #[test]
    fn test_sum_over_batch_size() {
        let (y_true, y_pred) = fixtures();
        let value = eval(&MeanSquaredLogarithmicError::new(), &y_true, &y_pred, None);
        assert_relative_eq!(value.scalar_value(), 0.24022643, epsilon = 1e-6);

        // Default construction carries the unit loss weight.
        let default = eval(
            &MeanSquaredLogarithmicError::default(),
            &y_true,
            &y_pred,
            None,
        );
        assert_relative_eq!(default.scalar_value(), 0.24022643, epsilon = 1e-6);
    }

    #[test]
    fn test_sample_weight() {
        let (y_true, y_pred) = fixtures();
        let w = arr1(&[0.7, 0.3]).into_dyn();
        let value = eval(
            &MeanSquaredLogarithmicError::new(),
            &y_true,
            &y_pred,
            Some(&w),
        );
        assert_relative_eq!(value.scalar_value(), 0.12011322, epsilon = 1e-6);
    }

    #[test]
    fn test_sum_reduction() {
        let (y_true, y_pred) = fixtures();
        let loss = MeanSquaredLogarithmicError::new().with_reduction(Reduction::Sum);
        let value = eval(&loss, &y_true, &y_pred, None);
        assert_relative_eq!(value.scalar_value(), 0.48045287, epsilon = 1e-6);
    }

    #[test]
    fn test_none_reduction() {
        let (y_true, y_pred) = fixtures();
        let loss = MeanSquaredLogarithmicError::new().with_reduction(Reduction::None);
        let value = eval(&loss, &y_true, &y_pred, None);
        assert_eq!(value.data().shape(), &[2]);
        for &v in value.data().iter() {
            assert_relative_eq!(v, 0.24022643, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_loss_weight_scales() {
        let (y_true, y_pred) = fixtures();
        let loss = MeanSquaredLogarithmicError::new().with_weight(2.0);
        let value = eval(&loss, &y_true, &y_pred, None);
        assert_relative_eq!(value.scalar_value(), 2.0 * 0.24022643, epsilon = 1e-6);
    }

    #[test]
    fn test_missing_y_true_is_reported() {
        let y_pred = Tensor::from_vec(vec![1.0], false);
        let x = Inputs::Single(arr1(&[1.0]).into_dyn());
        let empty = ParamTree::new();
        let ctx = StepContext {
            x: &x,
            y_true: None,
            y_pred: &y_pred,
            sample_weight: None,
            class_weight: None,
            training: false,
            parameters: &empty,
            states: &empty,
        };

        let err = MeanSquaredLogarithmicError::new().call(&ctx).unwrap_err();
        assert!(err.to_string().contains("y_true"));
    }
}
