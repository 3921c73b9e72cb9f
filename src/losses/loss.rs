//! Loss trait, reductions and the shared weighted-reduction builder

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use ndarray::{ArrayD, Axis};

use crate::autograd::{BackwardOp, Tensor};
use crate::context::StepContext;
use crate::error::{Error, Result};
use crate::spec::{LeafOutput, Spec, SpecLeaf};

/// Numeric floor applied before logarithms, matching Keras conventions.
pub const EPSILON: f32 = 1e-7;

/// How per-sample loss values collapse into the logged value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Reduction {
    /// Sum of weighted values divided by the number of samples (default).
    #[default]
    SumOverBatchSize,
    /// Sum of weighted values.
    Sum,
    /// No reduction; the per-sample vector is logged as-is.
    None,
}

/// A differentiable loss evaluated against the step context.
pub trait LossFn {
    /// Loss name; becomes the leaf's path segment after normalization.
    fn name(&self) -> &str;

    /// Compute the loss tensor(s) for this step.
    fn call(&self, ctx: &StepContext<'_>) -> Result<LeafOutput<Tensor>>;
}

/// A nested tree of losses.
pub type LossSpec = Spec<Arc<dyn LossFn>>;

/// Wrap a loss into a single-leaf spec.
pub fn loss(l: impl LossFn + 'static) -> LossSpec {
    Spec::Leaf(Arc::new(l))
}

impl SpecLeaf for Arc<dyn LossFn> {
    type Value = Tensor;

    fn leaf_name(&self) -> String {
        self.name().to_string()
    }

    fn evaluate(&self, ctx: &StepContext<'_>) -> Result<LeafOutput<Tensor>> {
        self.call(ctx)
    }
}

/// Closure-backed loss with an explicit name.
pub struct NamedLoss<F> {
    name: String,
    f: F,
}

impl<F> NamedLoss<F>
where
    F: Fn(&StepContext<'_>) -> Result<LeafOutput<Tensor>>,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        NamedLoss {
            name: name.into(),
            f,
        }
    }
}

impl<F> LossFn for NamedLoss<F>
where
    F: Fn(&StepContext<'_>) -> Result<LeafOutput<Tensor>>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, ctx: &StepContext<'_>) -> Result<LeafOutput<Tensor>> {
        (self.f)(ctx)
    }
}

/// Last axis of the predictions and its length as a float.
pub(crate) fn last_axis(p: &ArrayD<f32>) -> Result<(Axis, f32)> {
    if p.ndim() == 0 {
        return Err(Error::shape_mismatch("predictions of ndim >= 1", "ndim 0"));
    }
    let axis = Axis(p.ndim() - 1);
    Ok((axis, p.shape()[p.ndim() - 1] as f32))
}

/// Build the loss tensor from per-sample values and the elementwise
/// jacobian `∂value_i/∂pred`, applying sample weights, the loss weight and
/// the reduction, and wiring the backward pass into the predictions.
pub(crate) fn weighted_reduce(
    per_sample: ArrayD<f32>,
    jacobian: ArrayD<f32>,
    pred: &Tensor,
    sample_weight: Option<&ArrayD<f32>>,
    reduction: Reduction,
    weight: f32,
) -> Result<Tensor> {
    let mut values = per_sample;
    let mut jacobian = jacobian;

    if let Some(w) = sample_weight {
        if w.shape() != values.shape() {
            return Err(Error::shape_mismatch(
                format!("sample_weight of shape {:?}", values.shape()),
                format!("{:?}", w.shape()),
            ));
        }
        values = &values * w;
        let w_expanded = w.clone().insert_axis(Axis(w.ndim()));
        jacobian = &jacobian * &w_expanded;
    }

    if weight != 1.0 {
        values *= weight;
        jacobian *= weight;
    }

    let (data, jacobian, reduced) = match reduction {
        Reduction::SumOverBatchSize => {
            let n = values.len() as f32;
            (
                ArrayD::from_elem(vec![1], values.sum() / n),
                jacobian / n,
                true,
            )
        }
        Reduction::Sum => (ArrayD::from_elem(vec![1], values.sum()), jacobian, true),
        Reduction::None => (values, jacobian, false),
    };

    let mut result = Tensor::new(data, pred.requires_grad());
    if pred.requires_grad() {
        let backward_op = Rc::new(LossBackward {
            pred: pred.clone(),
            jacobian,
            result_grad: result.grad_cell(),
            reduced,
        });
        result.set_backward_op(backward_op);
    }

    Ok(result)
}

struct LossBackward {
    pred: Tensor,
    jacobian: ArrayD<f32>,
    result_grad: Rc<RefCell<Option<ArrayD<f32>>>>,
    reduced: bool,
}

impl BackwardOp for LossBackward {
    fn backward(&self) {
        let grad = match self.result_grad.borrow().as_ref() {
            Some(g) => g.clone(),
            None => return,
        };

        let pred_grad = if self.reduced {
            &self.jacobian * grad.sum()
        } else {
            // Per-sample output: expand the upstream gradient over the
            // reduced last axis before scaling the jacobian.
            let expanded = grad.insert_axis(Axis(self.jacobian.ndim() - 1));
            &self.jacobian * &expanded
        };

        self.pred.accumulate_grad(pred_grad);
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.pred.clone()]
    }
}
