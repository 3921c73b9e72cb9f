//! Metric trait and the shared weighted-mean helper

use std::sync::Arc;

use ndarray::{ArrayD, Axis};

use crate::context::StepContext;
use crate::error::{Error, Result};
use crate::logs::LogValue;
use crate::spec::{LeafOutput, Spec, SpecLeaf};

/// A metric evaluated against the step context.
///
/// Metrics produce [`LogValue`]s rather than tensors; nothing flows back
/// through them during training.
pub trait MetricFn {
    /// Metric name; becomes the leaf's path segment after normalization.
    fn name(&self) -> &str;

    /// Compute the metric value(s) for this batch.
    fn call(&self, ctx: &StepContext<'_>) -> Result<LeafOutput<LogValue>>;
}

/// A nested tree of metrics.
pub type MetricSpec = Spec<Arc<dyn MetricFn>>;

/// Wrap a metric into a single-leaf spec.
pub fn metric(m: impl MetricFn + 'static) -> MetricSpec {
    Spec::Leaf(Arc::new(m))
}

impl SpecLeaf for Arc<dyn MetricFn> {
    type Value = LogValue;

    fn leaf_name(&self) -> String {
        self.name().to_string()
    }

    fn evaluate(&self, ctx: &StepContext<'_>) -> Result<LeafOutput<LogValue>> {
        self.call(ctx)
    }
}

/// Closure-backed metric with an explicit name.
pub struct NamedMetric<F> {
    name: String,
    f: F,
}

impl<F> NamedMetric<F>
where
    F: Fn(&StepContext<'_>) -> Result<LeafOutput<LogValue>>,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        NamedMetric {
            name: name.into(),
            f,
        }
    }
}

impl<F> MetricFn for NamedMetric<F>
where
    F: Fn(&StepContext<'_>) -> Result<LeafOutput<LogValue>>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, ctx: &StepContext<'_>) -> Result<LeafOutput<LogValue>> {
        (self.f)(ctx)
    }
}

/// Weighted mean of elementwise match scores.
///
/// `sample_weight` may have the full shape of `values` or only its leading
/// dimensions; missing trailing axes are broadcast. Returns `sum(v * w) /
/// sum(w)`, or the plain mean when no weights are given.
pub(crate) fn weighted_mean(values: &ArrayD<f32>, sample_weight: Option<&ArrayD<f32>>) -> Result<f32> {
    let Some(w) = sample_weight else {
        if values.is_empty() {
            return Err(Error::shape_mismatch("non-empty values", "length 0"));
        }
        return Ok(values.sum() / values.len() as f32);
    };

    if w.ndim() > values.ndim() || w.shape() != &values.shape()[..w.ndim()] {
        return Err(Error::shape_mismatch(
            format!("sample_weight of leading shape {:?}", values.shape()),
            format!("{:?}", w.shape()),
        ));
    }

    let mut expanded = w.clone();
    for _ in w.ndim()..values.ndim() {
        let last = expanded.ndim();
        expanded = expanded.insert_axis(Axis(last));
    }
    let trailing: usize = values.shape()[w.ndim()..].iter().product();
    let total_weight = expanded.sum() * trailing as f32;
    if total_weight == 0.0 {
        return Err(Error::Config("sample_weight sums to zero".to_string()));
    }
    Ok((values * &expanded).sum() / total_weight)
}
