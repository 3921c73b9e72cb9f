//! Exact-match accuracy

use super::metric::weighted_mean;
use super::MetricFn;
use crate::context::StepContext;
use crate::error::{Error, Result};
use crate::logs::LogValue;
use crate::spec::LeafOutput;

/// Fraction of predictions exactly equal to the labels.
///
/// Intended for integer-valued class labels; use
/// [`BinaryAccuracy`](super::BinaryAccuracy) for probability outputs.
#[derive(Clone, Debug, Default)]
pub struct Accuracy;

impl Accuracy {
    pub fn new() -> Self {
        Accuracy
    }
}

impl MetricFn for Accuracy {
    fn name(&self) -> &str {
        "accuracy"
    }

    fn call(&self, ctx: &StepContext<'_>) -> Result<LeafOutput<LogValue>> {
        let y_true = ctx.y_true()?;
        let p = ctx.y_pred().data();
        if y_true.shape() != p.shape() {
            return Err(Error::shape_mismatch(
                format!("y_true of shape {:?}", p.shape()),
                format!("{:?}", y_true.shape()),
            ));
        }

        let mut matches = p.clone();
        matches.zip_mut_with(y_true, |m, &t| *m = if *m == t { 1.0 } else { 0.0 });
        let value = weighted_mean(&matches, ctx.sample_weight)?;
        Ok(LeafOutput::Single(LogValue::Scalar(value)))
    }
}
