//! Thresholded binary accuracy

use super::metric::weighted_mean;
use super::MetricFn;
use crate::context::StepContext;
use crate::error::{Error, Result};
use crate::logs::LogValue;
use crate::spec::LeafOutput;

/// Fraction of thresholded predictions matching binary labels.
///
/// Predictions above `threshold` count as class 1. Labels are treated the
/// same way, so probabilistic labels round at one half.
#[derive(Clone, Debug)]
pub struct BinaryAccuracy {
    threshold: f32,
}

impl Default for BinaryAccuracy {
    fn default() -> Self {
        BinaryAccuracy { threshold: 0.5 }
    }
}

impl BinaryAccuracy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }
}

impl MetricFn for BinaryAccuracy {
    fn name(&self) -> &str {
        "binary_accuracy"
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

        let t = self.threshold;
        let mut matches = p.clone();
        matches.zip_mut_with(y_true, |m, &label| {
            *m = if (*m > t) == (label > 0.5) { 1.0 } else { 0.0 };
        });
        let value = weighted_mean(&matches, ctx.sample_weight)?;
        Ok(LeafOutput::Single(LogValue::Scalar(value)))
    }
}
