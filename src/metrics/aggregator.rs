//! Metric aggregation: running averages over losses and metric outputs

use super::metric::MetricSpec;
use super::running::RunningAverage;
use crate::context::StepContext;
use crate::error::Result;
use crate::logs::Logs;
use crate::naming;

/// Evaluates a configured [`MetricSpec`] each batch and keeps the cumulative
/// averages, for both the loss logs fed in and the metric outputs.
///
/// Output keys are loss keys first (averaged), then metric keys in traversal
/// order, disambiguated against everything already present.
pub struct Metrics {
    spec: MetricSpec,
    loss_metrics: RunningAverage,
    values: RunningAverage,
}

impl Metrics {
    pub fn new(spec: MetricSpec) -> Self {
        Metrics {
            spec,
            loss_metrics: RunningAverage::new(),
            values: RunningAverage::new(),
        }
    }

    /// Discard accumulated averages, e.g. at an epoch boundary.
    pub fn reset(&mut self) {
        self.loss_metrics = RunningAverage::new();
        self.values = RunningAverage::new();
    }

    /// Fold one batch in: average the loss logs, evaluate every metric, and
    /// return the merged running averages.
    pub fn compute(&mut self, loss_logs: &Logs, ctx: &StepContext<'_>) -> Result<Logs> {
        let mut out = self.loss_metrics.update(loss_logs)?;

        let mut batch = Logs::new();
        for (path, value) in self.spec.apply(ctx)? {
            let key = naming::unique_key(naming::metric_key(&path), |k| {
                out.contains_key(k) || batch.contains_key(k)
            });
            batch.insert(key, value);
        }

        for (key, value) in self.values.update(&batch)? {
            out.insert(key, value);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::Tensor;
    use crate::context::Inputs;
    use crate::logs::LogValue;
    use crate::metrics::{metric, NamedMetric};
    use crate::spec::{LeafOutput, Spec};
    use crate::tree::ParamTree;
    use approx::assert_relative_eq;
    use ndarray::arr1;

    fn constant(name: &'static str, value: f32) -> MetricSpec {
        metric(NamedMetric::new(name, move |_ctx: &StepContext<'_>| {
            Ok(LeafOutput::Single(LogValue::Scalar(value)))
        }))
    }

    fn with_ctx<R>(f: impl FnOnce(&StepContext<'_>) -> R) -> R {
        let x = Inputs::from(arr1(&[0.0]));
        let y_pred = Tensor::from_vec(vec![0.0], false);
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
        f(&ctx)
    }

    fn loss_logs(value: f32) -> Logs {
        Logs::from([("loss".to_string(), LogValue::Scalar(value))])
    }

    #[test]
    fn test_losses_then_metrics_in_order() {
        let mut metrics = Metrics::new(Spec::named([("head", constant("acc", 1.0))]));
        let out = with_ctx(|ctx| metrics.compute(&loss_logs(2.0), ctx)).unwrap();

        let keys: Vec<_> = out.keys().cloned().collect();
        assert_eq!(keys, vec!["loss", "head/acc"]);
    }

    #[test]
    fn test_averages_accumulate() {
        let mut metrics = Metrics::new(constant("acc", 1.0));
        with_ctx(|ctx| metrics.compute(&loss_logs(4.0), ctx)).unwrap();

        // Second batch: loss averages to 3, the constant metric stays 1.
        let out = with_ctx(|ctx| metrics.compute(&loss_logs(2.0), ctx)).unwrap();
        assert_relative_eq!(out["loss"].as_scalar().unwrap(), 3.0);
        assert_relative_eq!(out["acc"].as_scalar().unwrap(), 1.0);
    }

    #[test]
    fn test_metric_key_collision_with_loss_key() {
        let mut metrics = Metrics::new(constant("loss", 0.5));
        let out = with_ctx(|ctx| metrics.compute(&loss_logs(2.0), ctx)).unwrap();

        let keys: Vec<_> = out.keys().cloned().collect();
        assert_eq!(keys, vec!["loss", "loss_1"]);
        assert_relative_eq!(out["loss_1"].as_scalar().unwrap(), 0.5);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut metrics = Metrics::new(constant("acc", 1.0));
        with_ctx(|ctx| metrics.compute(&loss_logs(10.0), ctx)).unwrap();

        metrics.reset();
        let out = with_ctx(|ctx| metrics.compute(&loss_logs(2.0), ctx)).unwrap();
        assert_relative_eq!(out["loss"].as_scalar().unwrap(), 2.0);
    }
}
