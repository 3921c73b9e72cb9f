//! Model: step-function orchestration over a module

use indexmap::IndexMap;
use ndarray::{Array1, ArrayD};

use crate::autograd::{self, Tensor};
use crate::context::{Inputs, StepContext};
use crate::error::{Error, Result};
use crate::logs::{LogValue, Logs};
use crate::losses::{Losses, LossSpec};
use crate::metrics::{Metrics, MetricSpec, RunningAverage};
use crate::mode::ExecutionMode;
use crate::model::Optimizer;
use crate::module::Module;
use crate::naming;
use crate::optim::GradientTransformation;

/// Ties a module to its loss tree, metric tree and optimizer, and exposes
/// the three step functions the training loop is built from.
///
/// Every step takes an explicit [`ExecutionMode`]; there is no ambient
/// phase. An initializing step runs the full pipeline but commits nothing.
pub struct Model {
    module: Option<Box<dyn Module>>,
    loss: Option<Losses>,
    metrics: Option<Metrics>,
    optimizer: Option<Optimizer>,
    loss_metrics: RunningAverage,
}

impl Model {
    pub fn new(module: impl Module + 'static) -> Self {
        Model {
            module: Some(Box::new(module)),
            loss: None,
            metrics: None,
            optimizer: None,
            loss_metrics: RunningAverage::new(),
        }
    }

    /// A model with nothing configured. Every step function reports a
    /// configuration error naming what is missing.
    pub fn empty() -> Self {
        Model {
            module: None,
            loss: None,
            metrics: None,
            optimizer: None,
            loss_metrics: RunningAverage::new(),
        }
    }

    pub fn with_loss(mut self, spec: LossSpec) -> Self {
        self.loss = Some(Losses::new(spec));
        self
    }

    pub fn with_metrics(mut self, spec: MetricSpec) -> Self {
        self.metrics = Some(Metrics::new(spec));
        self
    }

    pub fn with_optimizer(mut self, transform: impl GradientTransformation + 'static) -> Self {
        self.optimizer = Some(Optimizer::new(transform));
        self
    }

    pub fn module(&self) -> Option<&dyn Module> {
        self.module.as_deref()
    }

    pub fn optimizer(&self) -> Option<&Optimizer> {
        self.optimizer.as_ref()
    }

    /// Drop accumulated running averages, e.g. at an epoch boundary.
    pub fn reset_metrics(&mut self) {
        self.loss_metrics = RunningAverage::new();
        if let Some(metrics) = self.metrics.as_mut() {
            metrics.reset();
        }
    }

    /// Forward pass only.
    pub fn predict_step(&self, x: &Inputs, mode: ExecutionMode) -> Result<Tensor> {
        let module = self.require_module()?;
        module.call(x, mode.is_training())
    }

    /// Forward pass, loss evaluation and metric accumulation.
    ///
    /// Returns the total loss tensor (the sum of every configured loss and
    /// every module hook loss) and the running-averaged logs. The total
    /// stays wired into the autograd tape, so callers may run a backward
    /// pass on it.
    pub fn test_step(
        &mut self,
        x: &Inputs,
        y_true: Option<&ArrayD<f32>>,
        sample_weight: Option<&ArrayD<f32>>,
        class_weight: Option<&ArrayD<f32>>,
        mode: ExecutionMode,
    ) -> Result<(Tensor, Logs)> {
        let module = self.require_module()?;
        let y_pred = module.call(x, mode.is_training())?;
        let parameters = module.get_parameters();
        let states = module.get_states();
        let hook_losses = module.get_losses();

        let ctx = StepContext {
            x,
            y_true,
            y_pred: &y_pred,
            sample_weight,
            class_weight,
            training: mode.is_training(),
            parameters: &parameters,
            states: &states,
        };

        let mut tensors: IndexMap<String, Tensor> = IndexMap::new();
        if let Some(hook) = hook_losses {
            for (name, tensor) in hook {
                let mut base = name;
                if !base.ends_with("loss") {
                    base.push_str("_loss");
                }
                let key = naming::unique_key(base, |k| tensors.contains_key(k));
                tensors.insert(key, tensor);
            }
        }
        if let Some(losses) = &self.loss {
            for (base, tensor) in losses.compute(&ctx)? {
                let key = naming::unique_key(base, |k| tensors.contains_key(k));
                tensors.insert(key, tensor);
            }
        }

        let mut total = Tensor::scalar(0.0, false);
        for tensor in tensors.values() {
            let summed = autograd::sum(tensor);
            total = autograd::add(&total, &summed)?;
        }

        let mut batch_logs = Logs::with_capacity(tensors.len() + 1);
        for (key, tensor) in &tensors {
            batch_logs.insert(key.clone(), log_value(tensor));
        }
        batch_logs.insert("loss".to_string(), LogValue::Scalar(total.scalar_value()));

        let logs = if let Some(metrics) = self.metrics.as_mut() {
            metrics.compute(&batch_logs, &ctx)?
        } else {
            self.loss_metrics.update(&batch_logs)?
        };

        Ok((total, logs))
    }

    /// One optimization step: test step, backward pass, parameter update.
    ///
    /// Under [`ExecutionMode::Initializing`] the whole pipeline runs but
    /// neither parameters nor optimizer state are committed.
    pub fn train_step(
        &mut self,
        x: &Inputs,
        y_true: Option<&ArrayD<f32>>,
        sample_weight: Option<&ArrayD<f32>>,
        class_weight: Option<&ArrayD<f32>>,
        mode: ExecutionMode,
    ) -> Result<Logs> {
        if self.optimizer.is_none() {
            return Err(Error::Config("model has no optimizer".to_string()));
        }
        self.require_module()?.zero_grad();

        let (mut total, logs) = self.test_step(x, y_true, sample_weight, class_weight, mode)?;
        autograd::backward(&mut total, None);

        let module = self
            .module
            .as_mut()
            .ok_or_else(|| Error::Config("model has no module".to_string()))?;
        let params = module.get_parameters();
        let grads = module.gradients();
        let optimizer = self
            .optimizer
            .as_mut()
            .ok_or_else(|| Error::Config("model has no optimizer".to_string()))?;

        let next_params = optimizer.step(&params, &grads, mode)?;
        if !mode.is_initializing() {
            module.set_parameters(&next_params)?;
        }
        Ok(logs)
    }

    fn require_module(&self) -> Result<&dyn Module> {
        self.module
            .as_deref()
            .ok_or_else(|| Error::Config("model has no module".to_string()))
    }
}

fn log_value(tensor: &Tensor) -> LogValue {
    if tensor.len() == 1 {
        LogValue::Scalar(tensor.scalar_value())
    } else {
        LogValue::Vector(Array1::from_iter(tensor.data().iter().copied()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::losses::{loss, MeanSquaredError};
    use ndarray::arr1;

    #[test]
    fn test_empty_model_reports_missing_module() {
        let model = Model::empty();
        let x = Inputs::from(arr1(&[1.0]));

        let err = model.predict_step(&x, ExecutionMode::Evaluating).unwrap_err();
        assert!(err.to_string().contains("module"));
    }

    #[test]
    fn test_train_step_requires_optimizer() {
        struct Identity;
        impl Module for Identity {
            fn call(&self, x: &Inputs, _training: bool) -> Result<Tensor> {
                Ok(Tensor::new(x.single()?.clone(), false))
            }
            fn parameters(&self, _trainable: bool) -> IndexMap<String, Tensor> {
                IndexMap::new()
            }
            fn set_parameters(&mut self, _values: &crate::tree::ParamTree) -> Result<()> {
                Ok(())
            }
        }

        let mut model = Model::new(Identity).with_loss(loss(MeanSquaredError::new()));
        let y = arr1(&[1.0]).into_dyn();
        let x = Inputs::from(arr1(&[1.0]));

        let err = model
            .train_step(&x, Some(&y), None, None, ExecutionMode::Training)
            .unwrap_err();
        assert!(err.to_string().contains("optimizer"));
    }
}
