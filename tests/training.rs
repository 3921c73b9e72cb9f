//! End-to-end exercises of the three step functions.

use approx::assert_relative_eq;
use indexmap::IndexMap;
use modelar::losses::{loss, MeanSquaredError, MeanSquaredLogarithmicError};
use modelar::metrics::{metric, BinaryAccuracy};
use modelar::module::Linear;
use modelar::optim::Sgd;
use modelar::spec::Spec;
use modelar::tree::ParamTree;
use modelar::{ExecutionMode, Inputs, Model, Module, Result, Tensor};
use ndarray::{arr1, arr2, ArrayD};

/// Passes its input through unchanged. No parameters.
struct Identity;

impl Module for Identity {
    fn call(&self, x: &Inputs, _training: bool) -> Result<Tensor> {
        Ok(Tensor::new(x.single()?.clone(), false))
    }

    fn parameters(&self, _trainable: bool) -> IndexMap<String, Tensor> {
        IndexMap::new()
    }

    fn set_parameters(&mut self, _values: &ParamTree) -> Result<()> {
        Ok(())
    }
}

/// Identity that also declares a constant auxiliary loss.
struct Penalized;

impl Module for Penalized {
    fn call(&self, x: &Inputs, _training: bool) -> Result<Tensor> {
        Ok(Tensor::new(x.single()?.clone(), false))
    }

    fn parameters(&self, _trainable: bool) -> IndexMap<String, Tensor> {
        IndexMap::new()
    }

    fn set_parameters(&mut self, _values: &ParamTree) -> Result<()> {
        Ok(())
    }

    fn get_losses(&self) -> Option<IndexMap<String, Tensor>> {
        Some(IndexMap::from([(
            "l2".to_string(),
            Tensor::scalar(0.1, false),
        )]))
    }
}

fn msle_fixtures() -> (ArrayD<f32>, Inputs) {
    let y_true = arr2(&[[0.0, 1.0], [0.0, 0.0]]).into_dyn();
    let x = Inputs::from(arr2(&[[1.0, 1.0], [1.0, 0.0]]));
    (y_true, x)
}

#[test]
fn test_step_logs_named_loss_and_total() {
    let (y_true, x) = msle_fixtures();
    let mut model =
        Model::new(Identity).with_loss(loss(MeanSquaredLogarithmicError::new()));

    let (total, logs) = model
        .test_step(&x, Some(&y_true), None, None, ExecutionMode::Evaluating)
        .unwrap();

    assert_relative_eq!(total.scalar_value(), 0.24022643, epsilon = 1e-6);
    let keys: Vec<_> = logs.keys().cloned().collect();
    assert_eq!(
        keys,
        vec!["mean_squared_logarithmic_error_loss", "loss"]
    );
    assert_relative_eq!(
        logs["loss"].as_scalar().unwrap(),
        0.24022643,
        epsilon = 1e-6
    );
}

#[test]
fn test_step_applies_sample_weight() {
    let (y_true, x) = msle_fixtures();
    let w = arr1(&[0.7, 0.3]).into_dyn();
    let mut model =
        Model::new(Identity).with_loss(loss(MeanSquaredLogarithmicError::new()));

    let (total, _) = model
        .test_step(&x, Some(&y_true), Some(&w), None, ExecutionMode::Evaluating)
        .unwrap();

    assert_relative_eq!(total.scalar_value(), 0.12011322, epsilon = 1e-6);
}

#[test]
fn test_step_averages_across_batches() {
    let mut model = Model::new(Identity).with_loss(loss(MeanSquaredError::new()));

    // Batch 1: mean((1-0)²) = 1. Batch 2: mean((3-0)²) = 9.
    let zero = arr1(&[0.0]).into_dyn();
    let (_, first) = model
        .test_step(
            &Inputs::from(arr1(&[1.0])),
            Some(&zero),
            None,
            None,
            ExecutionMode::Evaluating,
        )
        .unwrap();
    assert_relative_eq!(first["loss"].as_scalar().unwrap(), 1.0, epsilon = 1e-5);

    let (_, second) = model
        .test_step(
            &Inputs::from(arr1(&[3.0])),
            Some(&zero),
            None,
            None,
            ExecutionMode::Evaluating,
        )
        .unwrap();
    assert_relative_eq!(second["loss"].as_scalar().unwrap(), 5.0, epsilon = 1e-5);

    // A fresh epoch starts the average over.
    model.reset_metrics();
    let (_, third) = model
        .test_step(
            &Inputs::from(arr1(&[1.0])),
            Some(&zero),
            None,
            None,
            ExecutionMode::Evaluating,
        )
        .unwrap();
    assert_relative_eq!(third["loss"].as_scalar().unwrap(), 1.0, epsilon = 1e-5);
}

#[test]
fn test_step_includes_module_hook_losses() {
    let x = Inputs::from(arr1(&[1.0]));
    let mut model = Model::new(Penalized);

    let (total, logs) = model
        .test_step(&x, None, None, None, ExecutionMode::Evaluating)
        .unwrap();

    let keys: Vec<_> = logs.keys().cloned().collect();
    assert_eq!(keys, vec!["l2_loss", "loss"]);
    assert_relative_eq!(total.scalar_value(), 0.1, epsilon = 1e-6);
}

#[test]
fn test_step_runs_metrics() {
    let y_true = arr2(&[[0.0], [0.0], [1.0], [1.0]]).into_dyn();
    let x = Inputs::from(arr2(&[[0.3], [0.7], [0.8], [0.6]]));
    let mut model = Model::new(Identity)
        .with_loss(loss(MeanSquaredError::new()))
        .with_metrics(metric(BinaryAccuracy::new()));

    let (_, logs) = model
        .test_step(&x, Some(&y_true), None, None, ExecutionMode::Evaluating)
        .unwrap();

    assert_relative_eq!(
        logs["binary_accuracy"].as_scalar().unwrap(),
        0.75,
        epsilon = 1e-6
    );
    assert!(logs.contains_key("loss"));
}

#[test]
fn train_step_reduces_loss() {
    // Fit y = 2x with a single linear unit.
    let x = Inputs::from(arr2(&[[1.0], [2.0], [3.0]]));
    let y_true = arr2(&[[2.0], [4.0], [6.0]]).into_dyn();

    let mut model = Model::new(Linear::new(1, 1, 3))
        .with_loss(loss(MeanSquaredError::new()))
        .with_optimizer(Sgd::new(0.05));

    model.reset_metrics();
    let (before, _) = model
        .test_step(&x, Some(&y_true), None, None, ExecutionMode::Evaluating)
        .unwrap();

    for _ in 0..500 {
        model
            .train_step(&x, Some(&y_true), None, None, ExecutionMode::Training)
            .unwrap();
    }

    model.reset_metrics();
    let (after, _) = model
        .test_step(&x, Some(&y_true), None, None, ExecutionMode::Evaluating)
        .unwrap();

    assert!(after.scalar_value() < before.scalar_value());
    assert!(after.scalar_value() < 0.01);
    assert_eq!(model.optimizer().unwrap().state().unwrap().step, 500);
}

#[test]
fn split_loss_tree_matches_single_loss_gradients() {
    // Two half-weighted copies of the same loss read the same predictions;
    // one optimization step must land where a single full-weight loss does.
    let x = Inputs::from(arr2(&[[1.0], [2.0], [3.0]]));
    let y_true = arr2(&[[2.0], [4.0], [6.0]]).into_dyn();

    let mut single = Model::new(Linear::new(1, 1, 11))
        .with_loss(loss(MeanSquaredError::new()))
        .with_optimizer(Sgd::new(0.1));
    let mut split = Model::new(Linear::new(1, 1, 11))
        .with_loss(Spec::list([
            loss(MeanSquaredError::new().with_weight(0.5)),
            loss(MeanSquaredError::new().with_weight(0.5)),
        ]))
        .with_optimizer(Sgd::new(0.1));

    single
        .train_step(&x, Some(&y_true), None, None, ExecutionMode::Training)
        .unwrap();
    split
        .train_step(&x, Some(&y_true), None, None, ExecutionMode::Training)
        .unwrap();

    let a = single.module().unwrap().get_parameters();
    let b = split.module().unwrap().get_parameters();
    for (key, value) in &a {
        for (left, right) in value.iter().zip(b[key].iter()) {
            assert_relative_eq!(*left, *right, epsilon = 1e-6);
        }
    }
}

#[test]
fn initializing_train_step_commits_nothing() {
    let x = Inputs::from(arr2(&[[1.0], [2.0]]));
    let y_true = arr2(&[[1.0], [2.0]]).into_dyn();

    let mut model = Model::new(Linear::new(1, 1, 9))
        .with_loss(loss(MeanSquaredError::new()))
        .with_optimizer(Sgd::new(0.1));

    let before = model.module().unwrap().get_parameters();
    let logs = model
        .train_step(&x, Some(&y_true), None, None, ExecutionMode::Initializing)
        .unwrap();

    assert!(logs.contains_key("loss"));
    assert_eq!(model.module().unwrap().get_parameters(), before);
    assert!(model.optimizer().unwrap().state().is_none());
}
