//! Step context: the injectable value pool for losses and metrics
//!
//! Instead of inspecting callables for their declared parameter names, every
//! loss and metric receives one typed [`StepContext`] and pulls exactly the
//! fields it needs. Required fields that are absent for the current step
//! surface as [`Error::MissingInput`] naming the field.

use indexmap::IndexMap;
use ndarray::ArrayD;

use crate::autograd::Tensor;
use crate::error::{Error, Result};
use crate::tree::ParamTree;

/// Forward-pass input: a single array, positional arrays, or named arrays.
#[derive(Clone, Debug)]
pub enum Inputs {
    Single(ArrayD<f32>),
    Positional(Vec<ArrayD<f32>>),
    Named(IndexMap<String, ArrayD<f32>>),
}

impl Inputs {
    /// The one input array, for modules taking a single positional input.
    pub fn single(&self) -> Result<&ArrayD<f32>> {
        match self {
            Inputs::Single(x) => Ok(x),
            Inputs::Positional(xs) if xs.len() == 1 => Ok(&xs[0]),
            _ => Err(Error::Config(
                "module expects a single input array".to_string(),
            )),
        }
    }

    /// Look up a named input.
    pub fn named(&self, name: &'static str) -> Result<&ArrayD<f32>> {
        match self {
            Inputs::Named(map) => map.get(name).ok_or(Error::MissingInput { name }),
            _ => Err(Error::MissingInput { name }),
        }
    }
}

impl From<ArrayD<f32>> for Inputs {
    fn from(x: ArrayD<f32>) -> Self {
        Inputs::Single(x)
    }
}

impl From<ndarray::Array1<f32>> for Inputs {
    fn from(x: ndarray::Array1<f32>) -> Self {
        Inputs::Single(x.into_dyn())
    }
}

impl From<ndarray::Array2<f32>> for Inputs {
    fn from(x: ndarray::Array2<f32>) -> Self {
        Inputs::Single(x.into_dyn())
    }
}

/// The named-value pool available to every loss and metric during a step.
pub struct StepContext<'a> {
    /// Forward-pass inputs.
    pub x: &'a Inputs,
    /// Ground truth, when the caller supplied it.
    pub y_true: Option<&'a ArrayD<f32>>,
    /// Predictions from `predict_step`.
    pub y_pred: &'a Tensor,
    /// Per-sample weights.
    pub sample_weight: Option<&'a ArrayD<f32>>,
    /// Per-class weights.
    pub class_weight: Option<&'a ArrayD<f32>>,
    /// Whether the module ran in training mode.
    pub training: bool,
    /// Trainable parameter values.
    pub parameters: &'a ParamTree,
    /// Non-trainable state values.
    pub states: &'a ParamTree,
}

impl<'a> StepContext<'a> {
    /// Ground truth, required.
    pub fn y_true(&self) -> Result<&'a ArrayD<f32>> {
        self.y_true.ok_or(Error::MissingInput { name: "y_true" })
    }

    /// Predictions, always present.
    pub fn y_pred(&self) -> &'a Tensor {
        self.y_pred
    }

    /// Per-sample weights, required.
    pub fn sample_weight(&self) -> Result<&'a ArrayD<f32>> {
        self.sample_weight
            .ok_or(Error::MissingInput { name: "sample_weight" })
    }

    /// Per-class weights, required.
    pub fn class_weight(&self) -> Result<&'a ArrayD<f32>> {
        self.class_weight
            .ok_or(Error::MissingInput { name: "class_weight" })
    }
}
