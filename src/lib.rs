//! # Modelar: Training-Step Orchestration Library
//!
//! Modelar ties a differentiable module to loss trees, metric trees and an
//! optimizer, and exposes the step functions a training loop is built from:
//! predict, test and train.
//!
//! ## Architecture
//!
//! - **autograd**: Tape-based automatic differentiation
//! - **module**: Trainable modules with named parameters
//! - **losses**: Differentiable losses and the loss aggregation pipeline
//! - **metrics**: Metrics with explicit running-average state
//! - **optim**: Gradient transformations (SGD, Adam) over parameter trees
//! - **model**: Step-function orchestration and the optimizer wrapper
//! - **spec**: Nested loss/metric trees and their traversal
//! - **context**: The typed value pool every loss and metric reads from

pub mod autograd;
pub mod context;
pub mod logs;
pub mod losses;
pub mod metrics;
pub mod mode;
pub mod model;
pub mod module;
pub mod naming;
pub mod optim;
pub mod spec;
pub mod tree;

pub mod error;

// Re-export commonly used types
pub use autograd::{backward, Tensor};
pub use context::{Inputs, StepContext};
pub use error::{Error, Result};
pub use logs::{LogValue, Logs};
pub use mode::ExecutionMode;
pub use model::{Model, Optimizer};
pub use module::Module;
