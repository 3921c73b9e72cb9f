//! Loss functions and the loss aggregation pipeline
//!
//! Losses are differentiable: each one returns a tensor wired into the
//! autograd tape via an analytic gradient with respect to the predictions.
//! A [`LossSpec`] tree of losses is evaluated by [`Losses`], which assigns
//! every output a unique `/`-joined log key ending in `_loss`.

mod aggregator;
mod loss;
mod mae;
mod mse;
mod msle;

pub use aggregator::Losses;
pub use loss::{loss, LossFn, LossSpec, NamedLoss, Reduction, EPSILON};
pub use mae::MeanAbsoluteError;
pub use mse::MeanSquaredError;
pub use msle::MeanSquaredLogarithmicError;
