//! Model assembly and step functions

mod model;
mod optimizer;

pub use model::Model;
pub use optimizer::Optimizer;
