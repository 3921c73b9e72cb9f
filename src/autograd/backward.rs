//! Backward operation trait

use super::Tensor;

/// A recorded backward step in the computational graph.
///
/// `backward` reads the result's gradient cell and accumulates into the
/// inputs' cells. It must not recurse: the driver in
/// [`backward`](super::backward) fires every node exactly once, after all
/// of that node's consumers have delivered their gradient, so a tensor
/// read by several operations is not double-counted.
pub trait BackwardOp {
    /// Propagate the output gradient to the operation's inputs.
    fn backward(&self);

    /// The input tensors this operation accumulates into.
    fn inputs(&self) -> Vec<Tensor>;
}
