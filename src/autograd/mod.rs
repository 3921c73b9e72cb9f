//! Tape-based autograd engine
//!
//! Differentiable N-dimensional arrays with shared gradient cells. Forward
//! ops record backward closures; calling [`backward`] on a scalar output
//! propagates gradients through the recorded graph.

mod backward;
mod ops;
mod tensor;


pub use backward::BackwardOp;
pub use ops::{add, add_bias, matmul, sum};
pub use tensor::Tensor;

use std::collections::{HashMap, HashSet};

type NodeKey = *const std::cell::RefCell<Option<ndarray::ArrayD<f32>>>;

fn node_key(t: &Tensor) -> NodeKey {
    std::rc::Rc::as_ptr(&t.grad_cell())
}

/// Perform a backward pass from `tensor`.
///
/// Seeds the output gradient with `grad_output`, or with ones when absent
/// (the usual case for a scalar loss). Each recorded operation fires
/// exactly once, after every consumer of its result has delivered its
/// gradient, so tensors feeding several operations accumulate correctly.
pub fn backward(tensor: &mut Tensor, grad_output: Option<ndarray::ArrayD<f32>>) {
    if let Some(grad) = grad_output {
        tensor.set_grad(grad);
    } else {
        tensor.set_grad(ndarray::ArrayD::ones(tensor.data().raw_dim()));
    }

    // First pass: count, per node, how many reachable operations consume it.
    let mut pending: HashMap<NodeKey, usize> = HashMap::new();
    let mut visited: HashSet<NodeKey> = HashSet::new();
    let mut stack = vec![tensor.clone()];
    while let Some(node) = stack.pop() {
        if !visited.insert(node_key(&node)) {
            continue;
        }
        if let Some(op) = node.backward_op() {
            for input in op.inputs() {
                *pending.entry(node_key(&input)).or_insert(0) += 1;
                stack.push(input);
            }
        }
    }

    // Second pass: fire a node once all of its consumers have reported.
    let mut ready = vec![tensor.clone()];
    while let Some(node) = ready.pop() {
        if let Some(op) = node.backward_op() {
            op.backward();
            for input in op.inputs() {
                if let Some(count) = pending.get_mut(&node_key(&input)) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push(input);
                    }
                }
            }
        }
    }
}
