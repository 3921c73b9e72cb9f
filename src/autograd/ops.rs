//! Autograd operations with backward passes

use super::{BackwardOp, Tensor};
use crate::error::{Error, Result};
use ndarray::{ArrayD, Axis, Ix1, Ix2};
use std::cell::RefCell;
use std::rc::Rc;

/// Add two tensors elementwise. Shapes must match exactly.
pub fn add(a: &Tensor, b: &Tensor) -> Result<Tensor> {
    if a.data().shape() != b.data().shape() {
        return Err(Error::shape_mismatch(
            format!("{:?}", a.data().shape()),
            format!("{:?}", b.data().shape()),
        ));
    }

    let data = a.data() + b.data();
    let requires_grad = a.requires_grad() || b.requires_grad();
    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(AddBackward {
            a: a.clone(),
            b: b.clone(),
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    Ok(result)
}

struct AddBackward {
    a: Tensor,
    b: Tensor,
    result_grad: Rc<RefCell<Option<ArrayD<f32>>>>,
}

impl BackwardOp for AddBackward {
    fn backward(&self) {
        let grad = match self.result_grad.borrow().as_ref() {
            Some(g) => g.clone(),
            None => return,
        };

        if self.a.requires_grad() {
            self.a.accumulate_grad(grad.clone());
        }
        if self.b.requires_grad() {
            self.b.accumulate_grad(grad);
        }
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone(), self.b.clone()]
    }
}

/// Sum all elements into a single-element tensor.
pub fn sum(a: &Tensor) -> Tensor {
    let total = a.data().sum();
    let mut result = Tensor::scalar(total, a.requires_grad());

    if a.requires_grad() {
        let backward_op = Rc::new(SumBackward {
            a: a.clone(),
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct SumBackward {
    a: Tensor,
    result_grad: Rc<RefCell<Option<ArrayD<f32>>>>,
}

impl BackwardOp for SumBackward {
    fn backward(&self) {
        let g = match self.result_grad.borrow().as_ref() {
            Some(g) => g.sum(),
            None => return,
        };

        let shape = self.a.data().raw_dim();
        self.a.accumulate_grad(ArrayD::from_elem(shape, g));
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }
}

/// Matrix product of a `(n, k)` tensor with a `(k, m)` tensor.
pub fn matmul(a: &Tensor, b: &Tensor) -> Result<Tensor> {
    let av = view2(a)?;
    let bv = view2(b)?;
    if av.shape()[1] != bv.shape()[0] {
        return Err(Error::shape_mismatch(
            format!("(_, {})", av.shape()[1]),
            format!("({}, _)", bv.shape()[0]),
        ));
    }

    let data = av.dot(&bv).into_dyn();
    let requires_grad = a.requires_grad() || b.requires_grad();
    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(MatmulBackward {
            a: a.clone(),
            b: b.clone(),
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    Ok(result)
}

struct MatmulBackward {
    a: Tensor,
    b: Tensor,
    result_grad: Rc<RefCell<Option<ArrayD<f32>>>>,
}

impl BackwardOp for MatmulBackward {
    fn backward(&self) {
        let grad = match self.result_grad.borrow().as_ref() {
            Some(g) => g.clone(),
            None => return,
        };
        // The forward pass validated both operands as 2-D.
        let g = match grad.view().into_dimensionality::<Ix2>() {
            Ok(g) => g.to_owned(),
            Err(_) => return,
        };

        if self.a.requires_grad() {
            if let Ok(bv) = view2(&self.b) {
                // ∂L/∂a = ∂L/∂out · bᵀ
                self.a.accumulate_grad(g.dot(&bv.t()).into_dyn());
            }
        }
        if self.b.requires_grad() {
            if let Ok(av) = view2(&self.a) {
                // ∂L/∂b = aᵀ · ∂L/∂out
                self.b.accumulate_grad(av.t().dot(&g).into_dyn());
            }
        }
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone(), self.b.clone()]
    }
}

/// Add a 1-D bias row to every row of a 2-D tensor.
pub fn add_bias(h: &Tensor, b: &Tensor) -> Result<Tensor> {
    let hv = view2(h)?;
    let bv = b
        .data()
        .view()
        .into_dimensionality::<Ix1>()
        .map_err(|_| Error::shape_mismatch("1-D bias", format!("{:?}", b.data().shape())))?;
    if hv.shape()[1] != bv.len() {
        return Err(Error::shape_mismatch(
            format!("bias of length {}", hv.shape()[1]),
            format!("length {}", bv.len()),
        ));
    }

    let data = (&hv + &bv).into_dyn();
    let requires_grad = h.requires_grad() || b.requires_grad();
    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(AddBiasBackward {
            h: h.clone(),
            b: b.clone(),
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    Ok(result)
}

struct AddBiasBackward {
    h: Tensor,
    b: Tensor,
    result_grad: Rc<RefCell<Option<ArrayD<f32>>>>,
}

impl BackwardOp for AddBiasBackward {
    fn backward(&self) {
        let grad = match self.result_grad.borrow().as_ref() {
            Some(g) => g.clone(),
            None => return,
        };

        if self.h.requires_grad() {
            self.h.accumulate_grad(grad.clone());
        }
        if self.b.requires_grad() {
            // Bias gradient sums over the batch axis.
            self.b.accumulate_grad(grad.sum_axis(Axis(0)));
        }
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.h.clone(), self.b.clone()]
    }
}

fn view2(t: &Tensor) -> Result<ndarray::ArrayView2<'_, f32>> {
    t.data()
        .view()
        .into_dimensionality::<Ix2>()
        .map_err(|_| Error::shape_mismatch("2-D tensor", format!("{:?}", t.data().shape())))
}
