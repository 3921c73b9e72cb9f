//! Fully-connected layer

use indexmap::IndexMap;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::Module;
use crate::autograd::{self, Tensor};
use crate::context::Inputs;
use crate::error::{Error, Result};
use crate::tree::ParamTree;

/// `y = x · w + b` over a batch of row vectors.
pub struct Linear {
    w: Tensor,
    b: Tensor,
}

impl Linear {
    /// New layer with uniform initialization scaled by the fan-in, from a
    /// fixed seed.
    pub fn new(in_features: usize, out_features: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let scale = 1.0 / (in_features.max(1) as f32).sqrt();
        let w = Array2::from_shape_fn((in_features, out_features), |_| {
            rng.gen_range(-scale..scale)
        });
        Linear {
            w: Tensor::new(w.into_dyn(), true),
            b: Tensor::new(Array1::zeros(out_features).into_dyn(), true),
        }
    }
}

impl Module for Linear {
    fn call(&self, x: &Inputs, _training: bool) -> Result<Tensor> {
        let input = Tensor::new(x.single()?.clone(), false);
        let h = autograd::matmul(&input, &self.w)?;
        autograd::add_bias(&h, &self.b)
    }

    fn parameters(&self, trainable: bool) -> IndexMap<String, Tensor> {
        if !trainable {
            return IndexMap::new();
        }
        IndexMap::from([
            ("w".to_string(), self.w.clone()),
            ("b".to_string(), self.b.clone()),
        ])
    }

    fn set_parameters(&mut self, values: &ParamTree) -> Result<()> {
        for (name, tensor) in [("w", &mut self.w), ("b", &mut self.b)] {
            let value = values
                .get(name)
                .ok_or_else(|| Error::Config(format!("missing parameter {name}")))?;
            if value.shape() != tensor.data().shape() {
                return Err(Error::shape_mismatch(
                    format!("{name}: {:?}", tensor.data().shape()),
                    format!("{:?}", value.shape()),
                ));
            }
            *tensor.data_mut() = value.clone();
        }
        Ok(())
    }
}
