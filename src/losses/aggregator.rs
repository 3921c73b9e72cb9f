//! Loss aggregation: evaluate a loss tree into uniquely-named tensors

use indexmap::IndexMap;

use super::LossSpec;
use crate::autograd::Tensor;
use crate::context::StepContext;
use crate::error::Result;
use crate::naming;

/// Evaluates a configured [`LossSpec`] and names every output.
///
/// Keys follow the loss naming rule: path segments joined with `/`, with
/// the loss-derived segment tagged `_loss`, and collisions disambiguated
/// with `_1`, `_2`, ... in traversal order. The caller sums the returned
/// tensors (together with any module hook losses) into the step's total.
pub struct Losses {
    spec: LossSpec,
}

impl Losses {
    pub fn new(spec: LossSpec) -> Self {
        Losses { spec }
    }

    /// Compute all named loss values for one step.
    pub fn compute(&self, ctx: &StepContext<'_>) -> Result<IndexMap<String, Tensor>> {
        let mut logs = IndexMap::new();
        for (path, value) in self.spec.apply(ctx)? {
            let key = naming::unique_key(naming::loss_key(&path), |k| logs.contains_key(k));
            logs.insert(key, value);
        }
        Ok(logs)
    }
}
