//! Structure-preserving operations over named parameter trees
//!
//! Parameters, gradients and optimizer slots all share one representation:
//! an insertion-ordered map from parameter name to array. The helpers here
//! mirror the `map`/`multimap` vocabulary of functional array libraries.

use indexmap::IndexMap;
use ndarray::ArrayD;

use crate::error::{Error, Result};

/// Named tree of arrays: parameters, gradients, updates, optimizer slots.
pub type ParamTree = IndexMap<String, ArrayD<f32>>;

/// Apply `f` to every leaf, preserving names and order.
pub fn map(tree: &ParamTree, f: impl Fn(&ArrayD<f32>) -> ArrayD<f32>) -> ParamTree {
    tree.iter().map(|(k, v)| (k.clone(), f(v))).collect()
}

/// Zip two trees leafwise with `f`.
///
/// Both trees must have identical key sets and per-leaf shapes; anything
/// else is a caller bug surfaced as [`Error::ShapeMismatch`].
pub fn multimap(
    a: &ParamTree,
    b: &ParamTree,
    f: impl Fn(&ArrayD<f32>, &ArrayD<f32>) -> ArrayD<f32>,
) -> Result<ParamTree> {
    if a.len() != b.len() || a.keys().any(|k| !b.contains_key(k)) {
        return Err(Error::shape_mismatch(
            format!("keys {:?}", a.keys().collect::<Vec<_>>()),
            format!("keys {:?}", b.keys().collect::<Vec<_>>()),
        ));
    }

    let mut out = ParamTree::with_capacity(a.len());
    for (k, va) in a {
        let vb = &b[k];
        if va.shape() != vb.shape() {
            return Err(Error::shape_mismatch(
                format!("{k}: {:?}", va.shape()),
                format!("{k}: {:?}", vb.shape()),
            ));
        }
        out.insert(k.clone(), f(va, vb));
    }
    Ok(out)
}

/// Tree of zeros shaped like `tree`.
pub fn zeros_like(tree: &ParamTree) -> ParamTree {
    map(tree, |v| ArrayD::zeros(v.raw_dim()))
}
