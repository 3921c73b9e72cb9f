//! Nested loss/metric trees and their traversal
//!
//! Losses and metrics are configured as a tree: a single leaf, an ordered
//! list of subtrees, or a name → subtree mapping. The tree is built once at
//! configuration time as a tagged union, so traversal never has to inspect
//! runtime types. Traversal is eager, left-to-right and depth-first;
//! mapping-valued leaf results are unpacked one level.

use indexmap::IndexMap;

use crate::context::StepContext;
use crate::error::Result;
use crate::naming::lower_snake_case;

/// Ordered name segments locating a leaf output inside a tree.
///
/// Segments run outermost mapping key first; `leaf_index` marks the segment
/// derived from the leaf itself (ancestor keys precede it, mapping keys from
/// an unpacked result follow it).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path {
    segments: Vec<String>,
    leaf: usize,
}

impl Path {
    pub fn new(segments: Vec<String>, leaf: usize) -> Self {
        debug_assert!(leaf < segments.len());
        Path { segments, leaf }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Index of the segment derived from the leaf's own name.
    pub fn leaf_index(&self) -> usize {
        self.leaf
    }
}

/// Result of evaluating one leaf: a single value, or a named mapping that
/// gets unpacked into one output per entry.
#[derive(Debug)]
pub enum LeafOutput<V> {
    Single(V),
    Named(IndexMap<String, V>),
}

/// A callable leaf of a loss/metric tree.
pub trait SpecLeaf {
    type Value;

    /// Display name for the leaf, normalized to `lower_snake_case` by the
    /// traversal before it enters the path.
    fn leaf_name(&self) -> String;

    /// Evaluate the leaf against the step context.
    fn evaluate(&self, ctx: &StepContext<'_>) -> Result<LeafOutput<Self::Value>>;
}

/// A nested tree of callable leaves.
pub enum Spec<T> {
    Leaf(T),
    List(Vec<Spec<T>>),
    Named(IndexMap<String, Spec<T>>),
}

impl<T> Spec<T> {
    /// Ordered sequence of subtrees; siblings share their parent's path.
    pub fn list(items: impl IntoIterator<Item = Spec<T>>) -> Self {
        Spec::List(items.into_iter().collect())
    }

    /// Name → subtree mapping; each key becomes a path segment.
    pub fn named<K: Into<String>>(entries: impl IntoIterator<Item = (K, Spec<T>)>) -> Self {
        Spec::Named(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl<T: SpecLeaf> Spec<T> {
    /// Evaluate every leaf, yielding `(path, value)` pairs in traversal
    /// order.
    pub fn apply(&self, ctx: &StepContext<'_>) -> Result<Vec<(Path, T::Value)>> {
        let mut out = Vec::new();
        let mut prefix = Vec::new();
        self.walk(&mut prefix, ctx, &mut out)?;
        Ok(out)
    }

    fn walk(
        &self,
        prefix: &mut Vec<String>,
        ctx: &StepContext<'_>,
        out: &mut Vec<(Path, T::Value)>,
    ) -> Result<()> {
        match self {
            Spec::Leaf(leaf) => {
                let name = lower_snake_case(&leaf.leaf_name());
                let leaf_index = prefix.len();
                match leaf.evaluate(ctx)? {
                    LeafOutput::Single(value) => {
                        let mut segments = prefix.clone();
                        segments.push(name);
                        out.push((Path::new(segments, leaf_index), value));
                    }
                    LeafOutput::Named(values) => {
                        for (key, value) in values {
                            let mut segments = prefix.clone();
                            segments.push(name.clone());
                            segments.push(key);
                            out.push((Path::new(segments, leaf_index), value));
                        }
                    }
                }
            }
            Spec::List(items) => {
                for item in items {
                    item.walk(prefix, ctx, out)?;
                }
            }
            Spec::Named(entries) => {
                for (key, item) in entries {
                    prefix.push(key.clone());
                    item.walk(prefix, ctx, out)?;
                    prefix.pop();
                }
            }
        }
        Ok(())
    }
}
