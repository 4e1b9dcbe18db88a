//! Input records for the exporters
//!
//! Trained models are handed over as plain parallel arrays so that any
//! training pipeline can populate them without linking a modelling library.
//!
//! A tree is a flattened node array: node `i` is described by
//! `threshold[i]`, `feature[i]`, `children_left[i]`, `children_right[i]`
//! and its class-count vector `value[i]`. Leaves carry [`TREE_LEAF`] in
//! both child slots and [`TREE_UNDEFINED`] as their split feature and
//! threshold.
//!
//! A one-vs-one linear model holds one hyperplane per unordered class pair,
//! indexed in the order produced by [`one_vs_one_pairs`].

use serde::{Deserialize, Serialize};

use crate::errors::{ExportError, Result};

/// Child id marking "no child"
pub const TREE_LEAF: i64 = -1;

/// Feature id and threshold carried by leaf nodes
pub const TREE_UNDEFINED: i64 = -2;

/// Flattened binary decision tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TreeArrays {
    /// Split value per node
    pub threshold: Vec<f64>,
    /// Split feature per node
    pub feature: Vec<i64>,
    /// Left child id per node ([`TREE_LEAF`] for leaves)
    pub children_left: Vec<i64>,
    /// Right child id per node ([`TREE_LEAF`] for leaves)
    pub children_right: Vec<i64>,
    /// Class counts (or weights) per node
    pub value: Vec<Vec<f64>>,
}

impl TreeArrays {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a split node and return its id
    pub fn push_split(
        &mut self,
        feature: i64,
        threshold: f64,
        left: i64,
        right: i64,
        value: Vec<f64>,
    ) -> i64 {
        self.threshold.push(threshold);
        self.feature.push(feature);
        self.children_left.push(left);
        self.children_right.push(right);
        self.value.push(value);
        (self.threshold.len() - 1) as i64
    }

    /// Append a leaf node and return its id
    pub fn push_leaf(&mut self, value: Vec<f64>) -> i64 {
        self.push_split(
            TREE_UNDEFINED,
            TREE_UNDEFINED as f64,
            TREE_LEAF,
            TREE_LEAF,
            value,
        )
    }

    /// Number of nodes in the node array
    pub fn node_count(&self) -> usize {
        self.threshold.len()
    }

    /// Width of the class-count vectors
    pub fn class_count(&self) -> usize {
        self.value.first().map_or(0, Vec::len)
    }

    /// Whether `node` is a leaf, `None` when the id is out of range
    pub fn is_leaf(&self, node: usize) -> Option<bool> {
        let left = *self.children_left.get(node)?;
        let right = *self.children_right.get(node)?;
        Some(left == TREE_LEAF && right == TREE_LEAF)
    }

    /// Check array shapes only
    pub fn validate_shape(&self) -> Result<()> {
        let node_count = self.node_count();
        if node_count == 0 {
            return Err(ExportError::InvalidTree("tree has no nodes".to_string()));
        }

        let lengths = [
            ("feature", self.feature.len()),
            ("children_left", self.children_left.len()),
            ("children_right", self.children_right.len()),
            ("value", self.value.len()),
        ];
        for (name, len) in lengths {
            if len != node_count {
                return Err(ExportError::ShapeMismatch(format!(
                    "{name} has {len} entries but threshold has {node_count}"
                )));
            }
        }

        let width = self.class_count();
        if width == 0 {
            return Err(ExportError::ShapeMismatch(
                "class-count vectors are empty".to_string(),
            ));
        }
        if let Some((node, row)) = self
            .value
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != width)
        {
            return Err(ExportError::ShapeMismatch(format!(
                "node {node} has {} class counts, expected {width}",
                row.len()
            )));
        }

        Ok(())
    }

    /// Check that child links describe a binary tree rooted at node 0.
    ///
    /// Every child id is the leaf sentinel or an in-range id, nodes have both
    /// children or neither, no node has two parents, the root has none, and
    /// every node is reachable from the root. Expects a valid shape.
    pub fn validate_links(&self) -> Result<()> {
        let node_count = self.node_count() as i64;
        let mut parent: Vec<Option<usize>> = vec![None; self.node_count()];

        for node in 0..self.node_count() {
            let left = self.children_left[node];
            let right = self.children_right[node];

            if (left == TREE_LEAF) != (right == TREE_LEAF) {
                return Err(ExportError::InvalidTree(format!(
                    "node {node} has exactly one child ({left}, {right})"
                )));
            }

            for child in [left, right] {
                if child == TREE_LEAF {
                    continue;
                }
                if child < 0 || child >= node_count {
                    return Err(ExportError::InvalidTree(format!(
                        "node {node} links to missing node {child}"
                    )));
                }
                if child as usize == node {
                    return Err(ExportError::InvalidTree(format!(
                        "node {node} links to itself"
                    )));
                }
                if child == 0 {
                    return Err(ExportError::InvalidTree(format!(
                        "node {node} links back to the root"
                    )));
                }
                if let Some(first) = parent[child as usize] {
                    return Err(ExportError::InvalidTree(format!(
                        "node {child} has two parents ({first} and {node})"
                    )));
                }
                parent[child as usize] = Some(node);
            }
        }

        // Unique parents still allow detached cycles
        // so every node must also hang off the root.
        let mut reached = vec![false; self.node_count()];
        let mut stack = vec![0usize];
        while let Some(node) = stack.pop() {
            reached[node] = true;
            for child in [self.children_left[node], self.children_right[node]] {
                if child != TREE_LEAF {
                    stack.push(child as usize);
                }
            }
        }
        if let Some(node) = reached.iter().position(|&seen| !seen) {
            return Err(ExportError::InvalidTree(format!(
                "node {node} is not reachable from the root"
            )));
        }

        Ok(())
    }

    /// Full structural validation
    pub fn validate(&self) -> Result<()> {
        self.validate_shape()?;
        self.validate_links()
    }
}

/// Fitted one-vs-one linear classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PairwiseLinearModel {
    /// Ordered class labels
    pub classes: Vec<String>,
    /// Bias per class pair
    pub intercept: Vec<f64>,
    /// Weight vector per class pair
    pub coef: Vec<Vec<f64>>,
}

impl PairwiseLinearModel {
    pub fn new(classes: Vec<String>, intercept: Vec<f64>, coef: Vec<Vec<f64>>) -> Self {
        Self {
            classes,
            intercept,
            coef,
        }
    }

    /// Number of class pairs, `C*(C-1)/2`
    pub fn pair_count(&self) -> usize {
        pair_count(self.classes.len())
    }

    /// Width of the coefficient matrix
    pub fn feature_count(&self) -> usize {
        self.coef.first().map_or(0, Vec::len)
    }

    pub fn validate(&self) -> Result<()> {
        let classes = self.classes.len();
        if classes < 2 {
            return Err(ExportError::ShapeMismatch(format!(
                "one-vs-one model needs at least 2 classes, got {classes}"
            )));
        }

        let pairs = self.pair_count();
        if self.intercept.len() != pairs {
            return Err(ExportError::ShapeMismatch(format!(
                "intercept has {} entries, expected {pairs} for {classes} classes",
                self.intercept.len()
            )));
        }
        if self.coef.len() != self.intercept.len() {
            return Err(ExportError::ShapeMismatch(format!(
                "coef has {} rows but intercept has {} entries",
                self.coef.len(),
                self.intercept.len()
            )));
        }

        let width = self.feature_count();
        if let Some((pair, row)) = self
            .coef
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != width)
        {
            return Err(ExportError::ShapeMismatch(format!(
                "coef row {pair} has {} coefficients, expected {width}",
                row.len()
            )));
        }

        Ok(())
    }
}

/// Number of unordered pairs among `classes` classes
pub fn pair_count(classes: usize) -> usize {
    classes * classes.saturating_sub(1) / 2
}

/// One-vs-one pair enumeration: `i` ascending, then `j` from `i + 1`.
///
/// Downstream consumers index pairwise rows positionally, so this order
/// must not change.
pub fn one_vs_one_pairs(classes: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..classes).flat_map(move |i| (i + 1..classes).map(move |j| (i, j)))
}

/// Index of the largest value, lowest index on ties. NaN entries are skipped.
pub fn argmax_first(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &val) in values.iter().enumerate() {
        if val.is_nan() {
            continue;
        }
        match best {
            Some((_, current)) if val <= current => {}
            _ => best = Some((idx, val)),
        }
    }
    best.map(|(idx, _)| idx)
}
