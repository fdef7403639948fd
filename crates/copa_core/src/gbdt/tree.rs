//! Regression trees for the boosted classifier
//!
//! Nodes hold fixed-point thresholds and leaf values at [`super::SCALE`].

use serde::{Deserialize, Serialize};

/// A tree node, either a split or a leaf
///
/// Splits send a row left when `features[feature_idx] <= threshold`.
/// Leaves carry `feature_idx == -1` and a `leaf` value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Node {
    pub id: i32,
    pub left: i32,
    pub right: i32,
    pub feature_idx: i32,
    pub threshold: i64,
    pub leaf: Option<i64>,
}

impl Node {
    pub fn internal(id: i32, feature_idx: i32, threshold: i64, left: i32, right: i32) -> Self {
        Self {
            id,
            left,
            right,
            feature_idx,
            threshold,
            leaf: None,
        }
    }

    pub fn leaf(id: i32, value: i64) -> Self {
        Self {
            id,
            left: -1,
            right: -1,
            feature_idx: -1,
            threshold: 0,
            leaf: Some(value),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.feature_idx == -1 || self.leaf.is_some()
    }
}

/// One boosting stage for one class
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Tree {
    /// Node 0 is the root
    pub nodes: Vec<Node>,

    /// Shrinkage applied to leaf values (fixed-point)
    pub weight: i64,

    /// Class whose raw score this tree contributes to
    pub class_idx: u32,
}

impl Tree {
    pub fn new(nodes: Vec<Node>, weight: i64, class_idx: u32) -> Self {
        Self {
            nodes,
            weight,
            class_idx,
        }
    }

    /// Leaf value reached by a feature vector, 0 on a malformed path
    pub fn evaluate(&self, features: &[i64]) -> i64 {
        let mut idx = 0usize;

        loop {
            let Some(node) = self.nodes.get(idx) else {
                return 0;
            };

            if node.is_leaf() {
                return node.leaf.unwrap_or(0);
            }

            let Some(&value) = features.get(node.feature_idx as usize) else {
                return 0;
            };

            let next = if value <= node.threshold {
                node.left
            } else {
                node.right
            };

            if next < 0 {
                return 0;
            }
            idx = next as usize;
        }
    }

    /// Number of split nodes
    pub fn split_count(&self) -> usize {
        self.nodes.iter().filter(|n| !n.is_leaf()).count()
    }

    /// Check child links, feature indices and leaf values
    pub fn validate(&self, feature_count: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("Tree has no nodes".to_string());
        }

        for (i, node) in self.nodes.iter().enumerate() {
            if node.is_leaf() {
                if node.leaf.is_none() {
                    return Err(format!("Leaf node {i} has no leaf value"));
                }
                continue;
            }

            for child in [node.left, node.right] {
                if child <= i as i32 || child as usize >= self.nodes.len() {
                    return Err(format!("Node {i} has invalid child: {child}"));
                }
            }

            if node.feature_idx < 0 || node.feature_idx as usize >= feature_count {
                return Err(format!(
                    "Node {} splits on feature {} of {}",
                    i, node.feature_idx, feature_count
                ));
            }
        }

        Ok(())
    }
}
