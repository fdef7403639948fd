//! CART (Classification and Regression Tree) builder
//!
//! Deterministic exact-greedy regression trees fitted to fixed-point
//! gradients and hessians. Split gain is
//! `G_left²/H_left + G_right²/H_right - G²/H`; leaf values are Newton steps
//! `-factor * G/H` at [`SCALE`].

use copa_core::{Node, Tree, SCALE};
use std::collections::BTreeMap;

use crate::deterministic::SplitTieBreaker;

/// Training parameters for a single tree
#[derive(Clone, Debug)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    pub min_samples_split: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            min_samples_leaf: 1,
            min_samples_split: 2,
        }
    }
}

/// Leaf values are clamped to this magnitude
const LEAF_LIMIT: i64 = 32 * SCALE;

/// Running gradient/hessian totals for a set of samples
#[derive(Clone, Copy, Debug, Default)]
struct GradStats {
    grad: i128,
    hess: i128,
    count: usize,
}

impl GradStats {
    fn add(&mut self, grad: i64, hess: i64) {
        self.grad += grad as i128;
        self.hess += hess as i128;
        self.count += 1;
    }

    fn minus(&self, other: &GradStats) -> GradStats {
        GradStats {
            grad: self.grad - other.grad,
            hess: self.hess - other.hess,
            count: self.count - other.count,
        }
    }

    fn score(&self) -> i128 {
        if self.hess > 0 {
            self.grad * self.grad / self.hess
        } else {
            0
        }
    }
}

/// Split candidate with gain and tie-breaker
#[derive(Debug, Clone)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: i64,
    gain: i128,
    tie_breaker: SplitTieBreaker,
}

impl SplitCandidate {
    fn beats(&self, other: &SplitCandidate) -> bool {
        self.gain > other.gain || (self.gain == other.gain && self.tie_breaker < other.tie_breaker)
    }
}

/// A fitted tree and the total split gain credited to each feature
#[derive(Debug, Clone)]
pub struct BuiltTree {
    pub tree: Tree,
    pub feature_gains: Vec<i128>,
}

/// Build one regression tree over a fixed sample set
pub struct CartBuilder<'a> {
    config: TreeConfig,
    features: &'a [Vec<i64>],
    gradients: &'a [i64],
    hessians: &'a [i64],
    feature_order: &'a [usize],
    leaf_factor: (i64, i64),
}

impl<'a> CartBuilder<'a> {
    /// `feature_order` is the seeded visiting order used to break gain ties;
    /// `leaf_factor` is the `(numerator, denominator)` applied to Newton steps.
    pub fn new(
        features: &'a [Vec<i64>],
        gradients: &'a [i64],
        hessians: &'a [i64],
        feature_order: &'a [usize],
        leaf_factor: (i64, i64),
        config: TreeConfig,
    ) -> Self {
        debug_assert_eq!(features.len(), gradients.len());
        debug_assert_eq!(features.len(), hessians.len());

        Self {
            config,
            features,
            gradients,
            hessians,
            feature_order,
            leaf_factor,
        }
    }

    fn feature_count(&self) -> usize {
        self.features.first().map_or(0, Vec::len)
    }

    /// Build the tree for `class_idx` with shrinkage `weight`
    pub fn build(&self, class_idx: u32, weight: i64) -> BuiltTree {
        let mut nodes = Vec::new();
        let mut feature_gains = vec![0i128; self.feature_count()];
        let indices: Vec<usize> = (0..self.features.len()).collect();

        self.build_node(&indices, 0, &mut nodes, &mut feature_gains);

        BuiltTree {
            tree: Tree::new(nodes, weight, class_idx),
            feature_gains,
        }
    }

    fn build_node(
        &self,
        indices: &[usize],
        depth: usize,
        nodes: &mut Vec<Node>,
        feature_gains: &mut [i128],
    ) -> i32 {
        let current_idx = nodes.len() as i32;
        let stats = self.sum_stats(indices);

        let split = if depth >= self.config.max_depth
            || indices.len() < self.config.min_samples_split
            || indices.len() < 2 * self.config.min_samples_leaf
        {
            None
        } else {
            self.find_best_split(indices, &stats)
        };

        let Some(split) = split else {
            nodes.push(Node::leaf(current_idx, self.leaf_value(&stats)));
            return current_idx;
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| self.features[i][split.feature_idx] <= split.threshold);

        feature_gains[split.feature_idx] += split.gain;

        // Reserve the slot; children are linked once built
        nodes.push(Node::internal(
            current_idx,
            split.feature_idx as i32,
            split.threshold,
            -1,
            -1,
        ));

        let left_idx = self.build_node(&left_indices, depth + 1, nodes, feature_gains);
        let right_idx = self.build_node(&right_indices, depth + 1, nodes, feature_gains);

        let node = &mut nodes[current_idx as usize];
        node.left = left_idx;
        node.right = right_idx;

        current_idx
    }

    /// Best positive-gain split over all features and thresholds
    fn find_best_split(&self, indices: &[usize], parent: &GradStats) -> Option<SplitCandidate> {
        let mut best: Option<SplitCandidate> = None;
        let parent_score = parent.score();

        for (rank, &feature_idx) in self.feature_order.iter().enumerate() {
            // Per distinct value totals, ascending
            let mut histogram: BTreeMap<i64, GradStats> = BTreeMap::new();
            for &i in indices {
                histogram
                    .entry(self.features[i][feature_idx])
                    .or_default()
                    .add(self.gradients[i], self.hessians[i]);
            }

            if histogram.len() < 2 {
                continue;
            }

            let mut left = GradStats::default();
            for (&threshold, bucket) in histogram.iter() {
                left.grad += bucket.grad;
                left.hess += bucket.hess;
                left.count += bucket.count;

                let right = parent.minus(&left);
                if right.count == 0 {
                    break;
                }
                if left.count < self.config.min_samples_leaf
                    || right.count < self.config.min_samples_leaf
                {
                    continue;
                }

                let gain = left.score() + right.score() - parent_score;
                if gain <= 0 {
                    continue;
                }

                let candidate = SplitCandidate {
                    feature_idx,
                    threshold,
                    gain,
                    tie_breaker: SplitTieBreaker::new(rank, threshold),
                };

                if best.as_ref().map_or(true, |current| candidate.beats(current)) {
                    best = Some(candidate);
                }
            }
        }

        best
    }

    fn sum_stats(&self, indices: &[usize]) -> GradStats {
        let mut stats = GradStats::default();
        for &i in indices {
            stats.add(self.gradients[i], self.hessians[i]);
        }
        stats
    }

    /// Newton step `-factor * G / H` at SCALE
    fn leaf_value(&self, stats: &GradStats) -> i64 {
        if stats.hess <= 0 {
            return 0;
        }

        let (num, den) = self.leaf_factor;
        let value = -(stats.grad * SCALE as i128 * num as i128) / (stats.hess * den as i128);
        value.clamp(-LEAF_LIMIT as i128, LEAF_LIMIT as i128) as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(features: &[Vec<i64>], gradients: &[i64], config: TreeConfig) -> BuiltTree {
        let hessians = vec![SCALE / 4; gradients.len()];
        let order: Vec<usize> = (0..features[0].len()).collect();
        CartBuilder::new(features, gradients, &hessians, &order, (1, 1), config).build(0, SCALE)
    }

    #[test]
    fn test_splits_on_informative_feature() {
        // Feature 1 separates the gradients, feature 0 is noise.
        let features = vec![
            vec![0, 0],
            vec![SCALE, 0],
            vec![0, SCALE],
            vec![SCALE, SCALE],
        ];
        let gradients = vec![SCALE / 2, SCALE / 2, -SCALE / 2, -SCALE / 2];

        let built = build(&features, &gradients, TreeConfig { max_depth: 1, ..Default::default() });
        let root = &built.tree.nodes[0];

        assert_eq!(root.feature_idx, 1);
        assert_eq!(root.threshold, 0);
        assert!(built.feature_gains[1] > 0);
        assert_eq!(built.feature_gains[0], 0);

        // Left rows have positive gradients, so the step is negative.
        assert!(built.tree.evaluate(&[0, 0]) < 0);
        assert!(built.tree.evaluate(&[0, SCALE]) > 0);
        assert!(built.tree.validate(2).is_ok());
    }

    #[test]
    fn test_leaf_only_tree() {
        let built = build(&[vec![SCALE]], &[-SCALE / 2], TreeConfig::default());

        assert_eq!(built.tree.nodes.len(), 1);
        assert_eq!(built.tree.nodes[0].leaf, Some(2 * SCALE));
    }

    #[test]
    fn test_constant_features_yield_leaf() {
        let features = vec![vec![0], vec![0], vec![0]];
        let built = build(&features, &[SCALE, -SCALE, SCALE], TreeConfig::default());
        assert_eq!(built.tree.split_count(), 0);
    }

    #[test]
    fn test_min_samples_leaf_respected() {
        let features = vec![vec![0], vec![SCALE], vec![SCALE], vec![SCALE]];
        let gradients = vec![SCALE, -SCALE, -SCALE, -SCALE];
        let config = TreeConfig {
            min_samples_leaf: 2,
            ..Default::default()
        };

        let built = build(&features, &gradients, config);
        assert_eq!(built.tree.split_count(), 0);
    }

    #[test]
    fn test_ties_follow_feature_order() {
        // Both features carry identical signal; the visiting order decides.
        let features = vec![vec![0, 0], vec![SCALE, SCALE]];
        let gradients = vec![SCALE, -SCALE];
        let hessians = vec![SCALE / 4; 2];
        let config = TreeConfig {
            max_depth: 1,
            ..Default::default()
        };

        let forward = [0, 1];
        let reverse = [1, 0];
        let a = CartBuilder::new(&features, &gradients, &hessians, &forward, (1, 1), config.clone())
            .build(0, SCALE);
        let b = CartBuilder::new(&features, &gradients, &hessians, &reverse, (1, 1), config)
            .build(0, SCALE);

        assert_eq!(a.tree.nodes[0].feature_idx, 0);
        assert_eq!(b.tree.nodes[0].feature_idx, 1);
    }
}
