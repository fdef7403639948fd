//! Gradient Boosted Decision Tree (GBDT) classifier trainer
//!
//! Multiclass log-loss boosting: every round fits one regression tree per
//! class to the softmax residuals, with Newton leaf steps scaled by
//! `(K - 1) / K`. Raw scores, leaves and shrinkage are fixed-point, so the
//! training trajectory matches inference exactly and a seed reproduces the
//! same model bit for bit.

use copa_core::{ClassifierModel, SCALE};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::cart::{CartBuilder, TreeConfig};
use crate::deterministic::LcgRng;
use crate::errors::TrainerError;

/// Smallest hessian per sample, keeps Newton steps finite
const MIN_HESSIAN: i64 = 1;

/// Classifier hyper-parameters
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingParams {
    pub num_rounds: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            num_rounds: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
            min_samples_split: 2,
            seed: 14,
        }
    }
}

impl TrainingParams {
    /// Shrinkage as a fixed-point tree weight
    pub fn learning_rate_fixed(&self) -> i64 {
        (self.learning_rate * SCALE as f64).round() as i64
    }
}

/// GBDT classifier trainer
pub struct GbdtTrainer {
    params: TrainingParams,
}

impl GbdtTrainer {
    pub fn new(params: TrainingParams) -> Self {
        Self { params }
    }

    /// Fit a classifier on an encoded matrix and its labels
    pub fn train(
        &self,
        features: &[Vec<i64>],
        labels: &[String],
        feature_names: Vec<String>,
    ) -> Result<ClassifierModel, TrainerError> {
        self.check_inputs(features, labels, &feature_names)?;

        let n_samples = features.len();
        let feature_count = feature_names.len();

        // Sorted labels give a stable class index
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for label in labels {
            *counts.entry(label.as_str()).or_default() += 1;
        }
        let classes: Vec<String> = counts.keys().map(|c| c.to_string()).collect();
        let class_of: BTreeMap<&str, usize> =
            counts.keys().enumerate().map(|(i, &c)| (c, i)).collect();
        let targets: Vec<usize> = labels.iter().map(|l| class_of[l.as_str()]).collect();
        let n_classes = classes.len();

        let init_scores: Vec<i64> = counts
            .values()
            .map(|&count| to_fixed((count as f64 / n_samples as f64).ln()))
            .collect();

        info!(
            "Training on {} samples, {} features, {} classes",
            n_samples, feature_count, n_classes
        );

        let mut raw: Vec<Vec<i64>> = vec![init_scores.clone(); n_samples];
        let mut trees = Vec::new();
        let mut gains = vec![0i128; feature_count];

        if n_classes < 2 {
            info!("Single class {:?}, no trees fitted", classes[0]);
        } else {
            let weight = self.params.learning_rate_fixed();
            let leaf_factor = (n_classes as i64 - 1, n_classes as i64);
            let tree_config = TreeConfig {
                max_depth: self.params.max_depth,
                min_samples_leaf: self.params.min_samples_leaf,
                min_samples_split: self.params.min_samples_split,
            };
            let mut rng = LcgRng::new(self.params.seed);

            for round in 0..self.params.num_rounds {
                debug!("Boosting round {}/{}", round + 1, self.params.num_rounds);

                let probabilities: Vec<Vec<f64>> = raw.iter().map(|r| softmax(r)).collect();

                for class_idx in 0..n_classes {
                    let (gradients, hessians) =
                        class_gradients(&probabilities, &targets, class_idx);
                    let order = rng.permutation(feature_count);

                    let built = CartBuilder::new(
                        features,
                        &gradients,
                        &hessians,
                        &order,
                        leaf_factor,
                        tree_config.clone(),
                    )
                    .build(class_idx as u32, weight);

                    for (row, scores) in features.iter().zip(raw.iter_mut()) {
                        let step = built.tree.evaluate(row) as i128 * weight as i128 / SCALE as i128;
                        scores[class_idx] = scores[class_idx].saturating_add(step as i64);
                    }

                    for (total, gain) in gains.iter_mut().zip(&built.feature_gains) {
                        *total += gain;
                    }
                    trees.push(built.tree);
                }
            }
        }

        let model = ClassifierModel::new(
            classes,
            feature_names,
            init_scores,
            trees,
            normalize_importances(&gains),
            self.params.seed,
        );
        model
            .validate()
            .map_err(|e| TrainerError::Training(e.to_string()))?;

        info!("Model fit: {} trees", model.num_trees());
        Ok(model)
    }

    fn check_inputs(
        &self,
        features: &[Vec<i64>],
        labels: &[String],
        feature_names: &[String],
    ) -> Result<(), TrainerError> {
        if features.is_empty() {
            return Err(TrainerError::Training("no training rows".into()));
        }

        if features.len() != labels.len() {
            return Err(TrainerError::Training(format!(
                "found input variables with inconsistent numbers of samples: {} rows, {} labels",
                features.len(),
                labels.len()
            )));
        }

        if let Some((row, width)) = features
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|&(_, w)| w != feature_names.len())
        {
            return Err(TrainerError::Training(format!(
                "row {} has shape {}, expected {} features",
                row,
                width,
                feature_names.len()
            )));
        }

        if self.params.num_rounds == 0 || self.params.max_depth == 0 {
            return Err(TrainerError::Training(
                "num_rounds and max_depth must be at least 1".into(),
            ));
        }

        if !(self.params.learning_rate > 0.0 && self.params.learning_rate.is_finite()) {
            return Err(TrainerError::Training(format!(
                "invalid learning rate {}",
                self.params.learning_rate
            )));
        }

        Ok(())
    }
}

fn to_fixed(value: f64) -> i64 {
    (value * SCALE as f64).round() as i64
}

/// Class probabilities from fixed-point raw scores
fn softmax(raw: &[i64]) -> Vec<f64> {
    let max = raw.iter().copied().max().unwrap_or(0);
    let exps: Vec<f64> = raw
        .iter()
        .map(|&s| ((s - max) as f64 / SCALE as f64).exp())
        .collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

/// Fixed-point log-loss gradient `p - y` and hessian `p (1 - p)` for one class
fn class_gradients(
    probabilities: &[Vec<f64>],
    targets: &[usize],
    class_idx: usize,
) -> (Vec<i64>, Vec<i64>) {
    probabilities
        .iter()
        .zip(targets)
        .map(|(p, &target)| {
            let p = p[class_idx];
            let y = if target == class_idx { 1.0 } else { 0.0 };
            let gradient = to_fixed(p - y);
            let hessian = to_fixed(p * (1.0 - p)).max(MIN_HESSIAN);
            (gradient, hessian)
        })
        .unzip()
}

/// Scale total gains so they sum to SCALE (all zero when nothing split)
fn normalize_importances(gains: &[i128]) -> Vec<i64> {
    let total: i128 = gains.iter().sum();
    if total <= 0 {
        return vec![0; gains.len()];
    }
    gains
        .iter()
        .map(|&g| (g * SCALE as i128 / total) as i64)
        .collect()
}
