//! Boosted one-vs-all classifier with fixed-point inference
//!
//! Each class owns a sequence of regression trees. A row's raw score for a
//! class is that class's initial score plus every tree's weighted leaf
//! value; the predicted label is the class with the highest raw score,
//! lowest class index on ties. All inference arithmetic is integer-only.

use super::tree::Tree;
use crate::serde_canon::{hash_canonical_hex, CanonicalError};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Model errors
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model validation failed: {0}")]
    ValidationFailed(String),

    #[error("expected {expected} features, got {found}")]
    FeatureCount { expected: usize, found: usize },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Encoding error: {0}")]
    EncodeError(#[from] bincode::Error),

    #[error("Canonical serialization error: {0}")]
    CanonicalError(#[from] CanonicalError),
}

/// Fixed-point unit (1e6)
pub const SCALE: i64 = 1_000_000;

/// Current on-disk format version
pub const MODEL_VERSION: i32 = 1;

/// Trained gradient-boosted classifier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassifierModel {
    pub version: i32,
    pub scale: i64,

    /// Class labels, sorted; a tree's `class_idx` indexes this list
    pub classes: Vec<String>,

    /// Encoded feature names, one per input column
    pub feature_names: Vec<String>,

    /// Per-class starting raw score (log prior, fixed-point)
    pub init_scores: Vec<i64>,

    /// Trees in boosting order
    pub trees: Vec<Tree>,

    /// Normalized split-gain importance per feature (fixed-point, sums to ~scale)
    pub importances: Vec<i64>,

    /// Seed the model was fitted with
    pub seed: u64,
}

impl ClassifierModel {
    pub fn new(
        classes: Vec<String>,
        feature_names: Vec<String>,
        init_scores: Vec<i64>,
        trees: Vec<Tree>,
        importances: Vec<i64>,
        seed: u64,
    ) -> Self {
        Self {
            version: MODEL_VERSION,
            scale: SCALE,
            classes,
            feature_names,
            init_scores,
            trees,
            importances,
            seed,
        }
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn num_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Validate model structure
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.version != MODEL_VERSION {
            return Err(ModelError::ValidationFailed(format!(
                "Unsupported model version: {}",
                self.version
            )));
        }

        if self.scale <= 0 {
            return Err(ModelError::ValidationFailed(format!(
                "Invalid scale: {}",
                self.scale
            )));
        }

        if self.classes.is_empty() {
            return Err(ModelError::ValidationFailed("Model has no classes".into()));
        }

        if self.init_scores.len() != self.classes.len() {
            return Err(ModelError::ValidationFailed(format!(
                "{} initial scores for {} classes",
                self.init_scores.len(),
                self.classes.len()
            )));
        }

        if self.importances.len() != self.feature_names.len() {
            return Err(ModelError::ValidationFailed(format!(
                "{} importances for {} features",
                self.importances.len(),
                self.feature_names.len()
            )));
        }

        for (i, tree) in self.trees.iter().enumerate() {
            if tree.class_idx as usize >= self.classes.len() {
                return Err(ModelError::ValidationFailed(format!(
                    "Tree {} targets class {} of {}",
                    i,
                    tree.class_idx,
                    self.classes.len()
                )));
            }
            tree.validate(self.feature_names.len()).map_err(|e| {
                ModelError::ValidationFailed(format!("Tree {} validation failed: {}", i, e))
            })?;
        }

        Ok(())
    }

    /// Raw per-class scores for one encoded row
    pub fn raw_scores(&self, features: &[i64]) -> Result<Vec<i64>, ModelError> {
        if features.len() != self.feature_names.len() {
            return Err(ModelError::FeatureCount {
                expected: self.feature_names.len(),
                found: features.len(),
            });
        }

        let mut scores = self.init_scores.clone();
        for tree in &self.trees {
            let leaf_value = tree.evaluate(features);
            let contribution = (leaf_value as i128 * tree.weight as i128 / self.scale as i128) as i64;
            let slot = &mut scores[tree.class_idx as usize];
            *slot = slot.saturating_add(contribution);
        }

        Ok(scores)
    }

    /// Index of the predicted class for one encoded row
    pub fn predict_index(&self, features: &[i64]) -> Result<usize, ModelError> {
        let scores = self.raw_scores(features)?;
        let mut best = 0;
        for (idx, &score) in scores.iter().enumerate().skip(1) {
            if score > scores[best] {
                best = idx;
            }
        }
        Ok(best)
    }

    /// Predicted label for one encoded row
    pub fn predict(&self, features: &[i64]) -> Result<&str, ModelError> {
        let idx = self.predict_index(features)?;
        Ok(&self.classes[idx])
    }

    /// Predicted labels for an encoded matrix
    pub fn predict_batch(&self, rows: &[Vec<i64>]) -> Result<Vec<&str>, ModelError> {
        rows.iter().map(|row| self.predict(row)).collect()
    }

    /// `(feature_name, importance)` pairs in feature order
    pub fn feature_importances(&self) -> Vec<(&str, f64)> {
        self.feature_names
            .iter()
            .zip(&self.importances)
            .map(|(name, &value)| (name.as_str(), value as f64 / self.scale as f64))
            .collect()
    }

    /// BLAKE3 of the canonical JSON form
    pub fn hash_hex(&self) -> Result<String, ModelError> {
        Ok(hash_canonical_hex(self)?)
    }

    /// Write the binary model to `path` and its hash to `<path>.hash`
    ///
    /// Returns the hash.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<String, ModelError> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(&mut writer, self)?;
        writer.flush()?;

        let hash = self.hash_hex()?;
        std::fs::write(hash_path(path), &hash)?;
        Ok(hash)
    }

    /// Read and validate a binary model
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let model: ClassifierModel = bincode::deserialize_from(reader)?;
        model.validate()?;
        Ok(model)
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }
}

/// Sidecar path holding the hash of a saved model
pub fn hash_path(model_path: &Path) -> PathBuf {
    let mut raw: OsString = model_path.as_os_str().to_owned();
    raw.push(".hash");
    PathBuf::from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gbdt::tree::Node;

    fn two_class_model() -> ClassifierModel {
        // Feature 0 set pushes towards "Sustained", unset towards "Not Sustained".
        let tree_a = Tree::new(
            vec![
                Node::internal(0, 0, 0, 1, 2),
                Node::leaf(1, 2 * SCALE),
                Node::leaf(2, -2 * SCALE),
            ],
            SCALE,
            0,
        );
        let tree_b = Tree::new(
            vec![
                Node::internal(0, 0, 0, 1, 2),
                Node::leaf(1, -2 * SCALE),
                Node::leaf(2, 2 * SCALE),
            ],
            SCALE,
            1,
        );

        ClassifierModel::new(
            vec!["Not Sustained".into(), "Sustained".into()],
            vec!["F_a".into(), "F_b".into()],
            vec![0, 0],
            vec![tree_a, tree_b],
            vec![SCALE, 0],
            14,
        )
    }

    #[test]
    fn test_model_creation() {
        let model = two_class_model();
        assert_eq!(model.num_classes(), 2);
        assert_eq!(model.num_trees(), 2);
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_predict() {
        let model = two_class_model();
        assert_eq!(model.predict(&[0, SCALE]).unwrap(), "Not Sustained");
        assert_eq!(model.predict(&[SCALE, 0]).unwrap(), "Sustained");

        let batch = model.predict_batch(&[vec![0, 0], vec![SCALE, SCALE]]).unwrap();
        assert_eq!(batch, vec!["Not Sustained", "Sustained"]);
    }

    #[test]
    fn test_ties_pick_lowest_class() {
        let mut model = two_class_model();
        model.trees.clear();
        assert_eq!(model.predict_index(&[0, 0]).unwrap(), 0);
    }

    #[test]
    fn test_wrong_width_rejected() {
        let model = two_class_model();
        assert!(matches!(
            model.predict(&[0]),
            Err(ModelError::FeatureCount { expected: 2, found: 1 })
        ));
    }

    #[test]
    fn test_feature_importances_aligned() {
        let model = two_class_model();
        let importances = model.feature_importances();
        assert_eq!(importances, vec![("F_a", 1.0), ("F_b", 0.0)]);
    }

    #[test]
    fn test_validation_catches_bad_class_index() {
        let mut model = two_class_model();
        model.trees[1].class_idx = 5;
        assert!(model.validate().is_err());

        let mut model = two_class_model();
        model.init_scores.pop();
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_save_load_round_trip() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("model.bin");

        let model = two_class_model();
        let hash = model.save(&path)?;

        let loaded = ClassifierModel::load(&path)?;
        assert_eq!(loaded, model);
        assert_eq!(std::fs::read_to_string(hash_path(&path))?, hash);
        assert_eq!(loaded.hash_hex()?, hash);
        Ok(())
    }
}
