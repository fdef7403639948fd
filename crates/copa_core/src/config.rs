//! Pipeline configuration
//!
//! Loaded from a TOML file with `[paths]`, `[flags]` and `[model]` sections.
//! Any omitted key takes its default.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Full pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub flags: StageFlags,
    pub model: ModelConfig,
}

/// Input and artifact locations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    /// Raw case records
    pub raw_data: PathBuf,
    /// Cleaned and featurized records
    pub clean_data: PathBuf,
    /// Binary model blob; its hash lands next to it
    pub model: PathBuf,
    /// Overall accuracy text report
    pub overall_accuracy: PathBuf,
    /// Accuracy by true class
    pub class_accuracy: PathBuf,
    /// Class prevalence in the held-out set
    pub prevalence: PathBuf,
    /// Feature importance, descending
    pub feature_importance: PathBuf,
    /// Every feature combination with its predicted finding
    pub app_data: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_data: PathBuf::from("data/copa_raw.csv"),
            clean_data: PathBuf::from("data/copa_clean.csv"),
            model: PathBuf::from("models/copa_model.bin"),
            overall_accuracy: PathBuf::from("models/overall_accuracy.txt"),
            class_accuracy: PathBuf::from("models/class_accuracy.csv"),
            prevalence: PathBuf::from("models/class_prevalence.csv"),
            feature_importance: PathBuf::from("models/feature_importance.csv"),
            app_data: PathBuf::from("data/copa_app_data.csv"),
        }
    }
}

/// Which stages run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StageFlags {
    pub clean: bool,
    pub model: bool,
    pub app_data: bool,
}

impl Default for StageFlags {
    fn default() -> Self {
        Self {
            clean: true,
            model: true,
            app_data: true,
        }
    }
}

/// Split, feature and classifier settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    pub features: Vec<String>,
    pub target: String,
    pub split_seed: u64,
    /// Fraction of rows held out for evaluation
    pub test_size: f64,
    pub fit_seed: u64,
    pub num_rounds: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    pub min_samples_split: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            features: [
                "POLICE_SHOOTING",
                "RACE_OF_COMPLAINANTS",
                "SEX_OF_COMPLAINANTS",
                "AGE_OF_COMPLAINANTS",
                "RACE_OF_INVOLVED_OFFICERS",
                "SEX_OF_INVOLVED_OFFICERS",
                "AGE_OF_INVOLVED_OFFICERS",
                "EXCESSIVE_FORCE",
                "YEARS_ON_FORCE_OF_INVOLVED_OFFICERS",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            target: "FINDING_CODE".to_string(),
            split_seed: 4,
            test_size: 0.25,
            fit_seed: 14,
            num_rounds: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
            min_samples_split: 2,
        }
    }
}

impl PipelineConfig {
    /// Load and validate configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;

        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings no stage could run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let model = &self.model;

        if model.features.is_empty() {
            return Err(ConfigError::Invalid("no feature columns configured".into()));
        }

        if model.target.trim().is_empty() {
            return Err(ConfigError::Invalid("target column is empty".into()));
        }

        if model.features.contains(&model.target) {
            return Err(ConfigError::Invalid(format!(
                "target {} is also listed as a feature",
                model.target
            )));
        }

        let mut seen = std::collections::HashSet::new();
        if let Some(dup) = model.features.iter().find(|f| !seen.insert(f.as_str())) {
            return Err(ConfigError::Invalid(format!("feature {dup} listed twice")));
        }

        if !(model.test_size > 0.0 && model.test_size < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "test_size must be in (0, 1), got {}",
                model.test_size
            )));
        }

        if !(model.learning_rate > 0.0 && model.learning_rate.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "learning_rate must be positive, got {}",
                model.learning_rate
            )));
        }

        if model.num_rounds == 0 || model.max_depth == 0 {
            return Err(ConfigError::Invalid(
                "num_rounds and max_depth must be at least 1".into(),
            ));
        }

        if model.min_samples_leaf == 0 || model.min_samples_split < 2 {
            return Err(ConfigError::Invalid(
                "min_samples_leaf must be >= 1 and min_samples_split >= 2".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.model.target, "FINDING_CODE");
        assert_eq!(config.model.features.len(), 9);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [flags]
            app_data = false

            [model]
            features = ["RACE_OF_COMPLAINANTS", "EXCESSIVE_FORCE"]
            test_size = 0.5
            "#,
        )
        .unwrap();

        assert!(!config.flags.app_data);
        assert!(config.flags.clean);
        assert_eq!(config.model.features.len(), 2);
        assert_eq!(config.model.fit_seed, 14);
        assert_eq!(config.paths, PathsConfig::default());
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut config = PipelineConfig::default();
        config.model.test_size = 1.0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.model.features.push("FINDING_CODE".into());
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.model.features.push("EXCESSIVE_FORCE".into());
        assert!(config.validate().is_err());

        assert!(PipelineConfig::from_toml_str("[model]\nfeatures = []").is_err());
    }

    #[test]
    fn test_config_save_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");

        let mut config = PipelineConfig::default();
        config.model.num_rounds = 10;
        config.save_to_file(&path).unwrap();

        let loaded = PipelineConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
