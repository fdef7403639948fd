use copa_core::{ConfigError, ModelError, TableError};
use thiserror::Error;

use crate::encoder::EncodeError;

/// Errors returned by the classifier trainer and the train/test splitter.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("training error: {0}")]
    Training(String),

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Errors computing or writing one evaluation metric.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("no held-out rows to evaluate")]
    Empty,

    #[error("{truth} true labels but {predicted} predictions")]
    LengthMismatch { truth: usize, predicted: usize },

    #[error("model has {model} features but encoder produces {encoder}")]
    FeatureMismatch { model: usize, encoder: usize },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stage failures surfaced to the pipeline driver.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("table: {0}")]
    Table(#[from] TableError),

    #[error("encoding: {0}")]
    Encode(#[from] EncodeError),

    #[error("trainer: {0}")]
    Trainer(#[from] TrainerError),

    #[error("model: {0}")]
    Model(#[from] ModelError),

    #[error("evaluation: {0}")]
    Eval(#[from] EvalError),

    #[error("combinations: {0}")]
    Combinations(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
