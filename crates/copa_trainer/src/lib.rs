//! COPA case outcome trainer
//!
//! Cleans raw complaint records, one-hot encodes demographic features, fits
//! a deterministic GBDT classifier of the final finding, evaluates it on a
//! held-out split and scores every feature combination.

pub mod cart;
pub mod combinations;
pub mod dataset;
pub mod deterministic;
pub mod encoder;
pub mod errors;
pub mod evaluate;
pub mod features;
pub mod filter;
pub mod pipeline;
pub mod schema;
pub mod trainer;

pub use combinations::{score_combinations, unique_combinations, write_combinations};
pub use dataset::{train_test_split, SplitData};
pub use deterministic::{LcgRng, SplitTieBreaker};
pub use encoder::{EncodeError, OneHotEncoder};
pub use errors::{EvalError, PipelineError, TrainerError};
pub use evaluate::{EvaluationReport, Evaluator, Metric, ReportPaths};
pub use features::make_excessive_force;
pub use filter::drop_invalid;
pub use pipeline::{clean_data, run, train_model, ModelOutcome, RunSummary};
pub use trainer::{GbdtTrainer, TrainingParams};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
