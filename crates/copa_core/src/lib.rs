//! Core types for the COPA case outcome pipeline
//!
//! Modules:
//! - `table`: in-memory delimited table of case records
//! - `gbdt`: fixed-point boosted-tree classifier model and persistence
//! - `config`: TOML pipeline configuration
//! - `serde_canon`: canonical JSON used for model hashing
//! - `errors`: table and configuration errors

pub mod config;
pub mod errors;
pub mod gbdt;
pub mod serde_canon;
pub mod table;

pub use config::{ModelConfig, PathsConfig, PipelineConfig, StageFlags};
pub use errors::{ConfigError, TableError};
pub use gbdt::{ClassifierModel, ModelError, Node, Tree, SCALE};
pub use table::{Row, Table};
