//! Error types for tables and pipeline configuration

use thiserror::Error;

/// Errors raised while reading, querying or writing a [`crate::Table`]
#[derive(Error, Debug)]
pub enum TableError {
    /// A required column is absent from the table header
    #[error("missing column: {0}")]
    MissingColumn(String),

    /// A cell could not be parsed as the type its column requires
    #[error("malformed value {value:?} in column {column} (row {row})")]
    MalformedValue {
        column: String,
        row: usize,
        value: String,
    },

    /// A row does not have as many cells as the header has columns
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// Column appended with the wrong number of values
    #[error("column {column} has {found} values, table has {expected} rows")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    /// Duplicate header name
    #[error("duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while loading or validating a pipeline configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
