//! One-hot encoding of categorical feature tables
//!
//! `fit` records the sorted distinct values of every column; `transform`
//! maps each row to a fixed-width vector of `0`/[`SCALE`] indicators in
//! fitted column order. A value unseen at fit time leaves its column's
//! block all zero. Missing cells are rejected: callers filter them out
//! before encoding.

use copa_core::{Table, SCALE};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("missing value in column {column} (row {row})")]
    MissingValue { column: String, row: usize },

    #[error("missing column: {0}")]
    MissingColumn(String),

    #[error("cannot fit an encoder on a table without columns")]
    NoColumns,
}

/// Vocabulary of one categorical column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedColumn {
    pub name: String,
    /// Sorted distinct values; position is the indicator offset within the block
    pub categories: Vec<String>,
    lookup: HashMap<String, usize>,
}

impl EncodedColumn {
    fn new(name: String, categories: Vec<String>) -> Self {
        let lookup = categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        Self {
            name,
            categories,
            lookup,
        }
    }

    /// Indicator names, `<COLUMN>_<value>`
    pub fn indicator_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .map(|c| format!("{}_{}", self.name, c))
            .collect()
    }
}

/// Fitted one-hot scheme
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneHotEncoder {
    columns: Vec<EncodedColumn>,
}

impl OneHotEncoder {
    /// Learn the vocabulary of every column of `data`
    pub fn fit(data: &Table) -> Result<Self, EncodeError> {
        if data.width() == 0 {
            return Err(EncodeError::NoColumns);
        }

        let mut columns = Vec::with_capacity(data.width());
        for (col, name) in data.headers().iter().enumerate() {
            let mut values = BTreeSet::new();
            for (row_idx, row) in data.rows().iter().enumerate() {
                let value = row[col].as_ref().ok_or_else(|| EncodeError::MissingValue {
                    column: name.clone(),
                    row: row_idx,
                })?;
                values.insert(value.clone());
            }
            columns.push(EncodedColumn::new(name.clone(), values.into_iter().collect()));
        }

        let encoder = Self { columns };
        info!(
            "Encoder fitted: {} columns, {} indicators",
            encoder.columns.len(),
            encoder.width()
        );
        Ok(encoder)
    }

    /// Encode every row of `data`; its columns are looked up by fitted name
    pub fn transform(&self, data: &Table) -> Result<Vec<Vec<i64>>, EncodeError> {
        let positions: Vec<usize> = self
            .columns
            .iter()
            .map(|c| {
                data.column_index(&c.name)
                    .map_err(|_| EncodeError::MissingColumn(c.name.clone()))
            })
            .collect::<Result<_, _>>()?;

        let width = self.width();
        let mut encoded = Vec::with_capacity(data.len());

        for (row_idx, row) in data.rows().iter().enumerate() {
            let mut vector = vec![0i64; width];
            let mut offset = 0;

            for (column, &pos) in self.columns.iter().zip(&positions) {
                let value = row[pos].as_deref().ok_or_else(|| EncodeError::MissingValue {
                    column: column.name.clone(),
                    row: row_idx,
                })?;

                if let Some(&slot) = column.lookup.get(value) {
                    vector[offset + slot] = SCALE;
                }
                offset += column.categories.len();
            }

            encoded.push(vector);
        }

        Ok(encoded)
    }

    /// Fitted columns in encoding order
    pub fn columns(&self) -> &[EncodedColumn] {
        &self.columns
    }

    /// Indicator names grouped by original column
    pub fn indicator_names(&self) -> Vec<(&str, Vec<String>)> {
        self.columns
            .iter()
            .map(|c| (c.name.as_str(), c.indicator_names()))
            .collect()
    }

    /// All indicator names in encoded order
    pub fn feature_names(&self) -> Vec<String> {
        self.columns.iter().flat_map(|c| c.indicator_names()).collect()
    }

    /// Number of indicator columns
    pub fn width(&self) -> usize {
        self.columns.iter().map(|c| c.categories.len()).sum()
    }
}
