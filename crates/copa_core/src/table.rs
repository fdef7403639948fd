//! In-memory delimited table
//!
//! Case records are kept as rows of optional string cells under a fixed
//! header. Every transforming operation returns a new table; the source is
//! never modified in place.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::errors::TableError;

/// Cell values read as missing
const MISSING_MARKERS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null"];

/// A single row of optional string cells
pub type Row = Vec<Option<String>>;

/// Rectangular table with a header and optional string cells
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Build a table, checking that every row matches the header width
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Result<Self, TableError> {
        let mut seen = HashSet::new();
        for name in &headers {
            if !seen.insert(name.as_str()) {
                return Err(TableError::DuplicateColumn(name.clone()));
            }
        }

        for (idx, row) in rows.iter().enumerate() {
            if row.len() != headers.len() {
                return Err(TableError::RaggedRow {
                    row: idx,
                    expected: headers.len(),
                    found: row.len(),
                });
            }
        }

        Ok(Self { headers, rows })
    }

    /// Build a table from string literals, empty strings become missing cells
    pub fn from_strs(headers: &[&str], rows: &[&[&str]]) -> Result<Self, TableError> {
        let headers = headers.iter().map(|h| h.to_string()).collect();
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|cell| parse_cell(cell)).collect())
            .collect();
        Self::new(headers, rows)
    }

    /// Read a CSV file with a header line
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let file = File::open(path.as_ref())?;
        Self::from_csv_reader(file)
    }

    /// Read CSV from any reader; the first record is the header
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(parse_cell).collect());
        }

        Self::new(headers, rows)
    }

    /// Write the table as CSV (header included) and flush the writer
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), TableError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write the table to a CSV file
    pub fn write_csv_path<P: AsRef<Path>>(&self, path: P) -> Result<(), TableError> {
        let file = File::create(path.as_ref())?;
        self.write_csv(BufWriter::new(file))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns
    pub fn width(&self) -> usize {
        self.headers.len()
    }

    /// Position of a column in the header
    pub fn column_index(&self, name: &str) -> Result<usize, TableError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    /// Check that every named column exists, reporting the first absent one
    pub fn require_columns(&self, names: &[&str]) -> Result<Vec<usize>, TableError> {
        names.iter().map(|name| self.column_index(name)).collect()
    }

    /// Cells of one column, top to bottom
    pub fn column(&self, name: &str) -> Result<Vec<Option<&str>>, TableError> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|row| row[idx].as_deref()).collect())
    }

    /// Cell at (row, column index)
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(col)).and_then(|c| c.as_deref())
    }

    /// Keep rows for which the predicate holds
    pub fn filter_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&[Option<String>]) -> bool,
    {
        Table {
            headers: self.headers.clone(),
            rows: self.rows.iter().filter(|row| keep(row)).cloned().collect(),
        }
    }

    /// Keep rows for which a fallible predicate holds, stopping at the first error
    pub fn try_filter_rows<F>(&self, mut keep: F) -> Result<Table, TableError>
    where
        F: FnMut(usize, &[Option<String>]) -> Result<bool, TableError>,
    {
        let mut rows = Vec::with_capacity(self.rows.len());
        for (idx, row) in self.rows.iter().enumerate() {
            if keep(idx, row)? {
                rows.push(row.clone());
            }
        }

        Ok(Table {
            headers: self.headers.clone(),
            rows,
        })
    }

    /// Project onto the named columns, in the order given
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Table, TableError> {
        let indices: Vec<usize> = names
            .iter()
            .map(|name| self.column_index(name.as_ref()))
            .collect::<Result<_, _>>()?;

        let headers = indices.iter().map(|&i| self.headers[i].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();

        Table::new(headers, rows)
    }

    /// Rows at the given positions, in the given order
    pub fn take(&self, indices: &[usize]) -> Table {
        Table {
            headers: self.headers.clone(),
            rows: indices
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
        }
    }

    /// Copy of this table with a column appended, or replaced if it already exists
    pub fn with_column(&self, name: &str, values: Vec<Option<String>>) -> Result<Table, TableError> {
        if values.len() != self.rows.len() {
            return Err(TableError::LengthMismatch {
                column: name.to_string(),
                expected: self.rows.len(),
                found: values.len(),
            });
        }

        let mut table = self.clone();
        match self.headers.iter().position(|h| h == name) {
            Some(idx) => {
                for (row, value) in table.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                table.headers.push(name.to_string());
                for (row, value) in table.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }

        Ok(table)
    }

    /// Distinct values of a column in first-seen order
    pub fn distinct(&self, name: &str) -> Result<Vec<Option<String>>, TableError> {
        let idx = self.column_index(name)?;
        let mut seen = HashSet::new();
        let mut values = Vec::new();
        for row in &self.rows {
            if seen.insert(row[idx].as_deref()) {
                values.push(row[idx].clone());
            }
        }
        Ok(values)
    }
}

/// Map missing markers (surrounding whitespace ignored) to `None`; other
/// fields are kept verbatim
fn parse_cell(raw: &str) -> Option<String> {
    if MISSING_MARKERS.contains(&raw.trim()) {
        None
    } else {
        Some(raw.to_string())
    }
}
