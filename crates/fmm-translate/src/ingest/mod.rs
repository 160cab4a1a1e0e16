//! Delimited text → [`Table`] ingestion.
//!
//! The table produced here is shaped for exact agreement with R's own
//! `read.csv` of the same file:
//!
//! | Concern        | Rule                                                            |
//! |----------------|-----------------------------------------------------------------|
//! | precision      | correctly rounded decimal parse ([`FloatPrecision::RoundTrip`]) |
//! | `trial` column | nullable `Int32`; blank or `< 1` becomes null, never NaN        |
//! | row labels     | `1..=N`, matching R's 1-based row numbering                     |
//! | whitespace     | trimmed from every header and cell, whatever the column type    |
//!
//! # Modules
//!
//! - [`parse`]: float parsing policies
//! - [`audit`]: cell-by-cell comparison against a foreign read of the same file

pub mod audit;
pub mod parse;

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int32Array, StringArray};
use fmm_core::{Error, Result, RowIndex, Table};

pub use parse::FloatPrecision;

/// Name of the trial column every input must carry.
pub const TRIAL_COLUMN: &str = "trial";

/// Configuration for text → [`Table`] ingestion.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Field delimiter (default: `b','`).
    pub delimiter: u8,
    /// Float parsing policy (default: [`FloatPrecision::RoundTrip`]).
    pub precision: FloatPrecision,
    /// Integer-valued column normalised to a nullable integer (default: `"trial"`).
    pub trial_column: String,
    /// Cell texts read as missing (default: `""` and `"NA"`).
    pub na_values: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            precision: FloatPrecision::RoundTrip,
            trial_column: TRIAL_COLUMN.to_string(),
            na_values: vec![String::new(), "NA".to_string()],
        }
    }
}

impl IngestConfig {
    /// Set the field delimiter.
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set the float parsing policy.
    pub fn precision(mut self, precision: FloatPrecision) -> Self {
        self.precision = precision;
        self
    }

    /// Set the trial column name.
    pub fn trial_column(mut self, name: impl Into<String>) -> Self {
        self.trial_column = name.into();
        self
    }

    fn is_na(&self, cell: &str) -> bool {
        self.na_values.iter().any(|na| na == cell)
    }
}

/// Read a delimited text file into a [`Table`].
pub fn read_table(path: &Path, config: &IngestConfig) -> Result<Table> {
    let file = File::open(path)
        .map_err(|e| Error::Parse(format!("failed to open {}: {e}", path.display())))?;
    tracing::info!(path = %path.display(), "reading table");
    read_table_from_reader(file, config)
}

/// Read delimited text from any reader into a [`Table`].
pub fn read_table_from_reader<R: Read>(reader: R, config: &IngestConfig) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(config.delimiter)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| Error::Parse(format!("failed to read header row: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();

    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(Error::Parse("input has no header row".into()));
    }

    let n_cols = headers.len();
    let mut cells: Vec<Vec<String>> = vec![Vec::new(); n_cols];

    for (i, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| Error::Parse(format!("data row {}: {e}", i + 1)))?;
        for (j, field) in record.iter().enumerate() {
            cells[j].push(field.to_string());
        }
    }

    let n_rows = cells[0].len();
    let trial_idx = headers.iter().position(|h| *h == config.trial_column).ok_or_else(|| {
        Error::Parse(format!("required column '{}' is missing", config.trial_column))
    })?;

    let mut columns: Vec<(String, ArrayRef)> = Vec::with_capacity(n_cols);
    for (j, (name, col)) in headers.iter().zip(&cells).enumerate() {
        let array = if j == trial_idx {
            Arc::new(normalize_trial(name, col, config)?) as ArrayRef
        } else {
            infer_column(col, config)
        };
        columns.push((name.clone(), array));
    }

    let table = Table::try_from_columns(columns, n_rows, RowIndex::one_based())?;
    tracing::info!(rows = table.num_rows(), cols = table.num_columns(), "table ingested");
    Ok(table)
}

/// Integer missing values must stay integer-typed: blank → -1 → null, `< 1` → null.
fn normalize_trial(name: &str, cells: &[String], config: &IngestConfig) -> Result<Int32Array> {
    let mut out: Vec<Option<i32>> = Vec::with_capacity(cells.len());
    for (i, cell) in cells.iter().enumerate() {
        let raw = if config.is_na(cell) {
            -1.0
        } else {
            let v = config.precision.parse(cell).ok_or_else(|| {
                Error::Parse(format!("column '{name}' row {}: '{cell}' is not numeric", i + 1))
            })?;
            if v.is_nan() { -1.0 } else { v.trunc() }
        };
        if !raw.is_finite() || raw > f64::from(i32::MAX) {
            return Err(Error::Parse(format!(
                "column '{name}' row {}: '{cell}' is out of integer range",
                i + 1
            )));
        }
        out.push(if raw < 1.0 { None } else { Some(raw as i32) });
    }
    let n_missing = out.iter().filter(|v| v.is_none()).count();
    tracing::debug!(column = name, n_missing, "trial column normalised");
    Ok(Int32Array::from(out))
}

/// Narrowest of `Int32`, `Float64`, `Boolean`, `Utf8` that holds every non-missing cell.
fn infer_column(cells: &[String], config: &IngestConfig) -> ArrayRef {
    if present(cells, config).next().is_none() {
        return Arc::new(Float64Array::from(vec![None::<f64>; cells.len()]));
    }
    if present(cells, config).all(|c| c.parse::<i32>().is_ok()) {
        let values: Vec<Option<i32>> = cells
            .iter()
            .map(|c| if config.is_na(c) { None } else { c.parse::<i32>().ok() })
            .collect();
        return Arc::new(Int32Array::from(values));
    }
    if present(cells, config).all(|c| config.precision.parse(c).is_some()) {
        let values: Vec<Option<f64>> = cells
            .iter()
            .map(|c| if config.is_na(c) { None } else { config.precision.parse(c) })
            .collect();
        return Arc::new(Float64Array::from(values));
    }
    if present(cells, config).all(|c| parse_bool(c).is_some()) {
        let values: Vec<Option<bool>> =
            cells.iter().map(|c| if config.is_na(c) { None } else { parse_bool(c) }).collect();
        return Arc::new(BooleanArray::from(values));
    }
    let values: Vec<Option<&str>> =
        cells.iter().map(|c| if config.is_na(c) { None } else { Some(c.as_str()) }).collect();
    Arc::new(StringArray::from(values))
}

fn present<'a>(cells: &'a [String], config: &'a IngestConfig) -> impl Iterator<Item = &'a str> + 'a {
    cells.iter().filter(move |c| !config.is_na(c)).map(String::as_str)
}

fn parse_bool(cell: &str) -> Option<bool> {
    match cell {
        "TRUE" | "True" | "true" | "T" => Some(true),
        "FALSE" | "False" | "false" | "F" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests;
