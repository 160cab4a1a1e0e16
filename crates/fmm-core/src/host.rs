//! Host-side value model.
//!
//! These are the types a caller sees after conversion: Arrow-backed
//! [`Table`]s with an explicit [`RowIndex`], N-dimensional `ndarray` arrays,
//! labeled sequences, and named lists. None of them hold foreign handles.

use std::fmt;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, Int32Array, Int64Array};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use ndarray::{Array2, ArrayD};

use crate::{Error, Result};

/// Row labels of a [`Table`].
#[derive(Debug, Clone, PartialEq)]
pub enum RowIndex {
    /// Consecutive integer labels `start, start + 1, ...`.
    Range {
        /// Label of the first row.
        start: i64,
    },
    /// Explicit labels, one per row.
    Labels(Vec<String>),
}

impl Default for RowIndex {
    fn default() -> Self {
        Self::Range { start: 0 }
    }
}

impl RowIndex {
    /// 1-based labels, matching R's row numbering.
    pub fn one_based() -> Self {
        Self::Range { start: 1 }
    }

    /// Label of row `i`.
    pub fn label(&self, i: usize) -> String {
        match self {
            Self::Range { start } => (start + i as i64).to_string(),
            Self::Labels(labels) => labels.get(i).cloned().unwrap_or_default(),
        }
    }

    /// Labels of the first `n` rows.
    pub fn labels(&self, n: usize) -> Vec<String> {
        (0..n).map(|i| self.label(i)).collect()
    }
}

/// An ordered set of named, equal-length columns with row labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    batch: RecordBatch,
    index: RowIndex,
}

impl Table {
    /// Wrap a record batch with the default positional index.
    pub fn new(batch: RecordBatch) -> Self {
        Self { batch, index: RowIndex::default() }
    }

    /// Build a table from named columns.
    ///
    /// `n_rows` is only consulted when `columns` is empty.
    pub fn try_from_columns(
        columns: Vec<(String, ArrayRef)>,
        n_rows: usize,
        index: RowIndex,
    ) -> Result<Self> {
        let fields: Vec<Field> =
            columns.iter().map(|(name, arr)| Field::new(name, arr.data_type().clone(), true)).collect();
        let arrays: Vec<ArrayRef> = columns.into_iter().map(|(_, arr)| arr).collect();
        let options = RecordBatchOptions::new().with_row_count(Some(
            arrays.first().map(|a| a.len()).unwrap_or(n_rows),
        ));
        let batch = RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), arrays, &options)?;
        Self::new(batch).with_index(index)
    }

    /// Build an all-`Float64` table from a column-major `n_rows x n_cols` buffer.
    pub fn from_column_major(
        data: &[f64],
        n_rows: usize,
        column_labels: Vec<String>,
        index: RowIndex,
    ) -> Result<Self> {
        if data.len() != n_rows * column_labels.len() {
            return Err(Error::Configuration(format!(
                "matrix buffer has {} elements, expected {} x {}",
                data.len(),
                n_rows,
                column_labels.len()
            )));
        }
        let columns = column_labels
            .into_iter()
            .enumerate()
            .map(|(j, name)| {
                let col: ArrayRef =
                    Arc::new(Float64Array::from(data[j * n_rows..(j + 1) * n_rows].to_vec()));
                (name, col)
            })
            .collect();
        Self::try_from_columns(columns, n_rows, index)
    }

    /// Replace the row index. Explicit labels must match the row count.
    pub fn with_index(mut self, index: RowIndex) -> Result<Self> {
        if let RowIndex::Labels(labels) = &index {
            if labels.len() != self.num_rows() {
                return Err(Error::Configuration(format!(
                    "row index has {} labels for {} rows",
                    labels.len(),
                    self.num_rows()
                )));
            }
        }
        self.index = index;
        Ok(self)
    }

    /// Underlying record batch.
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Row index.
    pub fn index(&self) -> &RowIndex {
        &self.index
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Number of columns.
    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<String> {
        self.batch.schema().fields().iter().map(|f| f.name().clone()).collect()
    }

    /// Column by name (first match).
    pub fn column(&self, name: &str) -> Option<&ArrayRef> {
        let schema = self.batch.schema();
        let idx = schema.fields().iter().position(|f| f.name() == name)?;
        Some(self.batch.column(idx))
    }

    /// Row labels.
    pub fn row_labels(&self) -> Vec<String> {
        self.index.labels(self.num_rows())
    }

    /// Numeric content as a row-major `n_rows x n_cols` matrix; nulls become NaN.
    ///
    /// Fails with [`Error::Conversion`] on a non-numeric column.
    pub fn to_f64_matrix(&self) -> Result<Array2<f64>> {
        let (n_rows, n_cols) = (self.num_rows(), self.num_columns());
        let mut out = Array2::<f64>::from_elem((n_rows, n_cols), f64::NAN);
        for (j, name) in self.column_names().iter().enumerate() {
            let col = self.batch.column(j);
            let values = column_as_f64(col.as_ref())
                .ok_or_else(|| Error::conversion(name.clone(), format!("{:?}", col.data_type())))?;
            for (i, v) in values.into_iter().enumerate() {
                out[[i, j]] = v;
            }
        }
        Ok(out)
    }
}

/// Numeric Arrow column as `f64`s with nulls as NaN; `None` for non-numeric types.
pub fn column_as_f64(array: &dyn Array) -> Option<Vec<f64>> {
    let any = array.as_any();
    if let Some(a) = any.downcast_ref::<Float64Array>() {
        return Some(a.iter().map(|v| v.unwrap_or(f64::NAN)).collect());
    }
    if let Some(a) = any.downcast_ref::<Int32Array>() {
        return Some(a.iter().map(|v| v.map(f64::from).unwrap_or(f64::NAN)).collect());
    }
    if let Some(a) = any.downcast_ref::<Int64Array>() {
        return Some(a.iter().map(|v| v.map(|x| x as f64).unwrap_or(f64::NAN)).collect());
    }
    if let Some(a) = any.downcast_ref::<BooleanArray>() {
        return Some(
            a.iter().map(|v| v.map(|b| if b { 1.0 } else { 0.0 }).unwrap_or(f64::NAN)).collect(),
        );
    }
    None
}

/// A numeric sequence paired with one label per element.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSeries {
    /// Element labels.
    pub index: Vec<String>,
    /// Values.
    pub values: Vec<f64>,
}

impl LabeledSeries {
    /// Pair labels with values; lengths must agree.
    pub fn new(index: Vec<String>, values: Vec<f64>) -> Result<Self> {
        if index.len() != values.len() {
            return Err(Error::Configuration(format!(
                "series has {} labels for {} values",
                index.len(),
                values.len()
            )));
        }
        Ok(Self { index, values })
    }

    /// Value for `label` (first match).
    pub fn get(&self, label: &str) -> Option<f64> {
        self.index.iter().position(|l| l == label).map(|i| self.values[i])
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// `true` if empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A heterogeneous container, optionally naming its elements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NamedList {
    names: Option<Vec<String>>,
    values: Vec<HostValue>,
}

impl NamedList {
    /// Empty named list.
    pub fn new() -> Self {
        Self { names: Some(Vec::new()), values: Vec::new() }
    }

    /// Unnamed list.
    pub fn unnamed(values: Vec<HostValue>) -> Self {
        Self { names: None, values }
    }

    /// List with explicit (possibly absent) names.
    pub fn with_names(names: Option<Vec<String>>, values: Vec<HostValue>) -> Result<Self> {
        if let Some(n) = &names {
            if n.len() != values.len() {
                return Err(Error::Configuration(format!(
                    "list has {} names for {} values",
                    n.len(),
                    values.len()
                )));
            }
        }
        Ok(Self { names, values })
    }

    /// Append a named element. Turns an unnamed list into a named one.
    pub fn push(&mut self, name: impl Into<String>, value: HostValue) {
        let len = self.values.len();
        self.names.get_or_insert_with(|| vec![String::new(); len]).push(name.into());
        self.values.push(value);
    }

    /// Element names, if any.
    pub fn names(&self) -> Option<&[String]> {
        self.names.as_deref()
    }

    /// Values in order.
    pub fn values(&self) -> &[HostValue] {
        &self.values
    }

    /// Element by name (first match).
    pub fn get(&self, name: &str) -> Option<&HostValue> {
        let idx = self.names.as_ref()?.iter().position(|n| n == name)?;
        self.values.get(idx)
    }

    /// `(name, value)` pairs; unnamed lists yield empty names.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HostValue)> {
        self.values.iter().enumerate().map(move |(i, v)| {
            let name = self.names.as_ref().and_then(|n| n.get(i)).map(String::as_str).unwrap_or("");
            (name, v)
        })
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// `true` if empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, HostValue)> for NamedList {
    fn from_iter<I: IntoIterator<Item = (S, HostValue)>>(iter: I) -> Self {
        let mut list = NamedList::new();
        for (name, value) in iter {
            list.push(name, value);
        }
        list
    }
}

/// A host-side value.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    /// Absent.
    Null,
    /// Float scalar.
    Float(f64),
    /// Integer scalar.
    Int(i32),
    /// Boolean scalar.
    Bool(bool),
    /// String scalar.
    Str(String),
    /// Plain numeric array, any rank, row-major.
    Array(ArrayD<f64>),
    /// Nullable integer sequence.
    Ints(Vec<Option<i32>>),
    /// Nullable boolean sequence.
    Bools(Vec<Option<bool>>),
    /// Nullable string sequence.
    Strings(Vec<Option<String>>),
    /// Labeled numeric sequence.
    Series(LabeledSeries),
    /// Table.
    Table(Table),
    /// Nested list.
    List(NamedList),
}

/// Variant tags of [`HostValue`], used to key host→foreign rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostKind {
    /// [`HostValue::Null`]
    Null,
    /// [`HostValue::Float`]
    Float,
    /// [`HostValue::Int`]
    Int,
    /// [`HostValue::Bool`]
    Bool,
    /// [`HostValue::Str`]
    Str,
    /// [`HostValue::Array`]
    Array,
    /// [`HostValue::Ints`]
    Ints,
    /// [`HostValue::Bools`]
    Bools,
    /// [`HostValue::Strings`]
    Strings,
    /// [`HostValue::Series`]
    Series,
    /// [`HostValue::Table`]
    Table,
    /// [`HostValue::List`]
    List,
}

impl fmt::Display for HostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Null => "null",
            Self::Float => "float",
            Self::Int => "int",
            Self::Bool => "bool",
            Self::Str => "str",
            Self::Array => "array",
            Self::Ints => "ints",
            Self::Bools => "bools",
            Self::Strings => "strings",
            Self::Series => "series",
            Self::Table => "table",
            Self::List => "list",
        };
        f.write_str(s)
    }
}

impl HostValue {
    /// Variant tag.
    pub fn kind(&self) -> HostKind {
        match self {
            Self::Null => HostKind::Null,
            Self::Float(_) => HostKind::Float,
            Self::Int(_) => HostKind::Int,
            Self::Bool(_) => HostKind::Bool,
            Self::Str(_) => HostKind::Str,
            Self::Array(_) => HostKind::Array,
            Self::Ints(_) => HostKind::Ints,
            Self::Bools(_) => HostKind::Bools,
            Self::Strings(_) => HostKind::Strings,
            Self::Series(_) => HostKind::Series,
            Self::Table(_) => HostKind::Table,
            Self::List(_) => HostKind::List,
        }
    }

    /// `true` for [`HostValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Plain array payload.
    pub fn as_array(&self) -> Option<&ArrayD<f64>> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Table payload.
    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Self::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Series payload.
    pub fn as_series(&self) -> Option<&LabeledSeries> {
        match self {
            Self::Series(s) => Some(s),
            _ => None,
        }
    }

    /// List payload.
    pub fn as_list(&self) -> Option<&NamedList> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }
}

impl From<f64> for HostValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<i32> for HostValue {
    fn from(x: i32) -> Self {
        Self::Int(x)
    }
}

impl From<bool> for HostValue {
    fn from(x: bool) -> Self {
        Self::Bool(x)
    }
}

impl From<&str> for HostValue {
    fn from(x: &str) -> Self {
        Self::Str(x.to_string())
    }
}

impl From<Table> for HostValue {
    fn from(t: Table) -> Self {
        Self::Table(t)
    }
}

impl From<NamedList> for HostValue {
    fn from(l: NamedList) -> Self {
        Self::List(l)
    }
}
