//! Double-vector override.
//!
//! Model results carry doubles labeled in one of three ways: flat `names`,
//! full `dimnames`, or `dimnames` with only column labels. Each labeling is
//! tried in turn and a failed attempt declines (`Ok(None)`) so the next one
//! runs. The last rule accepts any double vector.
//!
//! | order | rule                  | produces                      |
//! |-------|-----------------------|-------------------------------|
//! | 1     | `float:named-series`  | [`LabeledSeries`]             |
//! | 2     | `float:dimnamed-table`| [`Table`], row + column labels|
//! | 3     | `float:colnamed-table`| [`Table`], positional rows    |
//! | 4     | `float:plain-array`   | `ArrayD<f64>` with R's shape  |

use fmm_core::{HostValue, LabeledSeries, RObject, RType, RowIndex, Table, Vector};

use super::ToHostRule;
use super::rules::real_to_array;

/// The four double rules, in evaluation order.
pub fn float_vector_rules() -> Vec<ToHostRule> {
    vec![
        ToHostRule::new(RType::Real, "float:named-series", |obj, _| Ok(real(obj).and_then(named_series))),
        ToHostRule::new(RType::Real, "float:dimnamed-table", |obj, _| Ok(real(obj).and_then(dimnamed_table))),
        ToHostRule::new(RType::Real, "float:colnamed-table", |obj, _| Ok(real(obj).and_then(colnamed_table))),
        ToHostRule::new(RType::Real, "float:plain-array", |obj, _| Ok(real_to_array(obj))),
    ]
}

fn real(obj: &RObject) -> Option<&Vector<f64>> {
    match obj {
        RObject::Real(v) => Some(v),
        _ => None,
    }
}

/// `(nrow, ncol)` of a matrix whose extents agree with its payload.
fn matrix_dims(v: &Vector<f64>) -> Option<(usize, usize)> {
    match v.attrs.dim.as_deref() {
        Some(&[nrow, ncol]) if nrow * ncol == v.data.len() => Some((nrow, ncol)),
        _ => None,
    }
}

fn is_matrix(v: &Vector<f64>) -> bool {
    v.attrs.dim.as_ref().is_some_and(|d| d.len() == 2)
}

/// Non-empty label vector for `axis`.
fn axis_labels(v: &Vector<f64>, axis: usize) -> Option<&Vec<String>> {
    v.attrs.dimnames.as_ref()?.get(axis)?.as_ref().filter(|l| !l.is_empty())
}

fn named_series(v: &Vector<f64>) -> Option<HostValue> {
    if is_matrix(v) {
        return None;
    }
    let names = v.attrs.names.clone()?;
    match LabeledSeries::new(names, v.data.clone()) {
        Ok(series) => Some(HostValue::Series(series)),
        Err(e) => {
            tracing::trace!(error = %e, "flat names unusable, trying dimnames");
            None
        }
    }
}

fn dimnamed_table(v: &Vector<f64>) -> Option<HostValue> {
    let (nrow, ncol) = matrix_dims(v)?;
    let rows = axis_labels(v, 0)?;
    let cols = axis_labels(v, 1)?;
    if rows.len() != nrow || cols.len() != ncol {
        tracing::trace!(nrow, ncol, "dimnames disagree with dim");
        return None;
    }
    Table::from_column_major(&v.data, nrow, cols.clone(), RowIndex::Labels(rows.clone()))
        .map(HostValue::Table)
        .ok()
}

fn colnamed_table(v: &Vector<f64>) -> Option<HostValue> {
    let (nrow, ncol) = matrix_dims(v)?;
    // Column labels only; a matrix unlabeled on both axes stays an array.
    if axis_labels(v, 0).is_some() {
        return None;
    }
    let cols = axis_labels(v, 1).filter(|cols| cols.len() == ncol)?;
    Table::from_column_major(&v.data, nrow, cols.clone(), RowIndex::default()).map(HostValue::Table).ok()
}
