//! Structural equivalence of two result structures.
//!
//! [`compare`] walks two [`NamedList`]s field by field and stops at the
//! first disagreement, reporting it as a [`Mismatch`] that carries the
//! dotted path of the offending field. Values are classified into a closed
//! set of shapes, each with its own comparison:
//!
//! | left value                        | compared as                       |
//! |-----------------------------------|-----------------------------------|
//! | `Array`, `Ints`, `Float`, `Int`   | numeric, NaN-column policy        |
//! | `Table`, `Series`                 | 2-D numeric, NaN-column policy    |
//! | `Bools`, `Bool`                   | 0/1, NA as NaN                    |
//! | named `List`                      | recursion                         |
//! | `Null`                            | both absent                       |
//! | anything else                     | [`Mismatch::UnsupportedType`]     |
//!
//! The NaN-column policy: positions where the left side holds NaN are not
//! compared. For 1-D values that is per element; for N-D values a trailing
//! position (a column, for a matrix) is dropped when any entry along axis 0
//! is NaN.

use std::collections::BTreeSet;

use fmm_core::tolerance::is_close;
use fmm_core::{HostKind, HostValue, NamedList};
use ndarray::{ArrayD, IxDyn};
use thiserror::Error;

/// First disagreement found by [`compare`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Mismatch {
    /// The two structures name different fields.
    #[error("field names differ at '{path}': only left {only_left:?}, only right {only_right:?}")]
    FieldSet {
        /// Path of the structure (empty at top level).
        path: String,
        /// Names present only on the left.
        only_left: Vec<String>,
        /// Names present only on the right.
        only_right: Vec<String>,
    },

    /// The right value is not comparable with the left one.
    #[error("'{field}': left is {left}, right is {right}")]
    Kind {
        /// Dotted field path.
        field: String,
        /// Left kind.
        left: HostKind,
        /// Right kind.
        right: HostKind,
    },

    /// Same kind, different dimensions.
    #[error("'{field}': shape {left:?} vs {right:?}")]
    Shape {
        /// Dotted field path.
        field: String,
        /// Left shape.
        left: Vec<usize>,
        /// Right shape.
        right: Vec<usize>,
    },

    /// Values differ beyond tolerance.
    #[error("'{field}' differs at flat index {index}: {left} vs {right}")]
    Values {
        /// Dotted field path.
        field: String,
        /// Row-major position in the left value.
        index: usize,
        /// Left value.
        left: f64,
        /// Right value.
        right: f64,
    },

    /// Absent on the left, present on the right.
    #[error("'{field}' is absent on the left only")]
    Absent {
        /// Dotted field path.
        field: String,
    },

    /// The left value has no comparison rule.
    #[error("'{field}' has unsupported type {kind}")]
    UnsupportedType {
        /// Dotted field path.
        field: String,
        /// Left kind.
        kind: HostKind,
    },
}

/// Classified left-hand value.
enum Shape<'a> {
    Numeric,
    Table,
    Bool,
    Nested(&'a NamedList),
    Absent,
    Other,
}

fn classify(value: &HostValue) -> Shape<'_> {
    match value {
        HostValue::Array(_) | HostValue::Ints(_) | HostValue::Float(_) | HostValue::Int(_) => Shape::Numeric,
        HostValue::Table(_) | HostValue::Series(_) => Shape::Table,
        HostValue::Bools(_) | HostValue::Bool(_) => Shape::Bool,
        HostValue::List(list) if list.names().is_some() => Shape::Nested(list),
        HostValue::Null => Shape::Absent,
        _ => Shape::Other,
    }
}

fn vector(data: Vec<f64>) -> ArrayD<f64> {
    let n = data.len();
    ArrayD::from_shape_vec(IxDyn(&[n]), data).unwrap_or_else(|_| ArrayD::zeros(IxDyn(&[0])))
}

fn numeric(value: &HostValue) -> Option<ArrayD<f64>> {
    Some(match value {
        HostValue::Array(a) => a.clone(),
        HostValue::Ints(v) => vector(v.iter().map(|x| x.map_or(f64::NAN, f64::from)).collect()),
        HostValue::Float(x) => vector(vec![*x]),
        HostValue::Int(x) => vector(vec![f64::from(*x)]),
        _ => return None,
    })
}

fn tabular(value: &HostValue) -> Option<ArrayD<f64>> {
    match value {
        HostValue::Table(t) => t.to_f64_matrix().ok().map(|m| m.into_dyn()),
        HostValue::Series(s) => {
            ArrayD::from_shape_vec(IxDyn(&[s.len(), 1]), s.values.clone()).ok()
        }
        _ => None,
    }
}

fn boolean(value: &HostValue) -> Option<ArrayD<f64>> {
    let as_f64 = |b: Option<bool>| b.map_or(f64::NAN, |b| if b { 1.0 } else { 0.0 });
    match value {
        HostValue::Bools(v) => Some(vector(v.iter().copied().map(as_f64).collect())),
        HostValue::Bool(b) => Some(vector(vec![as_f64(Some(*b))])),
        _ => None,
    }
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() { name.to_string() } else { format!("{path}.{name}") }
}

/// Row-major positions of `a` that take part in the comparison.
fn compared_positions(a: &ArrayD<f64>) -> Vec<usize> {
    let flat: Vec<f64> = a.iter().copied().collect();
    if a.ndim() <= 1 {
        return (0..flat.len()).filter(|&i| !flat[i].is_nan()).collect();
    }
    let n0 = a.shape()[0];
    let rest = if n0 == 0 { 0 } else { flat.len() / n0 };
    let nan_column: Vec<bool> = (0..rest).map(|j| (0..n0).any(|i| flat[i * rest + j].is_nan())).collect();
    (0..n0).flat_map(|i| (0..rest).filter(|&j| !nan_column[j]).map(move |j| i * rest + j)).collect()
}

fn compare_arrays(field: &str, a: &ArrayD<f64>, b: &ArrayD<f64>, nan_policy: bool) -> Result<(), Mismatch> {
    if a.shape() != b.shape() {
        return Err(Mismatch::Shape { field: field.to_string(), left: a.shape().to_vec(), right: b.shape().to_vec() });
    }
    let left: Vec<f64> = a.iter().copied().collect();
    let right: Vec<f64> = b.iter().copied().collect();
    let positions: Vec<usize> = if nan_policy { compared_positions(a) } else { (0..left.len()).collect() };
    match positions.into_iter().find(|&i| !is_close(left[i], right[i])) {
        Some(index) => Err(Mismatch::Values { field: field.to_string(), index, left: left[index], right: right[index] }),
        None => Ok(()),
    }
}

fn compare_value(field: &str, a: &HostValue, b: &HostValue) -> Result<(), Mismatch> {
    let kind_mismatch = || Mismatch::Kind { field: field.to_string(), left: a.kind(), right: b.kind() };
    match classify(a) {
        Shape::Numeric => {
            let (x, y) = (numeric(a).ok_or_else(kind_mismatch)?, numeric(b).ok_or_else(kind_mismatch)?);
            compare_arrays(field, &x, &y, true)
        }
        Shape::Table => {
            let x = tabular(a).ok_or_else(|| Mismatch::UnsupportedType { field: field.to_string(), kind: a.kind() })?;
            let y = tabular(b).ok_or_else(kind_mismatch)?;
            compare_arrays(field, &x, &y, true)
        }
        Shape::Bool => {
            let (x, y) = (boolean(a).ok_or_else(kind_mismatch)?, boolean(b).ok_or_else(kind_mismatch)?);
            compare_arrays(field, &x, &y, false)
        }
        Shape::Nested(left) => match b {
            HostValue::List(right) if right.names().is_some() => compare_at(field, left, right),
            _ => Err(kind_mismatch()),
        },
        Shape::Absent => {
            if b.is_null() {
                Ok(())
            } else {
                Err(Mismatch::Absent { field: field.to_string() })
            }
        }
        Shape::Other => Err(Mismatch::UnsupportedType { field: field.to_string(), kind: a.kind() }),
    }
}

fn compare_at(path: &str, a: &NamedList, b: &NamedList) -> Result<(), Mismatch> {
    let left: BTreeSet<&str> = a.iter().map(|(n, _)| n).collect();
    let right: BTreeSet<&str> = b.iter().map(|(n, _)| n).collect();
    if left != right {
        return Err(Mismatch::FieldSet {
            path: path.to_string(),
            only_left: left.difference(&right).map(|s| s.to_string()).collect(),
            only_right: right.difference(&left).map(|s| s.to_string()).collect(),
        });
    }
    for (name, value) in a.iter() {
        let other = b.get(name).unwrap_or(&HostValue::Null);
        compare_value(&join(path, name), value, other)?;
    }
    Ok(())
}

/// Compare two result structures; `Ok` if they agree within tolerance.
///
/// Tables and labeled series go through the same NaN-column policy as
/// plain arrays: a table column holding a NaN on the left is skipped, not
/// compared cell by cell. A caller that needs strict table equality should
/// compare [`Table::to_f64_matrix`](fmm_core::Table::to_f64_matrix) output
/// directly.
pub fn compare(a: &NamedList, b: &NamedList) -> Result<(), Mismatch> {
    let outcome = compare_at("", a, b);
    match &outcome {
        Ok(()) => tracing::debug!(fields = a.len(), "structures agree"),
        Err(m) => tracing::debug!(mismatch = %m, "structures differ"),
    }
    outcome
}

/// Field names present in both structures, in `a`'s order.
///
/// Empty when either side is empty. A non-empty answer is the weak
/// agreement check used when the two sides come from different versions
/// of the fitting package and field sets are expected to drift.
pub fn common_fields<'a>(a: &'a NamedList, b: &NamedList) -> Vec<&'a str> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let right: BTreeSet<&str> = b.iter().map(|(n, _)| n).collect();
    a.iter().map(|(n, _)| n).filter(|n| right.contains(n)).collect()
}
