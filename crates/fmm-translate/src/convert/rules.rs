//! Base conversion rules.
//!
//! R stores arrays column-major; host arrays are row-major `ndarray`s.
//! Missing values map to `None` on the host side and back to the
//! type-specific R sentinel.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BooleanArray, Float64Array, Int32Array, Int64Array, LargeStringArray,
    StringArray,
};
use arrow::datatypes::DataType;
use fmm_core::robject::{NA_INTEGER, is_na_real, na_real};
use fmm_core::{
    DataFrame, Error, HostKind, HostValue, LabeledSeries, NamedList, RObject, RType, Result,
    RowIndex, RowNames, Table, Vector,
};
use ndarray::{ArrayD, IxDyn, ShapeBuilder};

use super::{RuleSet, ToForeignRule, ToHostRule};

impl RuleSet {
    /// NULL, scalars, atomic vectors, double arrays and lists.
    pub fn default_rules() -> Self {
        let mut rules = RuleSet::empty("default");
        rules.to_host = vec![
            ToHostRule::new(RType::Null, "null", |_, _| Ok(Some(HostValue::Null))),
            ToHostRule::new(RType::Real, "double-array", |obj, _| Ok(real_to_array(obj))),
            ToHostRule::new(RType::Integer, "integer", |obj, _| Ok(integer_to_host(obj))),
            ToHostRule::new(RType::Logical, "logical", |obj, _| Ok(logical_to_host(obj))),
            ToHostRule::new(RType::Character, "character", |obj, _| Ok(character_to_host(obj))),
            ToHostRule::new(RType::List, "list", list_to_host),
        ];
        rules.to_foreign = vec![
            ToForeignRule::new(HostKind::Null, "null", |_, _| Ok(Some(RObject::Null))),
            ToForeignRule::new(HostKind::Float, "float", |v, _| {
                Ok(match v {
                    HostValue::Float(x) => Some(RObject::real(vec![*x])),
                    _ => None,
                })
            }),
            ToForeignRule::new(HostKind::Int, "int", |v, _| {
                Ok(match v {
                    HostValue::Int(x) => Some(RObject::integer(vec![*x])),
                    _ => None,
                })
            }),
            ToForeignRule::new(HostKind::Bool, "bool", |v, _| {
                Ok(match v {
                    HostValue::Bool(x) => Some(RObject::logical(vec![Some(*x)])),
                    _ => None,
                })
            }),
            ToForeignRule::new(HostKind::Str, "str", |v, _| {
                Ok(match v {
                    HostValue::Str(s) => Some(RObject::string(s.clone())),
                    _ => None,
                })
            }),
            ToForeignRule::new(HostKind::Ints, "ints", |v, _| {
                Ok(match v {
                    HostValue::Ints(xs) => Some(RObject::Integer(Vector::new(
                        xs.iter().map(|x| x.unwrap_or(NA_INTEGER)).collect(),
                    ))),
                    _ => None,
                })
            }),
            ToForeignRule::new(HostKind::Bools, "bools", |v, _| {
                Ok(match v {
                    HostValue::Bools(xs) => Some(RObject::logical(xs.clone())),
                    _ => None,
                })
            }),
            ToForeignRule::new(HostKind::Strings, "strings", |v, _| {
                Ok(match v {
                    HostValue::Strings(xs) => Some(RObject::Character(Vector::new(xs.clone()))),
                    _ => None,
                })
            }),
            ToForeignRule::new(HostKind::Array, "array", |v, _| {
                Ok(match v {
                    HostValue::Array(a) => Some(array_to_real(a)),
                    _ => None,
                })
            }),
            ToForeignRule::new(HostKind::List, "list", list_to_foreign),
        ];
        rules
    }

    /// `data.frame` ↔ [`Table`] and labeled series → named double vector.
    pub fn table_rules() -> Self {
        let mut rules = RuleSet::empty("tables");
        rules.to_host =
            vec![ToHostRule::new(RType::DataFrame, "data.frame", |obj, _| match obj {
                RObject::DataFrame(df) => data_frame_to_table(df).map(|t| Some(HostValue::Table(t))),
                _ => Ok(None),
            })];
        rules.to_foreign = vec![
            ToForeignRule::new(HostKind::Table, "table", |v, _| match v {
                HostValue::Table(t) => table_to_data_frame(t).map(|df| Some(RObject::DataFrame(df))),
                _ => Ok(None),
            }),
            ToForeignRule::new(HostKind::Series, "series", |v, _| {
                Ok(match v {
                    HostValue::Series(s) => Some(series_to_real(s)),
                    _ => None,
                })
            }),
        ];
        rules
    }
}

/// Double vector → plain array, honoring `dim` (column-major).
pub fn real_to_array(obj: &RObject) -> Option<HostValue> {
    let RObject::Real(v) = obj else {
        return None;
    };
    let flat = || ArrayD::from_shape_vec(IxDyn(&[v.data.len()]), v.data.clone()).ok();
    let array = match &v.attrs.dim {
        Some(dim) if dim.iter().product::<usize>() == v.data.len() => {
            ArrayD::from_shape_vec(IxDyn(dim).f(), v.data.clone()).ok().or_else(flat)
        }
        _ => flat(),
    };
    array.map(HostValue::Array)
}

/// Plain array → double vector with `dim` for rank ≠ 1.
pub fn array_to_real(array: &ArrayD<f64>) -> RObject {
    // Iterating the transposed view yields R's column-major order.
    let data: Vec<f64> = array.t().iter().copied().collect();
    let vector = Vector::new(data);
    match array.ndim() {
        0 | 1 => RObject::Real(vector),
        _ => RObject::Real(vector.with_dim(array.shape().to_vec())),
    }
}

fn series_to_real(series: &LabeledSeries) -> RObject {
    RObject::Real(Vector::new(series.values.clone()).with_names(series.index.iter().cloned()))
}

fn integer_to_host(obj: &RObject) -> Option<HostValue> {
    let RObject::Integer(v) = obj else {
        return None;
    };
    if v.is_scalar() && v.data[0] != NA_INTEGER {
        return Some(HostValue::Int(v.data[0]));
    }
    Some(HostValue::Ints(v.data.iter().map(|&x| (x != NA_INTEGER).then_some(x)).collect()))
}

fn logical_to_host(obj: &RObject) -> Option<HostValue> {
    let RObject::Logical(v) = obj else {
        return None;
    };
    match v.data.as_slice() {
        [Some(b)] if v.is_scalar() => Some(HostValue::Bool(*b)),
        data => Some(HostValue::Bools(data.to_vec())),
    }
}

fn character_to_host(obj: &RObject) -> Option<HostValue> {
    let RObject::Character(v) = obj else {
        return None;
    };
    match v.data.as_slice() {
        [Some(s)] if v.is_scalar() => Some(HostValue::Str(s.clone())),
        data => Some(HostValue::Strings(data.to_vec())),
    }
}

fn list_to_host(obj: &RObject, rules: &RuleSet) -> Result<Option<HostValue>> {
    let RObject::List(v) = obj else {
        return Ok(None);
    };
    let names = v.attrs.names.clone();
    let mut values = Vec::with_capacity(v.data.len());
    for (i, elem) in v.data.iter().enumerate() {
        let label = names.as_ref().and_then(|n| n.get(i)).cloned().unwrap_or_else(|| format!("[{}]", i + 1));
        values.push(rules.to_host(elem).map_err(|e| e.within(&label))?);
    }
    Ok(Some(HostValue::List(NamedList::with_names(names, values)?)))
}

fn list_to_foreign(value: &HostValue, rules: &RuleSet) -> Result<Option<RObject>> {
    let HostValue::List(list) = value else {
        return Ok(None);
    };
    let mut data = Vec::with_capacity(list.len());
    for (i, (name, elem)) in list.iter().enumerate() {
        let label = if name.is_empty() { format!("[{}]", i + 1) } else { name.to_string() };
        data.push(rules.to_foreign(elem).map_err(|e| e.within(&label))?);
    }
    let mut vector = Vector::new(data);
    if let Some(names) = list.names() {
        vector = vector.with_names(names.iter().cloned());
    }
    Ok(Some(RObject::List(vector)))
}

/// R data frame → host table. `NA_real_` becomes null; other NaNs stay NaN.
pub fn data_frame_to_table(df: &DataFrame) -> Result<Table> {
    let n_rows = df.nrow();
    let mut columns: Vec<(String, ArrayRef)> = Vec::with_capacity(df.columns.len());
    for (name, col) in &df.columns {
        if col.len() != n_rows {
            return Err(Error::conversion(name.clone(), format!("{} column of length {}", col.type_name(), col.len())));
        }
        let array: ArrayRef = match col {
            RObject::Real(v) => Arc::new(Float64Array::from(
                v.data.iter().map(|&x| (!is_na_real(x)).then_some(x)).collect::<Vec<_>>(),
            )),
            RObject::Integer(v) => Arc::new(Int32Array::from(
                v.data.iter().map(|&x| (x != NA_INTEGER).then_some(x)).collect::<Vec<_>>(),
            )),
            RObject::Logical(v) => Arc::new(BooleanArray::from(v.data.clone())),
            RObject::Character(v) => Arc::new(StringArray::from(v.data.clone())),
            other => return Err(Error::conversion(name.clone(), other.type_name())),
        };
        columns.push((name.clone(), array));
    }
    let index = match &df.row_names {
        RowNames::Automatic(_) => RowIndex::one_based(),
        RowNames::Labels(labels) => RowIndex::Labels(labels.clone()),
    };
    Table::try_from_columns(columns, n_rows, index)
}

/// Host table → R data frame. A `1..=N` index becomes automatic row names.
pub fn table_to_data_frame(table: &Table) -> Result<DataFrame> {
    let mut columns = Vec::with_capacity(table.num_columns());
    for (name, col) in table.column_names().into_iter().zip(table.batch().columns()) {
        let obj = arrow_to_r(col.as_ref()).ok_or_else(|| Error::conversion(name.clone(), format!("{:?}", col.data_type())))?;
        columns.push((name, obj));
    }
    let row_names = match table.index() {
        RowIndex::Range { start: 1 } => RowNames::Automatic(table.num_rows()),
        _ => RowNames::Labels(table.row_labels()),
    };
    Ok(DataFrame { columns, row_names })
}

fn arrow_to_r(array: &dyn Array) -> Option<RObject> {
    let any = array.as_any();
    match array.data_type() {
        DataType::Float64 => {
            let a = any.downcast_ref::<Float64Array>()?;
            Some(RObject::real(a.iter().map(|v| v.unwrap_or_else(na_real)).collect()))
        }
        DataType::Int32 => {
            let a = any.downcast_ref::<Int32Array>()?;
            Some(RObject::integer(a.iter().map(|v| v.unwrap_or(NA_INTEGER)).collect()))
        }
        DataType::Int64 => {
            let a = any.downcast_ref::<Int64Array>()?;
            let fits = a.iter().flatten().all(|v| v > i64::from(NA_INTEGER) && v <= i64::from(i32::MAX));
            if fits {
                Some(RObject::integer(a.iter().map(|v| v.map(|x| x as i32).unwrap_or(NA_INTEGER)).collect()))
            } else {
                Some(RObject::real(a.iter().map(|v| v.map(|x| x as f64).unwrap_or_else(na_real)).collect()))
            }
        }
        DataType::Boolean => {
            let a = any.downcast_ref::<BooleanArray>()?;
            Some(RObject::logical(a.iter().collect()))
        }
        DataType::Utf8 => {
            let a = any.downcast_ref::<StringArray>()?;
            Some(RObject::Character(Vector::new(a.iter().map(|s| s.map(str::to_string)).collect())))
        }
        DataType::LargeUtf8 => {
            let a = any.downcast_ref::<LargeStringArray>()?;
            Some(RObject::Character(Vector::new(a.iter().map(|s| s.map(str::to_string)).collect())))
        }
        _ => None,
    }
}
