//! Rust model of the R values that cross the bridge boundary.
//!
//! R has no scalars: every atomic value is a vector, and labels live in
//! attributes (`names`, `dim`, `dimnames`, `class`). Missing values use
//! type-specific sentinels: `NA_integer_` is `i32::MIN`, `NA_real_` is a NaN
//! whose low word is 1954. The two must not be conflated: a plain `NaN` is a
//! different value from `NA_real_` on the R side.

use std::fmt;

/// R's `NA_integer_`.
pub const NA_INTEGER: i32 = i32::MIN;

/// Low word of R's `NA_real_` bit pattern.
const NA_REAL_LOW_WORD: u64 = 1954;

/// R's `NA_real_`.
pub fn na_real() -> f64 {
    f64::from_bits(0x7FF0_0000_0000_0000 | NA_REAL_LOW_WORD)
}

/// `true` if `x` is R's `NA_real_` (as opposed to an ordinary NaN).
pub fn is_na_real(x: f64) -> bool {
    x.is_nan() && (x.to_bits() & 0xFFFF_FFFF) == NA_REAL_LOW_WORD
}

/// Attributes carried by an R vector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    /// Flat element names.
    pub names: Option<Vec<String>>,
    /// Array extents (column-major).
    pub dim: Option<Vec<usize>>,
    /// One optional label vector per `dim` axis.
    pub dimnames: Option<Vec<Option<Vec<String>>>>,
    /// S3 class vector.
    pub class: Option<Vec<String>>,
}

impl Attributes {
    /// No attributes set.
    pub fn is_empty(&self) -> bool {
        self.names.is_none() && self.dim.is_none() && self.dimnames.is_none() && self.class.is_none()
    }
}

/// An R vector: payload plus attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Vector<T> {
    /// Elements in R storage order (column-major for arrays).
    pub data: Vec<T>,
    /// Attributes.
    pub attrs: Attributes,
}

impl<T> Vector<T> {
    /// Vector without attributes.
    pub fn new(data: Vec<T>) -> Self {
        Self { data, attrs: Attributes::default() }
    }

    /// Set flat names.
    pub fn with_names<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.attrs.names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Set array extents.
    pub fn with_dim(mut self, dim: Vec<usize>) -> Self {
        self.attrs.dim = Some(dim);
        self
    }

    /// Set per-axis labels.
    pub fn with_dimnames(mut self, dimnames: Vec<Option<Vec<String>>>) -> Self {
        self.attrs.dimnames = Some(dimnames);
        self
    }

    /// Set the S3 class.
    pub fn with_class<S: Into<String>>(mut self, class: impl IntoIterator<Item = S>) -> Self {
        self.attrs.class = Some(class.into_iter().map(Into::into).collect());
        self
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// `true` if the vector has no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// `true` for a length-1 vector without attributes (R's notion of a scalar).
    pub fn is_scalar(&self) -> bool {
        self.data.len() == 1 && self.attrs.is_empty()
    }
}

/// Row names of a data frame.
#[derive(Debug, Clone, PartialEq)]
pub enum RowNames {
    /// R's compact automatic row names `1..=n`.
    Automatic(usize),
    /// Explicit character row names.
    Labels(Vec<String>),
}

impl RowNames {
    /// Number of rows described.
    pub fn len(&self) -> usize {
        match self {
            Self::Automatic(n) => *n,
            Self::Labels(labels) => labels.len(),
        }
    }

    /// `true` if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An R `data.frame`.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
    /// Named columns, each an atomic vector of `row_names.len()` elements.
    pub columns: Vec<(String, RObject)>,
    /// Row names.
    pub row_names: RowNames,
}

impl DataFrame {
    /// Number of rows.
    pub fn nrow(&self) -> usize {
        self.row_names.len()
    }

    /// Column by name (first match).
    pub fn column(&self, name: &str) -> Option<&RObject> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    /// Column names in order.
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }
}

/// R `typeof()` classes the bridge distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RType {
    /// `NULL`
    Null,
    /// `double`
    Real,
    /// `integer`
    Integer,
    /// `logical`
    Logical,
    /// `character`
    Character,
    /// Generic vector (`list`).
    List,
    /// `data.frame` (a classed list on the R side).
    DataFrame,
    /// Anything else (closures, environments, language objects, ...).
    Other,
}

impl RType {
    /// R-facing name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Real => "double",
            Self::Integer => "integer",
            Self::Logical => "logical",
            Self::Character => "character",
            Self::List => "list",
            Self::DataFrame => "data.frame",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for RType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A foreign (R) value.
#[derive(Debug, Clone, PartialEq)]
pub enum RObject {
    /// `NULL`, the absent marker.
    Null,
    /// Double vector; may hold `NA_real_` and `NaN`.
    Real(Vector<f64>),
    /// Integer vector; `NA_integer_` is [`NA_INTEGER`].
    Integer(Vector<i32>),
    /// Logical vector; `None` is `NA`.
    Logical(Vector<Option<bool>>),
    /// Character vector; `None` is `NA_character_`.
    Character(Vector<Option<String>>),
    /// Generic vector.
    List(Vector<RObject>),
    /// Data frame.
    DataFrame(DataFrame),
    /// A value the bridge does not model, tagged with its `typeof()`.
    Other {
        /// `typeof()` of the value.
        type_name: String,
    },
}

impl RObject {
    /// Plain double vector.
    pub fn real(data: Vec<f64>) -> Self {
        Self::Real(Vector::new(data))
    }

    /// Plain integer vector.
    pub fn integer(data: Vec<i32>) -> Self {
        Self::Integer(Vector::new(data))
    }

    /// Plain logical vector.
    pub fn logical(data: Vec<Option<bool>>) -> Self {
        Self::Logical(Vector::new(data))
    }

    /// Plain character vector without `NA`s.
    pub fn character<S: Into<String>>(data: impl IntoIterator<Item = S>) -> Self {
        Self::Character(Vector::new(data.into_iter().map(|s| Some(s.into())).collect()))
    }

    /// Length-1 character vector.
    pub fn string(s: impl Into<String>) -> Self {
        Self::Character(Vector::new(vec![Some(s.into())]))
    }

    /// Named list from `(name, value)` pairs.
    pub fn named_list<S: Into<String>>(fields: impl IntoIterator<Item = (S, RObject)>) -> Self {
        let (names, values): (Vec<String>, Vec<RObject>) =
            fields.into_iter().map(|(n, v)| (n.into(), v)).unzip();
        Self::List(Vector::new(values).with_names(names))
    }

    /// `typeof()` class.
    pub fn rtype(&self) -> RType {
        match self {
            Self::Null => RType::Null,
            Self::Real(_) => RType::Real,
            Self::Integer(_) => RType::Integer,
            Self::Logical(_) => RType::Logical,
            Self::Character(_) => RType::Character,
            Self::List(_) => RType::List,
            Self::DataFrame(_) => RType::DataFrame,
            Self::Other { .. } => RType::Other,
        }
    }

    /// Type name for diagnostics (`typeof()` for [`RObject::Other`]).
    pub fn type_name(&self) -> &str {
        match self {
            Self::Other { type_name } => type_name,
            other => other.rtype().as_str(),
        }
    }

    /// Attributes of a vector value (`None` for NULL, data frames and others).
    pub fn attributes(&self) -> Option<&Attributes> {
        match self {
            Self::Real(v) => Some(&v.attrs),
            Self::Integer(v) => Some(&v.attrs),
            Self::Logical(v) => Some(&v.attrs),
            Self::Character(v) => Some(&v.attrs),
            Self::List(v) => Some(&v.attrs),
            Self::Null | Self::DataFrame(_) | Self::Other { .. } => None,
        }
    }

    /// `names()` of the value.
    pub fn names(&self) -> Option<Vec<String>> {
        match self {
            Self::DataFrame(df) => Some(df.columns.iter().map(|(n, _)| n.clone()).collect()),
            other => other.attributes().and_then(|a| a.names.clone()),
        }
    }

    /// `length()` of the value.
    pub fn len(&self) -> usize {
        match self {
            Self::Null | Self::Other { .. } => 0,
            Self::Real(v) => v.len(),
            Self::Integer(v) => v.len(),
            Self::Logical(v) => v.len(),
            Self::Character(v) => v.len(),
            Self::List(v) => v.len(),
            Self::DataFrame(df) => df.columns.len(),
        }
    }

    /// `true` if `length()` is zero.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` for `NULL`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Element of a named list (or column of a data frame) by name.
    pub fn get(&self, name: &str) -> Option<&RObject> {
        match self {
            Self::List(v) => {
                let names = v.attrs.names.as_ref()?;
                names.iter().position(|n| n == name).and_then(|i| v.data.get(i))
            }
            Self::DataFrame(df) => df.column(name),
            _ => None,
        }
    }

    /// First element of a character vector, if present and not `NA`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Character(v) => v.data.first().and_then(|s| s.as_deref()),
            _ => None,
        }
    }
}
