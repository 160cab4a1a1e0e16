//! Host ↔ R conversion through ordered rule sets.
//!
//! A [`RuleSet`] is a strategy table: foreign→host rules keyed by [`RType`]
//! and host→foreign rules keyed by [`HostKind`]. For a given source type the
//! rules are tried front to back; a rule answers `Ok(None)` to decline and
//! the next one is tried. Only when every rule declines is the conversion an
//! error.
//!
//! ```text
//! RuleSet::default_rules()      NULL, scalars, atomic vectors, lists
//!   + RuleSet::table_rules()    data.frame <-> Table, labeled series
//!   .with_float_override()      double vectors by labeling (see [`float`])
//! ```
//!
//! Registration mutates only the instance it is called on; rule sets are
//! cheap to clone (rules are reference-counted).
//!
//! # Modules
//!
//! - [`rules`]: base rules
//! - [`float`]: the double-vector override

pub mod float;
pub mod rules;

use std::fmt;
use std::ops::Add;
use std::sync::Arc;

use fmm_core::{Error, HostKind, HostValue, RObject, RType, Result};

/// Foreign→host conversion function. `Ok(None)` declines.
pub type ToHostFn = Arc<dyn Fn(&RObject, &RuleSet) -> Result<Option<HostValue>> + Send + Sync>;

/// Host→foreign conversion function. `Ok(None)` declines.
pub type ToForeignFn = Arc<dyn Fn(&HostValue, &RuleSet) -> Result<Option<RObject>> + Send + Sync>;

/// A foreign→host rule.
#[derive(Clone)]
pub struct ToHostRule {
    name: String,
    source: RType,
    apply: ToHostFn,
}

impl ToHostRule {
    /// Rule for values of `source` type.
    pub fn new<F>(source: RType, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&RObject, &RuleSet) -> Result<Option<HostValue>> + Send + Sync + 'static,
    {
        Self { name: name.into(), source, apply: Arc::new(f) }
    }

    /// Rule name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source type.
    pub fn source(&self) -> RType {
        self.source
    }
}

/// A host→foreign rule.
#[derive(Clone)]
pub struct ToForeignRule {
    name: String,
    source: HostKind,
    apply: ToForeignFn,
}

impl ToForeignRule {
    /// Rule for host values of `source` kind.
    pub fn new<F>(source: HostKind, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&HostValue, &RuleSet) -> Result<Option<RObject>> + Send + Sync + 'static,
    {
        Self { name: name.into(), source, apply: Arc::new(f) }
    }

    /// Rule name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source kind.
    pub fn source(&self) -> HostKind {
        self.source
    }
}

/// Conversion direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// R → host.
    ToHost,
    /// Host → R.
    ToForeign,
}

/// A value on either side of the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Host value.
    Host(HostValue),
    /// Foreign value.
    Foreign(RObject),
}

/// Ordered, extensible set of conversion rules.
#[derive(Clone, Default)]
pub struct RuleSet {
    name: String,
    to_host: Vec<ToHostRule>,
    to_foreign: Vec<ToForeignRule>,
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSet")
            .field("name", &self.name)
            .field("to_host", &self.to_host.iter().map(|r| r.name.as_str()).collect::<Vec<_>>())
            .field("to_foreign", &self.to_foreign.iter().map(|r| r.name.as_str()).collect::<Vec<_>>())
            .finish()
    }
}

impl RuleSet {
    /// Rule set with no rules.
    pub fn empty(name: impl Into<String>) -> Self {
        Self { name: name.into(), to_host: Vec::new(), to_foreign: Vec::new() }
    }

    /// `default_rules() + table_rules()`.
    pub fn base() -> Self {
        let mut rules = Self::default_rules() + Self::table_rules();
        rules.name = "base".to_string();
        rules
    }

    /// The rule set the bridge uses for model results: [`RuleSet::base`]
    /// with the double-vector override.
    pub fn bridge() -> Self {
        let mut rules = Self::base().with_float_override();
        rules.name = "bridge".to_string();
        rules
    }

    /// Register the double-vector override ([`float::float_vector_rules`]) ahead
    /// of every existing double rule.
    pub fn with_float_override(mut self) -> Self {
        self.register_to_host_group(float::float_vector_rules());
        self
    }

    /// Name of this rule set.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a foreign→host rule that takes precedence over existing ones.
    pub fn register_to_host<F>(&mut self, source: RType, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&RObject, &RuleSet) -> Result<Option<HostValue>> + Send + Sync + 'static,
    {
        self.to_host.insert(0, ToHostRule::new(source, name, f));
        self
    }

    /// Register a host→foreign rule that takes precedence over existing ones.
    pub fn register_to_foreign<F>(&mut self, source: HostKind, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&HostValue, &RuleSet) -> Result<Option<RObject>> + Send + Sync + 'static,
    {
        self.to_foreign.insert(0, ToForeignRule::new(source, name, f));
        self
    }

    /// Register several foreign→host rules ahead of existing ones, keeping their order.
    pub fn register_to_host_group(&mut self, group: Vec<ToHostRule>) -> &mut Self {
        self.to_host.splice(0..0, group);
        self
    }

    /// Names of the foreign→host rules for `source`, in evaluation order.
    pub fn to_host_rule_names(&self, source: RType) -> Vec<&str> {
        self.to_host.iter().filter(|r| r.source == source).map(|r| r.name.as_str()).collect()
    }

    /// Names of the host→foreign rules for `source`, in evaluation order.
    pub fn to_foreign_rule_names(&self, source: HostKind) -> Vec<&str> {
        self.to_foreign.iter().filter(|r| r.source == source).map(|r| r.name.as_str()).collect()
    }

    /// Convert a foreign value to the host side.
    pub fn to_host(&self, obj: &RObject) -> Result<HostValue> {
        let rtype = obj.rtype();
        for rule in self.to_host.iter().filter(|r| r.source == rtype) {
            if let Some(value) = (rule.apply)(obj, self)? {
                tracing::trace!(rule = %rule.name, rtype = %rtype, "converted to host");
                return Ok(value);
            }
        }
        Err(Error::conversion("", obj.type_name()))
    }

    /// Convert a host value to the foreign side.
    pub fn to_foreign(&self, value: &HostValue) -> Result<RObject> {
        let kind = value.kind();
        for rule in self.to_foreign.iter().filter(|r| r.source == kind) {
            if let Some(obj) = (rule.apply)(value, self)? {
                tracing::trace!(rule = %rule.name, kind = %kind, "converted to foreign");
                return Ok(obj);
            }
        }
        Err(Error::conversion("", kind.to_string()))
    }
}

/// `lhs + rhs`: the union of both rule sets, `rhs` rules tried first.
impl Add for RuleSet {
    type Output = RuleSet;

    fn add(self, rhs: RuleSet) -> RuleSet {
        let mut to_host = rhs.to_host;
        to_host.extend(self.to_host);
        let mut to_foreign = rhs.to_foreign;
        to_foreign.extend(self.to_foreign);
        RuleSet { name: format!("{} + {}", self.name, rhs.name), to_host, to_foreign }
    }
}

/// Convert `value` in `direction` with `rules`. A value already on the
/// target side is returned unchanged.
pub fn convert(value: &Value, direction: Direction, rules: &RuleSet) -> Result<Value> {
    match (value, direction) {
        (Value::Foreign(obj), Direction::ToHost) => rules.to_host(obj).map(Value::Host),
        (Value::Host(v), Direction::ToForeign) => rules.to_foreign(v).map(Value::Foreign),
        (Value::Host(_), Direction::ToHost) | (Value::Foreign(_), Direction::ToForeign) => {
            Ok(value.clone())
        }
    }
}
