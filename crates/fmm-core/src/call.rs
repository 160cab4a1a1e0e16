//! Structured description of a foreign function call.

use crate::robject::RObject;

/// A call argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// A literal value.
    Value(RObject),
    /// A reference to a binding in foreign state (`base::as.symbol(name)`).
    Symbol(String),
    /// A model formula (`stats::as.formula(text)`), passed through verbatim.
    Formula(String),
    /// A nested call evaluated before the outer one.
    Call(Box<RCall>),
}

impl From<RObject> for Arg {
    fn from(value: RObject) -> Self {
        Self::Value(value)
    }
}

impl From<RCall> for Arg {
    fn from(call: RCall) -> Self {
        Self::Call(Box::new(call))
    }
}

/// `function(args...)`, with `function` usually namespaced (`fastFMM::fui`).
#[derive(Debug, Clone, PartialEq)]
pub struct RCall {
    /// Function name, optionally `pkg::name`.
    pub function: String,
    /// Positional (`None`) and keyword arguments in order.
    pub args: Vec<(Option<String>, Arg)>,
}

impl RCall {
    /// Call with no arguments.
    pub fn new(function: impl Into<String>) -> Self {
        Self { function: function.into(), args: Vec::new() }
    }

    /// Append a positional argument.
    pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
        self.args.push((None, arg.into()));
        self
    }

    /// Append a keyword argument.
    pub fn named(mut self, name: impl Into<String>, arg: impl Into<Arg>) -> Self {
        self.args.push((Some(name.into()), arg.into()));
        self
    }

    /// Keyword argument by name.
    pub fn get(&self, name: &str) -> Option<&Arg> {
        self.args.iter().find(|(n, _)| n.as_deref() == Some(name)).map(|(_, a)| a)
    }

    /// Positional argument `i` (counting positional arguments only).
    pub fn positional(&self, i: usize) -> Option<&Arg> {
        self.args.iter().filter(|(n, _)| n.is_none()).nth(i).map(|(_, a)| a)
    }

    /// Function name without the namespace prefix.
    pub fn bare_name(&self) -> &str {
        self.function.rsplit("::").next().unwrap_or(&self.function)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_lookup() {
        let call = RCall::new("fastFMM::fui")
            .named("formula", Arg::Formula("y ~ x".into()))
            .arg(RObject::string("pos"))
            .named("seed", RObject::integer(vec![1]));
        assert_eq!(call.bare_name(), "fui");
        assert_eq!(call.get("seed"), Some(&Arg::Value(RObject::integer(vec![1]))));
        assert_eq!(call.positional(0), Some(&Arg::Value(RObject::string("pos"))));
        assert!(call.get("missing").is_none());
    }
}
