//! In-process test engine (feature `testing`).
//!
//! Emulates the R functions the bridge calls. `fastFMM::fui` here is a
//! deterministic stand-in used to exercise the bridge; its estimates are
//! not those of the package.
//!
//! | function                    | behavior                                        |
//! |-----------------------------|-------------------------------------------------|
//! | `utils::read.csv`           | R's column typing, automatic row names          |
//! | `fastFMM::fui`              | point-wise least squares (see [`fit`])          |
//! | `utils::packageVersion`     | `package_version` object, unless disabled       |
//! | `utils::installed.packages` | character matrix `[package, c(Package, Version)]` |
//! | `base::as.character`        | vectors and `package_version` objects           |
//!
//! Any other function is an R error (`could not find function`).

mod fit;
mod read_csv;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use fmm_core::robject::NA_INTEGER;
use fmm_core::{Arg, DataFrame, Engine, Error, RCall, RObject, Result, Vector};
use fmm_translate::FloatPrecision;

/// Argument after evaluation.
enum Evaluated {
    Value(RObject),
    Formula(String),
}

/// In-process R emulation.
#[derive(Debug, Clone)]
pub struct InMemoryEngine {
    env: HashMap<String, RObject>,
    packages: BTreeMap<String, String>,
    version_query: bool,
    read_precision: FloatPrecision,
    calls: Vec<String>,
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEngine {
    /// Engine with `fastFMM` 0.4.0 and the base packages installed.
    pub fn new() -> Self {
        let packages = [("base", "4.4.1"), ("stats", "4.4.1"), ("utils", "4.4.1"), ("fastFMM", "0.4.0")]
            .into_iter()
            .map(|(p, v)| (p.to_string(), v.to_string()))
            .collect();
        Self {
            env: HashMap::new(),
            packages,
            version_query: true,
            read_precision: FloatPrecision::RoundTrip,
            calls: Vec::new(),
        }
    }

    /// Install (or replace) a package version.
    pub fn with_package(mut self, package: impl Into<String>, version: impl Into<String>) -> Self {
        self.packages.insert(package.into(), version.into());
        self
    }

    /// Remove a package.
    pub fn without_package(mut self, package: &str) -> Self {
        self.packages.remove(package);
        self
    }

    /// Make `utils::packageVersion` fail, as it does when the package
    /// metadata is unreadable.
    pub fn without_version_query(mut self) -> Self {
        self.version_query = false;
        self
    }

    /// Float parsing used by `read.csv`.
    pub fn with_read_precision(mut self, precision: FloatPrecision) -> Self {
        self.read_precision = precision;
        self
    }

    /// Functions called so far, in order.
    pub fn calls(&self) -> &[String] {
        &self.calls
    }

    fn evaluate(&mut self, arg: &Arg) -> Result<Evaluated> {
        Ok(match arg {
            Arg::Value(v) => Evaluated::Value(v.clone()),
            Arg::Symbol(name) => Evaluated::Value(self.get(name)?),
            Arg::Formula(text) => Evaluated::Formula(text.clone()),
            Arg::Call(call) => Evaluated::Value(self.call(call)?),
        })
    }

    fn package_version(&self, function: &str, package: &str) -> Result<RObject> {
        if !self.version_query {
            return Err(foreign(function, "package metadata is unavailable"));
        }
        let version = self
            .packages
            .get(package)
            .ok_or_else(|| foreign(function, format!("there is no package called '{package}'")))?;
        let parts: Vec<i32> = version.split(|c: char| c == '.' || c == '-').filter_map(|p| p.parse().ok()).collect();
        Ok(RObject::List(Vector::new(vec![RObject::integer(parts)]).with_class(["package_version", "numeric_version"])))
    }

    fn installed_packages(&self) -> RObject {
        let n = self.packages.len();
        let mut data: Vec<Option<String>> = self.packages.keys().cloned().map(Some).collect();
        data.extend(self.packages.values().cloned().map(Some));
        RObject::Character(
            Vector::new(data)
                .with_dim(vec![n, 2])
                .with_dimnames(vec![Some(self.packages.keys().cloned().collect()), Some(vec!["Package".into(), "Version".into()])]),
        )
    }
}

fn foreign(function: &str, message: impl Into<String>) -> Error {
    Error::Foreign { call: function.to_string(), message: message.into() }
}

fn as_character(function: &str, obj: &RObject) -> Result<RObject> {
    let strings: Vec<Option<String>> = match obj {
        RObject::Character(v) => v.data.clone(),
        RObject::Integer(v) => v.data.iter().map(|&x| (x != NA_INTEGER).then(|| x.to_string())).collect(),
        RObject::Real(v) => v.data.iter().map(|x| (!x.is_nan()).then(|| x.to_string())).collect(),
        RObject::Logical(v) => v.data.iter().map(|b| b.map(|b| if b { "TRUE" } else { "FALSE" }.to_string())).collect(),
        // A package_version: one integer vector of components per element.
        RObject::List(v) if v.attrs.class.as_ref().is_some_and(|c| c.iter().any(|c| c == "numeric_version")) => v
            .data
            .iter()
            .map(|elem| match elem {
                RObject::Integer(parts) => {
                    Some(parts.data.iter().map(i32::to_string).collect::<Vec<_>>().join("."))
                }
                _ => None,
            })
            .collect(),
        other => return Err(foreign(function, format!("cannot coerce type '{}' to vector of type 'character'", other.type_name()))),
    };
    Ok(RObject::Character(Vector::new(strings)))
}

impl Engine for InMemoryEngine {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn assign(&mut self, name: &str, value: RObject) -> Result<()> {
        self.env.insert(name.to_string(), value);
        Ok(())
    }

    fn get(&mut self, name: &str) -> Result<RObject> {
        self.env.get(name).cloned().ok_or_else(|| foreign("base::get", format!("object '{name}' not found")))
    }

    fn exists(&mut self, name: &str) -> Result<bool> {
        Ok(self.env.contains_key(name))
    }

    fn call(&mut self, call: &RCall) -> Result<RObject> {
        self.calls.push(call.function.clone());
        let function = call.function.as_str();
        let mut positional: Vec<Evaluated> = Vec::new();
        let mut named: HashMap<String, Evaluated> = HashMap::new();
        for (name, arg) in &call.args {
            let value = self.evaluate(arg)?;
            match name {
                Some(name) => {
                    named.insert(name.clone(), value);
                }
                None => positional.push(value),
            }
        }
        let mut first = |key: &str| -> Option<Evaluated> {
            named.remove(key).or_else(|| (!positional.is_empty()).then(|| positional.remove(0)))
        };

        match call.bare_name() {
            "read.csv" => {
                let path = match first("file") {
                    Some(Evaluated::Value(obj)) => obj.as_str().map(str::to_string),
                    _ => None,
                }
                .ok_or_else(|| foreign(function, "argument \"file\" is missing, with no default"))?;
                let df = read_csv::read_csv(Path::new(&path), self.read_precision)?;
                tracing::debug!(path = %path, rows = df.nrow(), cols = df.columns.len(), "read.csv");
                Ok(RObject::DataFrame(df))
            }
            "fui" => {
                let formula = match first("formula") {
                    Some(Evaluated::Formula(text)) => text,
                    Some(Evaluated::Value(obj)) => obj
                        .as_str()
                        .map(str::to_string)
                        .ok_or_else(|| foreign(function, "'formula' must be a formula"))?,
                    None => return Err(foreign(function, "argument \"formula\" is missing, with no default")),
                };
                let data: DataFrame = match first("data") {
                    Some(Evaluated::Value(RObject::DataFrame(df))) => df,
                    Some(Evaluated::Value(other)) => {
                        return Err(foreign(function, format!("'data' must be a data.frame, not {}", other.type_name())));
                    }
                    _ => return Err(foreign(function, "argument \"data\" is missing, with no default")),
                };
                let mut args = HashMap::new();
                for (key, value) in named {
                    match value {
                        Evaluated::Value(obj) => {
                            args.insert(key, obj);
                        }
                        Evaluated::Formula(_) => return Err(foreign(function, format!("unexpected formula for '{key}'"))),
                    }
                }
                let fit_args = fit::FitArgs::from_args(&args)?;
                fit::fui(&formula, &data, &fit_args)
            }
            "packageVersion" => match first("pkg") {
                Some(Evaluated::Value(obj)) => {
                    let package = obj.as_str().ok_or_else(|| foreign(function, "invalid package name"))?;
                    self.package_version(function, package)
                }
                _ => Err(foreign(function, "argument \"pkg\" is missing, with no default")),
            },
            "installed.packages" => Ok(self.installed_packages()),
            "as.character" => match first("x") {
                Some(Evaluated::Value(obj)) => as_character(function, &obj),
                _ => Err(foreign(function, "argument \"x\" is missing, with no default")),
            },
            _ => Err(foreign(function, format!("could not find function \"{function}\""))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_version_object_to_character() {
        let mut engine = InMemoryEngine::new();
        let call = RCall::new("base::as.character").arg(RCall::new("utils::packageVersion").arg(RObject::string("fastFMM")));
        assert_eq!(engine.call(&call).unwrap().as_str(), Some("0.4.0"));
        assert_eq!(engine.calls(), &["base::as.character".to_string(), "utils::packageVersion".to_string()]);
    }

    #[test]
    fn test_version_query_can_be_disabled() {
        let mut engine = InMemoryEngine::new().without_version_query();
        let err = engine.call(&RCall::new("utils::packageVersion").arg(RObject::string("fastFMM"))).unwrap_err();
        assert!(matches!(err, Error::Foreign { .. }));
    }

    #[test]
    fn test_installed_packages_matrix() {
        let mut engine = InMemoryEngine::new().with_package("lme4", "1.1-35.5");
        match engine.call(&RCall::new("utils::installed.packages")).unwrap() {
            RObject::Character(v) => {
                let n = v.attrs.dim.as_ref().unwrap()[0];
                let rows = v.attrs.dimnames.as_ref().unwrap()[0].clone().unwrap();
                let i = rows.iter().position(|r| r == "lme4").unwrap();
                assert_eq!(v.data[n + i].as_deref(), Some("1.1-35.5"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unknown_symbol_and_function() {
        let mut engine = InMemoryEngine::new();
        assert!(matches!(engine.get("missing"), Err(Error::Foreign { .. })));
        let err = engine.call(&RCall::new("stats::lm")).unwrap_err();
        assert!(err.to_string().contains("could not find function"), "{err}");
    }
}
