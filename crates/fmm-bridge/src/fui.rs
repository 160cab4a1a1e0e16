//! `fastFMM::fui` invocation.
//!
//! ```text
//! DataSource ──ingest──▶ Table ──rules──▶ data.frame (bound in R)
//!                                              │
//!            fastFMM::fui(formula, data = <binding>, ...)   [LocalConverter]
//!                                              │
//! FuiResult ◀──────────── rules ◀──── named list
//! ```

use std::path::{Path, PathBuf};

use fmm_core::{Arg, Engine, Error, HostValue, NamedList, RCall, RObject, Result, Table};
use fmm_translate::{IngestConfig, RuleSet, read_table};

use crate::options::FuiOptions;
use crate::session::Session;

/// Binding used when the caller does not name one.
pub const DEFAULT_BINDING: &str = "host_dat";

/// Fully qualified fit function.
pub const FUI_FUNCTION: &str = "fastFMM::fui";

/// Where the model data comes from.
///
/// Valid combinations:
///
/// | `csv_path` | `table` | `binding` | meaning                                  |
/// |------------|---------|-----------|------------------------------------------|
/// | set        | -       | set       | ingest the file, push it under `binding` |
/// | -          | set     | set       | push the table under `binding`           |
/// | -          | -       | set       | use an existing foreign binding          |
///
/// Anything else is rejected with [`Error::Configuration`].
#[derive(Debug, Clone, Default)]
pub struct DataSource {
    /// Delimited text file to ingest.
    pub csv_path: Option<PathBuf>,
    /// Already-ingested table.
    pub table: Option<Table>,
    /// Foreign binding name.
    pub binding: Option<String>,
    /// Ingest settings for `csv_path`.
    pub ingest: IngestConfig,
}

impl DataSource {
    /// Ingest `path` and bind it under [`DEFAULT_BINDING`].
    pub fn csv(path: impl Into<PathBuf>) -> Self {
        Self { csv_path: Some(path.into()), binding: Some(DEFAULT_BINDING.to_string()), ..Self::default() }
    }

    /// Push `table` under [`DEFAULT_BINDING`].
    pub fn table(table: Table) -> Self {
        Self { table: Some(table), binding: Some(DEFAULT_BINDING.to_string()), ..Self::default() }
    }

    /// Use a data frame already bound to `name` in foreign state.
    pub fn binding(name: impl Into<String>) -> Self {
        Self { binding: Some(name.into()), ..Self::default() }
    }

    /// Bind under `name` instead.
    pub fn bound_to(mut self, name: impl Into<String>) -> Self {
        self.binding = Some(name.into());
        self
    }

    /// Ingest settings for the CSV path.
    pub fn with_ingest(mut self, config: IngestConfig) -> Self {
        self.ingest = config;
        self
    }

    /// Make the data visible to the engine and return the binding it lives under.
    fn prepare<E: Engine>(self, session: &mut Session<E>, rules: &RuleSet) -> Result<String> {
        let binding = match self.binding {
            Some(b) if !b.trim().is_empty() => b,
            _ => return Err(Error::Configuration("a binding name is required".into())),
        };
        match (self.csv_path, self.table) {
            (Some(path), None) => {
                let table = read_table(&path, &self.ingest)?;
                session.assign_table(&binding, &table, rules)?;
            }
            (None, Some(table)) => session.assign_table(&binding, &table, rules)?,
            (None, None) => {
                if !session.engine_mut().exists(&binding)? {
                    return Err(Error::Configuration(format!(
                        "no data given and '{binding}' is not bound in the {} engine",
                        session.engine().name()
                    )));
                }
            }
            (Some(path), Some(_)) => {
                return Err(Error::Configuration(format!(
                    "give either a CSV path ({}) or a table, not both",
                    path.display()
                )));
            }
        }
        Ok(binding)
    }
}

/// Converted result of one fit.
#[derive(Debug, Clone, PartialEq)]
pub struct FuiResult {
    fields: NamedList,
}

impl FuiResult {
    /// Field by name.
    pub fn get(&self, name: &str) -> Option<&HostValue> {
        self.fields.get(name)
    }

    /// Field names in result order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(name, _)| name).collect()
    }

    /// Coefficient estimates (`betaHat`).
    pub fn beta_hat(&self) -> Option<&HostValue> {
        self.get("betaHat")
    }

    /// Functional domain points the model was fit on (`argvals`).
    pub fn argvals(&self) -> Option<&HostValue> {
        self.get("argvals")
    }

    /// The whole result.
    pub fn as_list(&self) -> &NamedList {
        &self.fields
    }

    /// Unwrap into the named list.
    pub fn into_inner(self) -> NamedList {
        self.fields
    }
}

/// Fit `formula` on `source` with `fastFMM::fui`.
///
/// The table is pushed with `rules`, the call runs inside a
/// [`LocalConverter`](crate::LocalConverter) holding a copy of `rules`, and
/// the result is converted back with them. An R-side failure of the fit is
/// reported as [`Error::ModelFit`].
pub fn fui<E: Engine>(
    session: &mut Session<E>,
    source: DataSource,
    formula: &str,
    options: &FuiOptions,
    rules: &RuleSet,
) -> Result<FuiResult> {
    check_formula(formula)?;
    let binding = source.prepare(session, rules)?;
    fit_bound(session, &binding, formula, options, rules)
}

/// Fit on data read by the engine's own `utils::read.csv`.
///
/// This is the reference side when checking the host ingest path: the
/// bytes of `csv_path` never pass through the host.
pub fn fui_native<E: Engine>(
    session: &mut Session<E>,
    csv_path: &Path,
    binding: &str,
    formula: &str,
    options: &FuiOptions,
    rules: &RuleSet,
) -> Result<FuiResult> {
    check_formula(formula)?;
    if binding.trim().is_empty() {
        return Err(Error::Configuration("a binding name is required".into()));
    }
    let path = std::path::absolute(csv_path)?;
    let read = RCall::new("utils::read.csv").named("file", RObject::string(path.to_string_lossy()));
    session.engine_mut().call_into(binding, &read)?;
    tracing::info!(binding, path = %path.display(), "foreign read.csv");
    fit_bound(session, binding, formula, options, rules)
}

fn check_formula(formula: &str) -> Result<()> {
    if formula.trim().is_empty() {
        return Err(Error::Configuration("formula is empty".into()));
    }
    Ok(())
}

fn fui_call(binding: &str, formula: &str, options: &FuiOptions) -> RCall {
    let call = RCall::new(FUI_FUNCTION)
        .named("formula", Arg::Formula(formula.to_string()))
        .named("data", Arg::Symbol(binding.to_string()));
    options.to_args().into_iter().fold(call, |call, (name, arg)| call.named(name, arg))
}

fn fit_bound<E: Engine>(
    session: &mut Session<E>,
    binding: &str,
    formula: &str,
    options: &FuiOptions,
    rules: &RuleSet,
) -> Result<FuiResult> {
    let call = fui_call(binding, formula, options);
    tracing::info!(formula, binding, engine = session.engine().name(), rules = rules.name(), "calling fastFMM::fui");

    let mut scope = session.local_converter(rules.clone());
    let value = scope.call(&call).map_err(|e| match e {
        Error::Foreign { message, .. } => Error::ModelFit(message),
        other => other,
    })?;
    match value {
        HostValue::List(fields) => {
            tracing::info!(fields = fields.len(), "fit complete");
            Ok(FuiResult { fields })
        }
        other => Err(Error::ModelFit(format!("{FUI_FUNCTION} returned {}, not a named list", other.kind()))),
    }
}
