//! Engine handle and scoped conversion contexts.
//!
//! A [`Session`] owns one engine. Conversion rules are never global: a
//! [`LocalConverter`] activates a [`RuleSet`] on creation and deactivates
//! it when dropped, so a rule set is visible only for the operation that
//! opened it, whichever way that operation exits.

use fmm_core::{Engine, HostValue, RCall, RObject, Result, Table};
use fmm_translate::RuleSet;

/// An engine plus its stack of active conversion contexts.
pub struct Session<E> {
    engine: E,
    active: Vec<RuleSet>,
}

impl<E: Engine> Session<E> {
    /// Wrap an engine. No conversion rules are active.
    pub fn new(engine: E) -> Self {
        Self { engine, active: Vec::new() }
    }

    /// The engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The engine, mutably. Calls made through it bypass conversion.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Release the engine.
    pub fn into_engine(self) -> E {
        self.engine
    }

    /// Innermost active rule set, if a [`LocalConverter`] is open.
    pub fn active_rules(&self) -> Option<&RuleSet> {
        self.active.last()
    }

    /// Number of open conversion contexts.
    pub fn depth(&self) -> usize {
        self.active.len()
    }

    /// Activate `rules` until the returned guard is dropped.
    pub fn local_converter(&mut self, rules: RuleSet) -> LocalConverter<'_, E> {
        tracing::debug!(rules = rules.name(), depth = self.active.len() + 1, "conversion context opened");
        self.active.push(rules);
        LocalConverter { session: self }
    }

    /// Push `table` into foreign state under `name`, converted with `rules`.
    pub fn assign_table(&mut self, name: &str, table: &Table, rules: &RuleSet) -> Result<()> {
        let mut scope = self.local_converter(rules.clone());
        scope.assign(name, &HostValue::Table(table.clone()))?;
        tracing::info!(binding = name, rows = table.num_rows(), cols = table.num_columns(), "table pushed");
        Ok(())
    }
}

/// An open conversion context. Dropping it deactivates its rules.
pub struct LocalConverter<'s, E: Engine> {
    session: &'s mut Session<E>,
}

impl<E: Engine> LocalConverter<'_, E> {
    fn rules(&self) -> &RuleSet {
        // Non-empty while the guard lives.
        &self.session.active[self.session.active.len() - 1]
    }

    /// Name of the active rule set.
    pub fn rules_name(&self) -> &str {
        self.rules().name()
    }

    /// Convert a host value with the active rules.
    pub fn to_foreign(&self, value: &HostValue) -> Result<RObject> {
        self.rules().to_foreign(value)
    }

    /// Convert a foreign value with the active rules.
    pub fn to_host(&self, obj: &RObject) -> Result<HostValue> {
        self.rules().to_host(obj)
    }

    /// Convert `value` and bind it to `name`.
    pub fn assign(&mut self, name: &str, value: &HostValue) -> Result<()> {
        let obj = self.to_foreign(value)?;
        self.session.engine.assign(name, obj)
    }

    /// Fetch `name` and convert it.
    pub fn get(&mut self, name: &str) -> Result<HostValue> {
        let obj = self.session.engine.get(name)?;
        self.to_host(&obj)
    }

    /// Evaluate `call` without converting the result.
    pub fn call_raw(&mut self, call: &RCall) -> Result<RObject> {
        self.session.engine.call(call)
    }

    /// Evaluate `call` and convert the result.
    pub fn call(&mut self, call: &RCall) -> Result<HostValue> {
        let obj = self.call_raw(call)?;
        self.to_host(&obj)
    }

    /// The engine.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.session.engine
    }
}

impl<E: Engine> Drop for LocalConverter<'_, E> {
    fn drop(&mut self) {
        if let Some(rules) = self.session.active.pop() {
            tracing::debug!(rules = rules.name(), depth = self.session.active.len(), "conversion context closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::InMemoryEngine;
    use fmm_core::{Error, HostKind, RowIndex, Vector};

    #[test]
    fn test_scope_pushes_and_pops() {
        let mut session = Session::new(InMemoryEngine::new());
        assert!(session.active_rules().is_none());
        {
            let scope = session.local_converter(RuleSet::bridge());
            assert_eq!(scope.rules_name(), "bridge");
        }
        assert_eq!(session.depth(), 0);
    }

    #[test]
    fn test_scope_closes_on_error() {
        let mut session = Session::new(InMemoryEngine::new());
        let outcome: Result<HostValue> = (|| {
            let mut scope = session.local_converter(RuleSet::base());
            scope.call(&RCall::new("base::no_such_function"))
        })();
        assert!(matches!(outcome, Err(Error::Foreign { .. })));
        assert!(session.active_rules().is_none());
    }

    #[test]
    fn test_assign_and_get_through_scope() {
        let mut session = Session::new(InMemoryEngine::new());
        let table = Table::from_column_major(&[1.0, 2.0], 2, vec!["x".into()], RowIndex::one_based()).unwrap();
        session.assign_table("dat", &table, &RuleSet::base()).unwrap();
        assert!(session.engine_mut().exists("dat").unwrap());
        let back = session.local_converter(RuleSet::base()).get("dat").unwrap();
        assert_eq!(back.as_table().unwrap().to_f64_matrix().unwrap(), table.to_f64_matrix().unwrap());
        assert_eq!(session.depth(), 0);
    }

    #[test]
    fn test_each_scope_uses_its_own_rules() {
        let mut session = Session::new(InMemoryEngine::new());
        let obj = RObject::Real(Vector::new(vec![1.0]).with_names(["a"]));
        session.engine_mut().assign("v", obj).unwrap();
        {
            let mut scope = session.local_converter(RuleSet::base());
            assert_eq!(scope.get("v").unwrap().kind(), HostKind::Array);
        }
        let mut scope = session.local_converter(RuleSet::bridge());
        assert_eq!(scope.get("v").unwrap().kind(), HostKind::Series);
    }
}
