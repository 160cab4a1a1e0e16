//! Core traits for the bridge
//!
//! [`Engine`] is the boundary a foreign R runtime implements. High-level
//! bridge logic depends only on this trait, never on a concrete runtime.

use crate::Result;
use crate::call::RCall;
use crate::robject::RObject;

/// A foreign R runtime with its own global state (bindings).
///
/// Every method takes `&mut self`: an engine is not reentrant and must not
/// be driven from several threads at once. Calls block until the runtime
/// returns; there is no cancellation.
pub trait Engine {
    /// Runtime name for diagnostics (e.g. "Rscript", "in-memory").
    fn name(&self) -> &str;

    /// Bind `value` to `name` in the global environment.
    fn assign(&mut self, name: &str, value: RObject) -> Result<()>;

    /// Fetch the value bound to `name`.
    fn get(&mut self, name: &str) -> Result<RObject>;

    /// `true` if `name` is bound in the global environment.
    fn exists(&mut self, name: &str) -> Result<bool>;

    /// Evaluate `call` and return its value.
    ///
    /// R-level errors surface as [`crate::Error::Foreign`].
    fn call(&mut self, call: &RCall) -> Result<RObject>;

    /// Evaluate `call` and bind the value to `binding` without returning it.
    fn call_into(&mut self, binding: &str, call: &RCall) -> Result<()> {
        let value = self.call(call)?;
        self.assign(binding, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct DummyEngine {
        env: HashMap<String, RObject>,
    }

    impl Engine for DummyEngine {
        fn name(&self) -> &str {
            "Dummy"
        }

        fn assign(&mut self, name: &str, value: RObject) -> Result<()> {
            self.env.insert(name.to_string(), value);
            Ok(())
        }

        fn get(&mut self, name: &str) -> Result<RObject> {
            Ok(self.env.get(name).cloned().unwrap_or(RObject::Null))
        }

        fn exists(&mut self, name: &str) -> Result<bool> {
            Ok(self.env.contains_key(name))
        }

        fn call(&mut self, call: &RCall) -> Result<RObject> {
            Ok(RObject::string(call.function.clone()))
        }
    }

    #[test]
    fn test_default_call_into_binds_result() {
        let mut engine = DummyEngine::default();
        engine.call_into("out", &RCall::new("base::identity")).unwrap();
        assert!(engine.exists("out").unwrap());
        assert_eq!(engine.get("out").unwrap().as_str(), Some("base::identity"));
        assert_eq!(engine.name(), "Dummy");
    }
}
