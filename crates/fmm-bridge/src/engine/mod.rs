//! Engines: the foreign R runtimes a [`Session`](crate::Session) can drive.
//!
//! - [`RscriptEngine`] runs a real R installation through `Rscript`.
//! - `InMemoryEngine` (feature `testing`) emulates the handful of R
//!   functions the bridge calls, in process. Its `fui` is a deterministic
//!   stand-in for tests; the numbers it returns are not fastFMM estimates.

#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod rscript;

#[cfg(any(test, feature = "testing"))]
pub use memory::InMemoryEngine;
pub use rscript::{RscriptConfig, RscriptEngine};
