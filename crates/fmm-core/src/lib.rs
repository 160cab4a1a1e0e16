//! # fmm-core
//!
//! Core types, traits, and error handling for the fastFMM bridge.
//!
//! This crate provides:
//! - The error taxonomy shared by every crate in the workspace
//! - A Rust model of the R values that cross the boundary ([`RObject`])
//! - The host-side value model ([`HostValue`], [`Table`], [`NamedList`])
//! - The [`Engine`] trait a foreign R runtime implements

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod call;
pub mod error;
pub mod host;
pub mod robject;
pub mod tolerance;
pub mod traits;

pub use call::{Arg, RCall};
pub use error::{Error, Result};
pub use host::{HostKind, HostValue, LabeledSeries, NamedList, RowIndex, Table};
pub use robject::{Attributes, DataFrame, RObject, RType, RowNames, Vector};
pub use traits::Engine;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
