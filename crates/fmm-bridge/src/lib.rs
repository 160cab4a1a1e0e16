//! # fmm-bridge
//!
//! Call `fastFMM::fui` from Rust and get host-native results back.
//!
//! This crate provides:
//! - [`Session`], an engine handle with scoped conversion contexts ([`LocalConverter`])
//! - [`fui`] / [`fui_native`], the invocation adapter and its options ([`FuiOptions`])
//! - [`equivalence::compare`], a recursive diff of two result structures
//! - [`version`], installed-package version queries
//! - [`engine`], the `Rscript` engine (and, with the `testing` feature, an
//!   in-memory test double)
//!
//! ## Architecture
//!
//! Everything above [`engine`] depends on the [`fmm_core::Engine`] trait
//! only; the engine is chosen when the [`Session`] is created.
//!
//! ```no_run
//! use fmm_bridge::{DataSource, FuiOptions, Session, fui};
//! use fmm_bridge::engine::RscriptEngine;
//! use fmm_translate::RuleSet;
//!
//! # fn main() -> fmm_core::Result<()> {
//! let mut session = Session::new(RscriptEngine::from_env()?);
//! let source = DataSource::csv("lick.csv").bound_to("host_dat");
//! let result = fui(&mut session, source, "photometry ~ cs + (1 | id)", &FuiOptions::default(), &RuleSet::bridge())?;
//! println!("{:?}", result.field_names());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod audit;
pub mod engine;
pub mod equivalence;
pub mod fui;
pub mod options;
pub mod session;
pub mod version;

pub use equivalence::{Mismatch, common_fields, compare};
pub use fui::{DEFAULT_BINDING, DataSource, FuiResult, fui, fui_native};
pub use options::{FuiOptions, NonNegativity};
pub use session::{LocalConverter, Session};
pub use version::{PackageVersion, check_fastfmm_version, check_version, fastfmm_version, package_version};
