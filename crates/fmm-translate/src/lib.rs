//! # fmm-translate
//!
//! Data translation for the fastFMM bridge.
//!
//! Supports:
//! - Delimited text → [`Table`](fmm_core::Table) with the precision, missing-value
//!   and row-label conventions R expects ([`ingest`])
//! - Host ↔ R value conversion through ordered, extensible rule sets ([`convert`])

#![warn(clippy::all)]
#![allow(clippy::type_complexity)]

pub mod convert;
pub mod ingest;

pub use convert::{Direction, RuleSet, Value, convert};
pub use ingest::{FloatPrecision, IngestConfig, read_table, read_table_from_reader};
