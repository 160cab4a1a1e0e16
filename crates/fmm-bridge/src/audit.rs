//! Ingest audit against the engine's own reader.
//!
//! Reads one file twice, once through the host ingest path and once with
//! the engine's `utils::read.csv`, and compares the functional outcome
//! columns cell by cell.

use std::path::Path;

use fmm_core::{Engine, Error, RCall, RObject, Result};
use fmm_translate::ingest::audit::{CellComparison, all_close, compare_cells};
use fmm_translate::{IngestConfig, read_table};

use crate::session::Session;

/// Binding the foreign copy is read into.
pub const AUDIT_BINDING: &str = "audit_dat";

/// Compare the host and foreign reads of `csv_path` on the columns named
/// `<prefix><k>`.
pub fn audit_ingest<E: Engine>(
    session: &mut Session<E>,
    csv_path: &Path,
    config: &IngestConfig,
    prefix: &str,
) -> Result<Vec<CellComparison>> {
    let table = read_table(csv_path, config)?;

    let path = std::path::absolute(csv_path)?;
    let read = RCall::new("utils::read.csv").named("file", RObject::string(path.to_string_lossy()));
    let engine = session.engine_mut();
    engine.call_into(AUDIT_BINDING, &read)?;
    let foreign = match engine.get(AUDIT_BINDING)? {
        RObject::DataFrame(df) => df,
        other => return Err(Error::conversion(AUDIT_BINDING, other.type_name())),
    };

    let cells = compare_cells(&table, &foreign, prefix)?;
    if all_close(&cells) {
        tracing::info!(cells = cells.len(), path = %path.display(), "ingest audit passed");
    } else {
        let n_mismatched = cells.iter().filter(|c| !c.close).count();
        tracing::warn!(cells = cells.len(), n_mismatched, path = %path.display(), "ingest audit found differences");
    }
    Ok(cells)
}
