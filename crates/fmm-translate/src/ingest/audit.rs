//! Cell-by-cell comparison of a host-ingested table against the foreign
//! engine's own read of the same file.
//!
//! Host rows are 0-based internally; the foreign row compared against host
//! row `i` is `i + 1`.

use fmm_core::host::column_as_f64;
use fmm_core::robject::{NA_INTEGER, RObject};
use fmm_core::tolerance::is_close;
use fmm_core::{DataFrame, Error, Result, Table};

/// Default prefix of the functional outcome columns.
pub const DEFAULT_PREFIX: &str = "photometry.";

/// Outcome of comparing one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellComparison {
    /// Column name.
    pub column: String,
    /// 0-based host row.
    pub host_row: usize,
    /// 1-based foreign row.
    pub foreign_row: usize,
    /// Whether the values agree within tolerance.
    pub close: bool,
    /// Host value with 55 decimals.
    pub host_repr: String,
    /// Foreign value with 55 decimals.
    pub foreign_repr: String,
}

/// Compare every cell of the host columns named `<prefix><k>` with the
/// foreign data frame. Columns are visited in order of their numeric suffix.
pub fn compare_cells(table: &Table, foreign: &DataFrame, prefix: &str) -> Result<Vec<CellComparison>> {
    let mut targets: Vec<(u64, String)> = table
        .column_names()
        .into_iter()
        .filter_map(|name| {
            let k = name.strip_prefix(prefix)?.parse::<u64>().ok()?;
            Some((k, name))
        })
        .collect();
    targets.sort();

    let mut out = Vec::new();
    for (_, name) in targets {
        let host = table
            .column(&name)
            .and_then(|c| column_as_f64(c.as_ref()))
            .ok_or_else(|| Error::conversion(name.clone(), "non-numeric host column"))?;
        let theirs = foreign
            .column(&name)
            .ok_or_else(|| Error::Configuration(format!("foreign table has no column '{name}'")))?;
        let theirs = foreign_as_f64(theirs).ok_or_else(|| Error::conversion(name.clone(), theirs.type_name()))?;

        for (row, &h) in host.iter().enumerate() {
            let f = theirs.get(row).copied().unwrap_or(f64::NAN);
            out.push(CellComparison {
                column: name.clone(),
                host_row: row,
                foreign_row: row + 1,
                close: is_close(f, h),
                host_repr: format!("{h:.55}"),
                foreign_repr: format!("{f:.55}"),
            });
        }
    }
    let n_mismatched = out.iter().filter(|c| !c.close).count();
    tracing::debug!(cells = out.len(), n_mismatched, "ingest audit complete");
    Ok(out)
}

/// `true` if every compared cell agreed.
pub fn all_close(cells: &[CellComparison]) -> bool {
    cells.iter().all(|c| c.close)
}

fn foreign_as_f64(obj: &RObject) -> Option<Vec<f64>> {
    match obj {
        RObject::Real(v) => Some(v.data.clone()),
        RObject::Integer(v) => {
            Some(v.data.iter().map(|&x| if x == NA_INTEGER { f64::NAN } else { f64::from(x) }).collect())
        }
        _ => None,
    }
}
