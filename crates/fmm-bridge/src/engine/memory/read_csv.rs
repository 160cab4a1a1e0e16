//! `utils::read.csv` as R performs it: per-column type detection over the
//! whole column, `NA` and blank numeric cells as missing, automatic row names.

use std::path::Path;

use fmm_core::robject::{NA_INTEGER, na_real};
use fmm_core::{DataFrame, Error, RObject, Result, RowNames, Vector};
use fmm_translate::FloatPrecision;

pub(super) fn read_csv(path: &Path, precision: FloatPrecision) -> Result<DataFrame> {
    let foreign = |message: String| Error::Foreign { call: "utils::read.csv".into(), message };
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| foreign(format!("cannot open file '{}': {e}", path.display())))?;
    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| foreign(e.to_string()))?
        .iter()
        .map(|h| make_name(h.trim()))
        .collect();
    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for record in rdr.records() {
        let record = record.map_err(|e| foreign(e.to_string()))?;
        for (j, field) in record.iter().enumerate() {
            cells[j].push(field.trim().to_string());
        }
    }
    let n_rows = cells.first().map_or(0, Vec::len);
    let columns = headers.into_iter().zip(cells).map(|(name, col)| (name, column(&col, precision))).collect();
    Ok(DataFrame { columns, row_names: RowNames::Automatic(n_rows) })
}

/// `make.names` for the characters that occur in column headers.
fn make_name(header: &str) -> String {
    let mut name: String =
        header.chars().map(|c| if c.is_alphanumeric() || c == '.' || c == '_' { c } else { '.' }).collect();
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit() || c == '_') {
        name.insert(0, 'X');
    }
    name
}

fn is_missing(cell: &str) -> bool {
    cell.is_empty() || cell == "NA"
}

fn parse_logical(cell: &str) -> Option<bool> {
    match cell {
        "TRUE" | "T" | "True" | "true" => Some(true),
        "FALSE" | "F" | "False" | "false" => Some(false),
        _ => None,
    }
}

fn column(cells: &[String], precision: FloatPrecision) -> RObject {
    let present: Vec<&str> = cells.iter().map(String::as_str).filter(|c| !is_missing(c)).collect();
    if present.iter().all(|c| c.parse::<i32>().is_ok_and(|v| v != NA_INTEGER)) {
        return RObject::integer(cells.iter().map(|c| c.parse().unwrap_or(NA_INTEGER)).collect());
    }
    if present.iter().all(|c| precision.parse(c).is_some()) {
        let data = cells.iter().map(|c| if is_missing(c) { None } else { precision.parse(c) });
        return RObject::real(data.map(|v| v.unwrap_or_else(na_real)).collect());
    }
    if present.iter().all(|c| parse_logical(c).is_some()) {
        return RObject::logical(cells.iter().map(|c| parse_logical(c)).collect());
    }
    // Character columns keep blanks as "".
    RObject::Character(Vector::new(cells.iter().map(|c| (c != "NA").then(|| c.clone())).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmm_core::robject::is_na_real;
    use std::io::Write;

    #[test]
    fn test_r_column_types() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "id,trial,photometry.1,flag,label\n1,1,0.5,TRUE,a\n2,,NA,F,\n3,NA,1e-3,NA,NA\n").unwrap();
        file.flush().unwrap();
        let df = read_csv(file.path(), FloatPrecision::RoundTrip).unwrap();
        assert_eq!(df.row_names, RowNames::Automatic(3));
        assert_eq!(df.column("id").unwrap(), &RObject::integer(vec![1, 2, 3]));
        assert_eq!(df.column("trial").unwrap(), &RObject::integer(vec![1, NA_INTEGER, NA_INTEGER]));
        match df.column("photometry.1").unwrap() {
            RObject::Real(v) => {
                assert_eq!(v.data[0], 0.5);
                assert!(is_na_real(v.data[1]));
                assert_eq!(v.data[2], 1e-3);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(df.column("flag").unwrap(), &RObject::logical(vec![Some(true), Some(false), None]));
        assert_eq!(
            df.column("label").unwrap(),
            &RObject::Character(Vector::new(vec![Some("a".into()), Some(String::new()), None]))
        );
    }

    #[test]
    fn test_header_names_are_syntactic() {
        assert_eq!(make_name("photometry.1"), "photometry.1");
        assert_eq!(make_name("1st"), "X1st");
        assert_eq!(make_name("a b"), "a.b");
    }

    #[test]
    fn test_missing_file_is_foreign_error() {
        let err = read_csv(Path::new("/nonexistent/x.csv"), FloatPrecision::RoundTrip).unwrap_err();
        assert!(matches!(err, Error::Foreign { ref call, .. } if call == "utils::read.csv"), "{err}");
    }
}
