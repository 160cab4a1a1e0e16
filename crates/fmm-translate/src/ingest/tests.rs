//! Tests for text → Table ingestion.

use std::io::Write;

use arrow::array::{Array, Float64Array, Int32Array, StringArray};
use fmm_core::robject::{NA_INTEGER, RObject, RowNames, Vector};
use fmm_core::{DataFrame, Error, RowIndex};

use super::audit::{DEFAULT_PREFIX, all_close, compare_cells};
use super::*;

const SAMPLE: &str = "\
id,trial,cs,photometry.1,photometry.2
1,1,0,0.1,0.30000000000000004
1,,1,0.25,-1.5e-3
2,-3,0,1.7976931348623157e308,2.5
2,4,1,NA,0.123456789012345678
";

fn sample_table() -> Table {
    read_table_from_reader(SAMPLE.as_bytes(), &IngestConfig::default()).unwrap()
}

#[test]
fn test_rows_labelled_from_one() {
    let t = sample_table();
    assert_eq!(t.num_rows(), 4);
    assert_eq!(t.index(), &RowIndex::Range { start: 1 });
    let labels = t.row_labels();
    assert_eq!(labels.first().map(String::as_str), Some("1"));
    assert_eq!(labels.last().map(String::as_str), Some("4"));
}

#[test]
fn test_trial_is_nullable_integer() {
    let t = sample_table();
    let trial = t.column("trial").unwrap();
    let trial = trial.as_any().downcast_ref::<Int32Array>().expect("trial must be Int32");
    let values: Vec<Option<i32>> = trial.iter().collect();
    assert_eq!(values, vec![Some(1), None, None, Some(4)]);
    assert!(values.iter().flatten().all(|&v| v >= 1));
}

#[test]
fn test_trial_truncates_float_text() {
    let csv = "trial,y\n2.9,1\n0.5,2\nNaN,3\n";
    let t = read_table_from_reader(csv.as_bytes(), &IngestConfig::default()).unwrap();
    let trial = t.column("trial").unwrap().as_any().downcast_ref::<Int32Array>().unwrap().clone();
    assert_eq!(trial.iter().collect::<Vec<_>>(), vec![Some(2), None, None]);
}

#[test]
fn test_missing_trial_column_is_parse_error() {
    let err = read_table_from_reader("id,y\n1,2\n".as_bytes(), &IngestConfig::default()).unwrap_err();
    assert!(matches!(err, Error::Parse(ref m) if m.contains("trial")), "{err}");
}

#[test]
fn test_non_numeric_trial_is_parse_error() {
    let err = read_table_from_reader("trial,y\n1,2\nfirst,3\n".as_bytes(), &IngestConfig::default())
        .unwrap_err();
    assert!(matches!(err, Error::Parse(ref m) if m.contains("row 2")), "{err}");
}

#[test]
fn test_ragged_rows_are_parse_error() {
    let err =
        read_table_from_reader("trial,y\n1,2\n3\n".as_bytes(), &IngestConfig::default()).unwrap_err();
    assert!(matches!(err, Error::Parse(_)), "{err}");
}

#[test]
fn test_column_type_inference() {
    let t = sample_table();
    assert!(t.column("id").unwrap().as_any().downcast_ref::<Int32Array>().is_some());
    let p1 = t.column("photometry.1").unwrap().as_any().downcast_ref::<Float64Array>().unwrap();
    assert!(p1.is_null(3));
    assert_eq!(p1.value(0), 0.1);

    let csv = "trial,label,flag\n1,a,TRUE\n2,,FALSE\n";
    let t = read_table_from_reader(csv.as_bytes(), &IngestConfig::default()).unwrap();
    let label = t.column("label").unwrap().as_any().downcast_ref::<StringArray>().unwrap();
    assert_eq!(label.value(0), "a");
    assert!(label.is_null(1));
    assert_eq!(t.column("flag").unwrap().data_type(), &arrow::datatypes::DataType::Boolean);
}

#[test]
fn test_whitespace_is_trimmed_for_every_column_type() {
    let csv = " trial , label ,n,x,flag\n 1 , a b ,  7 , 0.5 , TRUE \n2,   , 8,NA ,FALSE\n";
    let t = read_table_from_reader(csv.as_bytes(), &IngestConfig::default()).unwrap();
    assert_eq!(t.column_names(), vec!["trial", "label", "n", "x", "flag"]);

    let label = t.column("label").unwrap().as_any().downcast_ref::<StringArray>().unwrap();
    assert_eq!(label.value(0), "a b");
    assert!(label.is_null(1));
    let n = t.column("n").unwrap().as_any().downcast_ref::<Int32Array>().unwrap();
    assert_eq!(n.iter().collect::<Vec<_>>(), vec![Some(7), Some(8)]);
    let x = t.column("x").unwrap().as_any().downcast_ref::<Float64Array>().unwrap();
    assert_eq!(x.value(0), 0.5);
    assert!(x.is_null(1));
    assert_eq!(t.column("flag").unwrap().data_type(), &arrow::datatypes::DataType::Boolean);
}

#[test]
fn test_numeric_columns_roundtrip_through_text() {
    let t = sample_table();
    for name in ["photometry.1", "photometry.2"] {
        let col = t.column(name).unwrap().as_any().downcast_ref::<Float64Array>().unwrap().clone();
        for v in col.iter().flatten() {
            let reparsed: f64 = format!("{v}").parse().unwrap();
            assert_eq!(reparsed.to_bits(), v.to_bits());
        }
    }
    let p2 = t.column("photometry.2").unwrap().as_any().downcast_ref::<Float64Array>().unwrap().clone();
    assert_eq!(format!("{}", p2.value(0)), "0.30000000000000004");
}

#[test]
fn test_tab_delimiter_and_file_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "trial\ty\n1\t0.5\n").unwrap();
    let config = IngestConfig::default().delimiter(b'\t');
    let t = read_table(file.path(), &config).unwrap();
    assert_eq!(t.column_names(), vec!["trial", "y"]);
}

#[test]
fn test_unreadable_path_is_parse_error() {
    let err = read_table(Path::new("/nonexistent/data.csv"), &IngestConfig::default()).unwrap_err();
    assert!(matches!(err, Error::Parse(_)));
}

#[test]
fn test_audit_compares_shifted_rows() {
    let t = sample_table();
    let p1 = vec![0.1, 0.25, 1.7976931348623157e308, f64::NAN];
    let p2 = vec![0.30000000000000004, -1.5e-3, 2.5, 0.123456789012345678];
    let foreign = DataFrame {
        columns: vec![
            ("trial".into(), RObject::Integer(Vector::new(vec![1, NA_INTEGER, NA_INTEGER, 4]))),
            ("photometry.2".into(), RObject::real(p2)),
            ("photometry.1".into(), RObject::real(p1)),
        ],
        row_names: RowNames::Automatic(4),
    };
    let cells = compare_cells(&t, &foreign, DEFAULT_PREFIX).unwrap();
    assert_eq!(cells.len(), 8);
    assert_eq!(cells[0].column, "photometry.1");
    assert_eq!(cells[0].host_row, 0);
    assert_eq!(cells[0].foreign_row, 1);
    // NA on both sides is reported, not hidden.
    assert!(!cells[3].close);
    assert!(cells.iter().filter(|c| c.column == "photometry.2").all(|c| c.close));
    assert!(!all_close(&cells));
    assert!(cells[0].host_repr.starts_with("0.1000000000000000055511151231257827"));
}

#[test]
fn test_audit_missing_foreign_column() {
    let t = sample_table();
    let foreign = DataFrame { columns: vec![], row_names: RowNames::Automatic(4) };
    assert!(matches!(compare_cells(&t, &foreign, DEFAULT_PREFIX), Err(Error::Configuration(_))));
}
