//! Ingested tables crossing the conversion layer.

use std::io::Write;

use fmm_core::robject::NA_INTEGER;
use fmm_core::{HostValue, RObject, RowIndex, RowNames};
use fmm_translate::{Direction, IngestConfig, RuleSet, Value, convert, read_table};

#[test]
fn ingested_table_becomes_data_frame_with_automatic_row_names() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "id,trial,photometry.1").unwrap();
    writeln!(file, "1,1,0.1").unwrap();
    writeln!(file, "1,0,0.2").unwrap();
    writeln!(file, "2,NA,0.30000000000000004").unwrap();
    file.flush().unwrap();

    let table = read_table(file.path(), &IngestConfig::default()).unwrap();
    assert_eq!(table.index(), &RowIndex::one_based());

    let rules = RuleSet::bridge();
    let foreign = match convert(&Value::Host(HostValue::Table(table)), Direction::ToForeign, &rules).unwrap() {
        Value::Foreign(obj) => obj,
        Value::Host(_) => panic!("still on the host side"),
    };
    let df = match &foreign {
        RObject::DataFrame(df) => df,
        other => panic!("expected data.frame, got {}", other.type_name()),
    };
    assert_eq!(df.row_names, RowNames::Automatic(3));
    assert_eq!(df.column("trial").unwrap(), &RObject::integer(vec![1, NA_INTEGER, NA_INTEGER]));
    match df.column("photometry.1").unwrap() {
        RObject::Real(v) => assert_eq!(v.data[2], 0.30000000000000004),
        other => panic!("unexpected {}", other.type_name()),
    }
}
