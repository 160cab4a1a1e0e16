//! Runs against a real R installation. Skipped unless `FMM_RSCRIPT_TESTS=1`.

use std::io::Write;

use fmm_bridge::engine::RscriptEngine;
use fmm_bridge::{
    DataSource, FuiOptions, Session, check_version, common_fields, compare, fui, fui_native, package_version,
};
use fmm_core::robject::{NA_INTEGER, is_na_real, na_real};
use fmm_core::{Engine, Error, HostKind, HostValue, NamedList, RCall, RObject, RowNames, Vector};
use fmm_translate::RuleSet;

fn r_session() -> Option<Session<RscriptEngine>> {
    if std::env::var("FMM_RSCRIPT_TESTS").as_deref() != Ok("1") {
        eprintln!("skipping: set FMM_RSCRIPT_TESTS=1 to run against Rscript");
        return None;
    }
    Some(Session::new(RscriptEngine::from_env().unwrap()))
}

#[test]
fn test_values_round_trip_through_r() {
    let Some(mut session) = r_session() else { return };
    let engine = session.engine_mut();

    let m = RObject::Real(
        Vector::new(vec![0.1, 1e-310, na_real(), f64::NAN, -0.0, f64::INFINITY])
            .with_dim(vec![3, 2])
            .with_dimnames(vec![Some(vec!["r1".into(), "r2".into(), "r3".into()]), Some(vec!["a".into(), "b".into()])]),
    );
    engine.assign("m", m.clone()).unwrap();
    let RObject::Real(back) = engine.get("m").unwrap() else { panic!("not a double") };
    let RObject::Real(orig) = &m else { unreachable!() };
    assert_eq!(back.attrs, orig.attrs);
    assert_eq!(back.data[0].to_bits(), 0.1f64.to_bits());
    assert_eq!(back.data[1].to_bits(), 1e-310f64.to_bits());
    assert!(is_na_real(back.data[2]));
    assert!(back.data[3].is_nan() && !is_na_real(back.data[3]));
    assert_eq!(back.data[4].to_bits(), (-0.0f64).to_bits());

    let list = RObject::named_list([
        ("n", RObject::integer(vec![1, NA_INTEGER])),
        ("s", RObject::character(["a\"b", "ü"])),
        ("flag", RObject::logical(vec![Some(true), None])),
        ("none", RObject::Null),
    ]);
    engine.assign("l", list.clone()).unwrap();
    assert_eq!(engine.get("l").unwrap(), list);
    assert!(engine.exists("l").unwrap());
    assert!(!engine.exists("not_there").unwrap());
}

#[test]
fn test_r_errors_are_foreign_and_leave_state_alone() {
    let Some(mut session) = r_session() else { return };
    let engine = session.engine_mut();
    engine.assign("x", RObject::integer(vec![1])).unwrap();
    let err = engine.call(&RCall::new("base::stop").arg(RObject::string("boom"))).unwrap_err();
    match err {
        Error::Foreign { call, message } => {
            assert_eq!(call, "base::stop");
            assert!(message.contains("boom"), "{message}");
        }
        other => panic!("unexpected {other}"),
    }
    assert_eq!(engine.get("x").unwrap(), RObject::integer(vec![1]));
}

#[test]
fn test_read_csv_data_frame() {
    let Some(mut session) = r_session() else { return };
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "id,trial,photometry.1").unwrap();
    writeln!(file, "1,,0.30000000000000004").unwrap();
    writeln!(file, "2,3,NA").unwrap();
    file.flush().unwrap();

    let path = file.path().to_string_lossy().into_owned();
    let engine = session.engine_mut();
    engine.call_into("dat", &RCall::new("utils::read.csv").named("file", RObject::string(path))).unwrap();
    let RObject::DataFrame(df) = engine.get("dat").unwrap() else { panic!("not a data.frame") };
    assert_eq!(df.row_names, RowNames::Automatic(2));
    assert_eq!(df.column("trial"), Some(&RObject::integer(vec![NA_INTEGER, 3])));
    let RObject::Real(p) = df.column("photometry.1").unwrap() else { panic!("not a double column") };
    assert_eq!(p.data[0], 0.30000000000000004);
    assert!(is_na_real(p.data[1]));
}

#[test]
fn test_base_package_version() {
    let Some(mut session) = r_session() else { return };
    let version = package_version(&mut session, "stats").unwrap();
    assert!(version.parts()[0] >= 3);
    assert!(check_version(&mut session, "stats", Some("3.0.0"), None).unwrap());
    assert!(matches!(
        package_version(&mut session, "surely.not.installed"),
        Err(Error::VersionDetection { .. })
    ));
}

fn with_fastfmm() -> Option<Session<RscriptEngine>> {
    let mut session = r_session()?;
    if !check_version(&mut session, "fastFMM", Some("0.3.0"), None).unwrap_or(false) {
        eprintln!("skipping: fastFMM >= 0.3.0 is not installed");
        return None;
    }
    Some(session)
}

fn photometry_csv() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "id,trial,cs,photometry.1,photometry.2,photometry.3,photometry.4").unwrap();
    for i in 0..40usize {
        let cs = i % 2;
        let v: Vec<String> =
            (1..=4).map(|k| format!("{}", 0.1 * k as f64 + cs as f64 + ((i * 7 + k * 3) % 13) as f64 / 13.0)).collect();
        writeln!(file, "{},{},{cs},{}", i / 5 + 1, i % 5 + 1, v.join(",")).unwrap();
    }
    file.flush().unwrap();
    file
}

/// Shared fields of `a` and `b`, each side restricted to them. Character
/// fields are checked for equality here since `compare` has no rule for them.
fn shared(a: &NamedList, b: &NamedList) -> (NamedList, NamedList) {
    let names = common_fields(a, b);
    assert!(!names.is_empty(), "no shared fields: {:?} vs {:?}", a.names(), b.names());
    let textual = |v: &HostValue| matches!(v.kind(), HostKind::Str | HostKind::Strings);
    let mut left = NamedList::new();
    let mut right = NamedList::new();
    for name in names {
        let (x, y) = (a.get(name).unwrap(), b.get(name).unwrap());
        if textual(x) {
            assert_eq!(x, y, "field '{name}'");
        } else {
            left.push(name, x.clone());
            right.push(name, y.clone());
        }
    }
    (left, right)
}

fn numeric_bits(value: &HostValue) -> Vec<u64> {
    match value {
        HostValue::Array(a) => a.iter().map(|x| x.to_bits()).collect(),
        HostValue::Table(t) => t.to_f64_matrix().unwrap().iter().map(|x| x.to_bits()).collect(),
        HostValue::Series(s) => s.values.iter().map(|x| x.to_bits()).collect(),
        HostValue::Float(x) => vec![x.to_bits()],
        HostValue::List(l) => l.values().iter().flat_map(numeric_bits).collect(),
        _ => Vec::new(),
    }
}

#[test]
fn test_fui_bridge_matches_native() {
    let Some(mut session) = with_fastfmm() else { return };
    let file = photometry_csv();
    let options = FuiOptions::default().with_parallel(false).with_silent(true);
    let rules = RuleSet::bridge();
    let formula = "photometry ~ cs + (1 | id)";
    let bridged = fui(&mut session, DataSource::csv(file.path()), formula, &options, &rules).unwrap();
    let native = fui_native(&mut session, file.path(), "dat", formula, &options, &rules).unwrap();
    assert!(matches!(bridged.beta_hat(), Some(HostValue::Table(_))));

    let (left, right) = shared(bridged.as_list(), native.as_list());
    assert!(left.get("betaHat").is_some());
    assert_eq!(compare(&left, &right), Ok(()));
}

#[test]
fn test_fui_seeded_bootstrap_is_bit_identical() {
    let Some(mut session) = with_fastfmm() else { return };
    let file = photometry_csv();
    let options =
        FuiOptions::default().with_analytic(false).with_bootstrap(20, 11).with_parallel(false).with_silent(true);
    let rules = RuleSet::bridge();
    let formula = "photometry ~ cs + (1 | id)";
    let first = fui(&mut session, DataSource::csv(file.path()), formula, &options, &rules).unwrap();
    let second = fui(&mut session, DataSource::binding("host_dat"), formula, &options, &rules).unwrap();

    assert_eq!(first.field_names(), second.field_names());
    for name in first.field_names() {
        let (a, b) = (first.get(name).unwrap(), second.get(name).unwrap());
        assert_eq!(numeric_bits(a), numeric_bits(b), "field '{name}'");
    }
    let (left, right) = shared(first.as_list(), second.as_list());
    assert_eq!(compare(&left, &right), Ok(()));
}
