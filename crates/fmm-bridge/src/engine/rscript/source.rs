//! Host values and calls as R source text.
//!
//! Doubles are written as C99 hexadecimal literals (`0x1.8p+1`), which R
//! parses exactly, so values cross into R bit for bit.

use std::fmt::Write as _;

use fmm_core::robject::{NA_INTEGER, is_na_real};
use fmm_core::{Arg, Attributes, DataFrame, Error, RCall, RObject, Result, RowNames, Vector};

/// Elements per line in long `c(...)` calls.
const ITEMS_PER_LINE: usize = 8;

/// Exact R literal for `x`.
pub fn double_literal(x: f64) -> String {
    if x.is_nan() {
        return if is_na_real(x) { "NA_real_".into() } else { "NaN".into() };
    }
    if x.is_infinite() {
        return if x > 0.0 { "Inf".into() } else { "-Inf".into() };
    }
    let bits = x.to_bits();
    let sign = if bits >> 63 == 1 { "-" } else { "" };
    let biased = ((bits >> 52) & 0x7ff) as i32;
    let frac = bits & ((1u64 << 52) - 1);
    match (biased, frac) {
        (0, 0) => format!("{sign}0x0p+0"),
        (0, _) => format!("{sign}0x0.{frac:013x}p-1022"),
        _ => format!("{sign}0x1.{frac:013x}p{:+}", biased - 1023),
    }
}

/// R string literal.
pub fn string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{{{:04x}}}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Backquoted R name, safe for any binding or argument name.
pub fn name_literal(name: &str) -> String {
    format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
}

fn c_call(items: Vec<String>, empty: &str) -> String {
    if items.is_empty() {
        return empty.to_string();
    }
    let mut out = String::from("c(");
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(if i % ITEMS_PER_LINE == 0 { ",\n  " } else { ", " });
        }
        out.push_str(item);
    }
    out.push(')');
    out
}

fn strings(labels: &[String]) -> String {
    c_call(labels.iter().map(|s| string_literal(s)).collect(), "character(0)")
}

fn with_attributes(base: String, attrs: &Attributes) -> String {
    if attrs.is_empty() {
        return base;
    }
    let mut parts = vec![base];
    if let Some(names) = &attrs.names {
        parts.push(format!("names = {}", strings(names)));
    }
    if let Some(dim) = &attrs.dim {
        parts.push(format!("dim = {}", c_call(dim.iter().map(|d| format!("{d}L")).collect(), "integer(0)")));
    }
    if let Some(dimnames) = &attrs.dimnames {
        let axes: Vec<String> =
            dimnames.iter().map(|a| a.as_ref().map_or_else(|| "NULL".to_string(), |l| strings(l))).collect();
        parts.push(format!("dimnames = list({})", axes.join(", ")));
    }
    if let Some(class) = &attrs.class {
        parts.push(format!("class = {}", strings(class)));
    }
    format!("structure({})", parts.join(", "))
}

fn vector<T>(v: &Vector<T>, empty: &str, item: impl Fn(&T) -> String) -> String {
    with_attributes(c_call(v.data.iter().map(item).collect(), empty), &v.attrs)
}

fn data_frame(df: &DataFrame) -> Result<String> {
    let mut cols = Vec::with_capacity(df.columns.len());
    for (name, col) in &df.columns {
        cols.push(format!("{} = {}", name_literal(name), value(col).map_err(|e| e.within(name))?));
    }
    let row_names = match &df.row_names {
        RowNames::Automatic(n) => format!(".set_row_names({n}L)"),
        RowNames::Labels(labels) => strings(labels),
    };
    Ok(format!(
        "structure(list({}), row.names = {row_names}, class = \"data.frame\")",
        cols.join(",\n  ")
    ))
}

/// R source evaluating to `obj`.
pub fn value(obj: &RObject) -> Result<String> {
    Ok(match obj {
        RObject::Null => "NULL".to_string(),
        RObject::Real(v) => vector(v, "double(0)", |&x| double_literal(x)),
        RObject::Integer(v) => {
            vector(v, "integer(0)", |&x| if x == NA_INTEGER { "NA_integer_".into() } else { format!("{x}L") })
        }
        RObject::Logical(v) => vector(v, "logical(0)", |x| {
            match x {
                Some(true) => "TRUE",
                Some(false) => "FALSE",
                None => "NA",
            }
            .to_string()
        }),
        RObject::Character(v) => {
            vector(v, "character(0)", |s| s.as_deref().map_or_else(|| "NA_character_".into(), string_literal))
        }
        RObject::List(v) => {
            let mut items = Vec::with_capacity(v.data.len());
            for (i, elem) in v.data.iter().enumerate() {
                let label = v.attrs.names.as_ref().and_then(|n| n.get(i)).cloned().unwrap_or_else(|| format!("[{}]", i + 1));
                items.push(value(elem).map_err(|e| e.within(&label))?);
            }
            with_attributes(format!("list({})", items.join(",\n  ")), &v.attrs)
        }
        RObject::DataFrame(df) => data_frame(df)?,
        RObject::Other { type_name } => return Err(Error::conversion("", type_name.clone())),
    })
}

fn argument(arg: &Arg) -> Result<String> {
    match arg {
        Arg::Value(v) => value(v),
        Arg::Symbol(name) => Ok(name_literal(name)),
        Arg::Formula(text) => Ok(format!("stats::as.formula({})", string_literal(text))),
        Arg::Call(call) => call_source(call),
    }
}

/// R source of `call`.
pub fn call_source(call: &RCall) -> Result<String> {
    let mut args = Vec::with_capacity(call.args.len());
    for (name, arg) in &call.args {
        let text = argument(arg)?;
        args.push(match name {
            Some(name) => format!("{} = {text}", name_literal(name)),
            None => text,
        });
    }
    Ok(format!("{}({})", call.function, args.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmm_core::robject::na_real;

    #[test]
    fn test_double_literals() {
        assert_eq!(double_literal(1.0), "0x1.0000000000000p+0");
        assert_eq!(double_literal(-3.0), "-0x1.8000000000000p+1");
        assert_eq!(double_literal(0.0), "0x0p+0");
        assert_eq!(double_literal(-0.0), "-0x0p+0");
        assert_eq!(double_literal(0.1), "0x1.999999999999ap-4");
        assert_eq!(double_literal(f64::from_bits(1)), "0x0.0000000000001p-1022");
        assert_eq!(double_literal(f64::NAN), "NaN");
        assert_eq!(double_literal(na_real()), "NA_real_");
        assert_eq!(double_literal(f64::NEG_INFINITY), "-Inf");
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(string_literal("a\"b\\c\n"), r#""a\"b\\c\n""#);
        assert_eq!(name_literal("photometry.1"), "`photometry.1`");
    }

    #[test]
    fn test_vector_with_attributes() {
        let v = RObject::Real(
            Vector::new(vec![1.0, 2.0]).with_dim(vec![2, 1]).with_dimnames(vec![None, Some(vec!["c1".into()])]),
        );
        assert_eq!(
            value(&v).unwrap(),
            "structure(c(0x1.0000000000000p+0, 0x1.0000000000000p+1), dim = c(2L, 1L), dimnames = list(NULL, c(\"c1\")))"
        );
        assert_eq!(value(&RObject::integer(vec![5, NA_INTEGER])).unwrap(), "c(5L, NA_integer_)");
        assert_eq!(value(&RObject::integer(vec![])).unwrap(), "integer(0)");
    }

    #[test]
    fn test_long_vectors_wrap() {
        let text = value(&RObject::integer((1..=10).collect())).unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_data_frame_source() {
        let df = DataFrame {
            columns: vec![("trial".into(), RObject::integer(vec![1, NA_INTEGER]))],
            row_names: RowNames::Automatic(2),
        };
        assert_eq!(
            value(&RObject::DataFrame(df)).unwrap(),
            "structure(list(`trial` = c(1L, NA_integer_)), row.names = .set_row_names(2L), class = \"data.frame\")"
        );
    }

    #[test]
    fn test_call_source() {
        let call = RCall::new("fastFMM::fui")
            .named("formula", Arg::Formula("y ~ x + (1 | id)".into()))
            .named("data", Arg::Symbol("host_dat".into()))
            .named("argvals", RObject::Null);
        assert_eq!(
            call_source(&call).unwrap(),
            "fastFMM::fui(`formula` = stats::as.formula(\"y ~ x + (1 | id)\"), `data` = `host_dat`, `argvals` = NULL)"
        );
    }

    #[test]
    fn test_other_values_cannot_be_sent() {
        let list = RObject::named_list([("f", RObject::Other { type_name: "closure".into() })]);
        match value(&list).unwrap_err() {
            Error::Conversion { field, type_name } => {
                assert_eq!(field, "f");
                assert_eq!(type_name, "closure");
            }
            other => panic!("unexpected {other}"),
        }
    }
}
