//! JSON wire format written by the embedded R encoder.
//!
//! ```text
//! {"type":"double","data":["0x1.8p+1","NA","NaN","Inf"],"attrs":{"dim":[..],"dimnames":[null,[..]]}}
//! {"type":"integer","data":[1,null],"attrs":{}}
//! {"type":"data.frame","names":[..],"columns":[..],"row_names":{"automatic":3}}
//! {"type":"other","type_name":"closure"}
//! ```

use fmm_core::robject::{NA_INTEGER, na_real};
use fmm_core::{Attributes, DataFrame, Error, RObject, Result, RowNames, Vector};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct WireAttrs {
    #[serde(default)]
    names: Option<Vec<Option<String>>>,
    #[serde(default)]
    dim: Option<Vec<usize>>,
    #[serde(default)]
    dimnames: Option<Vec<Option<Vec<Option<String>>>>>,
    #[serde(default)]
    class: Option<Vec<Option<String>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum WireRowNames {
    Automatic(usize),
    Labels(Vec<Option<String>>),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Wire {
    #[serde(rename = "null")]
    Null,
    #[serde(rename = "double")]
    Double {
        data: Vec<String>,
        #[serde(default)]
        attrs: WireAttrs,
    },
    #[serde(rename = "integer")]
    Integer {
        data: Vec<Option<i32>>,
        #[serde(default)]
        attrs: WireAttrs,
    },
    #[serde(rename = "logical")]
    Logical {
        data: Vec<Option<bool>>,
        #[serde(default)]
        attrs: WireAttrs,
    },
    #[serde(rename = "character")]
    Character {
        data: Vec<Option<String>>,
        #[serde(default)]
        attrs: WireAttrs,
    },
    #[serde(rename = "list")]
    List {
        data: Vec<Wire>,
        #[serde(default)]
        attrs: WireAttrs,
    },
    #[serde(rename = "data.frame")]
    DataFrame {
        names: Vec<Option<String>>,
        columns: Vec<Wire>,
        row_names: WireRowNames,
    },
    #[serde(rename = "other")]
    Other { type_name: String },
}

/// Parse C99 hexadecimal float text (`[-]0xH.HHHp±E`) exactly.
pub fn parse_hex_float(text: &str) -> Option<f64> {
    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let rest = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X"))?;
    let (digits, exp) = rest.split_once(['p', 'P'].as_slice()).unwrap_or((rest, "0"));
    let mut exp: i32 = exp.parse().ok()?;
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    let mut mantissa: u64 = 0;
    for (i, c) in int_part.chars().chain(frac_part.chars()).enumerate() {
        let d = u64::from(c.to_digit(16)?);
        if mantissa >> 60 != 0 {
            // Beyond 60 bits: only the exponent moves (integer digits) or
            // the digit is dropped (fraction digits). `%a` never gets here.
            if i < int_part.len() {
                exp = exp.checked_add(4)?;
            }
            continue;
        }
        mantissa = (mantissa << 4) | d;
        if i >= int_part.len() {
            exp = exp.checked_sub(4)?;
        }
    }
    let value = ldexp(mantissa as f64, exp);
    Some(if negative { -value } else { value })
}

/// `x * 2^exp`, scaling in steps that stay within the normal range.
fn ldexp(mut x: f64, mut exp: i32) -> f64 {
    let pow2 = |k: i32| f64::from_bits(((k + 1023) as u64) << 52);
    while exp > 1023 {
        x *= pow2(1023);
        exp -= 1023;
        if x.is_infinite() {
            return x;
        }
    }
    while exp < -1022 {
        x *= pow2(-1022);
        exp += 1022;
        if x == 0.0 {
            return x;
        }
    }
    x * pow2(exp)
}

fn parse_double(text: &str) -> Result<f64> {
    match text {
        "NA" => Ok(na_real()),
        "NaN" => Ok(f64::NAN),
        "Inf" => Ok(f64::INFINITY),
        "-Inf" => Ok(f64::NEG_INFINITY),
        _ => parse_hex_float(text).ok_or_else(|| Error::Engine(format!("malformed double on the wire: '{text}'"))),
    }
}

fn labels(v: Vec<Option<String>>) -> Vec<String> {
    v.into_iter().map(|s| s.unwrap_or_else(|| "NA".to_string())).collect()
}

impl From<WireAttrs> for Attributes {
    fn from(w: WireAttrs) -> Self {
        Attributes {
            names: w.names.map(labels),
            dim: w.dim,
            dimnames: w.dimnames.map(|axes| axes.into_iter().map(|a| a.map(labels)).collect()),
            class: w.class.map(labels),
        }
    }
}

fn with_attrs<T>(data: Vec<T>, attrs: WireAttrs) -> Vector<T> {
    Vector { data, attrs: attrs.into() }
}

fn decode(wire: Wire) -> Result<RObject> {
    Ok(match wire {
        Wire::Null => RObject::Null,
        Wire::Double { data, attrs } => {
            let values = data.iter().map(|s| parse_double(s)).collect::<Result<Vec<_>>>()?;
            RObject::Real(with_attrs(values, attrs))
        }
        Wire::Integer { data, attrs } => {
            RObject::Integer(with_attrs(data.into_iter().map(|x| x.unwrap_or(NA_INTEGER)).collect(), attrs))
        }
        Wire::Logical { data, attrs } => RObject::Logical(with_attrs(data, attrs)),
        Wire::Character { data, attrs } => RObject::Character(with_attrs(data, attrs)),
        Wire::List { data, attrs } => {
            let items = data.into_iter().map(decode).collect::<Result<Vec<_>>>()?;
            RObject::List(with_attrs(items, attrs))
        }
        Wire::DataFrame { names, columns, row_names } => {
            if names.len() != columns.len() {
                return Err(Error::Engine(format!(
                    "data.frame with {} names for {} columns",
                    names.len(),
                    columns.len()
                )));
            }
            let columns = labels(names)
                .into_iter()
                .zip(columns)
                .map(|(name, col)| decode(col).map(|obj| (name, obj)))
                .collect::<Result<Vec<_>>>()?;
            let row_names = match row_names {
                WireRowNames::Automatic(n) => RowNames::Automatic(n),
                WireRowNames::Labels(l) => RowNames::Labels(labels(l)),
            };
            RObject::DataFrame(DataFrame { columns, row_names })
        }
        Wire::Other { type_name } => RObject::Other { type_name },
    })
}

/// Decode one encoded value.
pub fn decode_str(text: &str) -> Result<RObject> {
    let wire: Wire = serde_json::from_str(text.trim())?;
    decode(wire)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::rscript::source::double_literal;
    use fmm_core::robject::is_na_real;

    #[test]
    fn test_hex_floats_from_r() {
        assert_eq!(parse_hex_float("0x1p+0"), Some(1.0));
        assert_eq!(parse_hex_float("-0x1.8p+1"), Some(-3.0));
        assert_eq!(parse_hex_float("0x1.999999999999ap-4"), Some(0.1));
        assert_eq!(parse_hex_float("0x0p+0"), Some(0.0));
        assert_eq!(parse_hex_float("0x1.fffffffffffffp+1023"), Some(f64::MAX));
        assert_eq!(parse_hex_float("0x0.0000000000001p-1022"), Some(f64::from_bits(1)));
        assert_eq!(parse_hex_float("0x1p-1074"), Some(f64::from_bits(1)));
        assert_eq!(parse_hex_float("1.5"), None);
        assert_eq!(parse_hex_float("0xzp+0"), None);
    }

    #[test]
    fn test_literals_round_trip_bit_exact() {
        // LCG over the bit space, skipping NaN payloads.
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        for _ in 0..2000 {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let x = f64::from_bits(state);
            if !x.is_finite() {
                continue;
            }
            let back = parse_hex_float(&double_literal(x)).unwrap();
            assert_eq!(back.to_bits(), x.to_bits(), "{x:e}");
        }
    }

    #[test]
    fn test_decode_matrix_with_column_labels() {
        let text = r#"{"type":"double","data":["0x1p+0","NA","NaN","-Inf"],
            "attrs":{"dim":[2,2],"dimnames":[null,["AIC","BIC"]]}}"#;
        match decode_str(text).unwrap() {
            RObject::Real(v) => {
                assert_eq!(v.data[0], 1.0);
                assert!(is_na_real(v.data[1]));
                assert!(v.data[2].is_nan() && !is_na_real(v.data[2]));
                assert_eq!(v.data[3], f64::NEG_INFINITY);
                assert_eq!(v.attrs.dim, Some(vec![2, 2]));
                assert_eq!(v.attrs.dimnames, Some(vec![None, Some(vec!["AIC".into(), "BIC".into()])]));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_decode_nested_list_and_data_frame() {
        let text = r#"{"type":"list","data":[
            {"type":"integer","data":[3,null],"attrs":{}},
            {"type":"data.frame","names":["id"],"columns":[{"type":"character","data":["a",null],"attrs":{}}],
             "row_names":{"automatic":2}},
            {"type":"null"},
            {"type":"other","type_name":"closure"}],
            "attrs":{"names":["n","df","none","f"]}}"#;
        let obj = decode_str(text).unwrap();
        assert_eq!(obj.get("n").unwrap(), &RObject::integer(vec![3, NA_INTEGER]));
        match obj.get("df").unwrap() {
            RObject::DataFrame(df) => assert_eq!(df.row_names, RowNames::Automatic(2)),
            other => panic!("unexpected {other:?}"),
        }
        assert!(obj.get("none").unwrap().is_null());
        assert_eq!(obj.get("f").unwrap().type_name(), "closure");
    }

    #[test]
    fn test_malformed_payloads() {
        assert!(matches!(decode_str("{\"type\":\"double\",\"data\":[\"1.0\"]}"), Err(Error::Engine(_))));
        assert!(matches!(decode_str("not json"), Err(Error::Json(_))));
    }
}
