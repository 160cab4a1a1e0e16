//! Float parsing policies.
//!
//! R parses numeric text exactly (correct rounding). A host that parses
//! with a faster, lossy routine drifts by an ulp or more on long mantissas,
//! which later shows up as spurious cross-runtime mismatches.

/// How decimal text becomes `f64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FloatPrecision {
    /// Correctly rounded: `format!("{}", x)` of the result reproduces any
    /// shortest-form input text.
    #[default]
    RoundTrip,
    /// Digit accumulation with at most 19 significant digits, then repeated
    /// multiplication or division by ten. Lossy; kept for comparisons.
    Legacy,
}

impl FloatPrecision {
    /// Parse `text` (surrounding whitespace ignored).
    pub fn parse(self, text: &str) -> Option<f64> {
        let text = text.trim();
        match self {
            Self::RoundTrip => text.parse::<f64>().ok(),
            Self::Legacy => parse_legacy(text),
        }
    }
}

const MAX_LEGACY_DIGITS: usize = 19;

fn parse_legacy(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let mut pos = 0;
    let negative = match bytes.first() {
        Some(b'-') => {
            pos += 1;
            true
        }
        Some(b'+') => {
            pos += 1;
            false
        }
        _ => false,
    };

    let mut mantissa: u64 = 0;
    let mut n_digits = 0usize;
    let mut exp10: i32 = 0;
    let mut seen_digit = false;
    let mut seen_point = false;

    while pos < bytes.len() {
        match bytes[pos] {
            b'0'..=b'9' => {
                seen_digit = true;
                let d = u64::from(bytes[pos] - b'0');
                if n_digits < MAX_LEGACY_DIGITS {
                    if mantissa != 0 || d != 0 {
                        n_digits += 1;
                    }
                    mantissa = mantissa * 10 + d;
                    if seen_point {
                        exp10 -= 1;
                    }
                } else if !seen_point {
                    exp10 += 1;
                }
            }
            b'.' if !seen_point => seen_point = true,
            _ => break,
        }
        pos += 1;
    }

    if !seen_digit {
        // inf / nan spellings
        return text.parse::<f64>().ok();
    }

    if pos < bytes.len() {
        if !matches!(bytes[pos], b'e' | b'E') {
            return None;
        }
        let exp: i32 = text[pos + 1..].parse().ok()?;
        exp10 = exp10.checked_add(exp)?;
    }

    let mut value = mantissa as f64;
    if exp10 >= 0 {
        for _ in 0..exp10.min(400) {
            value *= 10.0;
        }
    } else {
        for _ in 0..(-exp10).min(400) {
            value /= 10.0;
        }
    }
    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_reserializes_shortest_text() {
        for text in ["0.1", "0.30000000000000004", "-12.5", "1e-300", "123456.789012345", "5e-324"] {
            let x = FloatPrecision::RoundTrip.parse(text).unwrap();
            let back: f64 = format!("{x}").parse().unwrap();
            assert_eq!(back.to_bits(), x.to_bits(), "{text}");
        }
        assert_eq!(format!("{}", FloatPrecision::RoundTrip.parse("0.1").unwrap()), "0.1");
    }

    #[test]
    fn test_legacy_parses_common_forms() {
        assert_eq!(FloatPrecision::Legacy.parse("42"), Some(42.0));
        assert_eq!(FloatPrecision::Legacy.parse("-2.5"), Some(-2.5));
        assert_eq!(FloatPrecision::Legacy.parse("1.5e2"), Some(150.0));
        assert_eq!(FloatPrecision::Legacy.parse(" 0.5 "), Some(0.5));
        assert!(FloatPrecision::Legacy.parse("abc").is_none());
        assert!(FloatPrecision::Legacy.parse("1.2.3").is_none());
        assert!(FloatPrecision::Legacy.parse("inf").unwrap().is_infinite());
    }

    #[test]
    fn test_legacy_is_close_but_drifts() {
        // 17 significant digits, deterministic pseudo-random mantissas.
        let mut state: u64 = 0x2545_F491_4F6C_DD1D;
        let mut drifted = 0;
        for _ in 0..1000 {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let digits = format!("{:017}", state % 100_000_000_000_000_000);
            let text = format!("0.{digits}");
            let exact = FloatPrecision::RoundTrip.parse(&text).unwrap();
            let legacy = FloatPrecision::Legacy.parse(&text).unwrap();
            assert!((exact - legacy).abs() <= 1e-12 * exact.abs().max(1e-300), "{text}");
            if exact.to_bits() != legacy.to_bits() {
                drifted += 1;
            }
        }
        assert!(drifted > 0);
    }
}
