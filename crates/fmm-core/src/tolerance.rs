//! Approximate equality used by every cross-runtime numeric comparison.

/// Relative tolerance.
pub const RTOL: f64 = 1e-5;

/// Absolute tolerance.
pub const ATOL: f64 = 1e-8;

/// `|a - b| <= ATOL + RTOL * |b|`. NaN on either side is never close.
#[inline]
pub fn is_close(a: f64, b: f64) -> bool {
    if a.is_nan() || b.is_nan() {
        return false;
    }
    if a == b {
        return true;
    }
    (a - b).abs() <= ATOL + RTOL * b.abs()
}
