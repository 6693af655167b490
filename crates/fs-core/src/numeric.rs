use crate::FsError;

/// Floating point type used throughout system
pub type Real = f64;

/// Decimal places kept for sampled sweep positions.
pub const POSITION_DECIMALS: u32 = 6;

/// Decimal places used when keying vertices by coordinate.
pub const VERTEX_KEY_DECIMALS: u32 = 9;

/// Displacements at or below this magnitude are treated as "no move".
pub const MOVE_EPSILON: Real = 1e-9;

/// One tolerance for everything
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, FsError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(FsError::NonFinite { what, value: v })
    }
}

/// Round to a fixed number of decimal places.
///
/// Negative zero is normalised to zero so rounded values compare and print
/// the same way across runs.
pub fn round_to(v: Real, decimals: u32) -> Real {
    let scale = 10f64.powi(decimals as i32);
    let r = (v * scale).round() / scale;
    if r == 0.0 { 0.0 } else { r }
}

/// Integer key for a coordinate rounded to `decimals` places.
pub fn coord_key(v: Real, decimals: u32) -> i64 {
    let scale = 10f64.powi(decimals as i32);
    (v * scale).round() as i64
}
