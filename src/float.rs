//! Floating-point width conversions.

/// Half-precision encoding of a quiet NaN.
pub const HALF_NAN: u16 = 0x7e00;

const HALF_EXP_MASK: u16 = 0x7c00;
const HALF_MANT_MASK: u16 = 0x03ff;

/// Unpack an IEEE-754 half-precision bit pattern.
#[must_use]
pub fn half_to_f64(bits: u16) -> f64 {
    let sign = if bits & 0x8000 == 0 { 1.0 } else { -1.0 };
    let exp = (bits & HALF_EXP_MASK) >> 10;
    let mant = f64::from(bits & HALF_MANT_MASK);
    match exp {
        0 => sign * mant * 2f64.powi(-24),
        0x1f if mant == 0.0 => sign * f64::INFINITY,
        0x1f => f64::NAN,
        _ => sign * (1.0 + mant / 1024.0) * 2f64.powi(i32::from(exp) - 15),
    }
}

/// Half-precision bits representing `v` exactly, if any.
///
/// NaN maps to [`HALF_NAN`]; payloads are not preserved.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn f64_to_half_exact(v: f64) -> Option<u16> {
    if v.is_nan() {
        return Some(HALF_NAN);
    }
    let bits = v.to_bits();
    let sign = ((bits >> 48) & 0x8000) as u16;
    if v.is_infinite() {
        return Some(sign | HALF_EXP_MASK);
    }
    if v == 0.0 {
        return Some(sign);
    }
    let exp = ((bits >> 52) & 0x7ff) as i32 - 1023;
    let mant = bits & 0x000f_ffff_ffff_ffff;
    if (-14..=15).contains(&exp) {
        if mant & ((1 << 42) - 1) != 0 {
            return None;
        }
        let e = (exp + 15) as u16;
        return Some(sign | (e << 10) | (mant >> 42) as u16);
    }
    if (-24..-14).contains(&exp) {
        let full = mant | (1 << 52);
        let shift = (28 - exp) as u32;
        if full & ((1u64 << shift) - 1) != 0 {
            return None;
        }
        return Some(sign | (full >> shift) as u16);
    }
    None
}

/// Single-precision value equal to `v`, if any.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn f64_to_f32_exact(v: f64) -> Option<f32> {
    let f = v as f32;
    if v.is_nan() || f64::from(f) == v {
        Some(f)
    } else {
        None
    }
}

/// The narrowest IEEE-754 width able to hold a float.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FloatWidth {
    /// Two bytes.
    Half(u16),
    /// Four bytes.
    Single(f32),
    /// Eight bytes.
    Double(f64),
}

/// Pick the shortest width that round-trips `v` exactly.
#[must_use]
pub fn shortest(v: f64) -> FloatWidth {
    if let Some(h) = f64_to_half_exact(v) {
        FloatWidth::Half(h)
    } else if let Some(s) = f64_to_f32_exact(v) {
        FloatWidth::Single(s)
    } else {
        FloatWidth::Double(v)
    }
}
