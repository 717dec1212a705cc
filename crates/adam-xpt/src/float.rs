//! IEEE 754 double to IBM System/360 hexadecimal float conversion.
//!
//! Transport files store numerics as 8-byte IBM floats: one sign bit, a
//! 7-bit base-16 exponent biased by 64, and a 56-bit fraction. Missing values
//! are a marker byte followed by seven zero bytes.

/// Width of a stored numeric.
pub const NUMERIC_LEN: usize = 8;

/// First byte of the standard missing value `.`.
pub const MISSING_MARKER: u8 = 0x2e;

/// Encodes `value` as an IBM float. Magnitudes below the IBM range become
/// zero; magnitudes above it saturate.
#[must_use]
pub fn ieee_to_ibm(value: f64) -> [u8; NUMERIC_LEN] {
    if value == 0.0 || !value.is_finite() {
        return [0; NUMERIC_LEN];
    }
    let bits = value.to_bits();
    let sign = ((bits >> 63) as u8) << 7;
    let exponent = ((bits >> 52) & 0x7ff) as i32;
    if exponent == 0 {
        return [0; NUMERIC_LEN];
    }
    // value = mantissa / 2^53 * 2^binary_exp, with mantissa / 2^53 in [0.5, 1)
    let mantissa = (bits & 0x000f_ffff_ffff_ffff) | (1 << 52);
    let binary_exp = exponent - 1022;
    let hex_exp = (binary_exp + 3).div_euclid(4);
    let shift = 4 * hex_exp - binary_exp;
    let fraction = (mantissa << 3) >> shift;

    let biased = hex_exp + 64;
    if biased < 0 {
        return [0; NUMERIC_LEN];
    }
    if biased > 127 {
        let mut saturated = [0xff; NUMERIC_LEN];
        saturated[0] = sign | 0x7f;
        return saturated;
    }

    let mut out = [0u8; NUMERIC_LEN];
    out[0] = sign | biased as u8;
    out[1..].copy_from_slice(&fraction.to_be_bytes()[1..]);
    out
}

/// Decodes an IBM float. Missing values decode as `None`.
#[must_use]
pub fn ibm_to_ieee(bytes: [u8; NUMERIC_LEN]) -> Option<f64> {
    if is_missing(&bytes) {
        return None;
    }
    let mut fraction_bytes = [0u8; 8];
    fraction_bytes[1..].copy_from_slice(&bytes[1..]);
    let fraction = u64::from_be_bytes(fraction_bytes);
    if fraction == 0 {
        return Some(0.0);
    }
    let exponent = i32::from(bytes[0] & 0x7f) - 64;
    let magnitude = fraction as f64 * 2f64.powi(4 * exponent - 56);
    Some(if bytes[0] & 0x80 != 0 { -magnitude } else { magnitude })
}

/// The standard missing value.
#[must_use]
pub fn encode_missing() -> [u8; NUMERIC_LEN] {
    let mut out = [0u8; NUMERIC_LEN];
    out[0] = MISSING_MARKER;
    out
}

/// `.`, `._` and `.A` to `.Z` all count as missing.
#[must_use]
pub fn is_missing(bytes: &[u8; NUMERIC_LEN]) -> bool {
    let marker = bytes[0];
    let is_marker = marker == MISSING_MARKER || marker == b'_' || marker.is_ascii_uppercase();
    is_marker && bytes[1..].iter().all(|&b| b == 0)
}
