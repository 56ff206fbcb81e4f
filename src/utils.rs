//! Utility functions

use crate::error::{Result, SliceError};
use bytes::{BufMut, Bytes, BytesMut};
use std::mem;

/// Distance below which a value is considered to sit exactly on a sample
/// boundary.
pub const TOLERANCE: f64 = 1e-3;

/// Decimal inputs such as `4.999` are not representable; the comparison
/// admits the few ulps of representation error so the boundary itself is
/// inclusive.
fn within_tolerance(distance: f64, magnitude: f64) -> bool {
    distance <= TOLERANCE + magnitude.abs().max(1.0) * f64::EPSILON * 8.0
}

/// Remainder of `x / y` reduced into `[0, y)`. A remainder within tolerance
/// of `y`, or within representation noise of zero, is snapped to zero.
pub fn fmod_with_tolerance(x: f64, y: f64) -> f64 {
    let remainder = x.rem_euclid(y);
    if remainder <= x.abs().max(1.0) * f64::EPSILON * 8.0
        || within_tolerance((remainder - y).abs(), x)
    {
        0.0
    } else {
        remainder
    }
}

/// Floor of `x`, unless `x` is within tolerance of its ceiling.
pub fn floor_with_tolerance(x: f64) -> f64 {
    let ceil = x.ceil();
    if within_tolerance((x - ceil).abs(), x) {
        ceil
    } else {
        x.floor()
    }
}

/// Ceiling of `x`, unless `x` is within tolerance of its floor.
pub fn ceil_with_tolerance(x: f64) -> f64 {
    let floor = x.floor();
    if within_tolerance((x - floor).abs(), x) {
        floor
    } else {
        x.ceil()
    }
}

/// Encode samples as little-endian bytes
pub fn samples_to_bytes(data: &[f32]) -> Bytes {
    let mut bytes = BytesMut::with_capacity(mem::size_of_val(data));
    for &value in data {
        bytes.put_f32_le(value);
    }
    bytes.freeze()
}

/// Decode little-endian bytes into samples
pub fn bytes_to_samples(bytes: &[u8]) -> Result<Vec<f32>> {
    let width = mem::size_of::<f32>();
    if bytes.len() % width != 0 {
        return Err(SliceError::BadRequest(
            "Byte length not aligned with sample size".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(width)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Format byte size in human-readable form
pub fn format_bytes(bytes: usize) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];

    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}
