//! Checked float to integer conversions for pixel and screen coordinates

use crate::{Error, Result};

/// Safely convert f64 to i32 with bounds checking, truncating toward zero
///
/// # Errors
///
/// Returns an error if the value is not finite or outside i32 range
#[allow(clippy::cast_possible_truncation)] // Truncation after bounds check is safe
pub fn f64_to_i32(value: f64) -> Result<i32> {
    if value.is_finite() && value >= f64::from(i32::MIN) && value <= f64::from(i32::MAX) {
        Ok(value as i32)
    } else {
        Err(Error::InvalidInput(format!(
            "Value {value} cannot be safely converted to i32"
        )))
    }
}

/// Truncate and clamp an f32 into `[min, max]`
///
/// Non-finite input maps to `min`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)] // Clamping ensures safe truncation
pub fn f32_to_i32_clamp(value: f32, min: i32, max: i32) -> i32 {
    if !value.is_finite() {
        return min;
    }
    (value.clamp(min as f32, max as f32) as i32).clamp(min, max)
}

/// Round and clamp a screen coordinate into `[0, max]` as an X11 position
///
/// Non-finite input maps to 0.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Clamping ensures safe truncation
pub fn f64_to_i16_clamp(value: f64, max: u16) -> i16 {
    let max = i16::try_from(max).unwrap_or(i16::MAX);
    if !value.is_finite() {
        return 0;
    }
    let clamped = value.round().clamp(0.0, f64::from(max));
    (clamped as i16).clamp(0, max)
}
