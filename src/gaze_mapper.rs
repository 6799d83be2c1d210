//! Mapping from camera pixel space to screen space.
//!
//! Each axis is mapped independently by bounded linear interpolation from the
//! usable frame interior `[margin, dim - margin]` onto `[0, screen_dim]`.
//! Inputs outside the interior clamp to the nearest screen edge.

use crate::{
    error::Error,
    landmarks::Landmark,
    utils::safe_cast::f64_to_i32,
    Result,
};

/// Immutable screen size queried once from the input injection backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenBounds {
    pub width: f64,
    pub height: f64,
}

impl ScreenBounds {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Camera frame size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSize {
    pub width: i32,
    pub height: i32,
}

impl FrameSize {
    #[must_use]
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Linear map of `value` from `domain` to `range`, clamped to `range`
///
/// Mirrors one-dimensional table interpolation with a two-point table: values
/// left of the domain give `range.0`, values right of it give `range.1`. A
/// zero-width domain maps everything to `range.0`.
#[must_use]
pub fn interp(value: f64, domain: (f64, f64), range: (f64, f64)) -> f64 {
    let (d0, d1) = domain;
    let (r0, r1) = range;
    let span = d1 - d0;
    if span <= 0.0 || value.is_nan() {
        return r0;
    }
    if value <= d0 {
        return r0;
    }
    if value >= d1 {
        return r1;
    }
    (value - d0)
        .mul_add((r1 - r0) / span, r0)
        .clamp(r0.min(r1), r0.max(r1))
}

/// Usable domain for one axis, falling back to the full frame when the margin
/// leaves nothing
#[must_use]
pub fn axis_domain(dim: f64, margin: f64) -> (f64, f64) {
    if dim > 2.0 * margin {
        (margin, dim - margin)
    } else {
        (0.0, dim)
    }
}

/// Camera space to screen space mapper
#[derive(Debug, Clone, Copy)]
pub struct GazeMapper {
    screen: ScreenBounds,
    margin: f64,
}

impl GazeMapper {
    /// Create a mapper for a screen and frame margin in pixels
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for a negative or non-finite margin or
    /// screen size.
    pub fn new(screen: ScreenBounds, margin: f64) -> Result<Self> {
        if !margin.is_finite() || margin < 0.0 {
            return Err(Error::InvalidInput(format!(
                "Frame margin must be a non-negative number, got {margin}"
            )));
        }
        if !(screen.width.is_finite() && screen.height.is_finite())
            || screen.width < 0.0
            || screen.height < 0.0
        {
            return Err(Error::InvalidInput(format!(
                "Invalid screen size {}x{}",
                screen.width, screen.height
            )));
        }
        Ok(Self { screen, margin })
    }

    #[must_use]
    pub const fn margin(&self) -> f64 {
        self.margin
    }

    /// Map a camera pixel coordinate to a screen coordinate
    #[must_use]
    pub fn map(&self, x: f64, y: f64, frame: FrameSize) -> (f64, f64) {
        let domain_x = axis_domain(f64::from(frame.width), self.margin);
        let domain_y = axis_domain(f64::from(frame.height), self.margin);
        (
            interp(x, domain_x, (0.0, self.screen.width)),
            interp(y, domain_y, (0.0, self.screen.height)),
        )
    }

    /// Map a normalized landmark, returning its pixel position and the screen
    /// target
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the landmark cannot be expressed as a
    /// pixel coordinate.
    pub fn map_landmark(&self, point: Landmark, frame: FrameSize) -> Result<((i32, i32), (f64, f64))> {
        let px = landmark_to_pixel(point, frame)?;
        let target = self.map(f64::from(px.0), f64::from(px.1), frame);
        Ok((px, target))
    }
}

/// Truncate a normalized landmark to an integer pixel of the frame
///
/// # Errors
///
/// Returns `Error::InvalidInput` for non-finite or out of range coordinates.
pub fn landmark_to_pixel(point: Landmark, frame: FrameSize) -> Result<(i32, i32)> {
    let x = f64_to_i32(f64::from(point.x) * f64::from(frame.width))?;
    let y = f64_to_i32(f64::from(point.y) * f64::from(frame.height))?;
    Ok((x, y))
}
