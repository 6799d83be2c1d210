use super::CursorFilter;
use crate::{error::Error, Result};

/// Exponential damping toward the latest target
///
/// Each update moves the stored position `1 / factor` of the way to the
/// target: `next = prev + (target - prev) / factor`. The position starts at
/// the origin, so the first update after startup (or `reset`) lands a fifth of
/// the way from the top-left corner to the real target with the default
/// factor of five. That transient is expected.
#[derive(Debug, Clone)]
pub struct DampingFilter {
    factor: f64,
    x: f64,
    y: f64,
}

impl DampingFilter {
    /// Create a damping filter
    ///
    /// # Errors
    ///
    /// Returns `Error::FilterError` unless `factor` is finite and at least 1.
    pub fn new(factor: f64) -> Result<Self> {
        if !factor.is_finite() || factor < 1.0 {
            return Err(Error::FilterError(format!(
                "Smoothing factor must be >= 1, got {factor}"
            )));
        }
        Ok(Self {
            factor,
            x: 0.0,
            y: 0.0,
        })
    }

    /// Current smoothed position
    #[must_use]
    pub const fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

impl CursorFilter for DampingFilter {
    fn apply(&mut self, x: f64, y: f64) -> (f64, f64) {
        self.x += (x - self.x) / self.factor;
        self.y += (y - self.y) / self.factor;
        (self.x, self.y)
    }

    fn reset(&mut self) {
        self.x = 0.0;
        self.y = 0.0;
    }
}
