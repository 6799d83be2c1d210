//! Cursor trajectory smoothing.
//!
//! The pointer target produced by the gaze mapper jumps with every small
//! landmark wobble; filters trade that jitter for lag.

/// Exponential damping toward the mapped target
pub mod damping;

/// Trait for cursor filters
pub trait CursorFilter {
    /// Feed a new target and get the filtered position
    fn apply(&mut self, x: f64, y: f64) -> (f64, f64);

    /// Reset filter state
    fn reset(&mut self);
}
