//! Numeric helpers shared by the mapping, preview and injection code.

pub mod safe_cast;

use opencv::core::Rect;
use safe_cast::f32_to_i32_clamp;

/// Grow a face box by `shift` of its size on each side, make it square and
/// keep it inside a `max_width` x `max_height` image
///
/// The side never exceeds the shorter image edge.
#[must_use]
#[allow(clippy::cast_precision_loss)] // Precision loss acceptable for box dimensions
pub fn refine_box(bbox: Rect, max_width: i32, max_height: i32, shift: f32) -> Rect {
    let x_shift = f32_to_i32_clamp(bbox.width as f32 * shift, 0, max_width);
    let y_shift = f32_to_i32_clamp(bbox.height as f32 * shift, 0, max_height);

    let x = (bbox.x - x_shift).max(0);
    let y = (bbox.y - y_shift).max(0);
    let width = (bbox.width + 2 * x_shift).min(max_width - x);
    let height = (bbox.height + 2 * y_shift).min(max_height - y);

    let side = width.max(height).min(max_width.min(max_height)).max(0);
    let x = x.min(max_width - side).max(0);
    let y = y.min(max_height - side).max(0);
    Rect::new(x, y, side, side)
}

/// Seconds as a `Duration`, rejecting negative or non-finite values
///
/// # Errors
///
/// Returns `Error::ConfigError` naming `what` when `secs` is unusable.
pub fn secs_to_duration(secs: f64, what: &str) -> crate::Result<std::time::Duration> {
    std::time::Duration::try_from_secs_f64(secs)
        .map_err(|e| crate::Error::ConfigError(format!("{what} must be a non-negative number of seconds, got {secs}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_refine_box_expands_to_square() {
        let refined = refine_box(Rect::new(100, 100, 40, 60), 640, 480, 0.25);
        // 10 px and 15 px margins, then squared on the taller side
        assert_eq!(refined, Rect::new(90, 85, 90, 90));
    }

    #[test]
    fn test_refine_box_stays_inside_image() {
        for bbox in [Rect::new(190, 190, 20, 20), Rect::new(0, 0, 10, 10), Rect::new(-20, 30, 400, 300)] {
            let refined = refine_box(bbox, 200, 150, 0.5);
            assert!(refined.x >= 0 && refined.y >= 0);
            assert!(refined.x + refined.width <= 200);
            assert!(refined.y + refined.height <= 150);
            assert_eq!(refined.width, refined.height);
        }
    }

    #[test]
    fn test_secs_to_duration() {
        assert_eq!(secs_to_duration(1.5, "cooldown").unwrap(), Duration::from_millis(1500));
        assert_eq!(secs_to_duration(0.0, "cooldown").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_secs_to_duration_rejects_bad_values() {
        assert!(secs_to_duration(-0.1, "cooldown").is_err());
        assert!(secs_to_duration(f64::NAN, "cooldown").is_err());
        assert!(secs_to_duration(f64::INFINITY, "window").is_err());
    }
}
