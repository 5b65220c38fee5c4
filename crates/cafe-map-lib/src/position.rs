//! Fly-to position calculator
//!
//! On wide layouts a detail panel covers the right half of the screen, so a
//! selected café must not be centered: the camera target is shifted east so
//! the point lands at the left quarter of the visible width. Narrow layouts
//! show the detail panel as a bottom sheet instead and center the point
//! directly.

use crate::viewport::BoundingBox;
use geo::Point;

/// Zoom level used when focusing a single café
pub const DEFAULT_FOCUS_ZOOM: f64 = 17.0;

/// Container widths at or below this are treated as the narrow layout
pub const NARROW_VIEWPORT_PX: f64 = 768.0;

/// Horizontal screen fraction where the focused point should land
const FOCUS_FRACTION: f64 = 0.25;

#[inline]
pub fn is_narrow_viewport(width_px: f64) -> bool {
    width_px <= NARROW_VIEWPORT_PX
}

/// Camera center that places `position` at 25% of the viewport width.
///
/// The pixel offset is converted to degrees linearly against the current
/// longitude span: `(offset_px / width_px) * (east - west)`. That ignores
/// projection distortion, which is negligible at the city-scale zooms where
/// focusing happens, and it uses the span sampled before the fly rather than
/// the post-fly span, so the placement is best-effort rather than exact.
pub fn focus_center(position: Point<f64>, bounds: &BoundingBox, width_px: f64) -> Point<f64> {
    if is_narrow_viewport(width_px) {
        return position;
    }
    let offset_px = width_px * FOCUS_FRACTION;
    let offset_lng = (offset_px / width_px) * bounds.lng_span();
    Point::new(position.x() + offset_lng, position.y())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narrow_viewport_threshold() {
        assert!(is_narrow_viewport(375.0));
        assert!(is_narrow_viewport(768.0));
        assert!(!is_narrow_viewport(769.0));
        assert!(!is_narrow_viewport(1920.0));
    }

    #[test]
    fn test_narrow_layout_centers_the_point() {
        let bounds = BoundingBox::new(130.55, 31.58, 130.56, 31.60);
        let position = Point::new(130.555, 31.59);
        assert_eq!(focus_center(position, &bounds, 375.0), position);
    }

    #[test]
    fn test_wide_layout_shifts_east_by_quarter_span() {
        // A 0.01° longitude span at 1000 px shifts the center +0.0025°
        let bounds = BoundingBox::new(130.55, 31.58, 130.56, 31.60);
        let position = Point::new(130.555, 31.59);

        let center = focus_center(position, &bounds, 1000.0);
        assert!((center.x() - 130.5575).abs() < 1e-12);
        assert_eq!(center.y(), 31.59);
    }

    #[test]
    fn test_offset_scales_with_span_not_width() {
        let position = Point::new(0.0, 0.0);
        let narrow_span = BoundingBox::new(-0.005, -0.01, 0.005, 0.01);
        let wide_span = BoundingBox::new(-0.05, -0.1, 0.05, 0.1);

        let a = focus_center(position, &narrow_span, 1000.0);
        let b = focus_center(position, &wide_span, 1000.0);
        assert!((b.x() - a.x() * 10.0).abs() < 1e-12);
    }
}
