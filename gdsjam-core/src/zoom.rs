use gdsjam_model::Units;

/// Tunable bounds for [`clamp_zoom_scale`]: the visible width (in user
/// units) is kept within `[min_visible_width_um, document_extent_um *
/// max_extent_factor]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLimits {
    pub min_visible_width_um: f64,
    pub max_extent_factor: f64,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self { min_visible_width_um: 0.1, max_extent_factor: 10.0 }
    }
}

/// Clamps `new_scale` (screen pixels per database unit) so the resulting
/// visible width stays within `limits`. `canvas_width_px` and
/// `document_extent_db` anchor the screen-space and user-unit ends of the
/// computation; `units` converts database units to micrometres.
///
/// Returns `current_scale` unchanged when `new_scale` would violate either
/// bound, rather than silently substituting a different scale — a caller
/// computing `new_scale = zoom_factor * current_scale` gets a clean no-op at
/// the limit instead of a scale that drifts from what it asked for.
pub fn clamp_zoom_scale(
    new_scale: f64,
    canvas_width_px: f64,
    document_extent_db: f64,
    current_scale: f64,
    units: &Units,
    limits: &ZoomLimits,
) -> f64 {
    if new_scale <= 0.0 || canvas_width_px <= 0.0 {
        return current_scale;
    }
    let visible_width_um = units.db_to_um(canvas_width_px / new_scale);
    let max_visible_width_um = units.db_to_um(document_extent_db) * limits.max_extent_factor;

    if visible_width_um < limits.min_visible_width_um || visible_width_um > max_visible_width_um {
        current_scale
    } else {
        new_scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_scale_within_bounds() {
        let units = Units::default();
        let scale = clamp_zoom_scale(1.0, 800.0, 100_000.0, 1.0, &units, &ZoomLimits::default());
        assert_eq!(scale, 1.0);
    }

    #[test]
    fn rejects_zoom_in_past_minimum_visible_width() {
        let units = Units::default();
        // An enormous scale would shrink the visible width below 0.1 um.
        let huge_scale = 1.0e12;
        let scale = clamp_zoom_scale(huge_scale, 800.0, 100_000.0, 2.0, &units, &ZoomLimits::default());
        assert_eq!(scale, 2.0);
    }

    #[test]
    fn rejects_zoom_out_past_maximum_extent() {
        let units = Units::default();
        let tiny_scale = 1.0e-9;
        let scale = clamp_zoom_scale(tiny_scale, 800.0, 100_000.0, 2.0, &units, &ZoomLimits::default());
        assert_eq!(scale, 2.0);
    }
}
