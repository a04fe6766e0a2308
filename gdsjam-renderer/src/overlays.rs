use gdsjam_model::{BoundingBox, Units};

/// Spacing between grid lines in database units, chosen as the largest
/// power of ten whose spacing still fits at least ten divisions across the
/// current visible world width.
pub fn grid_spacing_db(visible_width_db: f64) -> f64 {
    if visible_width_db <= 0.0 {
        return 1.0;
    }
    let exponent = (visible_width_db / 10.0).log10().floor();
    10f64.powf(exponent)
}

/// World-space positions of the vertical (x) and horizontal (y) grid lines
/// spaced `spacing_db` apart that fall inside `bounds` (§4.7). Kept separate
/// from the actual canvas paint call so the line layout stays host-testable.
pub fn grid_lines_in_view(bounds: BoundingBox, spacing_db: f64) -> (Vec<f64>, Vec<f64>) {
    if spacing_db <= 0.0 || bounds.is_empty() {
        return (Vec::new(), Vec::new());
    }
    (grid_lines_along(bounds.min_x, bounds.max_x, spacing_db), grid_lines_along(bounds.min_y, bounds.max_y, spacing_db))
}

fn grid_lines_along(min: f64, max: f64, spacing: f64) -> Vec<f64> {
    let mut lines = Vec::new();
    let mut x = (min / spacing).ceil() * spacing;
    while x <= max {
        lines.push(x);
        x += spacing;
    }
    lines
}

/// A scale-bar length and its formatted label (§4.7): picks a "nice" round
/// value near a quarter of the visible width and renders it in whichever of
/// nm/µm/mm keeps the displayed number in a readable range.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleBar {
    pub length_db: f64,
    pub label: String,
}

const NICE_MULTIPLES: [f64; 3] = [1.0, 2.0, 5.0];

pub fn compute_scale_bar(visible_width_db: f64, units: &Units) -> ScaleBar {
    if visible_width_db <= 0.0 {
        return ScaleBar { length_db: 0.0, label: "0".to_string() };
    }
    let target = visible_width_db / 4.0;
    let exponent = target.log10().floor();
    let base = 10f64.powf(exponent);

    let mut best = base;
    let mut best_diff = f64::INFINITY;
    for &mult in &NICE_MULTIPLES {
        for &scale in &[base, base * 10.0, base / 10.0] {
            let candidate = mult * scale;
            let diff = (candidate - target).abs();
            if diff < best_diff {
                best_diff = diff;
                best = candidate;
            }
        }
    }

    ScaleBar { length_db: best, label: format_length(units.db_to_um(best)) }
}

/// Formats a length given in micrometres using whichever of nm/µm/mm keeps
/// the displayed magnitude in `[1, 1000)`, trimming trailing zeros.
fn format_length(um: f64) -> String {
    let abs = um.abs();
    let (value, unit) = if abs < 1.0 {
        (um * 1000.0, "nm")
    } else if abs < 1000.0 {
        (um, "\u{b5}m")
    } else {
        (um / 1000.0, "mm")
    };
    let trimmed = format!("{value:.3}");
    let trimmed = trimmed.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {unit}")
}

/// The world-space coordinate readout (§4.7): converts a world point to
/// micrometres at 3-decimal precision, widened to 4 decimals below a
/// `0.01` zoom scale, where a single screen pixel already spans enough
/// world distance that the extra digit is needed to keep the readout from
/// aliasing between adjacent cursor positions.
pub fn format_coordinate_readout(world_x_db: f64, world_y_db: f64, units: &Units, zoom_scale: f64) -> String {
    let precision = if zoom_scale < 0.01 { 4 } else { 3 };
    let x_um = units.db_to_um(world_x_db);
    let y_um = units.db_to_um(world_y_db);
    format!("({x_um:.precision$}, {y_um:.precision$}) \u{b5}m")
}
