use compact_str::CompactString;

use crate::{geometry::BoundingBox, instance::Instance, polygon::Polygon};

/// A cell's name substring that marks it as a GDSJam context/annotation cell
/// (ruler labels, probe-point markers) rather than layout geometry. Matching
/// cells are still rendered at full zoom but are always descended into for
/// the minimap regardless of [`Cell::skip_in_minimap`].
const CONTEXT_INFO_MARKER: &str = "CONTEXT_INFO";

/// A named collection of polygons and child-cell placements.
///
/// `bounding_box` and `skip_in_minimap` are derived, not supplied directly —
/// see [`crate::Document::build`].
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub name: CompactString,
    pub polygons: Vec<Polygon>,
    pub instances: Vec<Instance>,
    pub(crate) bounding_box: BoundingBox,
    pub(crate) skip_in_minimap: bool,
}

impl Cell {
    /// Builds a cell with empty derived state; [`crate::Document::build`]
    /// fills in `bounding_box` and `skip_in_minimap` once the full hierarchy
    /// is known.
    pub fn new(name: impl Into<CompactString>, polygons: Vec<Polygon>, instances: Vec<Instance>) -> Self {
        Self { name: name.into(), polygons, instances, bounding_box: BoundingBox::EMPTY, skip_in_minimap: false }
    }

    /// This cell's bounding box in its own local coordinate frame, including
    /// the transformed extent of every child instance.
    pub fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }

    /// Whether the minimap pipeline should skip descending into this cell's
    /// instances (spec.md §3 size-based cell-skip policy), always `false` for
    /// [`Self::is_context_info`] cells.
    pub fn skip_in_minimap(&self) -> bool {
        self.skip_in_minimap && !self.is_context_info()
    }

    pub fn is_context_info(&self) -> bool {
        self.name.contains(CONTEXT_INFO_MARKER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerKey;

    #[test]
    fn context_info_cells_are_never_skipped() {
        let mut cell = Cell::new("PROBE_CONTEXT_INFO_1", vec![], vec![]);
        cell.skip_in_minimap = true;
        assert!(!cell.skip_in_minimap());
    }

    #[test]
    fn ordinary_cells_respect_the_derived_flag() {
        let mut cell = Cell::new(
            "VIA_ARRAY",
            vec![Polygon::new(
                LayerKey::new(1, 0),
                vec![crate::geometry::Point::new(0.0, 0.0), crate::geometry::Point::new(1.0, 0.0), crate::geometry::Point::new(1.0, 1.0)],
            )
            .unwrap()],
            vec![],
        );
        cell.skip_in_minimap = true;
        assert!(cell.skip_in_minimap());
    }
}
