use crate::{
    error::ModelError,
    geometry::{BoundingBox, Point},
    layer::LayerKey,
};

/// A closed polygon ring on a single layer/datatype. The last point
/// implicitly connects back to the first. `bounding_box` is the tight
/// integer-or-real bounds of `points`, computed once at construction and
/// cached.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub layer: LayerKey,
    points: Vec<Point>,
    bounding_box: BoundingBox,
}

impl Polygon {
    /// Builds a polygon, computing and caching its bounding box.
    ///
    /// # Errors
    /// Returns [`ModelError::DegeneratePolygon`] if fewer than 3 points are
    /// given — a ring needs at least a triangle to enclose any area.
    pub fn new(layer: LayerKey, points: Vec<Point>) -> Result<Self, ModelError> {
        if points.len() < 3 {
            return Err(ModelError::DegeneratePolygon);
        }
        let bounding_box = BoundingBox::from_points(&points);
        Ok(Self { layer, points, bounding_box })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }
}
