/// A point in database units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned bounding box in database units, `min <= max` unless empty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// The identity element for [`BoundingBox::union`] — unioning with `EMPTY`
    /// is a no-op.
    pub const EMPTY: BoundingBox =
        BoundingBox { min_x: f64::INFINITY, min_y: f64::INFINITY, max_x: f64::NEG_INFINITY, max_y: f64::NEG_INFINITY };

    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    pub fn width(&self) -> f64 {
        (self.max_x - self.min_x).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.max_y - self.min_y).max(0.0)
    }

    /// The larger of width and height; the scale BoundingBox::max_dimension used
    /// for the minimap skip-small-cell policy (spec.md §3) and for the
    /// document extent it is measured against.
    pub fn max_dimension(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.width().max(self.height())
        }
    }

    pub fn center(&self) -> Point {
        Point::new((self.min_x + self.max_x) / 2.0, (self.min_y + self.max_y) / 2.0)
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        BoundingBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.min_x <= other.max_x && self.max_x >= other.min_x && self.min_y <= other.max_y && self.max_y >= other.min_y
    }

    pub fn contains_point(&self, p: Point) -> bool {
        !self.is_empty() && p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    /// The tight bounds of a point ring. Returns [`BoundingBox::EMPTY`] for an
    /// empty slice.
    pub fn from_points(points: &[Point]) -> BoundingBox {
        points.iter().fold(BoundingBox::EMPTY, |acc, p| {
            acc.union(&BoundingBox::new(p.x, p.y, p.x, p.y))
        })
    }
}

/// A 2×3 affine transform, applied as `x' = a*x + b*y + tx`, `y' = c*x + d*y + ty`.
///
/// This is the composed-matrix representation of a chain of [`crate::Transform2D`]
/// placements; see [`crate::Transform2D::to_affine`] for how a single
/// instance's mirror/rotate/magnify/translate placement becomes one of these.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine2 {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Affine2 {
    pub const IDENTITY: Affine2 = Affine2 { a: 1.0, b: 0.0, c: 0.0, d: 1.0, tx: 0.0, ty: 0.0 };

    pub fn apply(&self, p: Point) -> Point {
        Point::new(self.a * p.x + self.b * p.y + self.tx, self.c * p.x + self.d * p.y + self.ty)
    }

    /// Returns the transform equivalent to applying `self` first and `outer`
    /// second: `self.then(outer).apply(p) == outer.apply(self.apply(p))`.
    pub fn then(&self, outer: &Affine2) -> Affine2 {
        Affine2 {
            a: outer.a * self.a + outer.b * self.c,
            b: outer.a * self.b + outer.b * self.d,
            c: outer.c * self.a + outer.d * self.c,
            d: outer.c * self.b + outer.d * self.d,
            tx: outer.a * self.tx + outer.b * self.ty + outer.tx,
            ty: outer.c * self.tx + outer.d * self.ty + outer.ty,
        }
    }
}

/// Transforms all four corners of `bbox` under `t` and re-bounds, per the
/// spec.md §4.2 invariant that a transformed bounding box must come from all
/// four corners rather than just the transformed min/max.
pub fn transform_bbox_corners(bbox: BoundingBox, t: &Affine2) -> BoundingBox {
    if bbox.is_empty() {
        return BoundingBox::EMPTY;
    }
    let corners = [
        Point::new(bbox.min_x, bbox.min_y),
        Point::new(bbox.max_x, bbox.min_y),
        Point::new(bbox.max_x, bbox.max_y),
        Point::new(bbox.min_x, bbox.max_y),
    ];
    corners.iter().map(|&p| t.apply(p)).fold(BoundingBox::EMPTY, |acc, p| acc.union(&BoundingBox::new(p.x, p.y, p.x, p.y)))
}
