use compact_str::CompactString;

use crate::geometry::Affine2;

/// A single instance's placement transform, applied to its cell's geometry
/// in the order **mirror (y → −y) → rotate → magnify → translate**.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2D {
    pub x: f64,
    pub y: f64,
    pub rotation_deg: f64,
    pub mirror: bool,
    pub magnification: f64,
}

impl Transform2D {
    pub const IDENTITY: Transform2D =
        Transform2D { x: 0.0, y: 0.0, rotation_deg: 0.0, mirror: false, magnification: 1.0 };

    /// Expands this placement into the equivalent 2×3 affine matrix, folding
    /// the mirror → rotate → magnify → translate chain into one matrix
    /// product.
    pub fn to_affine(&self) -> Affine2 {
        let y_mirror = if self.mirror { -1.0 } else { 1.0 };
        let (sin_t, cos_t) = self.rotation_deg.to_radians().sin_cos();
        let m = self.magnification;
        Affine2 {
            a: m * cos_t,
            b: m * (-sin_t * y_mirror),
            c: m * sin_t,
            d: m * (cos_t * y_mirror),
            tx: self.x,
            ty: self.y,
        }
    }
}

/// A placement of a named cell inside another cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub cell_ref: CompactString,
    pub x: f64,
    pub y: f64,
    pub rotation_deg: f64,
    pub mirror: bool,
    pub magnification: f64,
}

impl Instance {
    pub fn new(cell_ref: impl Into<CompactString>, x: f64, y: f64) -> Self {
        Self { cell_ref: cell_ref.into(), x, y, rotation_deg: 0.0, mirror: false, magnification: 1.0 }
    }

    pub fn with_rotation_deg(mut self, deg: f64) -> Self {
        self.rotation_deg = deg;
        self
    }

    pub fn mirrored(mut self) -> Self {
        self.mirror = true;
        self
    }

    pub fn with_magnification(mut self, mag: f64) -> Self {
        self.magnification = mag;
        self
    }

    pub fn transform(&self) -> Transform2D {
        Transform2D {
            x: self.x,
            y: self.y,
            rotation_deg: self.rotation_deg,
            mirror: self.mirror,
            magnification: self.magnification,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::geometry::Point;

    #[test]
    fn rotation_90_matches_spec_example() {
        // spec.md §8 scenario S2: instance at (1000,1000), rotation 90°, no
        // mirror/magnification; child polygon (0,0)-(10,0)-(10,10)-(0,10).
        let t = Instance::new("C", 1000.0, 1000.0).with_rotation_deg(90.0).transform().to_affine();

        let expect = |src: (f64, f64), dst: (f64, f64)| {
            let p = t.apply(Point::new(src.0, src.1));
            assert!((p.x - dst.0).abs() < 1.0e-9, "x: {p:?} vs {dst:?}");
            assert!((p.y - dst.1).abs() < 1.0e-9, "y: {p:?} vs {dst:?}");
        };
        expect((0.0, 0.0), (1000.0, 1000.0));
        expect((10.0, 0.0), (1000.0, 1010.0));
        expect((10.0, 10.0), (990.0, 1010.0));
        expect((0.0, 10.0), (990.0, 1000.0));
    }

    proptest! {
        #[test]
        fn composition_matches_sequential_application(
            x1 in -50.0..50.0f64, y1 in -50.0..50.0f64, rot1 in 0.0..360.0f64, mirror1 in any::<bool>(), mag1 in 0.1..4.0f64,
            x2 in -50.0..50.0f64, y2 in -50.0..50.0f64, rot2 in 0.0..360.0f64, mirror2 in any::<bool>(), mag2 in 0.1..4.0f64,
            px in -20.0..20.0f64, py in -20.0..20.0f64,
        ) {
            let inner = Transform2D { x: x1, y: y1, rotation_deg: rot1, mirror: mirror1, magnification: mag1 };
            let outer = Transform2D { x: x2, y: y2, rotation_deg: rot2, mirror: mirror2, magnification: mag2 };

            let p = Point::new(px, py);
            let sequential = outer.to_affine().apply(inner.to_affine().apply(p));
            let composed = inner.to_affine().then(&outer.to_affine()).apply(p);

            prop_assert!((sequential.x - composed.x).abs() < 1.0e-6);
            prop_assert!((sequential.y - composed.y).abs() < 1.0e-6);
        }
    }
}
