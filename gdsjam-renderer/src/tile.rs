use gdsjam_model::{BoundingBox, LayerKey};

use crate::scene::GroupHandle;

/// The default tile size in database units, a power-of-two chosen so the
/// culling grid and the renderer's tile buckets agree without
/// reconfiguration; overridable via [`crate::renderer::RenderConfig`].
pub const DEFAULT_TILE_SIZE_DB: f64 = 4096.0;

/// `(layer, datatype, tileX, tileY)` — the bucket a polygon's transformed
/// bounding-box center falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub layer: LayerKey,
    pub tile_x: i32,
    pub tile_y: i32,
}

impl TileKey {
    pub fn from_center(layer: LayerKey, center_x: f64, center_y: f64, tile_size: f64) -> Self {
        Self { layer, tile_x: (center_x / tile_size).floor() as i32, tile_y: (center_y / tile_size).floor() as i32 }
    }
}

/// A batch of polygons sharing a tile key, plus the accumulated world-space
/// bounds and the scene-graph group holding their draw commands.
#[derive(Debug)]
pub struct RenderedTile {
    pub key: TileKey,
    pub bbox: BoundingBox,
    pub group: GroupHandle,
    pub polygon_count: u32,
}

impl RenderedTile {
    pub fn new(key: TileKey, group: GroupHandle) -> Self {
        Self { key, bbox: BoundingBox::EMPTY, group, polygon_count: 0 }
    }

    pub fn accumulate(&mut self, polygon_bbox: BoundingBox) {
        self.bbox = self.bbox.union(&polygon_bbox);
        self.polygon_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_key_buckets_by_floor_division() {
        let layer = LayerKey::new(1, 0);
        assert_eq!(TileKey::from_center(layer, 0.0, 0.0, 40.0), TileKey { layer, tile_x: 0, tile_y: 0 });
        assert_eq!(TileKey::from_center(layer, 39.9, 0.0, 40.0), TileKey { layer, tile_x: 0, tile_y: 0 });
        assert_eq!(TileKey::from_center(layer, 40.0, 0.0, 40.0), TileKey { layer, tile_x: 1, tile_y: 0 });
        assert_eq!(TileKey::from_center(layer, -0.1, 0.0, 40.0), TileKey { layer, tile_x: -1, tile_y: 0 });
    }
}
