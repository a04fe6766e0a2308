use hashbrown::{HashMap, HashSet};

use gdsjam_model::{BoundingBox, LayerKey};

/// The main container's affine transform: `(tx, ty)` is the world point
/// currently centered on screen, `s` is screen pixels per database unit.
/// World Y grows up; screen Y grows down, so every screen↔world conversion
/// flips the Y axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub tx: f64,
    pub ty: f64,
    pub s: f64,
    pub screen_width: f64,
    pub screen_height: f64,
}

impl Viewport {
    pub fn new(screen_width: f64, screen_height: f64) -> Self {
        Self { tx: 0.0, ty: 0.0, s: 1.0, screen_width, screen_height }
    }

    pub fn screen_from_world(&self, wx: f64, wy: f64) -> (f64, f64) {
        let sx = (wx - self.tx) * self.s + self.screen_width / 2.0;
        let sy = self.screen_height / 2.0 - (wy - self.ty) * self.s;
        (sx, sy)
    }

    pub fn world_from_screen(&self, sx: f64, sy: f64) -> (f64, f64) {
        let wx = (sx - self.screen_width / 2.0) / self.s + self.tx;
        let wy = self.ty - (sy - self.screen_height / 2.0) / self.s;
        (wx, wy)
    }

    /// The visible world-space window, accounting for the Y-flip: the
    /// screen's top edge maps to the world's *maximum* y, not its minimum.
    pub fn viewport_bounds_world(&self) -> BoundingBox {
        let half_w = self.screen_width / (2.0 * self.s);
        let half_h = self.screen_height / (2.0 * self.s);
        BoundingBox::new(self.tx - half_w, self.ty - half_h, self.tx + half_w, self.ty + half_h)
    }

    /// Pans by a delta in screen pixels.
    pub fn pan_screen(&mut self, dx: f64, dy: f64) {
        self.tx -= dx / self.s;
        self.ty += dy / self.s;
    }

    /// Sets the scale directly, keeping the world point under
    /// `(screen_x, screen_y)` fixed on screen.
    pub fn zoom_at(&mut self, screen_x: f64, screen_y: f64, new_scale: f64) {
        let (wx, wy) = self.world_from_screen(screen_x, screen_y);
        self.s = new_scale;
        let (new_wx, new_wy) = self.world_from_screen(screen_x, screen_y);
        self.tx -= new_wx - wx;
        self.ty -= new_wy - wy;
    }

    pub fn fit_bbox(&mut self, bbox: BoundingBox, margin_fraction: f64) {
        if bbox.is_empty() || bbox.width() <= 0.0 || bbox.height() <= 0.0 {
            return;
        }
        let center = bbox.center();
        self.tx = center.x;
        self.ty = center.y;
        let margin = 1.0 - margin_fraction;
        let scale_x = self.screen_width / bbox.width() * margin;
        let scale_y = self.screen_height / bbox.height() * margin;
        self.s = scale_x.min(scale_y);
    }
}

/// The subset of a rendered tile's state that C3's culling needs: its
/// world-space bounds, the layer it belongs to, and how many polygons it
/// holds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CullItem {
    pub bbox: BoundingBox,
    pub layer: LayerKey,
    pub polygon_count: u32,
}

/// For each item, evaluates `visible = in_window ∧ layer_visible` and
/// returns the parallel visibility flags plus the summed polygon count of
/// visible items.
pub fn update_visibility(
    bounds: BoundingBox,
    items: &[CullItem],
    layer_visibility: &HashMap<LayerKey, bool>,
) -> (Vec<bool>, u32) {
    let mut visible_polygon_count = 0u32;
    let flags = items
        .iter()
        .map(|item| {
            let layer_visible = layer_visibility.get(&item.layer).copied().unwrap_or(false);
            let visible = layer_visible && bounds.intersects(&item.bbox);
            if visible {
                visible_polygon_count += item.polygon_count;
            }
            visible
        })
        .collect();
    (flags, visible_polygon_count)
}

/// Layers that transitioned `false → true` between `old_map` and `new_map`
/// and have no rendered tiles yet — a trigger for an on-demand partial
/// re-render of just those layers.
pub fn detect_newly_visible_layers(
    new_map: &HashMap<LayerKey, bool>,
    old_map: &HashMap<LayerKey, bool>,
    items: &[CullItem],
) -> Vec<LayerKey> {
    let layers_with_tiles: HashSet<LayerKey> = items.iter().map(|item| item.layer).collect();
    new_map
        .iter()
        .filter(|(layer, &visible)| {
            visible && !old_map.get(*layer).copied().unwrap_or(false) && !layers_with_tiles.contains(*layer)
        })
        .map(|(layer, _)| *layer)
        .collect()
}
