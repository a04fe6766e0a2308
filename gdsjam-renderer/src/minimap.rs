use hashbrown::HashMap;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use gdsjam_model::{BoundingBox, Cell, Document, FlattenedPolygon, HierarchyVisitor, LayerKey};

use crate::{error::Error, js};

/// A remote participant's visible viewport, drawn as an outline rectangle
/// distinct from the local one. Carries `scale` so a click landing inside
/// this participant's rectangle can navigate to their exact zoom level
/// (§4.8), not just recenter on their viewport's midpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticipantViewport {
    pub participant_id: u32,
    pub bounds: BoundingBox,
    pub scale: f64,
    pub is_followed: bool,
}

/// Independent small-scale overview of the full document (C8). Shares the
/// data model with the main renderer but runs its own flattening pass under
/// the size-based cell-skip policy rather than a polygon budget.
pub struct Minimap {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    document_bbox: BoundingBox,
    viewport_outline: Option<BoundingBox>,
    participant_viewports: Vec<ParticipantViewport>,
    on_navigate: Option<Box<dyn FnMut(f64, f64, Option<f64>)>>,
}

impl Minimap {
    pub fn init(canvas_id: &str) -> Result<Self, Error> {
        let canvas = js::get_canvas_by_id(canvas_id)?;
        let ctx = js::get_2d_context(&canvas)?;
        Ok(Self {
            canvas,
            ctx,
            document_bbox: BoundingBox::EMPTY,
            viewport_outline: None,
            participant_viewports: Vec::new(),
            on_navigate: None,
        })
    }

    pub fn set_on_navigate(&mut self, callback: Box<dyn FnMut(f64, f64, Option<f64>)>) {
        self.on_navigate = Some(callback);
    }

    pub fn update_viewport_outline(&mut self, bounds: BoundingBox) {
        self.viewport_outline = Some(bounds);
    }

    pub fn update_participant_viewports(&mut self, viewports: Vec<ParticipantViewport>) {
        self.participant_viewports = viewports;
    }

    fn minimap_transform(&self) -> (f64, f64, f64) {
        let width = f64::from(self.canvas.width());
        let height = f64::from(self.canvas.height());
        if self.document_bbox.is_empty() || self.document_bbox.width() <= 0.0 || self.document_bbox.height() <= 0.0 {
            return (0.0, 0.0, 1.0);
        }
        let scale = (width / self.document_bbox.width()).min(height / self.document_bbox.height());
        (self.document_bbox.min_x, self.document_bbox.min_y, scale)
    }

    fn project(&self, wx: f64, wy: f64) -> (f64, f64) {
        let (ox, oy, scale) = self.minimap_transform();
        let height = f64::from(self.canvas.height());
        ((wx - ox) * scale, height - (wy - oy) * scale)
    }

    /// Walks the document's top cells via the shared flattening traversal,
    /// skipping cells below the size threshold and never descending into
    /// `CONTEXT_INFO` cells, then paints every emitted polygon at
    /// reduced alpha.
    pub fn render(&mut self, document: &Document, layer_visibility: &HashMap<LayerKey, bool>, layer_colors: &HashMap<LayerKey, (u8, u8, u8)>) {
        self.document_bbox = document.bounding_box;

        let mut collector = MinimapCollector { polygons: Vec::new() };
        gdsjam_model::walk_hierarchy(document, &mut collector, u32::MAX);

        self.ctx.set_fill_style_str("#141414");
        self.ctx.fill_rect(0.0, 0.0, f64::from(self.canvas.width()), f64::from(self.canvas.height()));

        for polygon in &collector.polygons {
            if !layer_visibility.get(&polygon.layer).copied().unwrap_or(false) {
                continue;
            }
            let (r, g, b) = layer_colors.get(&polygon.layer).copied().unwrap_or((160, 160, 160));
            self.paint_flattened(polygon, r, g, b);
        }

        self.paint_outline(self.viewport_outline, "#ffffff");
        let participants: Vec<ParticipantViewport> = self.participant_viewports.clone();
        for participant in &participants {
            let color = if participant.is_followed { "#ffd24e" } else { "#4ea1ff" };
            self.paint_outline(Some(participant.bounds), color);
            self.paint_participant_label(participant, color);
        }
    }

    fn paint_flattened(&self, polygon: &FlattenedPolygon, r: u8, g: u8, b: u8) {
        if polygon.world_points.len() < 3 {
            return;
        }
        self.ctx.begin_path();
        let (x0, y0) = self.project(polygon.world_points[0].x, polygon.world_points[0].y);
        self.ctx.move_to(x0, y0);
        for p in &polygon.world_points[1..] {
            let (sx, sy) = self.project(p.x, p.y);
            self.ctx.line_to(sx, sy);
        }
        self.ctx.close_path();
        self.ctx.set_fill_style_str(&format!("rgba({r}, {g}, {b}, 0.8)"));
        self.ctx.fill();
    }

    fn paint_outline(&self, bounds: Option<BoundingBox>, color: &str) {
        let Some(bounds) = bounds else { return };
        if bounds.is_empty() {
            return;
        }
        let (x0, y0) = self.project(bounds.min_x, bounds.max_y);
        let (x1, y1) = self.project(bounds.max_x, bounds.min_y);
        self.ctx.set_stroke_style_str(color);
        self.ctx.set_line_width(1.5);
        self.ctx.stroke_rect(x0, y0, x1 - x0, y1 - y0);
    }

    /// Draws a small label above a participant's rectangle (§4.8).
    fn paint_participant_label(&self, participant: &ParticipantViewport, color: &str) {
        if participant.bounds.is_empty() {
            return;
        }
        let (x0, y0) = self.project(participant.bounds.min_x, participant.bounds.max_y);
        self.ctx.set_fill_style_str(color);
        self.ctx.set_font("10px sans-serif");
        let _ = self.ctx.fill_text(&format!("#{}", participant.participant_id), x0, y0 - 2.0);
    }

    /// Hit-tests a minimap click against participant viewport rectangles
    /// first (so clicking inside someone else's viewport jumps to their
    /// position, with their exact scale for navigation), then falls back to
    /// navigating to the clicked world point with `scale = None` (§4.8:
    /// "scale undefined = center-only"). Returns the navigation target and
    /// also invokes the `on_navigate` callback, if set.
    pub fn handle_click(&mut self, canvas_x: f64, canvas_y: f64) -> Option<(f64, f64, Option<f64>)> {
        let (ox, oy, scale) = self.minimap_transform();
        if scale <= 0.0 {
            return None;
        }
        let height = f64::from(self.canvas.height());
        let world_x = canvas_x / scale + ox;
        let world_y = (height - canvas_y) / scale + oy;

        let target = navigate_target(world_x, world_y, &self.participant_viewports);

        if let Some(cb) = &mut self.on_navigate {
            cb(target.0, target.1, target.2);
        }
        Some(target)
    }
}

/// Pure click-hit-test logic (§4.8), split out from [`Minimap::handle_click`]
/// so it's testable without a real canvas: a world point landing inside a
/// participant's rectangle navigates to their exact center and scale,
/// otherwise it navigates to the clicked point with `scale = None`.
fn navigate_target(world_x: f64, world_y: f64, participants: &[ParticipantViewport]) -> (f64, f64, Option<f64>) {
    participants
        .iter()
        .find(|participant| participant.bounds.contains_point(gdsjam_model::Point::new(world_x, world_y)))
        .map(|participant| {
            let center = participant.bounds.center();
            (center.x, center.y, Some(participant.scale))
        })
        .unwrap_or((world_x, world_y, None))
}

struct MinimapCollector {
    polygons: Vec<FlattenedPolygon>,
}

impl HierarchyVisitor for MinimapCollector {
    fn skip_cell(&mut self, cell: &Cell, _depth: u32) -> bool {
        cell.skip_in_minimap()
    }

    fn visit_cell(&mut self, _cell: &Cell, _depth: u32) -> bool {
        true
    }

    fn emit_polygon(&mut self, polygon: FlattenedPolygon) {
        self.polygons.push(polygon);
    }
}

#[cfg(test)]
mod tests {
    use gdsjam_model::{Instance, Point, Polygon, Units};

    use super::*;

    fn rect(layer: LayerKey, x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon {
        Polygon::new(layer, vec![Point::new(x0, y0), Point::new(x1, y0), Point::new(x1, y1), Point::new(x0, y1)]).unwrap()
    }

    #[test]
    fn navigate_target_hits_a_participant_and_carries_their_scale() {
        let participants = vec![ParticipantViewport {
            participant_id: 7,
            bounds: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            scale: 4.5,
            is_followed: false,
        }];
        let (x, y, scale) = navigate_target(5.0, 5.0, &participants);
        assert_eq!((x, y), (5.0, 5.0));
        assert_eq!(scale, Some(4.5));
    }

    #[test]
    fn navigate_target_falls_back_to_the_clicked_point_with_no_scale() {
        let participants = vec![ParticipantViewport {
            participant_id: 7,
            bounds: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            scale: 4.5,
            is_followed: false,
        }];
        let (x, y, scale) = navigate_target(500.0, 500.0, &participants);
        assert_eq!((x, y), (500.0, 500.0));
        assert_eq!(scale, None);
    }

    #[test]
    fn collector_skips_descent_into_small_cells() {
        use std::collections::HashMap as StdHashMap;

        let layer = LayerKey::new(1, 0);
        let mut cells = StdHashMap::new();
        cells.insert("leaf".into(), Cell::new("leaf", vec![rect(layer, 0.0, 0.0, 1.0, 1.0)], vec![]));
        cells.insert(
            "small_holder".into(),
            Cell::new("small_holder", vec![], vec![Instance::new("leaf", 0.0, 0.0)]),
        );
        cells.insert("big".into(), Cell::new("big", vec![rect(layer, 0.0, 0.0, 1000.0, 1000.0)], vec![]));
        cells.insert(
            "T".into(),
            Cell::new("T", vec![], vec![Instance::new("small_holder", 0.0, 0.0), Instance::new("big", 2000.0, 0.0)]),
        );
        let doc = Document::build(Units::default(), cells).unwrap();

        // `small_holder`'s own bounding box (inherited from `leaf`) is tiny
        // relative to the document extent set by `big`, so it's flagged
        // skip-in-minimap; `leaf`'s polygon is only reachable by descending
        // into `small_holder`'s instances.
        assert!(doc.cells["small_holder"].skip_in_minimap());

        let mut collector = MinimapCollector { polygons: Vec::new() };
        gdsjam_model::walk_hierarchy(&doc, &mut collector, 10);

        assert_eq!(collector.polygons.len(), 1);
    }

    #[test]
    fn collector_never_descends_into_context_info_cells() {
        use std::collections::HashMap as StdHashMap;

        let layer = LayerKey::new(1, 0);
        let mut cells = StdHashMap::new();
        cells.insert("LEAF".into(), Cell::new("LEAF", vec![rect(layer, 0.0, 0.0, 1.0, 1.0)], vec![]));
        cells.insert(
            "PROBE_CONTEXT_INFO".into(),
            Cell::new("PROBE_CONTEXT_INFO", vec![rect(layer, 5.0, 5.0, 6.0, 6.0)], vec![Instance::new("LEAF", 0.0, 0.0)]),
        );
        cells.insert("T".into(), Cell::new("T", vec![], vec![Instance::new("PROBE_CONTEXT_INFO", 0.0, 0.0)]));
        let doc = Document::build(Units::default(), cells).unwrap();

        let mut collector = MinimapCollector { polygons: Vec::new() };
        gdsjam_model::walk_hierarchy(&doc, &mut collector, 10);

        // Only the context cell's own polygon is emitted; `LEAF` is never reached.
        assert_eq!(collector.polygons.len(), 1);
    }

    #[test]
    fn s6_a_one_by_one_cell_is_skipped_and_a_hundred_by_hundred_cell_is_drawn() {
        use std::collections::HashMap as StdHashMap;

        let layer = LayerKey::new(1, 0);
        let mut cells = StdHashMap::new();
        cells.insert("tiny".into(), Cell::new("tiny", vec![rect(layer, 0.0, 0.0, 1.0, 1.0)], vec![]));
        cells.insert("huge".into(), Cell::new("huge", vec![rect(layer, 0.0, 0.0, 100.0, 100.0)], vec![]));
        cells.insert(
            "TOP".into(),
            Cell::new("TOP", vec![], vec![Instance::new("tiny", 0.0, 0.0), Instance::new("huge", 300.0, 0.0)]),
        );
        let doc = Document::build(Units::default(), cells).unwrap();
        assert!(doc.cells["tiny"].skip_in_minimap());
        assert!(!doc.cells["huge"].skip_in_minimap());

        let mut collector = MinimapCollector { polygons: Vec::new() };
        gdsjam_model::walk_hierarchy(&doc, &mut collector, 10);

        assert_eq!(collector.polygons.len(), 1);
        assert_eq!(collector.polygons[0].layer, layer);
    }
}
