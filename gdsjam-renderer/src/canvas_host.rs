use hashbrown::{HashMap, HashSet};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use gdsjam_core::Viewport;

use crate::{
    error::Error,
    js,
    overlays::{grid_lines_in_view, ScaleBar},
    scene::{GroupHandle, PaintStyle, PolygonDraw, SceneHost},
};

/// A [`SceneHost`] backed by a single `<canvas>` 2D rendering context.
///
/// Grounded on the teacher's WebGL2 `Renderer`: owns the canvas and its
/// context, exposes `create`/`create_with_canvas` and `resize`, and a
/// `begin_frame`/`end_frame`-shaped entry point (`paint`) — retargeted from
/// immediate-mode GL draw calls to `CanvasRenderingContext2d` path fills and
/// strokes, since C5's retained scene graph holds world-space polygons
/// rather than a GPU vertex buffer.
pub struct Canvas2dSceneHost {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    next_id: u32,
    groups: HashMap<GroupHandle, Vec<PolygonDraw>>,
}

impl Canvas2dSceneHost {
    pub fn create(canvas_id: &str) -> Result<Self, Error> {
        let canvas = js::get_canvas_by_id(canvas_id)?;
        Self::create_with_canvas(canvas)
    }

    pub fn create_with_canvas(canvas: HtmlCanvasElement) -> Result<Self, Error> {
        let ctx = js::get_2d_context(&canvas)?;
        Ok(Self { canvas, ctx, next_id: 0, groups: HashMap::new() })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.canvas.set_width(width);
        self.canvas.set_height(height);
    }

    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    /// Repaints every group whose handle is in `visible_groups` against the
    /// given viewport, projecting world points to screen space. Groups
    /// outside the visible set (per C3's culling) are skipped entirely —
    /// they stay resident in `self.groups` for the next frame that needs
    /// them, since culling never destroys draw data, only a re-render does.
    pub fn paint(&self, viewport: &Viewport, background: &str, visible_groups: &HashSet<GroupHandle>) {
        self.ctx.set_fill_style_str(background);
        self.ctx.fill_rect(0.0, 0.0, f64::from(self.canvas.width()), f64::from(self.canvas.height()));

        for (handle, polygons) in &self.groups {
            if !visible_groups.contains(handle) {
                continue;
            }
            for draw in polygons {
                self.paint_polygon(viewport, draw);
            }
        }
    }

    fn paint_polygon(&self, viewport: &Viewport, draw: &PolygonDraw) {
        if draw.world_points.len() < 3 {
            return;
        }
        self.ctx.begin_path();
        let (x0, y0) = viewport.screen_from_world(draw.world_points[0].0, draw.world_points[0].1);
        self.ctx.move_to(x0, y0);
        for &(wx, wy) in &draw.world_points[1..] {
            let (sx, sy) = viewport.screen_from_world(wx, wy);
            self.ctx.line_to(sx, sy);
        }
        self.ctx.close_path();

        match draw.style {
            PaintStyle::Fill { alpha } => {
                let color = format!("rgba({}, {}, {}, {})", draw.color.r, draw.color.g, draw.color.b, alpha);
                self.ctx.set_fill_style_str(&color);
                self.ctx.fill();
            }
            PaintStyle::Stroke { width_db } => {
                let color = format!("rgb({}, {}, {})", draw.color.r, draw.color.g, draw.color.b);
                self.ctx.set_stroke_style_str(&color);
                self.ctx.set_line_width(width_db * viewport.s);
                self.ctx.stroke();
            }
        }
    }

    /// Paints vertical/horizontal grid lines at `spacing_db` intervals
    /// across the visible viewport at alpha ~0.3 (§4.7).
    pub fn paint_grid(&self, viewport: &Viewport, spacing_db: f64) {
        let bounds = viewport.viewport_bounds_world();
        let (xs, ys) = grid_lines_in_view(bounds, spacing_db);
        if xs.is_empty() && ys.is_empty() {
            return;
        }

        self.ctx.save();
        self.ctx.set_global_alpha(0.3);
        self.ctx.set_stroke_style_str("#ffffff");
        self.ctx.set_line_width(1.0);

        for x in xs {
            let (sx, sy_top) = viewport.screen_from_world(x, bounds.max_y);
            let (_, sy_bottom) = viewport.screen_from_world(x, bounds.min_y);
            self.ctx.begin_path();
            self.ctx.move_to(sx, sy_top);
            self.ctx.line_to(sx, sy_bottom);
            self.ctx.stroke();
        }
        for y in ys {
            let (sx_left, sy) = viewport.screen_from_world(bounds.min_x, y);
            let (sx_right, _) = viewport.screen_from_world(bounds.max_x, y);
            self.ctx.begin_path();
            self.ctx.move_to(sx_left, sy);
            self.ctx.line_to(sx_right, sy);
            self.ctx.stroke();
        }

        self.ctx.restore();
    }

    /// Draws `bar`'s length as a screen-space bar in the canvas's
    /// bottom-left corner plus its formatted label (§4.7).
    pub fn paint_scale_bar(&self, bar: &ScaleBar, zoom_scale: f64) {
        if bar.length_db <= 0.0 {
            return;
        }
        const MARGIN_PX: f64 = 16.0;
        let screen_length = bar.length_db * zoom_scale;
        let y = f64::from(self.canvas.height()) - MARGIN_PX;
        let x0 = MARGIN_PX;
        let x1 = x0 + screen_length;

        self.ctx.save();
        self.ctx.set_stroke_style_str("#ffffff");
        self.ctx.set_line_width(2.0);
        self.ctx.begin_path();
        self.ctx.move_to(x0, y);
        self.ctx.line_to(x1, y);
        self.ctx.stroke();

        self.ctx.set_fill_style_str("#ffffff");
        self.ctx.set_font("12px sans-serif");
        let _ = self.ctx.fill_text(&bar.label, x0, y - 6.0);
        self.ctx.restore();
    }

    /// Draws the latest cursor's world-coordinate readout text (§4.7) in
    /// the canvas's top-left corner.
    pub fn paint_coordinate_readout(&self, text: &str) {
        self.ctx.save();
        self.ctx.set_fill_style_str("#ffffff");
        self.ctx.set_font("12px sans-serif");
        let _ = self.ctx.fill_text(text, 8.0, 16.0);
        self.ctx.restore();
    }
}

impl SceneHost for Canvas2dSceneHost {
    fn create_group(&mut self) -> GroupHandle {
        let handle = GroupHandle(self.next_id);
        self.next_id += 1;
        self.groups.insert(handle, Vec::new());
        handle
    }

    fn append(&mut self, group: GroupHandle, polygon: PolygonDraw) {
        if let Some(entries) = self.groups.get_mut(&group) {
            entries.push(polygon);
        }
    }

    fn destroy_group(&mut self, group: GroupHandle) {
        self.groups.remove(&group);
    }

    fn clear(&mut self) {
        self.groups.clear();
        self.next_id = 0;
    }
}
