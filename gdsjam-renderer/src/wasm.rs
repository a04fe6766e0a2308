use std::collections::HashMap as StdHashMap;

use wasm_bindgen::prelude::*;
use web_sys::{console, HtmlCanvasElement};

use gdsjam_core::FillMode;
use gdsjam_model::{Cell, Document, Instance, LayerKey, Point, Polygon, Units};

use crate::{
    canvas_host::Canvas2dSceneHost,
    log::{log_debug, log_warn},
    minimap::{Minimap, ParticipantViewport},
    renderer::{RenderConfig, RenderOptions, RenderWarning, Renderer, ViewportState},
};

fn js_err(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Accumulates cells, polygons and instances from JS one call at a time,
/// mirroring the teacher's `JsCellData`/`update_cell` pattern of building up
/// state through explicit setters rather than handing a whole parsed
/// structure across the wasm boundary. `build()` hands the accumulated cells
/// to [`gdsjam_model::Document::build`], which does the real validation and
/// derivation (topCells, bounding boxes, skipInMinimap, layer table).
#[wasm_bindgen]
#[derive(Debug, Default)]
pub struct GdsDocumentBuilder {
    database_unit_m: f64,
    user_unit_m: f64,
    cells: StdHashMap<String, (Vec<Polygon>, Vec<Instance>)>,
}

#[wasm_bindgen]
impl GdsDocumentBuilder {
    #[wasm_bindgen(constructor)]
    pub fn new(database_unit_m: f64, user_unit_m: f64) -> GdsDocumentBuilder {
        GdsDocumentBuilder { database_unit_m, user_unit_m, cells: StdHashMap::new() }
    }

    /// Registers an empty cell if `name` hasn't been seen yet. Idempotent.
    #[wasm_bindgen(js_name = ensureCell)]
    pub fn ensure_cell(&mut self, name: &str) {
        self.cells.entry(name.to_string()).or_default();
    }

    /// Adds a polygon ring (flattened `x0, y0, x1, y1, ...`) on `(layer,
    /// datatype)` to `cell`. Fails if fewer than 3 points are given.
    #[wasm_bindgen(js_name = addPolygon)]
    pub fn add_polygon(&mut self, cell: &str, layer: u16, datatype: u16, xs: &[f64], ys: &[f64]) -> Result<(), JsValue> {
        if xs.len() != ys.len() {
            return Err(js_err("xs and ys must have the same length"));
        }
        let points: Vec<Point> = xs.iter().zip(ys.iter()).map(|(&x, &y)| Point::new(x, y)).collect();
        let polygon = Polygon::new(LayerKey::new(layer, datatype), points).map_err(js_err)?;
        self.cells.entry(cell.to_string()).or_default().0.push(polygon);
        Ok(())
    }

    /// Adds a placement of `child` inside `cell` at `(x, y)` with the
    /// mirror→rotate→magnify→translate placement transform.
    #[wasm_bindgen(js_name = addInstance)]
    pub fn add_instance(&mut self, cell: &str, child: &str, x: f64, y: f64, rotation_deg: f64, mirror: bool, magnification: f64) {
        let instance = Instance::new(child, x, y).with_rotation_deg(rotation_deg).with_magnification(magnification);
        let instance = if mirror { instance.mirrored() } else { instance };
        self.cells.entry(cell.to_string()).or_default().1.push(instance);
    }

    /// Validates and derives the full [`Document`], consuming this builder.
    pub fn build(self) -> Result<GdsDocument, JsValue> {
        let units = Units::new(self.database_unit_m, self.user_unit_m);
        let cells: StdHashMap<compact_str::CompactString, Cell> = self
            .cells
            .into_iter()
            .map(|(name, (polygons, instances))| (name.as_str().into(), Cell::new(name, polygons, instances)))
            .collect();
        let document = Document::build(units, cells).map_err(js_err)?;
        Ok(GdsDocument { document })
    }
}

/// A validated, ready-to-render document.
#[wasm_bindgen]
#[derive(Debug)]
pub struct GdsDocument {
    document: Document,
}

#[wasm_bindgen]
impl GdsDocument {
    #[wasm_bindgen(js_name = cellCount)]
    pub fn cell_count(&self) -> u32 {
        self.document.cells.len() as u32
    }

    #[wasm_bindgen(js_name = topCellCount)]
    pub fn top_cell_count(&self) -> u32 {
        self.document.top_cells.len() as u32
    }
}

/// The `#[wasm_bindgen]` surface (§6), wrapping [`Renderer<Canvas2dSceneHost>`]
/// behind `init`/`renderDocument`/`setViewportState`, matching the shape of
/// the teacher's `BeamtermRenderer` binding.
#[wasm_bindgen]
pub struct GdsViewer {
    renderer: Renderer<Canvas2dSceneHost>,
    units: Units,
}

#[wasm_bindgen]
impl GdsViewer {
    #[wasm_bindgen(constructor)]
    pub fn new(canvas: HtmlCanvasElement) -> Result<GdsViewer, JsValue> {
        console_error_panic_hook::set_once();
        let width = f64::from(canvas.width());
        let height = f64::from(canvas.height());
        let host = Canvas2dSceneHost::create_with_canvas(canvas).map_err(js_err)?;
        let renderer = Renderer::new(host, RenderConfig::default(), width, height);
        Ok(GdsViewer { renderer, units: Units::default() })
    }

    pub fn destroy(&mut self) {
        self.renderer.destroy();
    }

    /// Loads `doc` and performs the initial full render (§4.5), optionally
    /// fitting the viewport to the document extent unless `skip_fit` is set.
    /// Returns the number of polygons actually drawn.
    #[wasm_bindgen(js_name = renderDocument)]
    pub fn render_document(&mut self, doc: GdsDocument, max_depth: u32, max_polygons: u32, skip_fit: bool) -> Result<u32, JsValue> {
        self.units = doc.document.units;
        let options = RenderOptions::new(max_depth, max_polygons.max(1), FillMode::Fill);
        let report = self.renderer.render_document(doc.document, options, None).map_err(js_err)?;
        if report.warning == Some(RenderWarning::BudgetExhausted) {
            log_warn!("render budget exhausted at {} polygons, {} tiles", report.total_rendered, report.tiles_created);
        }
        if !skip_fit {
            self.renderer.fit_to_view();
        }
        Ok(report.total_rendered)
    }

    #[wasm_bindgen(js_name = getViewportState)]
    pub fn get_viewport_state(&self) -> JsValue {
        let ViewportState { tx, ty, s } = self.renderer.viewport_state();
        let out = js_sys::Object::new();
        let _ = js_sys::Reflect::set(&out, &"tx".into(), &JsValue::from_f64(tx));
        let _ = js_sys::Reflect::set(&out, &"ty".into(), &JsValue::from_f64(ty));
        let _ = js_sys::Reflect::set(&out, &"s".into(), &JsValue::from_f64(s));
        out.into()
    }

    #[wasm_bindgen(js_name = setViewportState)]
    pub fn set_viewport_state(&mut self, tx: f64, ty: f64, s: f64) -> bool {
        self.renderer.set_viewport_state(ViewportState { tx, ty, s })
    }

    #[wasm_bindgen(js_name = setViewportCenter)]
    pub fn set_viewport_center(&mut self, wx: f64, wy: f64) -> bool {
        self.renderer.set_viewport_center(wx, wy)
    }

    #[wasm_bindgen(js_name = setViewportCenterAndScale)]
    pub fn set_viewport_center_and_scale(&mut self, wx: f64, wy: f64, scale: f64) -> bool {
        self.renderer.set_viewport_center_and_scale(wx, wy, scale)
    }

    #[wasm_bindgen(js_name = fitToView)]
    pub fn fit_to_view(&mut self) -> bool {
        self.renderer.fit_to_view()
    }

    #[wasm_bindgen(js_name = setViewportLocked)]
    pub fn set_viewport_locked(&mut self, locked: bool) {
        self.renderer.set_viewport_locked(locked);
    }

    #[wasm_bindgen(js_name = toggleFill)]
    pub fn toggle_fill(&mut self) -> bool {
        matches!(self.renderer.toggle_fill(), FillMode::Fill)
    }

    #[wasm_bindgen(js_name = toggleGrid)]
    pub fn toggle_grid(&mut self) -> bool {
        self.renderer.toggle_grid()
    }

    /// Repaints the grid, scale bar, and coordinate readout chrome (§4.7)
    /// onto the canvas if the debounced overlay redraw is due. `cursor_x`/
    /// `cursor_y` are the latest cursor position in world space, if any.
    /// Returns whether a repaint actually happened.
    #[wasm_bindgen(js_name = paintOverlays)]
    pub fn paint_overlays(&mut self, now_ms: f64, cursor_x: Option<f64>, cursor_y: Option<f64>) -> bool {
        if !self.renderer.poll_overlay_redraw(now_ms) {
            return false;
        }
        let viewport = self.renderer.viewport();
        if self.renderer.grid_visible() {
            self.renderer.host().paint_grid(&viewport, self.renderer.grid_spacing_db());
        }
        if let Some(bar) = self.renderer.scale_bar() {
            self.renderer.host().paint_scale_bar(&bar, viewport.s);
        }
        if let (Some(wx), Some(wy)) = (cursor_x, cursor_y) {
            let text = crate::overlays::format_coordinate_readout(wx, wy, &self.units, viewport.s);
            self.renderer.host().paint_coordinate_readout(&text);
        }
        true
    }

    /// Checks the LOD controller against the current zoom and queues a
    /// depth-change re-render if the zoom threshold band was crossed,
    /// returning the new depth if so. The caller invokes
    /// `performIncrementalRerender` to actually apply it.
    #[wasm_bindgen(js_name = checkAndTriggerRerender)]
    pub fn check_and_trigger_rerender(&mut self, utilization: f64) -> Option<u32> {
        let depth = self.renderer.check_and_trigger_rerender(utilization);
        if let Some(depth) = depth {
            log_debug!("zoom threshold crossed, queued re-render at depth {depth}");
        }
        depth
    }

    #[wasm_bindgen(js_name = performIncrementalRerender)]
    pub fn perform_incremental_rerender(&mut self, new_depth: u32) -> Result<u32, JsValue> {
        let report = self.renderer.perform_incremental_rerender(new_depth, None).map_err(js_err)?;
        Ok(report.total_rendered)
    }

    #[wasm_bindgen(js_name = getPerformanceMetrics)]
    pub fn get_performance_metrics(&self) -> JsValue {
        let metrics = self.renderer.performance_metrics();
        let out = js_sys::Object::new();
        let set = |key: &str, value: f64| {
            let _ = js_sys::Reflect::set(&out, &key.into(), &JsValue::from_f64(value));
        };
        set("fps", metrics.fps);
        set("visiblePolygons", f64::from(metrics.visible_polygons));
        set("totalPolygons", f64::from(metrics.total_polygons));
        set("polygonBudget", f64::from(metrics.polygon_budget));
        set("budgetUtilization", metrics.budget_utilization);
        set("currentDepth", f64::from(metrics.current_depth));
        set("zoomLevel", metrics.zoom_level);
        set("zoomThresholdLow", metrics.zoom_threshold_low);
        set("zoomThresholdHigh", metrics.zoom_threshold_high);
        out.into()
    }

    #[wasm_bindgen(js_name = recordFrame)]
    pub fn record_frame(&mut self, now_ms: f64) {
        self.renderer.record_frame(now_ms);
    }

    /// Formats a world point as a micrometre coordinate readout (§4.7), with
    /// precision scaled to the current zoom level.
    #[wasm_bindgen(js_name = formatCoordinateReadout)]
    pub fn format_coordinate_readout(&self, world_x_db: f64, world_y_db: f64) -> String {
        crate::overlays::format_coordinate_readout(world_x_db, world_y_db, &self.units, self.renderer.viewport_state().s)
    }
}

/// A minimap wrapper (C8) exposing the independent overview pipeline, sharing
/// the document with the main viewer but not its state.
#[wasm_bindgen]
pub struct GdsMinimap {
    minimap: Minimap,
}

#[wasm_bindgen]
impl GdsMinimap {
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str) -> Result<GdsMinimap, JsValue> {
        Ok(GdsMinimap { minimap: Minimap::init(canvas_id).map_err(js_err)? })
    }

    #[wasm_bindgen(js_name = updateViewportOutline)]
    pub fn update_viewport_outline(&mut self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) {
        self.minimap.update_viewport_outline(gdsjam_model::BoundingBox::new(min_x, min_y, max_x, max_y));
    }

    /// Hit-tests a minimap click (§4.8) and returns `{worldX, worldY,
    /// scale}` for navigation, or `undefined` if the minimap has no
    /// document yet. `scale` is left unset when the click didn't land on a
    /// participant's rectangle, matching the "scale undefined =
    /// center-only" rule.
    #[wasm_bindgen(js_name = handleClick)]
    pub fn handle_click(&mut self, canvas_x: f64, canvas_y: f64) -> JsValue {
        let Some((world_x, world_y, scale)) = self.minimap.handle_click(canvas_x, canvas_y) else {
            return JsValue::UNDEFINED;
        };
        let out = js_sys::Object::new();
        let _ = js_sys::Reflect::set(&out, &"worldX".into(), &JsValue::from_f64(world_x));
        let _ = js_sys::Reflect::set(&out, &"worldY".into(), &JsValue::from_f64(world_y));
        if let Some(scale) = scale {
            let _ = js_sys::Reflect::set(&out, &"scale".into(), &JsValue::from_f64(scale));
        }
        out.into()
    }

    /// Renders `doc`'s flattened polygons at reduced alpha plus the current
    /// viewport/participant outlines. `layers` is `[layer, datatype, visible,
    /// r, g, b, ...]` (six `u16`s per entry) — the layer table is passed as a
    /// flat buffer rather than a typed map since wasm-bindgen can't carry a
    /// `HashMap<LayerKey, _>` directly across the boundary.
    pub fn render(&mut self, doc: &GdsDocument, layers: &[u16]) {
        let mut visibility = hashbrown::HashMap::new();
        let mut colors = hashbrown::HashMap::new();
        for entry in layers.chunks_exact(6) {
            let key = LayerKey::new(entry[0], entry[1]);
            visibility.insert(key, entry[2] != 0);
            colors.insert(key, (entry[3] as u8, entry[4] as u8, entry[5] as u8));
        }
        self.minimap.render(&doc.document, &visibility, &colors);
    }

    /// Replaces the set of participant viewport outlines drawn on the next
    /// `render` call. `flat` is `[id, minX, minY, maxX, maxY, scale,
    /// isFollowed, ...]` (seven `f64`s per entry; `isFollowed` is `0`/`1`).
    #[wasm_bindgen(js_name = updateParticipantViewports)]
    pub fn update_participant_viewports(&mut self, flat: &[f64]) {
        let viewports = flat
            .chunks_exact(7)
            .map(|c| ParticipantViewport {
                participant_id: c[0] as u32,
                bounds: gdsjam_model::BoundingBox::new(c[1], c[2], c[3], c[4]),
                scale: c[5],
                is_followed: c[6] != 0.0,
            })
            .collect();
        self.minimap.update_participant_viewports(viewports);
    }
}

/// Initialize the WASM module.
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    console::log_1(&"gdsjam-renderer wasm module loaded".into());
}
