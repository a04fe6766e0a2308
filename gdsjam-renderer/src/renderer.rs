use hashbrown::HashMap;

use gdsjam_core::{
    clamp_zoom_scale, detect_newly_visible_layers, update_visibility, CullItem, Debouncer, FillMode, LodController,
    SpatialIndex, Viewport, ZoomLimits,
};
use gdsjam_model::{transform_bbox_corners, Affine2, BoundingBox, Cell, Document, LayerKey, DEFAULT_COLOR};

use crate::{
    error::Error,
    scene::{PaintStyle, PolygonDraw, SceneHost},
    tile::{RenderedTile, TileKey, DEFAULT_TILE_SIZE_DB},
};

/// Tunable constants (§6), overridable via the teacher's fluent-builder
/// idiom rather than hard-coded, while every constant ships a
/// spec-accurate default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderConfig {
    pub tile_size_db: f64,
    pub hierarchical_polygon_threshold: u32,
    pub fill_alpha: f32,
    pub stroke_screen_px_target: f64,
    pub min_stroke_width_db: f64,
    pub minimap_skip_fraction: f64,
    pub cull_debounce_ms: f64,
    pub overlay_debounce_ms: f64,
    pub fps_update_interval_ms: f64,
    pub base_polygon_budget: u32,
    pub zoom_limits: ZoomLimits,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            tile_size_db: DEFAULT_TILE_SIZE_DB,
            hierarchical_polygon_threshold: gdsjam_core::HIERARCHICAL_POLYGON_THRESHOLD,
            fill_alpha: 0.7,
            stroke_screen_px_target: 2.0,
            min_stroke_width_db: 0.1,
            minimap_skip_fraction: 0.01,
            cull_debounce_ms: 100.0,
            overlay_debounce_ms: 50.0,
            fps_update_interval_ms: 500.0,
            base_polygon_budget: 500_000,
            zoom_limits: ZoomLimits::default(),
        }
    }
}

impl RenderConfig {
    pub fn builder() -> RenderConfigBuilder {
        RenderConfigBuilder(RenderConfig::default())
    }
}

/// Fluent builder for [`RenderConfig`], in the teacher's
/// `Terminal::builder(...)` style.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderConfigBuilder(RenderConfig);

impl RenderConfigBuilder {
    pub fn tile_size(mut self, db: f64) -> Self {
        self.0.tile_size_db = db;
        self
    }

    pub fn hierarchical_polygon_threshold(mut self, n: u32) -> Self {
        self.0.hierarchical_polygon_threshold = n;
        self
    }

    pub fn fill_alpha(mut self, alpha: f32) -> Self {
        self.0.fill_alpha = alpha;
        self
    }

    pub fn stroke_screen_px_target(mut self, px: f64) -> Self {
        self.0.stroke_screen_px_target = px;
        self
    }

    pub fn min_stroke_width_db(mut self, db: f64) -> Self {
        self.0.min_stroke_width_db = db;
        self
    }

    pub fn minimap_skip_fraction(mut self, fraction: f64) -> Self {
        self.0.minimap_skip_fraction = fraction;
        self
    }

    pub fn cull_debounce_ms(mut self, ms: f64) -> Self {
        self.0.cull_debounce_ms = ms;
        self
    }

    pub fn overlay_debounce_ms(mut self, ms: f64) -> Self {
        self.0.overlay_debounce_ms = ms;
        self
    }

    pub fn fps_update_interval_ms(mut self, ms: f64) -> Self {
        self.0.fps_update_interval_ms = ms;
        self
    }

    pub fn base_polygon_budget(mut self, budget: u32) -> Self {
        self.0.base_polygon_budget = budget;
        self
    }

    pub fn zoom_limits(mut self, limits: ZoomLimits) -> Self {
        self.0.zoom_limits = limits;
        self
    }

    pub fn build(self) -> RenderConfig {
        self.0
    }
}

/// Per-call render parameters (§4.5).
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub max_depth: u32,
    pub max_polygons_per_render: u32,
    pub fill_mode: FillMode,
    pub override_scale: Option<f64>,
    pub layer_visibility: HashMap<LayerKey, bool>,
}

impl RenderOptions {
    pub fn new(max_depth: u32, max_polygons_per_render: u32, fill_mode: FillMode) -> Self {
        Self { max_depth, max_polygons_per_render, fill_mode, override_scale: None, layer_visibility: HashMap::new() }
    }
}

/// A non-fatal render-time anomaly (§7): the partial scene is still valid
/// and interactive, so this is surfaced as a warning, not an `Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderWarning {
    BudgetExhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderReport {
    pub total_rendered: u32,
    pub tiles_created: u32,
    pub warning: Option<RenderWarning>,
}

/// A merged, not-yet-applied re-render trigger. A [`RerenderRequest::LayersOnly`]
/// pending request is upgraded to [`RerenderRequest::FullDepthChange`] by a
/// later depth-change trigger rather than dropped, so a depth change never
/// loses an on-demand layer request that arrived first.
#[derive(Debug, Clone, PartialEq)]
pub enum RerenderRequest {
    FullDepthChange(u32),
    LayersOnly(Vec<LayerKey>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub tx: f64,
    pub ty: f64,
    pub s: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceMetrics {
    pub fps: f64,
    pub visible_polygons: u32,
    pub total_polygons: u32,
    pub polygon_budget: u32,
    pub budget_utilization: f64,
    pub current_depth: u32,
    pub zoom_level: f64,
    pub zoom_threshold_low: f64,
    pub zoom_threshold_high: f64,
    pub viewport_bounds: BoundingBox,
}

/// The progress interval from §4.5: "yield every N polygons so progress
/// callbacks surface." Real cooperative yielding is the host's
/// responsibility (see `wasm.rs`'s `requestAnimationFrame`-driven loop);
/// this crate just calls back at the same cadence.
const PROGRESS_INTERVAL: u32 = 10_000;

/// Walks a layout hierarchy under a polygon budget, batching transformed
/// polygons into per-`(layer, tile)` scene-graph groups (C5).
pub struct Renderer<H: SceneHost> {
    host: H,
    config: RenderConfig,
    viewport: Viewport,
    lod: LodController,
    cull_debouncer: Debouncer<()>,
    overlay_debouncer: Debouncer<()>,
    grid_visible: bool,
    spatial_index: SpatialIndex<TileKey>,
    tiles: HashMap<TileKey, RenderedTile>,
    document: Option<Document>,
    layer_visibility: HashMap<LayerKey, bool>,
    fill_mode: FillMode,
    viewport_locked: bool,
    is_rerendering: bool,
    generation: u64,
    pending_rerender: Option<RerenderRequest>,
    total_rendered: u32,
    fps: f64,
    frames_since_fps_update: u32,
    last_fps_update_ms: f64,
}

impl<H: SceneHost> Renderer<H> {
    pub fn new(host: H, config: RenderConfig, screen_width: f64, screen_height: f64) -> Self {
        let lod = LodController::new(config.base_polygon_budget, FillMode::Fill);
        let cull_debounce_ms = config.cull_debounce_ms;
        let overlay_debounce_ms = config.overlay_debounce_ms;
        Self {
            host,
            spatial_index: SpatialIndex::new(config.tile_size_db),
            config,
            viewport: Viewport::new(screen_width, screen_height),
            lod,
            cull_debouncer: Debouncer::new(cull_debounce_ms),
            overlay_debouncer: Debouncer::new(overlay_debounce_ms),
            grid_visible: true,
            tiles: HashMap::new(),
            document: None,
            layer_visibility: HashMap::new(),
            fill_mode: FillMode::Fill,
            viewport_locked: false,
            is_rerendering: false,
            generation: 0,
            pending_rerender: None,
            total_rendered: 0,
            fps: 0.0,
            frames_since_fps_update: 0,
            last_fps_update_ms: 0.0,
        }
    }

    pub fn destroy(&mut self) {
        self.host.clear();
        self.spatial_index.clear();
        self.tiles.clear();
        self.document = None;
    }

    /// Renders `document` from scratch: the full §4.5 algorithm, replacing
    /// any previously rendered scene. All prior tile handles are destroyed
    /// (via `SceneHost::clear`) before the new ones are created, per the
    /// model's "destroy all prior tile draw handles before installing the
    /// new model" lifecycle rule.
    pub fn render_document(
        &mut self,
        document: Document,
        mut options: RenderOptions,
        progress: Option<&mut dyn FnMut(u32, u32)>,
    ) -> Result<RenderReport, Error> {
        if options.max_polygons_per_render == 0 {
            return Err(Error::zero_polygon_budget());
        }
        if options.layer_visibility.is_empty() {
            options.layer_visibility = document.layers.values().map(|info| (info.key, info.visible)).collect();
        }

        let top_cell_instance_count: u32 =
            document.top_cells.iter().filter_map(|n| document.cells.get(n.as_str())).map(|c| c.instances.len() as u32).sum();
        let top_cell_polygon_count: u32 =
            document.top_cells.iter().filter_map(|n| document.cells.get(n.as_str())).map(|c| c.polygons.len() as u32).sum();
        self.lod.init_depth_for_document(top_cell_instance_count, top_cell_polygon_count);

        self.generation += 1;
        self.is_rerendering = true;
        self.host.clear();

        let scale = options.override_scale.unwrap_or(self.viewport.s);
        let stroke_width_db = (self.config.stroke_screen_px_target / scale).max(self.config.min_stroke_width_db);

        let mut tiles: HashMap<TileKey, RenderedTile> = HashMap::new();
        {
            let mut ctx = RenderCtx {
                document: &document,
                host: &mut self.host,
                tiles: &mut tiles,
                tile_size: self.config.tile_size_db,
                fill_mode: options.fill_mode,
                fill_alpha: self.config.fill_alpha,
                stroke_width_db,
                layer_visibility: &options.layer_visibility,
                remaining_budget: options.max_polygons_per_render,
                rendered: 0,
                progress,
            };
            for name in &document.top_cells {
                if ctx.remaining_budget == 0 {
                    break;
                }
                if let Some(cell) = document.cells.get(name.as_str()) {
                    render_cell(&mut ctx, cell, Affine2::IDENTITY, options.max_depth);
                }
            }
            self.total_rendered = ctx.rendered;
        }

        self.spatial_index.clear();
        for (id, tile) in tiles.values().enumerate() {
            self.spatial_index.insert(id as u32, tile.bbox, tile.key);
        }
        self.tiles = tiles;
        self.layer_visibility = options.layer_visibility;
        self.fill_mode = options.fill_mode;
        self.lod.set_fill_mode(options.fill_mode);
        self.document = Some(document);
        self.is_rerendering = false;
        self.pending_rerender = None;
        self.lod.recompute_zoom_thresholds(scale);

        let warning =
            if self.total_rendered >= options.max_polygons_per_render { Some(RenderWarning::BudgetExhausted) } else { None };

        Ok(RenderReport { total_rendered: self.total_rendered, tiles_created: self.tiles.len() as u32, warning })
    }

    /// Incremental re-render (§4.5): preserves the current `(tx, ty, s)` by
    /// passing it through as `override_scale` so stroke widths stay
    /// consistent, then rebuilds the scene from the held document.
    pub fn perform_incremental_rerender(&mut self, new_depth: u32, progress: Option<&mut dyn FnMut(u32, u32)>) -> Result<RenderReport, Error> {
        let Some(document) = self.document.take() else {
            return Err(Error::InvalidConfig("no document loaded".to_string()));
        };
        let options = RenderOptions {
            max_depth: new_depth,
            max_polygons_per_render: self.lod.get_scaled_budget(),
            fill_mode: self.fill_mode,
            override_scale: Some(self.viewport.s),
            layer_visibility: self.layer_visibility.clone(),
        };
        self.render_document(document, options, progress)
    }

    /// Queues (merging with any already-pending request) a re-render
    /// trigger rather than applying it immediately, so the caller can
    /// decide when to actually run `perform_incremental_rerender`.
    pub fn queue_rerender(&mut self, request: RerenderRequest) {
        self.pending_rerender = Some(match (self.pending_rerender.take(), request) {
            (Some(RerenderRequest::FullDepthChange(_)), RerenderRequest::FullDepthChange(depth)) => {
                RerenderRequest::FullDepthChange(depth)
            }
            (Some(RerenderRequest::FullDepthChange(depth)), RerenderRequest::LayersOnly(_)) => {
                RerenderRequest::FullDepthChange(depth)
            }
            (Some(RerenderRequest::LayersOnly(_)), RerenderRequest::FullDepthChange(depth)) => {
                RerenderRequest::FullDepthChange(depth)
            }
            (Some(RerenderRequest::LayersOnly(mut layers)), RerenderRequest::LayersOnly(new_layers)) => {
                for layer in new_layers {
                    if !layers.contains(&layer) {
                        layers.push(layer);
                    }
                }
                RerenderRequest::LayersOnly(layers)
            }
            (None, request) => request,
        });
    }

    pub fn pending_rerender(&self) -> Option<&RerenderRequest> {
        self.pending_rerender.as_ref()
    }

    /// Checks the LOD controller against the current zoom and queues a
    /// depth-change re-render if the zoom threshold band was crossed.
    pub fn check_and_trigger_rerender(&mut self, utilization: f64) -> Option<u32> {
        let depth = self.lod.check_and_trigger_rerender(self.viewport.s, self.is_rerendering, utilization)?;
        self.queue_rerender(RerenderRequest::FullDepthChange(depth));
        Some(depth)
    }

    pub fn should_rerender_on_zoom_change(&self) -> bool {
        self.lod.should_rerender_on_zoom_change()
    }

    // --- viewport state -------------------------------------------------

    pub fn viewport_state(&self) -> ViewportState {
        ViewportState { tx: self.viewport.tx, ty: self.viewport.ty, s: self.viewport.s }
    }

    /// Updates the transform directly (e.g. from an external sync source).
    /// Deliberately does not recompute the LOD zoom-threshold band: that
    /// band is the hysteresis `check_and_trigger_rerender` tests *against*,
    /// and is only re-centered once a render actually happens (§9's
    /// "recomputed after every render").
    pub fn set_viewport_state(&mut self, state: ViewportState) -> bool {
        if self.viewport_locked {
            return false;
        }
        self.viewport.tx = state.tx;
        self.viewport.ty = state.ty;
        self.viewport.s = state.s;
        self.request_overlay_redraw();
        true
    }

    pub fn set_viewport_center(&mut self, wx: f64, wy: f64) -> bool {
        if self.viewport_locked {
            return false;
        }
        self.viewport.tx = wx;
        self.viewport.ty = wy;
        self.request_overlay_redraw();
        true
    }

    pub fn set_viewport_center_and_scale(&mut self, wx: f64, wy: f64, scale: f64) -> bool {
        if self.viewport_locked {
            return false;
        }
        let document_extent = self.document.as_ref().map(|d| d.bounding_box.max_dimension()).unwrap_or(0.0);
        let units = self.document.as_ref().map(|d| d.units).unwrap_or_default();
        let clamped = clamp_zoom_scale(scale, self.viewport.screen_width, document_extent, self.viewport.s, &units, &self.config.zoom_limits);
        self.viewport.tx = wx;
        self.viewport.ty = wy;
        self.viewport.s = clamped;
        self.request_overlay_redraw();
        true
    }

    pub fn fit_to_view(&mut self) -> bool {
        if self.viewport_locked {
            return false;
        }
        let Some(document) = &self.document else { return false };
        self.viewport.fit_bbox(document.bounding_box, 0.05);
        self.lod.recompute_zoom_thresholds(self.viewport.s);
        self.request_overlay_redraw();
        true
    }

    pub fn set_viewport_locked(&mut self, locked: bool) {
        self.viewport_locked = locked;
    }

    pub fn viewport_locked(&self) -> bool {
        self.viewport_locked
    }

    pub fn toggle_fill(&mut self) -> FillMode {
        self.fill_mode = match self.fill_mode {
            FillMode::Fill => FillMode::Outline,
            FillMode::Outline => FillMode::Fill,
        };
        self.lod.set_fill_mode(self.fill_mode);
        self.fill_mode
    }

    /// Toggles the grid overlay (§4.7, §6) and requests a redraw of the
    /// overlay chrome so the toggle takes effect without waiting for the
    /// next viewport change.
    pub fn toggle_grid(&mut self) -> bool {
        self.grid_visible = !self.grid_visible;
        self.request_overlay_redraw();
        self.grid_visible
    }

    pub fn grid_visible(&self) -> bool {
        self.grid_visible
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// The grid line spacing (§4.7) for the current viewport's visible width.
    pub fn grid_spacing_db(&self) -> f64 {
        crate::overlays::grid_spacing_db(self.viewport.viewport_bounds_world().width())
    }

    /// The current scale bar (§4.7), or `None` if no document is loaded to
    /// take units from.
    pub fn scale_bar(&self) -> Option<crate::overlays::ScaleBar> {
        let units = self.document.as_ref()?.units;
        Some(crate::overlays::compute_scale_bar(self.viewport.viewport_bounds_world().width(), &units))
    }

    /// Queues a debounced grid/scale-bar overlay redraw (§4.3): the latest
    /// request wins, coalescing bursts of viewport changes into one repaint.
    fn request_overlay_redraw(&mut self) {
        self.overlay_debouncer.request(());
    }

    /// Polls whether the debounced overlay redraw is due; the host calls
    /// this once per frame to decide whether to repaint the grid, scale
    /// bar, and coordinate readout.
    pub fn poll_overlay_redraw(&mut self, now_ms: f64) -> bool {
        self.overlay_debouncer.poll(now_ms).is_some()
    }

    /// Idempotent: if the new map makes previously-invisible, never-rendered
    /// layers visible, queues a `LayersOnly` partial re-render for exactly
    /// those layers (§6).
    pub fn on_layer_visibility_changed(&mut self, new_map: HashMap<LayerKey, bool>) {
        let items: Vec<CullItem> =
            self.tiles.values().map(|tile| CullItem { bbox: tile.bbox, layer: tile.key.layer, polygon_count: tile.polygon_count }).collect();
        let newly_visible = detect_newly_visible_layers(&new_map, &self.layer_visibility, &items);
        self.layer_visibility = new_map;
        if !newly_visible.is_empty() {
            self.queue_rerender(RerenderRequest::LayersOnly(newly_visible));
        }
    }

    /// Runs culling against the current viewport bounds, returning the
    /// total visible polygon count.
    pub fn update_visibility(&self) -> u32 {
        let bounds = self.viewport.viewport_bounds_world();
        let items: Vec<CullItem> =
            self.tiles.values().map(|tile| CullItem { bbox: tile.bbox, layer: tile.key.layer, polygon_count: tile.polygon_count }).collect();
        update_visibility(bounds, &items, &self.layer_visibility).1
    }

    pub fn record_frame(&mut self, now_ms: f64) {
        self.frames_since_fps_update += 1;
        let elapsed = now_ms - self.last_fps_update_ms;
        if elapsed >= self.config.fps_update_interval_ms {
            self.fps = f64::from(self.frames_since_fps_update) * 1000.0 / elapsed;
            self.frames_since_fps_update = 0;
            self.last_fps_update_ms = now_ms;
        }
    }

    pub fn performance_metrics(&self) -> PerformanceMetrics {
        let budget = self.lod.get_scaled_budget();
        PerformanceMetrics {
            fps: self.fps,
            visible_polygons: self.update_visibility(),
            total_polygons: self.total_rendered,
            polygon_budget: budget,
            budget_utilization: if budget > 0 { f64::from(self.total_rendered) / f64::from(budget) } else { 0.0 },
            current_depth: self.lod.current_depth,
            zoom_level: self.viewport.s,
            zoom_threshold_low: self.lod.zoom_threshold_low(),
            zoom_threshold_high: self.lod.zoom_threshold_high(),
            viewport_bounds: self.viewport.viewport_bounds_world(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn is_rerendering(&self) -> bool {
        self.is_rerendering
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

struct RenderCtx<'a, H: SceneHost> {
    document: &'a Document,
    host: &'a mut H,
    tiles: &'a mut HashMap<TileKey, RenderedTile>,
    tile_size: f64,
    fill_mode: FillMode,
    fill_alpha: f32,
    stroke_width_db: f64,
    layer_visibility: &'a HashMap<LayerKey, bool>,
    remaining_budget: u32,
    rendered: u32,
    progress: Option<&'a mut dyn FnMut(u32, u32)>,
}

fn render_cell<H: SceneHost>(ctx: &mut RenderCtx<H>, cell: &Cell, transform: Affine2, max_depth: u32) {
    if ctx.remaining_budget == 0 {
        return;
    }
    let cell_budget = ctx.remaining_budget;
    let mut cell_rendered = 0u32;

    for polygon in &cell.polygons {
        if cell_rendered >= cell_budget {
            break;
        }
        let Some(&layer_visible) = ctx.layer_visibility.get(&polygon.layer) else { continue };
        if !layer_visible {
            continue;
        }

        let color = ctx.document.layers.get(&polygon.layer.as_string_key()).map(|info| info.color).unwrap_or(DEFAULT_COLOR);
        let world_bbox = transform_bbox_corners(polygon.bounding_box(), &transform);
        let world_points: Vec<(f64, f64)> = polygon.points().iter().map(|&p| { let p = transform.apply(p); (p.x, p.y) }).collect();

        let key = TileKey::from_center(polygon.layer, world_bbox.center().x, world_bbox.center().y, ctx.tile_size);
        let group = match ctx.tiles.get(&key) {
            Some(tile) => tile.group,
            None => {
                let group = ctx.host.create_group();
                ctx.tiles.insert(key, RenderedTile::new(key, group));
                group
            }
        };

        let style = style_for(ctx.fill_mode, ctx.fill_alpha, ctx.stroke_width_db);
        ctx.host.append(group, PolygonDraw { world_points, color, style });
        ctx.tiles.get_mut(&key).expect("just inserted").accumulate(world_bbox);

        cell_rendered += 1;
        ctx.rendered += 1;
        if ctx.rendered % PROGRESS_INTERVAL == 0 {
            if let Some(cb) = ctx.progress.as_mut() {
                cb(ctx.rendered, ctx.rendered);
            }
        }
    }
    ctx.remaining_budget = ctx.remaining_budget.saturating_sub(cell_rendered);

    if max_depth == 0 || ctx.remaining_budget == 0 || cell.is_context_info() {
        return;
    }

    for inst in &cell.instances {
        if ctx.remaining_budget == 0 {
            break;
        }
        let Some(child) = ctx.document.cells.get(inst.cell_ref.as_str()) else { continue };
        let child_transform = inst.transform().to_affine().then(&transform);
        render_cell(ctx, child, child_transform, max_depth - 1);
    }
}

fn style_for(fill_mode: FillMode, fill_alpha: f32, stroke_width_db: f64) -> PaintStyle {
    match fill_mode {
        FillMode::Fill => PaintStyle::Fill { alpha: fill_alpha },
        FillMode::Outline => PaintStyle::Stroke { width_db: stroke_width_db },
    }
}

#[cfg(test)]
mod tests {
    use gdsjam_model::{Instance, LayerKey as Layer, Point, Polygon, Units};

    use crate::scene::RecordingSceneHost;

    use super::*;

    fn rect(layer: Layer, x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon {
        Polygon::new(layer, vec![Point::new(x0, y0), Point::new(x1, y0), Point::new(x1, y1), Point::new(x0, y1)]).unwrap()
    }

    fn grid_document() -> Document {
        use std::collections::HashMap as StdHashMap;
        let layer = Layer::new(1, 0);
        let mut polygons = Vec::new();
        for gx in 0..10 {
            for gy in 0..10 {
                let x0 = (gx * 10) as f64;
                let y0 = (gy * 10) as f64;
                polygons.push(rect(layer, x0, y0, x0 + 10.0, y0 + 10.0));
            }
        }
        let mut cells = StdHashMap::new();
        cells.insert("TOP".into(), Cell::new("TOP", polygons, vec![]));
        Document::build(Units::default(), cells).unwrap()
    }

    #[test]
    fn s1_nine_tiles_cover_a_ten_by_ten_grid_at_tile_40() {
        let doc = grid_document();
        let config = RenderConfig::builder().tile_size(40.0).build();
        let mut renderer = Renderer::new(RecordingSceneHost::new(), config, 800.0, 600.0);
        let mut options = RenderOptions::new(0, 1000, FillMode::Fill);
        options.layer_visibility.insert(Layer::new(1, 0), true);

        let report = renderer.render_document(doc, options, None).unwrap();
        assert_eq!(report.total_rendered, 100);
        assert_eq!(report.tiles_created, 9);
        assert!(report.warning.is_none());

        let hits = renderer.spatial_index.query(BoundingBox::new(5.0, 5.0, 35.0, 35.0));
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn s3_budget_of_fifty_emits_exactly_fifty_and_warns() {
        let doc = grid_document();
        let mut renderer = Renderer::new(RecordingSceneHost::new(), RenderConfig::default(), 800.0, 600.0);
        let mut options = RenderOptions::new(0, 50, FillMode::Fill);
        options.layer_visibility.insert(Layer::new(1, 0), true);

        let report = renderer.render_document(doc, options, None).unwrap();
        assert_eq!(report.total_rendered, 50);
        assert_eq!(report.warning, Some(RenderWarning::BudgetExhausted));
        assert_eq!(renderer.performance_metrics().total_polygons, 50);
    }

    #[test]
    fn s2_rotated_instance_polygon_lands_on_expected_world_points() {
        let layer = Layer::new(1, 0);
        let mut cells = std::collections::HashMap::new();
        cells.insert("C".into(), Cell::new("C", vec![rect(layer, 0.0, 0.0, 10.0, 10.0)], vec![]));
        cells.insert("T".into(), Cell::new("T", vec![], vec![Instance::new("C", 1000.0, 1000.0).with_rotation_deg(90.0)]));
        let doc = Document::build(Units::default(), cells).unwrap();

        let mut renderer = Renderer::new(RecordingSceneHost::new(), RenderConfig::default(), 800.0, 600.0);
        let mut options = RenderOptions::new(2, 1000, FillMode::Fill);
        options.layer_visibility.insert(layer, true);
        renderer.render_document(doc, options, None).unwrap();

        let drawn: Vec<_> = renderer.host().groups.values().flatten().collect();
        assert_eq!(drawn.len(), 1);
        let mut points = drawn[0].world_points.clone();
        points.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let mut expected = vec![(1000.0, 1000.0), (1000.0, 1010.0), (990.0, 1000.0), (990.0, 1010.0)];
        expected.sort_by(|a, b| a.partial_cmp(b).unwrap());
        for (p, e) in points.iter().zip(expected.iter()) {
            assert!((p.0 - e.0).abs() < 1.0e-6 && (p.1 - e.1).abs() < 1.0e-6);
        }
    }

    #[test]
    fn context_info_cells_are_not_descended_during_render() {
        let layer = Layer::new(1, 0);
        let mut cells = std::collections::HashMap::new();
        cells.insert("LEAF".into(), Cell::new("LEAF", vec![rect(layer, 0.0, 0.0, 1.0, 1.0)], vec![]));
        cells.insert(
            "LIB_CONTEXT_INFO".into(),
            Cell::new("LIB_CONTEXT_INFO", vec![rect(layer, 5.0, 5.0, 6.0, 6.0)], vec![Instance::new("LEAF", 0.0, 0.0)]),
        );
        cells.insert("T".into(), Cell::new("T", vec![], vec![Instance::new("LIB_CONTEXT_INFO", 0.0, 0.0)]));
        let doc = Document::build(Units::default(), cells).unwrap();

        let mut renderer = Renderer::new(RecordingSceneHost::new(), RenderConfig::default(), 800.0, 600.0);
        let mut options = RenderOptions::new(10, 1000, FillMode::Fill);
        options.layer_visibility.insert(layer, true);
        let report = renderer.render_document(doc, options, None).unwrap();
        assert_eq!(report.total_rendered, 1);
    }

    #[test]
    fn rerender_requests_merge_layers_only_into_full_depth_change() {
        let mut renderer = Renderer::new(RecordingSceneHost::new(), RenderConfig::default(), 800.0, 600.0);
        renderer.queue_rerender(RerenderRequest::LayersOnly(vec![Layer::new(1, 0)]));
        renderer.queue_rerender(RerenderRequest::FullDepthChange(4));
        assert_eq!(renderer.pending_rerender(), Some(&RerenderRequest::FullDepthChange(4)));
    }

    #[test]
    fn s4_zooming_from_one_to_eight_triggers_a_depth_increase() {
        use std::collections::HashMap as StdHashMap;

        let layer = Layer::new(1, 0);
        let mut child_polygons = Vec::with_capacity(1000);
        for i in 0..1000 {
            let x0 = (i * 2) as f64;
            child_polygons.push(rect(layer, x0, 0.0, x0 + 1.0, 1.0));
        }
        let mut cells = StdHashMap::new();
        cells.insert("CHILD".into(), Cell::new("CHILD", child_polygons, vec![]));
        let top_polygons = (0..10).map(|i| rect(layer, i as f64, 100.0, i as f64 + 1.0, 101.0)).collect();
        let instances = vec![
            Instance::new("CHILD", 0.0, 0.0),
            Instance::new("CHILD", 5000.0, 0.0),
            Instance::new("CHILD", 10_000.0, 0.0),
        ];
        cells.insert("TOP".into(), Cell::new("TOP", top_polygons, instances));
        let doc = Document::build(Units::default(), cells).unwrap();

        let mut renderer = Renderer::new(RecordingSceneHost::new(), RenderConfig::default(), 800.0, 600.0);
        let mut options = RenderOptions::new(10, 100_000, FillMode::Fill);
        options.layer_visibility.insert(layer, true);
        options.override_scale = Some(1.0);
        renderer.render_document(doc, options, None).unwrap();
        renderer.set_viewport_state(ViewportState { tx: 0.0, ty: 0.0, s: 1.0 });

        let depth_before = renderer.performance_metrics().current_depth;
        let triggered = renderer.set_viewport_state(ViewportState { tx: 0.0, ty: 0.0, s: 8.0 });
        assert!(triggered);
        let new_depth = renderer.check_and_trigger_rerender(0.1);
        assert!(new_depth.is_some());
        assert!(new_depth.unwrap() > depth_before);
    }

    #[test]
    fn s5_hiding_a_layer_then_showing_it_restores_visibility_without_new_tiles() {
        let layer_a = Layer::new(1, 0);
        let layer_b = Layer::new(2, 0);
        let mut polygons = vec![rect(layer_b, 0.0, 0.0, 10.0, 10.0)];
        for gx in 0..5 {
            let x0 = (gx * 20) as f64;
            polygons.push(rect(layer_a, x0, 0.0, x0 + 10.0, 10.0));
        }
        let mut cells = std::collections::HashMap::new();
        cells.insert("TOP".into(), Cell::new("TOP", polygons, vec![]));
        let doc = Document::build(Units::default(), cells).unwrap();

        let mut renderer = Renderer::new(RecordingSceneHost::new(), RenderConfig::default(), 800.0, 600.0);
        let mut options = RenderOptions::new(0, 1000, FillMode::Fill);
        options.layer_visibility.insert(layer_a, true);
        options.layer_visibility.insert(layer_b, true);
        renderer.render_document(doc, options, None).unwrap();
        let tiles_before = renderer.tiles.len();

        let mut hidden = HashMap::new();
        hidden.insert(layer_a, false);
        hidden.insert(layer_b, true);
        renderer.on_layer_visibility_changed(hidden);
        assert!(renderer.pending_rerender().is_none());

        // panning while layer_a is hidden never surfaces its polygons,
        // since culling filters on `layer_visibility` directly.
        renderer.viewport.tx = 40.0;
        assert_eq!(renderer.update_visibility(), 1);

        let mut shown = HashMap::new();
        shown.insert(layer_a, true);
        shown.insert(layer_b, true);
        renderer.on_layer_visibility_changed(shown);
        // tiles for layer_a already existed from the initial render, so no
        // incremental re-render is queued on re-show.
        assert!(renderer.pending_rerender().is_none());
        assert_eq!(renderer.tiles.len(), tiles_before);
    }

    #[test]
    fn toggle_grid_flips_visibility_and_requests_an_overlay_redraw() {
        let mut renderer = Renderer::new(RecordingSceneHost::new(), RenderConfig::default(), 800.0, 600.0);
        assert!(renderer.grid_visible());
        assert!(!renderer.toggle_grid());
        assert!(!renderer.grid_visible());
        assert!(renderer.poll_overlay_redraw(0.0));
    }

    #[test]
    fn overlay_redraw_is_debounced_across_viewport_changes() {
        let config = RenderConfig::builder().overlay_debounce_ms(50.0).build();
        let mut renderer = Renderer::new(RecordingSceneHost::new(), config, 800.0, 600.0);

        renderer.set_viewport_center(10.0, 10.0);
        assert!(renderer.poll_overlay_redraw(0.0), "first request fires immediately");
        renderer.set_viewport_center(20.0, 20.0);
        assert!(!renderer.poll_overlay_redraw(10.0), "interval hasn't elapsed");
        renderer.set_viewport_center(30.0, 30.0);
        assert!(renderer.poll_overlay_redraw(50.0), "latest request wins once the interval elapses");
    }

    #[test]
    fn grid_spacing_and_scale_bar_track_the_current_viewport_width() {
        let doc = grid_document();
        let mut renderer = Renderer::new(RecordingSceneHost::new(), RenderConfig::default(), 800.0, 600.0);
        let mut options = RenderOptions::new(0, 1000, FillMode::Fill);
        options.layer_visibility.insert(Layer::new(1, 0), true);
        renderer.render_document(doc, options, None).unwrap();
        renderer.fit_to_view();

        assert!(renderer.grid_spacing_db() > 0.0);
        let bar = renderer.scale_bar().expect("document loaded");
        assert!(bar.length_db > 0.0);
    }
}
