mod canvas_host;
mod error;
pub(crate) mod js;
mod log;
mod minimap;
mod overlays;
mod renderer;
mod scene;
mod tile;
mod wasm;

pub use gdsjam_core::FillMode;

pub use crate::{
    canvas_host::Canvas2dSceneHost,
    error::Error,
    minimap::{Minimap, ParticipantViewport},
    overlays::{compute_scale_bar, format_coordinate_readout, grid_spacing_db, ScaleBar},
    renderer::{
        PerformanceMetrics, RenderConfig, RenderConfigBuilder, RenderOptions, RenderReport, RenderWarning, Renderer,
        RerenderRequest, ViewportState,
    },
    scene::{GroupHandle, PaintStyle, PolygonDraw, RecordingSceneHost, SceneHost},
    tile::{RenderedTile, TileKey, DEFAULT_TILE_SIZE_DB},
    wasm::{GdsDocument, GdsDocumentBuilder, GdsMinimap, GdsViewer},
};
