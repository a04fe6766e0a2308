mod debounce;
mod index;
mod lod;
mod viewport;
mod zoom;

pub use debounce::Debouncer;
pub use index::{IndexedItem, ItemId, SpatialIndex};
pub use lod::{FillMode, LodController, HIERARCHICAL_POLYGON_THRESHOLD, MAX_DEPTH, ZOOM_BAND};
pub use viewport::{detect_newly_visible_layers, update_visibility, CullItem, Viewport};
pub use zoom::{clamp_zoom_scale, ZoomLimits};
