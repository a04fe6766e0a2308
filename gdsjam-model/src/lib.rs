mod cell;
mod color;
mod document;
mod error;
mod geometry;
mod instance;
mod layer;
mod polygon;
mod units;

pub use cell::Cell;
pub use color::{layer_color, Color, DEFAULT_COLOR};
pub use document::{walk_hierarchy, Document, FlattenStats, FlattenedPolygon, HierarchyVisitor};
pub use error::ModelError;
pub use geometry::{transform_bbox_corners, Affine2, BoundingBox, Point};
pub use instance::{Instance, Transform2D};
pub use layer::{LayerInfo, LayerKey, ParseLayerKeyError};
pub use polygon::Polygon;
pub use units::Units;
