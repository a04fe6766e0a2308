use gdsjam_model::Color;
use hashbrown::HashMap;

/// How a polygon is painted: filled with alpha in fill mode, or stroked at a
/// fixed world-space width in outline mode (so strokes stay ~2 screen pixels
/// regardless of the current zoom once the host scales by the viewport).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PaintStyle {
    Fill { alpha: f32 },
    Stroke { width_db: f64 },
}

/// A single polygon queued for drawing, in world (database-unit) space. The
/// host is responsible for projecting through the current viewport.
#[derive(Debug, Clone)]
pub struct PolygonDraw {
    pub world_points: Vec<(f64, f64)>,
    pub color: Color,
    pub style: PaintStyle,
}

/// Opaque handle to a group of draw commands — one per rendered tile,
/// mirroring [`crate::tile::RenderedTile`]'s ownership of a draw handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupHandle(pub u32);

/// A backend-agnostic retained 2-D scene graph: the host the renderer
/// builds a draw list against, generalizing the teacher's single-drawable
/// `prepare`/`draw`/`cleanup` trait into "a host that owns many groups."
pub trait SceneHost {
    /// Allocates a new, empty group and returns its handle.
    fn create_group(&mut self) -> GroupHandle;

    /// Appends a polygon to a previously created group.
    fn append(&mut self, group: GroupHandle, polygon: PolygonDraw);

    /// Destroys a group and everything drawn into it.
    fn destroy_group(&mut self, group: GroupHandle);

    /// Destroys every group — used when installing a fresh document or
    /// starting a full re-render.
    fn clear(&mut self);
}

/// An in-memory [`SceneHost`] that records draw commands instead of
/// painting them; used by tests and as the model for
/// [`crate::canvas_host::Canvas2dSceneHost`].
#[derive(Debug, Default)]
pub struct RecordingSceneHost {
    next_id: u32,
    pub groups: HashMap<GroupHandle, Vec<PolygonDraw>>,
}

impl RecordingSceneHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn polygon_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

impl SceneHost for RecordingSceneHost {
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
