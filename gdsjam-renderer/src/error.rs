/// Error categories for the small set of truly-fatal renderer conditions.
/// Recoverable conditions (dangling refs, budget exhaustion, an
/// unparsable color, a locked viewport, a superseded re-render) are
/// reported as data — see [`crate::renderer::RenderWarning`] and
/// [`crate::renderer::RenderReport`] — never as an `Err`.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Failed to retrieve a DOM element or the 2D rendering context.
    #[error("Initialization error: {0}")]
    Initialization(String),

    /// Resource creation/management errors in the scene host.
    #[error("Resource error: {0}")]
    Resource(String),

    /// A `RenderConfig`/`RenderOptions` value failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub fn window_not_found() -> Self {
        Self::Initialization("Unable to retrieve window".to_string())
    }

    pub fn document_not_found() -> Self {
        Self::Initialization("Unable to retrieve document".to_string())
    }

    pub fn canvas_not_found() -> Self {
        Self::Initialization("Unable to retrieve canvas".to_string())
    }

    pub fn canvas_context_failed() -> Self {
        Self::Initialization("Failed to retrieve 2D canvas rendering context".to_string())
    }

    pub fn group_creation_failed() -> Self {
        Self::Resource("Failed to allocate a scene graph group".to_string())
    }

    pub fn zero_polygon_budget() -> Self {
        Self::InvalidConfig("max_polygons_per_render must be greater than zero".to_string())
    }

    pub fn zero_max_depth() -> Self {
        Self::InvalidConfig("max_depth must be greater than zero".to_string())
    }
}
