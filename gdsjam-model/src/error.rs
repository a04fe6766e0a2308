/// Errors produced while building or validating a [`crate::Document`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("document has no cells")]
    EmptyDocument,

    #[error("document has no top-level cells (every cell is referenced by another)")]
    NoTopCells,

    #[error("polygon has fewer than 3 points")]
    DegeneratePolygon,

    #[error("cell {0:?} references unknown cell {1:?}")]
    UnknownCellRef(compact_str::CompactString, compact_str::CompactString),

    #[error("cell {0:?} is part of an instance reference cycle")]
    CyclicReference(compact_str::CompactString),
}
