//! Error types for mesh construction and validation.

use thiserror::Error;

/// Result type for mesh operations.
pub type MeshResult<T> = Result<T, MeshError>;

/// Errors that can occur while building or validating a mesh.
#[derive(Debug, Error)]
pub enum MeshError {
    /// A triangle references a vertex index outside the vertex array.
    #[error("invalid vertex index: {index} (mesh has {vertex_count} vertices)")]
    InvalidVertexIndex {
        /// The out-of-range index.
        index: u32,
        /// Total number of vertices.
        vertex_count: usize,
    },

    /// Two triangles share the same directed edge, so the surface is not
    /// orientable-manifold.
    #[error("duplicate directed edge from {from} to {to}")]
    DuplicateDirectedEdge {
        /// Source vertex of the repeated half-edge.
        from: u32,
        /// Target vertex of the repeated half-edge.
        to: u32,
    },

    /// A connectivity invariant does not hold.
    #[error("mesh integrity error: {predicate}")]
    IntegrityViolation {
        /// The violated predicate, as written in the check.
        predicate: &'static str,
    },

    /// The mesh has no triangles at all.
    #[error("mesh is empty")]
    Empty,
}
