//! Error types for attachment computation.

use thiserror::Error;

/// Result type for attachment operations.
pub type AttachResult<T> = Result<T, AttachError>;

/// Errors that can occur while computing or applying an attachment.
#[derive(Debug, Error)]
pub enum AttachError {
    /// The embedding does not cover the skeleton's joints.
    #[error("embedding has {got} positions, skeleton has {expected} joints")]
    EmbeddingMismatch {
        /// Joint count of the skeleton.
        expected: usize,
        /// Position count supplied.
        got: usize,
    },

    /// The heat system could not be factored or solved.
    #[error("heat system failed: {0}")]
    Solver(#[from] rig_solver::SolveError),

    /// A vertex received no weight from any bone.
    #[error("vertex {vertex} is influenced by no bone")]
    NoInfluence {
        /// The uncovered vertex.
        vertex: usize,
    },

    /// The mesh being deformed does not match the attachment.
    #[error("mesh has {got} vertices, attachment was built for {expected}")]
    MeshMismatch {
        /// Vertex count the attachment was built for.
        expected: usize,
        /// Vertex count of the mesh being deformed.
        got: usize,
    },

    /// Wrong number of bone transforms supplied to `deform`.
    #[error("got {got} transforms for {expected} bones")]
    TransformCount {
        /// Bone count of the attachment.
        expected: usize,
        /// Transform count supplied.
        got: usize,
    },
}
