//! Error types for skeleton embedding.

use thiserror::Error;

/// Result type for embedding operations.
pub type EmbedResult<T> = Result<T, EmbedError>;

/// Errors that can occur during sphere packing and embedding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EmbedError {
    /// The mesh interior admitted no spheres at all.
    #[error("mesh interior is empty: no spheres could be packed")]
    EmptyPacking,

    /// The skeleton has no bones to embed.
    #[error("skeleton has no bones")]
    DegenerateSkeleton,

    /// No joint assignment satisfies the visibility requirement.
    #[error("no discrete embedding satisfies interior visibility")]
    NoEmbedding,
}
