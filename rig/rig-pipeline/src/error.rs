//! Pipeline-level error type.

use thiserror::Error;

/// Result type for pipeline operations.
pub type RigResult<T> = Result<T, RigError>;

/// A failure in any stage of the rigging pipeline.
///
/// Every stage failure surfaces as a distinct variant; nothing is masked
/// and nothing is retried.
#[derive(Debug, Error)]
pub enum RigError {
    /// The mesh is not a closed orientable manifold.
    #[error("mesh failed validation: {0}")]
    Topology(#[from] rig_mesh::MeshError),

    /// The mesh is not connected.
    #[error("mesh is not connected")]
    NotConnected,

    /// Sphere packing or the embedding search failed.
    #[error("embedding failed: {0}")]
    Embedding(#[from] rig_embed::EmbedError),

    /// The attachment solve failed.
    #[error("attachment failed: {0}")]
    Attachment(#[from] rig_attach::AttachError),

    /// Writing an output file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
