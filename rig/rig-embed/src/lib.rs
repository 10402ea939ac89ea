//! Skeleton embedding for automatic rigging.
//!
//! Places a template skeleton inside a character mesh in three steps:
//!
//! 1. [`pack_spheres`] - greedy largest-first packing of the mesh interior
//!    with non-overlapping spheres found on the deep interior (medial) set
//!    of the signed distance field
//! 2. [`SphereGraph`] + [`discrete_embedding`] - sphere centers become
//!    candidate joint sites in a proximity graph; reduced-skeleton joints
//!    are assigned to graph vertices by a branch-and-bound search over a
//!    cost combining bone length, orientation, symmetry, feet, fat, and
//!    interior visibility
//! 3. [`refine_embedding`] - bounded local descent on a smooth version of
//!    the same cost, with visibility replaced by an exponential
//!    surface-proximity barrier
//!
//! The discrete result is expanded from the reduced skeleton back to the
//! full joint set with [`expand_to_full`], interpolating collapsed chain
//! joints along their bone by the recorded length fractions.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod discrete;
mod error;
mod graph;
mod packing;
mod refine;

pub use discrete::{discrete_embedding, expand_to_full};
pub use error::{EmbedError, EmbedResult};
pub use graph::SphereGraph;
pub use packing::{pack_spheres, PackedSphere};
pub use refine::refine_embedding;

/// Weights and constants for the embedding cost terms.
///
/// The defaults are tuned for meshes normalized into the unit box and
/// skeletons built by `rig-skeleton` (which live in `[-0.5, 0.5]` scaled by
/// the driver).
#[derive(Debug, Clone)]
pub struct EmbedParams {
    /// Weight of the squared bone-length deviation (normalized by total
    /// skeleton length).
    pub length_weight: f64,
    /// Weight of the squared angular deviation from template bone
    /// directions.
    pub orientation_weight: f64,
    /// Weight of the squared distance between symmetric joints after
    /// reflection across the sagittal plane `x = 0.5`.
    pub symmetry_weight: f64,
    /// Weight of the vertical coordinate of joints flagged as feet.
    pub feet_weight: f64,
    /// Weight of the (negated) sphere radius at joints flagged as fat.
    pub fat_weight: f64,
    /// Smallest sphere worth packing.
    pub min_sphere_radius: f64,
    /// Additive slack when connecting nearly touching spheres.
    pub sphere_slack: f64,
    /// Sharpness of the exponential surface barrier in refinement.
    pub barrier_sharpness: f64,
    /// Samples per bone for the refinement barrier.
    pub barrier_samples: u32,
    /// Refinement iteration cap.
    pub max_refine_iterations: u32,
}

impl Default for EmbedParams {
    fn default() -> Self {
        Self {
            length_weight: 1.0,
            orientation_weight: 0.5,
            symmetry_weight: 1.0,
            feet_weight: 2.0,
            fat_weight: 1.0,
            min_sphere_radius: 0.005,
            sphere_slack: 0.001,
            barrier_sharpness: 500.0,
            barrier_samples: 10,
            max_refine_iterations: 200,
        }
    }
}
