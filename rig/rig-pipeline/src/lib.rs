//! The automatic rigging pipeline.
//!
//! Chains the stages leaf-first, each one fully owning its intermediate
//! data and releasing it when the next stage's output exists:
//!
//! 1. mesh validation (integrity + connectivity)
//! 2. signed distance field
//! 3. sphere packing and the sphere proximity graph
//! 4. discrete embedding, continuous refinement, full-skeleton expansion
//! 5. heat-based attachment
//!
//! [`rig`] runs the whole chain; [`rig_with_given_embedding`] skips the
//! fitting stages and attaches against the skeleton's template positions
//! mapped into the mesh's normalized frame (the `--no-fit` path). The
//! returned [`RigOutput`] outlives the pipeline and feeds the deformer.
//!
//! Persisted outputs follow the classic two-file form:
//! `skeleton.out` (one `index x y z parent` row per joint, in the original
//! mesh frame) and `attachment.out` (one row of per-bone weights per
//! vertex, rounded to four decimals).

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod error;
mod output;
mod pipeline;

pub use error::{RigError, RigResult};
pub use output::{write_attachment_out, write_skeleton_out};
pub use pipeline::{rig, rig_with_given_embedding, RigOutput};
