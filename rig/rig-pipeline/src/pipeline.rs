//! The single-pass pipeline driver.

use nalgebra::Point3;
use rig_attach::{Attachment, DEFAULT_HEAT_WEIGHT};
use rig_embed::{
    discrete_embedding, expand_to_full, pack_spheres, refine_embedding, EmbedError, EmbedParams,
    SphereGraph,
};
use rig_field::{DistanceField, VisibilityTester};
use rig_mesh::Mesh;
use rig_skeleton::Skeleton;
use tracing::info;

use crate::error::{RigError, RigResult};

/// The pipeline's result: joint positions in the normalized mesh frame plus
/// the per-vertex bone weights.
#[derive(Debug, Clone)]
pub struct RigOutput {
    /// One position per full-skeleton joint.
    pub embedding: Vec<Point3<f64>>,
    /// Skinning weights, handed on to the deformer.
    pub attachment: Attachment,
}

/// Validate the mesh for rigging: integrity plus connectivity.
fn validate(mesh: &Mesh) -> RigResult<()> {
    mesh.integrity_check()?;
    if !mesh.is_connected() {
        return Err(RigError::NotConnected);
    }
    Ok(())
}

/// Fit a skeleton inside a mesh and compute skinning weights.
///
/// The mesh must already be normalized into the unit box
/// ([`Mesh::normalize_bounding_box`]); the skeleton is used as the fitting
/// template, typically pre-scaled by the driver.
///
/// # Errors
///
/// Returns an error when the mesh fails validation, no embedding satisfies
/// interior visibility, or the attachment solve fails.
pub fn rig(skeleton: &Skeleton, mesh: &Mesh) -> RigResult<RigOutput> {
    validate(mesh)?;

    let params = EmbedParams::default();

    info!("building distance field");
    let field = DistanceField::build(mesh);

    info!("packing spheres");
    let spheres = pack_spheres(&field, &params);
    if spheres.is_empty() {
        return Err(RigError::Embedding(EmbedError::EmptyPacking));
    }
    let graph = SphereGraph::connect(spheres, &field, &params);
    let tester = VisibilityTester::new(&field);

    info!("embedding skeleton");
    let reduced = discrete_embedding(skeleton, &graph, &tester, &params)?;
    drop(graph); // the refinement works on the field alone

    let reduced = refine_embedding(skeleton, &field, &reduced, &params);
    let embedding = expand_to_full(skeleton, &reduced);

    info!("computing attachment");
    let attachment = Attachment::new(mesh, skeleton, &embedding, &tester, DEFAULT_HEAT_WEIGHT)?;

    Ok(RigOutput {
        embedding,
        attachment,
    })
}

/// Attach against the skeleton's template positions without fitting.
///
/// The template joints (given in the original mesh frame) are mapped
/// through the mesh's recorded normalization; only the distance field
/// needed by the attachment's visibility test is built.
///
/// # Errors
///
/// Returns an error when the mesh fails validation or the attachment solve
/// fails.
pub fn rig_with_given_embedding(skeleton: &Skeleton, mesh: &Mesh) -> RigResult<RigOutput> {
    validate(mesh)?;

    let embedding: Vec<Point3<f64>> = skeleton
        .full_positions()
        .iter()
        .map(|&p| mesh.from_original_frame(p))
        .collect();

    let field = DistanceField::build(mesh);
    let tester = VisibilityTester::new(&field);
    let attachment = Attachment::new(mesh, skeleton, &embedding, &tester, DEFAULT_HEAT_WEIGHT)?;

    Ok(RigOutput {
        embedding,
        attachment,
    })
}
