//! Persisted pipeline outputs.

use std::io::{BufWriter, Write};
use std::path::Path;

use nalgebra::Point3;
use rig_attach::Attachment;
use rig_mesh::Mesh;
use rig_skeleton::Skeleton;

use crate::error::RigResult;

/// Write the embedded skeleton as `index x y z parent` rows.
///
/// Positions are mapped back through the mesh's recorded normalization into
/// the original input frame; the parent column uses full-skeleton indices
/// with −1 for the root.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_skeleton_out<P: AsRef<Path>>(
    path: P,
    mesh: &Mesh,
    skeleton: &Skeleton,
    embedding: &[Point3<f64>],
) -> RigResult<()> {
    let mut out = BufWriter::new(std::fs::File::create(path)?);
    for (i, &p) in embedding.iter().enumerate() {
        let original = mesh.to_original_frame(p);
        writeln!(
            out,
            "{i} {} {} {} {}",
            original.x,
            original.y,
            original.z,
            skeleton.full_parent()[i]
        )?;
    }
    out.flush()?;
    Ok(())
}

/// Write the attachment as one row of per-bone weights per vertex, each
/// weight rounded to four decimal places.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_attachment_out<P: AsRef<Path>>(path: P, attachment: &Attachment) -> RigResult<()> {
    let mut out = BufWriter::new(std::fs::File::create(path)?);
    for i in 0..attachment.vertex_count() {
        for &w in attachment.weights(i) {
            let rounded = (w * 10000.0 + 0.5).floor() / 10000.0;
            write!(out, "{rounded} ")?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}
