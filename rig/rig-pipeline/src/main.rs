//! Command-line automatic rigging.
//!
//! Loads a character mesh, fits a template skeleton inside it, computes
//! heat-based skinning weights, and writes `skeleton.out` and
//! `attachment.out` next to the working directory.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use nalgebra::{UnitQuaternion, Vector3};
use rig_mesh_io::load_mesh;
use rig_pipeline::{rig, rig_with_given_embedding, write_attachment_out, write_skeleton_out};
use rig_skeleton::Skeleton;
use tracing::info;

/// Automatic rigging: skeleton embedding plus skinning weights.
#[derive(Parser)]
#[command(name = "rig")]
#[command(about = "Embed a template skeleton in a character mesh and compute skinning weights")]
#[command(version)]
struct Cli {
    /// Mesh file (.obj, .ply, .off, .gts, or .stl)
    mesh: PathBuf,

    /// Skeleton: a built-in name (human, quad, horse, centaur) or a
    /// skeleton file path
    #[arg(long, default_value = "human")]
    skel: String,

    /// Rotation applied to the mesh before fitting, as `x,y,z,deg`
    /// (axis and angle); may be repeated
    #[arg(long = "rot", value_name = "X,Y,Z,DEG")]
    rotations: Vec<String>,

    /// Uniform scale applied to the template skeleton
    #[arg(long, default_value_t = 1.0)]
    scale: f64,

    /// Stop after loading and normalizing the mesh
    #[arg(long)]
    mesh_only: bool,

    /// Stop after packing the interior with spheres
    #[arg(long)]
    circles_only: bool,

    /// Skip fitting and attach against the skeleton as given
    #[arg(long)]
    no_fit: bool,
}

fn parse_rotation(spec: &str) -> Result<UnitQuaternion<f64>> {
    let parts: Vec<&str> = spec.split(',').collect();
    if parts.len() != 4 {
        bail!("rotation must be `x,y,z,deg`, got `{spec}`");
    }
    let nums: Vec<f64> = parts
        .iter()
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .with_context(|| format!("bad rotation `{spec}`"))?;
    let axis = Vector3::new(nums[0], nums[1], nums[2]);
    let Some(axis) = nalgebra::Unit::try_new(axis, 1e-12) else {
        bail!("rotation axis must be nonzero");
    };
    Ok(UnitQuaternion::from_axis_angle(&axis, nums[3].to_radians()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut mesh = load_mesh(&cli.mesh)
        .with_context(|| format!("reading mesh {}", cli.mesh.display()))?;

    for spec in &cli.rotations {
        let rotation = parse_rotation(spec)?;
        mesh.apply_rotation(&rotation);
    }
    mesh.normalize_bounding_box();
    mesh.compute_vertex_normals();

    if cli.mesh_only {
        info!(
            vertices = mesh.vertex_count(),
            triangles = mesh.triangle_count(),
            "mesh loaded; stopping as requested"
        );
        return Ok(());
    }

    let skeleton = match Skeleton::builtin(&cli.skel) {
        Some(s) => s,
        None => Skeleton::from_file(&cli.skel)
            .with_context(|| format!("reading skeleton {}", cli.skel))?,
    };

    if cli.circles_only {
        let field = rig_field::DistanceField::build(&mesh);
        let spheres = rig_embed::pack_spheres(&field, &rig_embed::EmbedParams::default());
        info!(spheres = spheres.len(), "packed spheres; stopping as requested");
        return Ok(());
    }

    let output = if cli.no_fit {
        rig_with_given_embedding(&skeleton, &mesh)?
    } else {
        let mut fitted = skeleton.clone();
        fitted.scale(cli.scale * 0.7);
        rig(&fitted, &mesh)?
    };

    write_skeleton_out("skeleton.out", &mesh, &skeleton, &output.embedding)?;
    write_attachment_out("attachment.out", &output.attachment)?;
    info!("wrote skeleton.out and attachment.out");

    Ok(())
}
