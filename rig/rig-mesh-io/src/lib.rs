//! Mesh file I/O for the rigging pipeline.
//!
//! This crate reads triangle meshes from five ASCII formats:
//!
//! - **OBJ** (Wavefront) - `v`/`f` records, faces triangulated as a fan
//! - **PLY** (ASCII subset) - header through `end_header`, then vertices and faces
//! - **OFF** - count header, vertices, faces
//! - **GTS** - vertices, edge list, faces referencing edges
//! - **STL** (ASCII) - `facet`/`vertex` records with exact-match vertex deduplication
//!
//! Each reader produces the same raw soup - a vertex list and a triangle
//! list - which is handed to [`rig_mesh::Mesh::from_soup`] for topology
//! construction and validation. Formats that use a different axis convention
//! (PLY, GTS, STL) are permuted into the internal one on read.
//!
//! Comment lines starting with `#` and blank lines are ignored in every
//! format. Any malformed record aborts the read with an error naming the
//! line; there is no partial output.
//!
//! # Example
//!
//! ```no_run
//! use rig_mesh_io::load_mesh;
//!
//! let mesh = load_mesh("character.obj").unwrap();
//! println!("{} vertices", mesh.vertex_count());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod error;
mod gts;
mod obj;
mod off;
mod ply;
mod stl;

pub use error::{IoError, IoResult};
pub use gts::read_gts;
pub use obj::{read_obj, write_obj};
pub use off::read_off;
pub use ply::read_ply;
pub use stl::read_stl;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use nalgebra::Point3;
use rig_mesh::Mesh;
use tracing::info;

/// Raw triangle soup produced by every reader: positions and vertex-index
/// triples, before any topology construction.
pub type Soup = (Vec<Point3<f64>>, Vec<[u32; 3]>);

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshFormat {
    /// Wavefront OBJ.
    Obj,
    /// Polygon File Format (ASCII subset).
    Ply,
    /// Object File Format.
    Off,
    /// GNU Triangulated Surface.
    Gts,
    /// Stereolithography (ASCII).
    Stl,
}

impl MeshFormat {
    /// Detect the format from a file extension.
    ///
    /// Returns `None` when the extension is missing or unrecognized.
    #[must_use]
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "obj" => Some(Self::Obj),
            "ply" => Some(Self::Ply),
            "off" => Some(Self::Off),
            "gts" => Some(Self::Gts),
            "stl" => Some(Self::Stl),
            _ => None,
        }
    }
}

/// Load a mesh from a file, detecting the format from the extension.
///
/// The raw soup is validated and assembled into a half-edge mesh; a file
/// that parses but does not describe a closed orientable manifold is
/// rejected here as well.
///
/// # Errors
///
/// Returns an error if the extension is unknown, the file cannot be read,
/// a record is malformed, or topology construction fails.
pub fn load_mesh<P: AsRef<Path>>(path: P) -> IoResult<Mesh> {
    let path = path.as_ref();
    let format = MeshFormat::from_path(path).ok_or_else(|| IoError::UnknownFormat {
        extension: path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("(none)")
            .to_string(),
    })?;

    let reader = BufReader::new(File::open(path)?);
    let (positions, triangles) = match format {
        MeshFormat::Obj => read_obj(reader)?,
        MeshFormat::Ply => read_ply(reader)?,
        MeshFormat::Off => read_off(reader)?,
        MeshFormat::Gts => read_gts(reader)?,
        MeshFormat::Stl => read_stl(reader)?,
    };

    let mesh = Mesh::from_soup(positions, triangles)?;
    info!(
        path = %path.display(),
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        "loaded mesh"
    );
    Ok(mesh)
}

/// Split a line into whitespace-delimited words, dropping comments.
///
/// Returns `None` for blank lines and lines whose first word starts with `#`.
pub(crate) fn words(line: &str) -> Option<Vec<&str>> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    match fields.first() {
        None => None,
        Some(first) if first.starts_with('#') => None,
        Some(_) => Some(fields),
    }
}

pub(crate) fn parse_f64(token: &str, line: usize) -> IoResult<f64> {
    token
        .parse::<f64>()
        .map_err(|_| IoError::parse(line, format!("bad numeric token `{token}`")))
}

pub(crate) fn parse_index(token: &str, line: usize) -> IoResult<i64> {
    token
        .parse::<i64>()
        .map_err(|_| IoError::parse(line, format!("bad index token `{token}`")))
}
