//! Wavefront OBJ reading and writing.
//!
//! Only `v` and `f` records are interpreted; everything else (`vt`, `vn`,
//! `g`, `usemtl`, ...) is skipped. Faces use 1-based indices and polygons
//! with more than three vertices are triangulated as a fan around the first
//! vertex.

use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use nalgebra::Point3;
use rig_mesh::Mesh;

use crate::error::{IoError, IoResult};
use crate::{parse_f64, parse_index, words, Soup};

/// Maximum number of vertices accepted in a single `f` record.
const MAX_FACE_VERTICES: usize = 14;

/// Read an OBJ mesh from a buffered reader.
///
/// # Errors
///
/// Returns an error on a malformed `v` or `f` record, or if the file
/// contains no faces.
pub fn read_obj<R: BufRead>(reader: R) -> IoResult<Soup> {
    let mut positions: Vec<Point3<f64>> = Vec::new();
    let mut triangles: Vec<[u32; 3]> = Vec::new();

    for (line_index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_num = line_index + 1;
        let Some(fields) = words(&line) else {
            continue;
        };

        match fields[0] {
            "v" => {
                if fields.len() != 4 {
                    return Err(IoError::parse(line_num, "expected `v x y z`"));
                }
                let x = parse_f64(fields[1], line_num)?;
                let y = parse_f64(fields[2], line_num)?;
                let z = parse_f64(fields[3], line_num)?;
                positions.push(Point3::new(x, y, z));
            }
            "f" => {
                let count = fields.len() - 1;
                if !(3..=MAX_FACE_VERTICES).contains(&count) {
                    return Err(IoError::parse(
                        line_num,
                        format!("face with {count} vertices"),
                    ));
                }
                let mut indices = [0u32; MAX_FACE_VERTICES];
                for (slot, token) in indices.iter_mut().zip(&fields[1..]) {
                    // `f v/vt/vn` style records reference the vertex before
                    // the first slash.
                    let vertex_token = token.split('/').next().unwrap_or(token);
                    let raw = parse_index(vertex_token, line_num)?;
                    if raw < 1 {
                        return Err(IoError::parse(line_num, format!("face index {raw}")));
                    }
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    {
                        *slot = (raw - 1) as u32;
                    }
                }
                // fan triangulation around the first vertex
                for j in 2..count {
                    triangles.push([indices[0], indices[j - 1], indices[j]]);
                }
            }
            _ => {} // unrecognized record
        }
    }

    if triangles.is_empty() {
        return Err(IoError::NoGeometry);
    }
    Ok((positions, triangles))
}

/// Write a mesh as OBJ.
///
/// Positions are printed with shortest round-trip formatting, so re-reading
/// the file reproduces them exactly.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_obj<P: AsRef<Path>>(mesh: &Mesh, path: P) -> IoResult<()> {
    let mut out = BufWriter::new(std::fs::File::create(path)?);

    for v in &mesh.vertices {
        writeln!(out, "v {} {} {}", v.position.x, v.position.y, v.position.z)?;
    }
    for [a, b, c] in mesh.triangles() {
        writeln!(out, "f {} {} {}", a + 1, b + 1, c + 1)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_vertices_and_fan_faces() {
        let src = "\
# a quad split into two triangles by the fan
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
f 1 2 3 4
";
        let (positions, triangles) = read_obj(Cursor::new(src)).unwrap();
        assert_eq!(positions.len(), 4);
        assert_eq!(triangles, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn skips_unknown_records() {
        let src = "\
vn 0 0 1
vt 0.5 0.5
v 0 0 0
v 1 0 0
v 0 1 0
f 1/1/1 2/2/2 3/3/3
";
        let (positions, triangles) = read_obj(Cursor::new(src)).unwrap();
        assert_eq!(positions.len(), 3);
        assert_eq!(triangles, vec![[0, 1, 2]]);
    }

    #[test]
    fn malformed_vertex_aborts() {
        let src = "v 0 0\nf 1 2 3\n";
        assert!(matches!(
            read_obj(Cursor::new(src)),
            Err(IoError::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn bad_numeric_token_aborts() {
        let src = "v 0 zero 0\n";
        assert!(read_obj(Cursor::new(src)).is_err());
    }
}
