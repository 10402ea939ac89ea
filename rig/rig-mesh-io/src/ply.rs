//! PLY (ASCII subset) reading.
//!
//! The header is scanned for a single `element vertex N` declaration and
//! ends at `end_header`. The body holds `N` vertex lines of at least three
//! floats, followed by face lines of the form `3 a b c` with 0-based
//! indices. Vertex coordinates are stored as `(-z, x, -y)` to align the
//! format's axis convention with the internal one.

use std::io::BufRead;

use nalgebra::Point3;

use crate::error::{IoError, IoResult};
use crate::{parse_f64, parse_index, words, Soup};

/// Read an ASCII PLY mesh from a buffered reader.
///
/// # Errors
///
/// Returns an error if the header lacks a vertex count, a vertex or face
/// record is malformed, or the file contains no faces.
pub fn read_ply<R: BufRead>(reader: R) -> IoResult<Soup> {
    let mut positions: Vec<Point3<f64>> = Vec::new();
    let mut triangles: Vec<[u32; 3]> = Vec::new();

    let mut in_header = true;
    let mut verts_left: i64 = -1;

    for (line_index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_num = line_index + 1;
        let Some(fields) = words(&line) else {
            continue;
        };

        if in_header {
            if fields[0] == "end_header" {
                if verts_left < 0 {
                    return Err(IoError::parse(line_num, "no vertex count in header"));
                }
                in_header = false;
                continue;
            }
            if fields.len() >= 3 && fields[0] == "element" && fields[1] == "vertex" {
                verts_left = parse_index(fields[2], line_num)?;
            }
            continue;
        }

        if verts_left > 0 {
            verts_left -= 1;
            if fields.len() < 3 {
                return Err(IoError::parse(line_num, "short vertex record"));
            }
            let x = parse_f64(fields[0], line_num)?;
            let y = parse_f64(fields[1], line_num)?;
            let z = parse_f64(fields[2], line_num)?;
            positions.push(Point3::new(-z, x, -y));
            continue;
        }

        // face record: `3 a b c`
        if fields.len() != 4 {
            return Err(IoError::parse(line_num, "expected `3 a b c` face record"));
        }
        let mut tri = [0u32; 3];
        for (slot, token) in tri.iter_mut().zip(&fields[1..]) {
            let raw = parse_index(token, line_num)?;
            if raw < 0 {
                return Err(IoError::parse(line_num, format!("face index {raw}")));
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                *slot = raw as u32;
            }
        }
        triangles.push(tri);
    }

    if triangles.is_empty() {
        return Err(IoError::NoGeometry);
    }
    Ok((positions, triangles))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_header_vertices_and_faces() {
        let src = "\
ply
format ascii 1.0
element vertex 3
property float x
property float y
property float z
element face 1
property list uchar int vertex_indices
end_header
1 2 3
4 5 6
7 8 9
3 0 1 2
";
        let (positions, triangles) = read_ply(Cursor::new(src)).unwrap();
        assert_eq!(positions.len(), 3);
        // coordinates permuted to (-z, x, -y)
        assert_eq!(positions[0], Point3::new(-3.0, 1.0, -2.0));
        assert_eq!(triangles, vec![[0, 1, 2]]);
    }

    #[test]
    fn missing_vertex_count_aborts() {
        let src = "ply\nend_header\n";
        assert!(read_ply(Cursor::new(src)).is_err());
    }
}
