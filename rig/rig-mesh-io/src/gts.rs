//! GTS (GNU Triangulated Surface) reading.
//!
//! The header line supplies vertex and edge counts. Vertex coordinates are
//! stored as `(-x, z, y)` to align the format's axis convention with the
//! internal one. The edge section lists 1-based endpoint pairs; each face
//! references three 1-based edge indices, and the face's corner vertices are
//! reconstructed as the endpoint each edge shares with the next one.

use std::io::BufRead;

use nalgebra::Point3;

use crate::error::{IoError, IoResult};
use crate::{parse_f64, parse_index, words, Soup};

/// Read a GTS mesh from a buffered reader.
///
/// # Errors
///
/// Returns an error on a malformed record, an edge index out of range, a
/// face whose consecutive edges share no endpoint, or if the file contains
/// no faces.
pub fn read_gts<R: BufRead>(reader: R) -> IoResult<Soup> {
    let mut positions: Vec<Point3<f64>> = Vec::new();
    let mut triangles: Vec<[u32; 3]> = Vec::new();
    let mut fedges: Vec<(u32, u32)> = Vec::new();

    let mut in_header = true;
    let mut verts_left: i64 = -1;
    let mut edges_left: i64 = -1;

    for (line_index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_num = line_index + 1;
        let Some(fields) = words(&line) else {
            continue;
        };

        if in_header {
            if fields.len() < 3 {
                continue;
            }
            verts_left = parse_index(fields[0], line_num)?;
            edges_left = parse_index(fields[1], line_num)?;
            in_header = false;
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
            positions.push(Point3::new(-x, z, y));
            continue;
        }

        if edges_left > 0 {
            edges_left -= 1;
            if fields.len() != 2 {
                return Err(IoError::parse(line_num, "expected `v1 v2` edge record"));
            }
            let a = parse_index(fields[0], line_num)?;
            let b = parse_index(fields[1], line_num)?;
            if a < 1 || b < 1 {
                return Err(IoError::parse(line_num, "edge endpoint index < 1"));
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            fedges.push(((a - 1) as u32, (b - 1) as u32));
            continue;
        }

        // face record: three 1-based edge indices
        if fields.len() != 3 {
            return Err(IoError::parse(line_num, "expected three edge indices"));
        }
        let mut edge_refs = [0usize; 3];
        for (slot, token) in edge_refs.iter_mut().zip(fields.iter()) {
            let raw = parse_index(token, line_num)?;
            if raw < 1 || (raw as usize) > fedges.len() {
                return Err(IoError::parse(line_num, format!("edge index {raw}")));
            }
            #[allow(clippy::cast_sign_loss)]
            {
                *slot = (raw - 1) as usize;
            }
        }

        let mut tri = [0u32; 3];
        for i in 0..3 {
            let cur = fedges[edge_refs[i]];
            let next = fedges[edge_refs[(i + 1) % 3]];
            // the corner vertex is the endpoint shared by this edge and the next
            tri[i] = if cur.0 == next.0 || cur.0 == next.1 {
                cur.0
            } else if cur.1 == next.0 || cur.1 == next.1 {
                cur.1
            } else {
                return Err(IoError::parse(
                    line_num,
                    "face edges share no common endpoint",
                ));
            };
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
    fn reconstructs_faces_from_edges() {
        // a tetrahedron: 4 vertices, 6 edges, 4 faces
        let src = "\
4 6 4
0 0 0
1 0 0
0 1 0
0 0 1
1 2
2 3
3 1
1 4
2 4
3 4
1 3 2
1 5 4
3 4 6
2 6 5
";
        let (positions, triangles) = read_gts(Cursor::new(src)).unwrap();
        assert_eq!(positions.len(), 4);
        assert_eq!(triangles.len(), 4);
        // coordinates permuted to (-x, z, y)
        assert_eq!(positions[1], Point3::new(-1.0, 0.0, 0.0));
        // first face references edges (1,2),(3,1),(2,3) -> corners 1,0? shared endpoints
        for tri in &triangles {
            assert!(tri[0] != tri[1] && tri[1] != tri[2] && tri[0] != tri[2]);
        }
    }

    #[test]
    fn mismatched_face_edges_abort() {
        let src = "\
4 3 1
0 0 0
1 0 0
0 1 0
0 0 1
1 2
3 4
1 3
1 2 3
";
        assert!(read_gts(Cursor::new(src)).is_err());
    }
}
