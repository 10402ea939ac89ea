//! OFF reading.
//!
//! The first non-comment line with at least three words supplies the vertex
//! count (the bare `OFF` magic line has one word and falls through). Vertex
//! lines hold three floats in the internal axis convention; faces are
//! `3 a b c` with 0-based indices.

use std::io::BufRead;

use nalgebra::Point3;

use crate::error::{IoError, IoResult};
use crate::{parse_f64, parse_index, words, Soup};

/// Read an OFF mesh from a buffered reader.
///
/// # Errors
///
/// Returns an error on a malformed vertex or face record, or if the file
/// contains no faces.
pub fn read_off<R: BufRead>(reader: R) -> IoResult<Soup> {
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
            if fields.len() < 3 {
                continue; // not the `vertices faces edges` line yet
            }
            verts_left = parse_index(fields[0], line_num)?;
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
            positions.push(Point3::new(x, y, z));
            continue;
        }

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
    fn reads_counts_vertices_and_faces() {
        let src = "\
OFF
# comment
4 4 0
0 0 0
1 0 0
0 1 0
0 0 1
3 0 2 1
3 0 1 3
3 0 3 2
3 1 2 3
";
        let (positions, triangles) = read_off(Cursor::new(src)).unwrap();
        assert_eq!(positions.len(), 4);
        assert_eq!(triangles.len(), 4);
        assert_eq!(triangles[0], [0, 2, 1]);
    }

    #[test]
    fn bad_face_record_aborts() {
        let src = "4 1 0\n0 0 0\n1 0 0\n0 1 0\n0 0 1\n3 0 1\n";
        assert!(read_off(Cursor::new(src)).is_err());
    }
}
