//! ASCII STL reading.
//!
//! `vertex x y z` records are collected in groups of three per facet and
//! stored as `(y, z, x)` in the internal axis convention. Vertices are
//! deduplicated by exact floating-point equality. A facet that repeats a
//! vertex after deduplication is degenerate and skipped with a log line
//! rather than aborting the read.

use std::io::BufRead;

use hashbrown::HashMap;
use nalgebra::Point3;
use tracing::warn;

use crate::error::{IoError, IoResult};
use crate::{parse_f64, words, Soup};

/// Bit-exact key for a position, with `-0.0` folded into `0.0` so that the
/// map agrees with `==` on floats.
fn position_key(p: Point3<f64>) -> [u64; 3] {
    [p.x, p.y, p.z].map(|c| (c + 0.0).to_bits())
}

/// Read an ASCII STL mesh from a buffered reader.
///
/// # Errors
///
/// Returns an error on a malformed `vertex` record, a facet with fewer than
/// three vertices, or if the file contains no (non-degenerate) facets.
pub fn read_stl<R: BufRead>(reader: R) -> IoResult<Soup> {
    let mut positions: Vec<Point3<f64>> = Vec::new();
    let mut triangles: Vec<[u32; 3]> = Vec::new();
    let mut vertex_index: HashMap<[u64; 3], u32> = HashMap::new();
    let mut last: Vec<u32> = Vec::with_capacity(4);

    for (line_index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_num = line_index + 1;
        let Some(fields) = words(&line) else {
            continue;
        };

        match fields[0] {
            "vertex" => {
                if fields.len() < 4 {
                    return Err(IoError::parse(line_num, "expected `vertex x y z`"));
                }
                let x = parse_f64(fields[1], line_num)?;
                let y = parse_f64(fields[2], line_num)?;
                let z = parse_f64(fields[3], line_num)?;
                let position = Point3::new(y, z, x);

                #[allow(clippy::cast_possible_truncation)]
                let index = *vertex_index
                    .entry(position_key(position))
                    .or_insert_with(|| {
                        positions.push(position);
                        (positions.len() - 1) as u32
                    });

                last.push(index);
                if last.len() > 3 {
                    last.remove(0);
                }
            }
            "endfacet" => {
                if last.len() < 3 {
                    return Err(IoError::parse(line_num, "facet with fewer than 3 vertices"));
                }
                if last[0] == last[1] || last[1] == last[2] || last[0] == last[2] {
                    warn!(line = line_num, "degenerate facet skipped");
                    continue;
                }
                triangles.push([last[0], last[1], last[2]]);
            }
            _ => {} // solid / facet / outer loop / endloop / endsolid
        }
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

    fn facet(a: (f64, f64, f64), b: (f64, f64, f64), c: (f64, f64, f64)) -> String {
        format!(
            "facet normal 0 0 0\nouter loop\nvertex {} {} {}\nvertex {} {} {}\nvertex {} {} {}\nendloop\nendfacet\n",
            a.0, a.1, a.2, b.0, b.1, b.2, c.0, c.1, c.2
        )
    }

    #[test]
    fn dedupes_vertices_exactly() {
        let mut src = String::from("solid block\n");
        src.push_str(&facet((0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (0.0, 1.0, 0.0)));
        src.push_str(&facet((0.0, 0.0, 0.0), (0.0, 1.0, 0.0), (0.0, 0.0, 1.0)));
        src.push_str("endsolid block\n");

        let (positions, triangles) = read_stl(Cursor::new(src)).unwrap();
        // 4 distinct vertices across 2 facets
        assert_eq!(positions.len(), 4);
        assert_eq!(triangles.len(), 2);
        // coordinates permuted to (y, z, x)
        assert_eq!(positions[1], Point3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn degenerate_facet_skipped() {
        let mut src = String::from("solid s\n");
        src.push_str(&facet((0.0, 0.0, 0.0), (0.0, 0.0, 0.0), (0.0, 1.0, 0.0)));
        src.push_str(&facet((0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (0.0, 1.0, 0.0)));
        src.push_str("endsolid s\n");

        let (_, triangles) = read_stl(Cursor::new(src)).unwrap();
        assert_eq!(triangles.len(), 1);
    }

    #[test]
    fn only_degenerate_facets_is_an_error() {
        let mut src = String::from("solid s\n");
        src.push_str(&facet((0.0, 0.0, 0.0), (0.0, 0.0, 0.0), (0.0, 1.0, 0.0)));
        src.push_str("endsolid s\n");
        assert!(matches!(read_stl(Cursor::new(src)), Err(IoError::NoGeometry)));
    }
}
