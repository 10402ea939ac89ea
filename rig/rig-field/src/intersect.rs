//! Line-mesh intersection through a projection-plane grid.

use nalgebra::{Point3, Vector2, Vector3};
use rig_mesh::Mesh;

/// Grid resolution along each axis of the projection plane.
const CELLS: usize = 200;

/// All intersections of a fixed-direction line with a mesh.
///
/// Triangles are binned into a `CELLS × CELLS` grid over the plane
/// perpendicular to the direction; a query projects the point into the
/// plane, tests the triangles in its cell in 2D, and computes the 3D plane
/// intersection for hits. Face normals are prescaled by `1 / (n · dir)` so
/// the intersection reduces to a single dot product.
#[derive(Debug, Clone)]
pub struct Intersector {
    dir: Vector3<f64>,
    basis: (Vector3<f64>, Vector3<f64>),
    lo: Vector2<f64>,
    size: Vector2<f64>,
    points: Vec<Vector2<f64>>,
    triangles: Vec<Vec<u32>>,
    corners: Vec<[u32; 3]>,
    positions: Vec<Point3<f64>>,
    scaled_normals: Vec<Vector3<f64>>,
}

/// An orthonormal basis perpendicular to `dir`.
fn perpendicular_basis(dir: Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let helper = if dir.x.abs() < 0.5 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let u = dir.cross(&helper).normalize();
    let v = dir.cross(&u);
    (u, v)
}

impl Intersector {
    /// Build the grid for a mesh and a line direction.
    #[must_use]
    pub fn new(mesh: &Mesh, dir: Vector3<f64>) -> Self {
        let dir = dir.normalize();
        let basis = perpendicular_basis(dir);

        let positions: Vec<Point3<f64>> = mesh.vertices.iter().map(|v| v.position).collect();
        let points: Vec<Vector2<f64>> = positions
            .iter()
            .map(|p| Vector2::new(p.coords.dot(&basis.0), p.coords.dot(&basis.1)))
            .collect();

        let mut lo = points.first().copied().unwrap_or_else(Vector2::zeros);
        let mut hi = lo;
        for p in &points {
            lo = lo.inf(p);
            hi = hi.sup(p);
        }
        let size = hi - lo;

        let mut out = Self {
            dir,
            basis,
            lo,
            size,
            points,
            triangles: vec![Vec::new(); CELLS * CELLS],
            corners: mesh.triangles().collect(),
            positions,
            scaled_normals: Vec::with_capacity(mesh.triangle_count()),
        };

        for t in 0..out.corners.len() {
            let corners = out.corners[t];
            let mut tri_lo = out.points[corners[0] as usize];
            let mut tri_hi = tri_lo;
            for &c in &corners[1..] {
                tri_lo = tri_lo.inf(&out.points[c as usize]);
                tri_hi = tri_hi.sup(&out.points[c as usize]);
            }

            let (from_x, from_y) = out.cell_index(tri_lo);
            let (to_x, to_y) = out.cell_index(tri_hi);
            #[allow(clippy::cast_possible_truncation)]
            for y in from_y..=to_y {
                for x in from_x..=to_x {
                    out.triangles[y * CELLS + x].push(t as u32);
                }
            }

            let a = out.positions[corners[0] as usize];
            let b = out.positions[corners[1] as usize];
            let c = out.positions[corners[2] as usize];
            let cross = (b - a).cross(&(c - a));
            let normal = cross.try_normalize(0.0).unwrap_or_else(Vector3::zeros);
            let along = normal.dot(&dir);
            // zero when the triangle is (numerically) coplanar with the line
            out.scaled_normals.push(if along.abs() <= 1e-8 {
                Vector3::zeros()
            } else {
                normal / along
            });
        }

        out
    }

    /// Grid cell containing a plane point, clamped to the grid.
    fn cell_index(&self, pt: Vector2<f64>) -> (usize, usize) {
        let c = (pt - self.lo).component_div(&self.size);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let to_cell = |v: f64| -> usize {
            let idx = (v * CELLS as f64) as i64;
            idx.clamp(0, CELLS as i64 - 1) as usize
        };
        (to_cell(c[0]), to_cell(c[1]))
    }

    /// All intersection points of the line through `pt` along the fixed
    /// direction with the mesh surface.
    #[must_use]
    pub fn intersect(&self, pt: Point3<f64>) -> Vec<Point3<f64>> {
        let mut out = Vec::new();

        let pt2 = Vector2::new(pt.coords.dot(&self.basis.0), pt.coords.dot(&self.basis.1));
        if pt2.x < self.lo.x
            || pt2.y < self.lo.y
            || pt2.x > self.lo.x + self.size.x
            || pt2.y > self.lo.y + self.size.y
        {
            return out; // line misses the projected bounds entirely
        }

        let (x, y) = self.cell_index(pt2);
        for &t in &self.triangles[y * CELLS + x] {
            let corners = self.corners[t as usize];

            // 2D point-in-triangle: consistent cross-product signs
            let mut signs = [0i32; 3];
            for j in 0..3 {
                let a = self.points[corners[j] as usize];
                let b = self.points[corners[(j + 1) % 3] as usize];
                let d1 = b - a;
                let d2 = pt2 - a;
                signs[j] = if d1.x * d2.y - d1.y * d2.x < 0.0 { -1 } else { 1 };
            }
            if signs[0] != signs[1] || signs[1] != signs[2] {
                continue;
            }

            let n = self.scaled_normals[t as usize];
            let a = self.positions[corners[0] as usize];
            if n.norm_squared() == 0.0 {
                // coplanar: project the triangle center onto the line
                let b = self.positions[corners[1] as usize];
                let c = self.positions[corners[2] as usize];
                let center = Point3::from((a.coords + b.coords + c.coords) / 3.0);
                let along = (center - pt).dot(&self.dir);
                out.push(pt + self.dir * along);
                continue;
            }

            out.push(pt + self.dir * n.dot(&(a - pt)));
        }

        out
    }

    /// The line direction.
    #[must_use]
    pub fn direction(&self) -> Vector3<f64> {
        self.dir
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cube() -> Mesh {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
        ];
        let triangles = vec![
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [3, 7, 6],
            [3, 6, 2],
            [0, 4, 7],
            [0, 7, 3],
            [1, 2, 6],
            [1, 6, 5],
        ];
        Mesh::from_soup(positions, triangles).unwrap()
    }

    #[test]
    fn line_through_cube_hits_twice() {
        let mesh = cube();
        let intersector = Intersector::new(&mesh, Vector3::x());
        let hits = intersector.intersect(Point3::new(0.5, 0.4, 0.6));
        assert_eq!(hits.len(), 2);
        for hit in &hits {
            assert!((hit.x - 0.0).abs() < 1e-10 || (hit.x - 1.0).abs() < 1e-10);
        }
    }

    #[test]
    fn line_outside_bounds_misses() {
        let mesh = cube();
        let intersector = Intersector::new(&mesh, Vector3::x());
        let hits = intersector.intersect(Point3::new(0.5, 5.0, 5.0));
        assert!(hits.is_empty());
    }

    #[test]
    fn parity_separates_inside_from_outside() {
        let mesh = cube();
        let intersector = Intersector::new(&mesh, Vector3::x());

        let count_ahead = |p: Point3<f64>| {
            intersector
                .intersect(p)
                .iter()
                .filter(|hit| (*hit - p).dot(&intersector.direction()) > 0.0)
                .count()
        };

        assert_eq!(count_ahead(Point3::new(0.5, 0.4, 0.6)) % 2, 1);
        assert_eq!(count_ahead(Point3::new(-1.0, 0.4, 0.6)) % 2, 0);
    }
}
