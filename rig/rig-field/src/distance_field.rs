//! Adaptive octree signed distance field.

use hashbrown::HashMap;
use nalgebra::{Point3, Vector3};
use rig_mesh::Mesh;
use tracing::debug;

use crate::intersect::Intersector;
use crate::project::TriangleProjector;

/// Interpolation tolerance driving octree subdivision.
const TOLERANCE: f64 = 0.003;

/// Maximum octree depth; leaf cells are `2^-MAX_DEPTH` on a side.
const MAX_DEPTH: u32 = 6;

/// Minimum octree depth, so the field has resolution even far from the
/// surface.
const MIN_DEPTH: u32 = 2;

/// Corner offsets of a cube in binary order (x + 2y + 4z).
const CORNERS: [[f64; 3]; 8] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [1.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [1.0, 0.0, 1.0],
    [0.0, 1.0, 1.0],
    [1.0, 1.0, 1.0],
];

#[derive(Debug, Clone, Copy)]
struct OctNode {
    /// Signed distances at the cell's 8 corners.
    corners: [f64; 8],
    /// Child node indices in corner order; `children[0] == -1` marks a leaf.
    children: [i32; 8],
}

/// An octree approximation of signed distance to a mesh surface over the
/// unit cube, positive outside.
///
/// Cells subdivide while the surface may cross them and trilinear
/// interpolation of the corner distances is not yet within tolerance of the
/// exact value at the cell center. Exact corner values come from a
/// nearest-point query ([`TriangleProjector`]) signed by ray-crossing parity
/// ([`Intersector`]).
///
/// The mesh is expected to be normalized into the unit box (see
/// [`rig_mesh::Mesh::normalize_bounding_box`]) so the octree domain covers
/// it.
#[derive(Debug, Clone)]
pub struct DistanceField {
    nodes: Vec<OctNode>,
}

/// Exact signed-distance evaluator shared by the build.
struct ExactField {
    projector: TriangleProjector,
    intersector: Intersector,
    /// Corner values keyed by lattice coordinates at the finest resolution,
    /// so cells sharing corners evaluate each one once.
    cache: HashMap<(u32, u32, u32), f64>,
}

impl ExactField {
    fn new(mesh: &Mesh) -> Self {
        // the probe is skewed off the axes so octree lattice points do not
        // land on edges of axis-aligned triangles in projection
        let probe = Vector3::new(0.9, 0.35, 0.25);
        Self {
            projector: TriangleProjector::new(mesh),
            intersector: Intersector::new(mesh, probe),
            cache: HashMap::new(),
        }
    }

    /// Exact signed distance: nearest-point distance, negative when an odd
    /// number of surface crossings lies ahead along the probe direction.
    fn signed(&self, p: Point3<f64>) -> f64 {
        let unsigned = self.projector.distance(p);
        let ahead = self
            .intersector
            .intersect(p)
            .iter()
            .filter(|hit| (*hit - p).dot(&self.intersector.direction()) > 0.0)
            .count();
        if ahead % 2 == 1 {
            -unsigned
        } else {
            unsigned
        }
    }

    fn signed_at_lattice(&mut self, lattice: (u32, u32, u32)) -> f64 {
        if let Some(&d) = self.cache.get(&lattice) {
            return d;
        }
        let step = 1.0 / f64::from(1u32 << MAX_DEPTH);
        let p = Point3::new(
            f64::from(lattice.0) * step,
            f64::from(lattice.1) * step,
            f64::from(lattice.2) * step,
        );
        let d = self.signed(p);
        self.cache.insert(lattice, d);
        d
    }
}

impl DistanceField {
    /// Build the field for a normalized mesh.
    #[must_use]
    pub fn build(mesh: &Mesh) -> Self {
        let mut exact = ExactField::new(mesh);
        let mut field = Self { nodes: Vec::new() };
        field.subdivide(&mut exact, (0, 0, 0), 0);
        debug!(nodes = field.nodes.len(), "built distance field octree");
        field
    }

    /// Build the subtree for the cell at `lattice` (in units of the finest
    /// cell size) and `depth`; returns its node index.
    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    // Wrap/truncation: node counts stay far below i32::MAX at MAX_DEPTH 6.
    fn subdivide(&mut self, exact: &mut ExactField, lattice: (u32, u32, u32), depth: u32) -> i32 {
        let span = 1u32 << (MAX_DEPTH - depth);
        let mut corners = [0.0f64; 8];
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        for (value, offset) in corners.iter_mut().zip(&CORNERS) {
            *value = exact.signed_at_lattice((
                lattice.0 + span * offset[0] as u32,
                lattice.1 + span * offset[1] as u32,
                lattice.2 + span * offset[2] as u32,
            ));
        }

        let out = self.nodes.len() as i32;
        self.nodes.push(OctNode {
            corners,
            children: [-1; 8],
        });

        if depth >= MAX_DEPTH {
            return out;
        }

        let min = corners.iter().copied().fold(f64::MAX, f64::min);
        let max = corners.iter().copied().fold(f64::MIN, f64::max);
        let split = if depth < MIN_DEPTH {
            true
        } else if min < 0.0 && max > 0.0 {
            // the surface crosses the cell; resolve it fully so values near
            // the surface interpolate within the visibility threshold
            true
        } else {
            // subdivide while the surface may cross the cell and the
            // trilinear approximation has not converged at the center
            let cell_size = f64::from(span) / f64::from(1u32 << MAX_DEPTH);
            let half_diagonal = cell_size * 3f64.sqrt() * 0.5;
            let center_lattice = (
                lattice.0 + span / 2,
                lattice.1 + span / 2,
                lattice.2 + span / 2,
            );
            let center_exact = exact.signed_at_lattice(center_lattice);
            let center_estimate = corners.iter().sum::<f64>() / 8.0;
            center_exact.abs() < half_diagonal + TOLERANCE
                && (center_estimate - center_exact).abs() > TOLERANCE
        };

        if split {
            let half = span / 2;
            let mut children = [-1i32; 8];
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            for (slot, offset) in children.iter_mut().zip(&CORNERS) {
                *slot = self.subdivide(
                    exact,
                    (
                        lattice.0 + half * offset[0] as u32,
                        lattice.1 + half * offset[1] as u32,
                        lattice.2 + half * offset[2] as u32,
                    ),
                    depth + 1,
                );
            }
            self.nodes[out as usize].children = children;
        }

        out
    }

    /// Evaluate the approximate signed distance at a point.
    ///
    /// The point is clamped into the unit cube first; positive values are
    /// outside the surface.
    #[must_use]
    pub fn evaluate(&self, p: Point3<f64>) -> f64 {
        let mut x = p.x.clamp(0.0, 1.0);
        let mut y = p.y.clamp(0.0, 1.0);
        let mut z = p.z.clamp(0.0, 1.0);

        let mut node = 0usize;
        loop {
            let n = &self.nodes[node];
            if n.children[0] < 0 {
                // trilinear interpolation within the leaf
                let mut value = 0.0;
                for (corner, offset) in n.corners.iter().zip(&CORNERS) {
                    let wx = if offset[0] > 0.5 { x } else { 1.0 - x };
                    let wy = if offset[1] > 0.5 { y } else { 1.0 - y };
                    let wz = if offset[2] > 0.5 { z } else { 1.0 - z };
                    value += corner * wx * wy * wz;
                }
                return value;
            }

            let ix = usize::from(x >= 0.5);
            let iy = usize::from(y >= 0.5);
            let iz = usize::from(z >= 0.5);
            x = if ix == 1 { (x - 0.5) * 2.0 } else { x * 2.0 };
            y = if iy == 1 { (y - 0.5) * 2.0 } else { y * 2.0 };
            z = if iz == 1 { (z - 0.5) * 2.0 } else { z * 2.0 };
            #[allow(clippy::cast_sign_loss)]
            {
                node = n.children[ix + 2 * iy + 4 * iz] as usize;
            }
        }
    }

    /// Central-difference gradient of the field.
    #[must_use]
    pub fn gradient(&self, p: Point3<f64>) -> Vector3<f64> {
        const H: f64 = 1e-4;
        let mut g = Vector3::zeros();
        for k in 0..3 {
            let mut hi = p;
            let mut lo = p;
            hi[k] += H;
            lo[k] -= H;
            g[k] = (self.evaluate(hi) - self.evaluate(lo)) / (2.0 * H);
        }
        g
    }

    /// Number of octree nodes (diagnostic).
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// A cube spanning [0.25, 0.75]³.
    fn centered_cube() -> Mesh {
        let positions = vec![
            Point3::new(0.25, 0.25, 0.25),
            Point3::new(0.75, 0.25, 0.25),
            Point3::new(0.75, 0.75, 0.25),
            Point3::new(0.25, 0.75, 0.25),
            Point3::new(0.25, 0.25, 0.75),
            Point3::new(0.75, 0.25, 0.75),
            Point3::new(0.75, 0.75, 0.75),
            Point3::new(0.25, 0.75, 0.75),
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
    fn sign_convention_is_positive_outside() {
        let field = DistanceField::build(&centered_cube());
        assert!(field.evaluate(Point3::new(0.5, 0.5, 0.5)) < 0.0);
        assert!(field.evaluate(Point3::new(0.05, 0.05, 0.05)) > 0.0);
        assert!(field.evaluate(Point3::new(0.95, 0.5, 0.5)) > 0.0);
    }

    #[test]
    fn distance_magnitude_is_approximate() {
        let field = DistanceField::build(&centered_cube());
        // center of the cube is 0.25 from every face
        let center = field.evaluate(Point3::new(0.5, 0.5, 0.5));
        assert!((center + 0.25).abs() < 0.05, "center distance {center}");
        // just outside a face
        let outside = field.evaluate(Point3::new(0.85, 0.5, 0.5));
        assert!((outside - 0.1).abs() < 0.05, "outside distance {outside}");
    }

    #[test]
    fn gradient_points_away_from_interior() {
        let field = DistanceField::build(&centered_cube());
        let g = field.gradient(Point3::new(0.8, 0.5, 0.5));
        assert!(g.x > 0.0);
    }
}
