//! Interior visibility between points.

use nalgebra::Point3;

use crate::distance_field::DistanceField;

/// Field value above which a sample counts as having left the interior.
const MAX_VAL: f64 = 0.002;

/// Step divisor for the sampling walk: samples sit `length / 100` apart,
/// independent of segment length.
///
/// Fixed so that embeddings are reproducible across runs and meshes; short
/// segments are oversampled and very long ones undersampled by design of
/// the contract.
const SAMPLES: u32 = 100;

/// Answers "can `a` see `b` without leaving the mesh interior?" by sampling
/// the signed distance field along the segment.
#[derive(Debug, Clone)]
pub struct VisibilityTester<'a> {
    field: &'a DistanceField,
}

impl<'a> VisibilityTester<'a> {
    /// Create a tester over a distance field.
    #[must_use]
    pub fn new(field: &'a DistanceField) -> Self {
        Self { field }
    }

    /// The underlying field.
    #[must_use]
    pub fn field(&self) -> &DistanceField {
        self.field
    }

    /// Whether the open segment from `a` to `b` stays inside the surface.
    ///
    /// Walks samples spaced `|b - a| / 100` apart, starting one step past
    /// `a` and running one step past `b`; any sample whose field value
    /// exceeds [`MAX_VAL`] fails the test. When the clearance at the current
    /// sample and at the far endpoint together cover the remaining path
    /// length, the rest of the segment cannot surface and the test accepts
    /// early.
    #[must_use]
    pub fn can_see(&self, a: Point3<f64>, b: Point3<f64>) -> bool {
        let at_b = self.field.evaluate(b);
        let diff = (b - a) / f64::from(SAMPLES);
        let mut left = (b - a).norm();
        let left_inc = left / f64::from(SAMPLES);

        let mut cur = a + diff;
        while left >= 0.0 {
            let d = self.field.evaluate(cur);
            if d > MAX_VAL {
                return false;
            }
            // clearances are negative inside; deep enough means the rest of
            // the segment stays interior
            if d + at_b + left <= MAX_VAL {
                return true;
            }
            cur += diff;
            left -= left_inc;
        }

        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rig_mesh::Mesh;

    /// An L-shaped solid: visibility between the two arm tips must fail,
    /// while points within one arm see each other.
    fn l_shape() -> Mesh {
        // union of two boxes sharing the corner block at [0.1,0.5]x[0.1,0.5]
        // expressed as a single closed surface
        let p = |x: f64, y: f64, z: f64| Point3::new(x, y, z);
        // outer profile of the L in the xy plane, extruded in z
        let profile = [
            p(0.1, 0.1, 0.0),
            p(0.9, 0.1, 0.0),
            p(0.9, 0.5, 0.0),
            p(0.5, 0.5, 0.0),
            p(0.5, 0.9, 0.0),
            p(0.1, 0.9, 0.0),
        ];
        let mut positions = Vec::new();
        for z in [0.1, 0.5] {
            for corner in &profile {
                positions.push(p(corner.x, corner.y, z));
            }
        }
        let mut triangles: Vec<[u32; 3]> = Vec::new();
        // bottom (z=0.1), viewed from below: fan of the concave polygon
        // split into two convex quads
        let quads_bottom = [[0u32, 3, 2, 1], [0, 5, 4, 3]];
        for q in quads_bottom {
            triangles.push([q[0], q[1], q[2]]);
            triangles.push([q[0], q[2], q[3]]);
        }
        // top (z=0.5), reversed winding
        let quads_top = [[6u32, 7, 8, 9], [6, 9, 10, 11]];
        for q in quads_top {
            triangles.push([q[0], q[1], q[2]]);
            triangles.push([q[0], q[2], q[3]]);
        }
        // sides
        for i in 0u32..6 {
            let j = (i + 1) % 6;
            triangles.push([i, j, 6 + j]);
            triangles.push([i, 6 + j, 6 + i]);
        }
        Mesh::from_soup(positions, triangles).unwrap()
    }

    #[test]
    fn straight_interior_segment_is_visible() {
        let mesh = l_shape();
        let field = DistanceField::build(&mesh);
        let tester = VisibilityTester::new(&field);
        assert!(tester.can_see(Point3::new(0.2, 0.3, 0.3), Point3::new(0.8, 0.3, 0.3)));
    }

    #[test]
    fn segment_cutting_the_notch_is_not_visible() {
        let mesh = l_shape();
        let field = DistanceField::build(&mesh);
        let tester = VisibilityTester::new(&field);
        // tip of the horizontal arm to tip of the vertical arm crosses the
        // notch at (0.7, 0.7)
        assert!(!tester.can_see(Point3::new(0.85, 0.3, 0.3), Point3::new(0.3, 0.85, 0.3)));
    }
}
