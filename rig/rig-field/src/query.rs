//! Point-to-primitive distance queries.

use nalgebra::Point3;

/// Compute the closest point on a triangle to a query point.
///
/// Implements the region classification from "Real-Time Collision
/// Detection" by Christer Ericson.
#[must_use]
#[allow(clippy::many_single_char_names, clippy::similar_names)]
pub fn closest_point_on_triangle(
    point: Point3<f64>,
    v0: Point3<f64>,
    v1: Point3<f64>,
    v2: Point3<f64>,
) -> Point3<f64> {
    let ab = v1 - v0;
    let ac = v2 - v0;
    let ap = point - v0;

    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);

    // vertex region outside A
    if d1 <= 0.0 && d2 <= 0.0 {
        return v0;
    }

    let bp = point - v1;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);

    // vertex region outside B
    if d3 >= 0.0 && d4 <= d3 {
        return v1;
    }

    // edge region AB
    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return v0 + ab * v;
    }

    let cp = point - v2;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);

    // vertex region outside C
    if d6 >= 0.0 && d5 <= d6 {
        return v2;
    }

    // edge region AC
    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return v0 + ac * w;
    }

    // edge region BC
    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return v1 + (v2 - v1) * w;
    }

    // inside the face region
    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    v0 + ab * v + ac * w
}

/// Compute the closest point on a line segment to a query point.
#[must_use]
pub fn closest_point_on_segment(point: Point3<f64>, a: Point3<f64>, b: Point3<f64>) -> Point3<f64> {
    let ab = b - a;
    let t = (point - a).dot(&ab) / ab.norm_squared().max(f64::EPSILON);
    a + ab * t.clamp(0.0, 1.0)
}

/// Compute the squared distance from a point to a line segment.
#[must_use]
pub fn point_segment_distance_squared(point: Point3<f64>, a: Point3<f64>, b: Point3<f64>) -> f64 {
    (point - closest_point_on_segment(point, a, b)).norm_squared()
}
