//! Continuous refinement of the discrete embedding.

use nalgebra::{Point3, Vector3};
use rig_field::DistanceField;
use rig_skeleton::Skeleton;
use tracing::debug;

use crate::EmbedParams;

/// Margin added to field values inside the exponential barrier, matching
/// the visibility threshold.
const BARRIER_MARGIN: f64 = 0.002;

/// Cap on the barrier exponent so the penalty stays finite.
const BARRIER_EXPONENT_CAP: f64 = 50.0;

/// Finite-difference step for the penalty gradient.
const GRADIENT_STEP: f64 = 1e-5;

/// Locally optimize reduced-joint positions on a smooth penalty.
///
/// The penalty keeps the discrete cost's length, orientation, symmetry,
/// feet, and fat terms (with sphere radius replaced by field depth) and
/// swaps the hard visibility requirement for an exponential barrier on the
/// field value sampled along each bone. Descent is plain gradient descent
/// with backtracking line search, stopped at a fixed point or the iteration
/// cap.
#[must_use]
pub fn refine_embedding(
    skeleton: &Skeleton,
    field: &DistanceField,
    positions: &[Point3<f64>],
    params: &EmbedParams,
) -> Vec<Point3<f64>> {
    let mut pos = positions.to_vec();
    let mut cost = penalty(skeleton, field, &pos, params);

    let mut step = 0.01;
    let mut iterations = 0u32;
    for _ in 0..params.max_refine_iterations {
        iterations += 1;
        let grad = numeric_gradient(skeleton, field, &pos, params);
        let grad_norm = grad.iter().map(Vector3::norm_squared).sum::<f64>().sqrt();
        if grad_norm < 1e-9 {
            break;
        }

        // backtracking line search along the normalized descent direction
        let mut accepted = false;
        for _ in 0..24 {
            let trial: Vec<Point3<f64>> = pos
                .iter()
                .zip(&grad)
                .map(|(p, g)| p - g * (step / grad_norm))
                .collect();
            let trial_cost = penalty(skeleton, field, &trial, params);
            if trial_cost < cost {
                pos = trial;
                cost = trial_cost;
                step = (step * 1.5).min(0.05);
                accepted = true;
                break;
            }
            step *= 0.5;
            if step < 1e-7 {
                break;
            }
        }
        if !accepted {
            break; // fixed point
        }
    }

    debug!(iterations, cost, "continuous refinement finished");
    pos
}

/// The smooth embedding penalty.
fn penalty(
    skeleton: &Skeleton,
    field: &DistanceField,
    positions: &[Point3<f64>],
    params: &EmbedParams,
) -> f64 {
    let m = skeleton.reduced_count();
    let parent = skeleton.reduced_parent();
    let template = skeleton.reduced_positions();
    let lengths = skeleton.reduced_length();
    let total = skeleton.total_length().max(1e-12);

    let barrier = |p: Point3<f64>| -> f64 {
        let exponent = params.barrier_sharpness * (field.evaluate(p) + BARRIER_MARGIN);
        exponent.min(BARRIER_EXPONENT_CAP).exp()
    };

    let mut cost = 0.0;

    for j in 1..m {
        #[allow(clippy::cast_sign_loss)]
        let p = parent[j] as usize;
        let bone = positions[j] - positions[p];
        let length = bone.norm();

        let deviation = (length - lengths[j]) / total;
        cost += params.length_weight * deviation * deviation;

        let template_dir = template[j] - template[p];
        if length > 1e-12 && template_dir.norm() > 1e-12 {
            let angle = bone.angle(&template_dir);
            cost += params.orientation_weight * angle * angle;
        }

        // the bone must stay clear of the surface along its whole extent
        for s in 1..=params.barrier_samples {
            let t = f64::from(s) / f64::from(params.barrier_samples + 1);
            cost += barrier(positions[p] + bone * t);
        }
    }

    for j in 0..m {
        cost += barrier(positions[j]);
        if skeleton.reduced_feet()[j] {
            cost += params.feet_weight * positions[j].y;
        }
        if skeleton.reduced_fat()[j] {
            // deep interior stands in for a large sphere
            cost += params.fat_weight * field.evaluate(positions[j]);
        }
        let sym = skeleton.reduced_sym()[j];
        #[allow(clippy::cast_sign_loss)]
        if sym >= 0 {
            let partner = positions[sym as usize];
            let reflected = Point3::new(1.0 - partner.x, partner.y, partner.z);
            cost += params.symmetry_weight * (positions[j] - reflected).norm_squared();
        }
    }

    cost
}

/// Finite-difference gradient of [`penalty`] in all joint coordinates.
fn numeric_gradient(
    skeleton: &Skeleton,
    field: &DistanceField,
    positions: &[Point3<f64>],
    params: &EmbedParams,
) -> Vec<Vector3<f64>> {
    let mut grad = vec![Vector3::zeros(); positions.len()];
    let mut work = positions.to_vec();
    for j in 0..positions.len() {
        for k in 0..3 {
            let original = work[j][k];
            work[j][k] = original + GRADIENT_STEP;
            let hi = penalty(skeleton, field, &work, params);
            work[j][k] = original - GRADIENT_STEP;
            let lo = penalty(skeleton, field, &work, params);
            work[j][k] = original;
            grad[j][k] = (hi - lo) / (2.0 * GRADIENT_STEP);
        }
    }
    grad
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rig_mesh::Mesh;
    use rig_skeleton::SkeletonBuilder;

    fn tall_box() -> Mesh {
        let positions = vec![
            Point3::new(0.35, 0.05, 0.35),
            Point3::new(0.65, 0.05, 0.35),
            Point3::new(0.65, 0.95, 0.35),
            Point3::new(0.35, 0.95, 0.35),
            Point3::new(0.35, 0.05, 0.65),
            Point3::new(0.65, 0.05, 0.65),
            Point3::new(0.65, 0.95, 0.65),
            Point3::new(0.35, 0.95, 0.65),
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
    fn refinement_does_not_increase_the_penalty() {
        let mesh = tall_box();
        let field = DistanceField::build(&mesh);
        let params = EmbedParams::default();
        let skeleton = SkeletonBuilder::new()
            .joint("base", Point3::new(0.0, -0.6, 0.0), None)
            .joint("tip", Point3::new(0.0, 0.6, 0.0), Some("base"))
            .build()
            .unwrap();

        let start = vec![Point3::new(0.5, 0.4, 0.5), Point3::new(0.5, 0.6, 0.5)];
        let before = penalty(&skeleton, &field, &start, &params);
        let refined = refine_embedding(&skeleton, &field, &start, &params);
        let after = penalty(&skeleton, &field, &refined, &params);
        assert!(after <= before + 1e-12);
    }

    #[test]
    fn refined_joints_stay_interior() {
        let mesh = tall_box();
        let field = DistanceField::build(&mesh);
        let params = EmbedParams::default();
        let skeleton = SkeletonBuilder::new()
            .joint("base", Point3::new(0.0, -0.6, 0.0), None)
            .joint("tip", Point3::new(0.0, 0.6, 0.0), Some("base"))
            .build()
            .unwrap();

        let start = vec![Point3::new(0.5, 0.35, 0.5), Point3::new(0.5, 0.65, 0.5)];
        let refined = refine_embedding(&skeleton, &field, &start, &params);
        for p in &refined {
            assert!(field.evaluate(*p) < BARRIER_MARGIN);
        }
    }
}
