//! Greedy sphere packing of the mesh interior.

use hashbrown::HashSet;
use nalgebra::Point3;
use rig_field::DistanceField;
use tracing::debug;

use crate::EmbedParams;

/// An interior sphere: a candidate joint site.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PackedSphere {
    /// Sphere center, in the normalized mesh frame.
    pub center: Point3<f64>,
    /// Sphere radius (clearance to the surface).
    pub radius: f64,
}

/// Resolution of the candidate seed grid.
const SEED_GRID: u32 = 48;

/// Gradient-descent steps used to slide seeds onto the deep interior set.
const DEEPEN_STEPS: u32 = 10;

/// Step size for the deepening descent.
const DEEPEN_RATE: f64 = 0.02;

/// Quantization used to merge seeds that converged to the same spot.
const MERGE_SCALE: f64 = 256.0;

/// Pack the mesh interior with non-overlapping spheres, largest first.
///
/// Seeds on a regular grid are slid down the distance-field gradient toward
/// locally deepest interior points, deduplicated, sorted by clearance, and
/// accepted greedily: a candidate whose center already lies inside an
/// accepted sphere is discarded.
///
/// Returns an empty vector when the interior is too thin to hold any sphere
/// of the configured minimum radius.
#[must_use]
pub fn pack_spheres(field: &DistanceField, params: &EmbedParams) -> Vec<PackedSphere> {
    let mut candidates: Vec<PackedSphere> = Vec::new();
    let mut seen: HashSet<(i64, i64, i64)> = HashSet::new();

    let step = 1.0 / f64::from(SEED_GRID);
    for ix in 0..SEED_GRID {
        for iy in 0..SEED_GRID {
            for iz in 0..SEED_GRID {
                let mut p = Point3::new(
                    (f64::from(ix) + 0.5) * step,
                    (f64::from(iy) + 0.5) * step,
                    (f64::from(iz) + 0.5) * step,
                );
                if field.evaluate(p) >= 0.0 {
                    continue;
                }

                // slide toward the locally deepest interior point
                for _ in 0..DEEPEN_STEPS {
                    let g = field.gradient(p);
                    p -= g * DEEPEN_RATE;
                    p = Point3::new(
                        p.x.clamp(0.0, 1.0),
                        p.y.clamp(0.0, 1.0),
                        p.z.clamp(0.0, 1.0),
                    );
                }

                let radius = -field.evaluate(p);
                if radius < params.min_sphere_radius {
                    continue;
                }

                #[allow(clippy::cast_possible_truncation)]
                let key = (
                    (p.x * MERGE_SCALE).round() as i64,
                    (p.y * MERGE_SCALE).round() as i64,
                    (p.z * MERGE_SCALE).round() as i64,
                );
                if seen.insert(key) {
                    candidates.push(PackedSphere { center: p, radius });
                }
            }
        }
    }

    // largest spheres claim space first
    candidates.sort_by(|a, b| {
        b.radius
            .partial_cmp(&a.radius)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut packed: Vec<PackedSphere> = Vec::new();
    for candidate in candidates {
        let covered = packed
            .iter()
            .any(|s| (s.center - candidate.center).norm() < s.radius);
        if !covered {
            packed.push(candidate);
        }
    }

    debug!(spheres = packed.len(), "packed interior spheres");
    packed
}
