//! Attachment construction and linear blend deformation.

use nalgebra::{Point3, Vector3};
use rig_field::{closest_point_on_segment, point_segment_distance_squared, VisibilityTester};
use rig_mesh::{Mesh, Transform};
use rig_skeleton::Skeleton;
use rig_solver::SpdMatrix;
use smallvec::SmallVec;
use tracing::debug;

use crate::error::{AttachError, AttachResult};

/// Bones at most this factor farther than the nearest one still count as
/// "equally close" for heat-source placement.
const NEAREST_SLACK: f64 = 1.0001;

/// Weights below this threshold are dropped from the sparse representation.
const WEIGHT_CUTOFF: f64 = 1e-8;

/// Whether `v` points into the cone spanned by the face normals around a
/// vertex: its direction must agree with the averaged normal beyond 60°.
fn vector_in_cone(v: Vector3<f64>, normals: &[Vector3<f64>]) -> bool {
    let avg: Vector3<f64> = normals.iter().sum();
    let Some(v) = v.try_normalize(0.0) else {
        return false;
    };
    let Some(avg) = avg.try_normalize(0.0) else {
        return false;
    };
    v.dot(&avg) > 0.5
}

/// Per-vertex bone weights for linear blend skinning.
///
/// Holds both a dense weight vector per vertex (length = bone count) and
/// the equivalent sparse `(bone, weight)` list restricted to weights above
/// `1e-8`. Weights are non-negative and sum to one per vertex.
#[derive(Debug, Clone)]
pub struct Attachment {
    bone_count: usize,
    weights: Vec<Vec<f64>>,
    nonzero: Vec<SmallVec<[(u32, f64); 8]>>,
}

impl Attachment {
    /// Compute skinning weights for a mesh and an embedded skeleton.
    ///
    /// `embedding` holds one position per full-skeleton joint, in the same
    /// (normalized) frame as the mesh. Bone `j` spans full joints `j + 1`
    /// and that joint's parent.
    ///
    /// For each vertex the nearest bones are found; those that are
    /// interior-visible from the vertex and lie inside its normal cone
    /// become heat sources. A single cotangent-Laplacian-plus-heat matrix
    /// is factored once and solved per bone, then weights are clipped to
    /// `[0, 1]`, thresholded, and renormalized.
    ///
    /// # Errors
    ///
    /// Returns an error when the embedding size disagrees with the
    /// skeleton, the heat system is not positive definite, or some vertex
    /// ends up with no bone influence.
    #[allow(clippy::too_many_lines)]
    pub fn new(
        mesh: &Mesh,
        skeleton: &Skeleton,
        embedding: &[Point3<f64>],
        tester: &VisibilityTester<'_>,
        initial_heat_weight: f64,
    ) -> AttachResult<Self> {
        if embedding.len() != skeleton.full_count() {
            return Err(AttachError::EmbeddingMismatch {
                expected: skeleton.full_count(),
                got: embedding.len(),
            });
        }

        let nv = mesh.vertex_count();
        let bones = skeleton.bone_count();
        let parent = skeleton.full_parent();

        let rings: Vec<Vec<u32>> = (0..nv).map(|i| mesh.one_ring(i)).collect();

        // the two endpoints of each bone
        let bone_ends: Vec<(Point3<f64>, Point3<f64>)> = (0..bones)
            .map(|j| {
                #[allow(clippy::cast_sign_loss)]
                let p = parent[j + 1] as usize;
                (embedding[j + 1], embedding[p])
            })
            .collect();

        let mut bone_dists: Vec<Vec<f64>> = vec![vec![0.0; bones]; nv];
        let mut bone_vis: Vec<Vec<bool>> = vec![vec![false; bones]; nv];

        for i in 0..nv {
            let pos = mesh.vertices[i].position;
            let ring = &rings[i];

            let normals: Vec<Vector3<f64>> = (0..ring.len())
                .map(|j| {
                    let nj = (j + 1) % ring.len();
                    let v1 = mesh.vertices[ring[j] as usize].position - pos;
                    let v2 = mesh.vertices[ring[nj] as usize].position - pos;
                    v1.cross(&v2).try_normalize(0.0).unwrap_or_else(Vector3::zeros)
                })
                .collect();

            let mut min_dist = f64::MAX;
            for (j, &(a, b)) in bone_ends.iter().enumerate() {
                bone_dists[i][j] = point_segment_distance_squared(pos, a, b).sqrt();
                min_dist = min_dist.min(bone_dists[i][j]);
            }
            for (j, &(a, b)) in bone_ends.iter().enumerate() {
                // when several bones are equally close, all of them get
                // factored in, not just the first
                if bone_dists[i][j] > min_dist * NEAREST_SLACK {
                    continue;
                }
                let p = closest_point_on_segment(pos, a, b);
                bone_vis[i][j] = tester.can_see(pos, p) && vector_in_cone(pos - p, &normals);
            }
        }

        // we solve (H - L) w = H·1_nearest with H - L = D A, D = diag(1/area)
        let mut rows: Vec<Vec<(usize, f64)>> = vec![Vec::new(); nv];
        let mut inv_area = vec![0.0f64; nv];
        let mut heat = vec![0.0f64; nv];
        let mut closest = vec![usize::MAX; nv];

        for i in 0..nv {
            let pos = mesh.vertices[i].position;
            let ring = &rings[i];

            // twice the 1-ring area: cross-product magnitudes
            let mut area = 0.0;
            for j in 0..ring.len() {
                let nj = (j + 1) % ring.len();
                let v1 = mesh.vertices[ring[j] as usize].position - pos;
                let v2 = mesh.vertices[ring[nj] as usize].position - pos;
                area += v1.cross(&v2).norm();
            }
            inv_area[i] = 1.0 / (1e-10 + area);

            let mut min_dist = f64::MAX;
            for j in 0..bones {
                if bone_dists[i][j] < min_dist {
                    closest[i] = j;
                    min_dist = bone_dists[i][j];
                }
            }
            for j in 0..bones {
                if bone_vis[i][j] && bone_dists[i][j] <= min_dist * 1.000_01 {
                    let d = 1e-8 + bone_dists[i][closest[i]];
                    heat[i] += initial_heat_weight / (d * d);
                }
            }

            // cotangent Laplacian row
            let mut sum = 0.0;
            for j in 0..ring.len() {
                let nj = (j + 1) % ring.len();
                let pj = (j + ring.len() - 1) % ring.len();

                let prev = mesh.vertices[ring[pj] as usize].position;
                let next = mesh.vertices[ring[nj] as usize].position;
                let other = mesh.vertices[ring[j] as usize].position;

                let v1 = pos - prev;
                let v2 = other - prev;
                let v3 = pos - next;
                let v4 = other - next;

                let cot1 = v1.dot(&v2) / (1e-6 + v1.cross(&v2).norm());
                let cot2 = v3.dot(&v4) / (1e-6 + v3.cross(&v4).norm());
                sum += cot1 + cot2;

                // lower triangle only; the sum runs over the full ring
                if (ring[j] as usize) > i {
                    continue;
                }
                rows[i].push((ring[j] as usize, -cot1 - cot2));
            }
            rows[i].push((i, sum + heat[i] / inv_area[i]));
            rows[i].sort_unstable_by_key(|&(c, _)| c);
        }

        let llt = SpdMatrix::from_lower_rows(rows)?.factor()?;

        let mut nonzero: Vec<SmallVec<[(u32, f64); 8]>> = vec![SmallVec::new(); nv];
        for j in 0..bones {
            let mut rhs = vec![0.0f64; nv];
            for i in 0..nv {
                if bone_vis[i][j] && bone_dists[i][j] <= bone_dists[i][closest[i]] * 1.000_01 {
                    rhs[i] = heat[i] / inv_area[i];
                }
            }
            let solution = llt.solve(&rhs);
            #[allow(clippy::cast_possible_truncation)]
            for (i, &w) in solution.iter().enumerate() {
                let w = w.min(1.0); // clip, just in case
                if w > WEIGHT_CUTOFF {
                    nonzero[i].push((j as u32, w));
                }
            }
        }

        // renormalize to a partition of unity and build the dense form
        let mut weights = vec![vec![0.0f64; bones]; nv];
        for i in 0..nv {
            let sum: f64 = nonzero[i].iter().map(|&(_, w)| w).sum();
            if sum <= 0.0 {
                return Err(AttachError::NoInfluence { vertex: i });
            }
            for (bone, w) in &mut nonzero[i] {
                *w /= sum;
                weights[i][*bone as usize] = *w;
            }
        }

        debug!(vertices = nv, bones, "attachment computed");

        Ok(Self {
            bone_count: bones,
            weights,
            nonzero,
        })
    }

    /// Number of bones the weights span.
    #[inline]
    #[must_use]
    pub fn bone_count(&self) -> usize {
        self.bone_count
    }

    /// Number of vertices the attachment was built for.
    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.weights.len()
    }

    /// Dense weight vector of a vertex (length = bone count).
    #[must_use]
    pub fn weights(&self, vertex: usize) -> &[f64] {
        &self.weights[vertex]
    }

    /// Sparse `(bone, weight)` pairs of a vertex, weights above `1e-8`.
    #[must_use]
    pub fn nonzero_weights(&self, vertex: usize) -> &[(u32, f64)] {
        &self.nonzero[vertex]
    }

    /// Pose a mesh by per-bone transforms (linear blend skinning).
    ///
    /// Each vertex moves to the weight-blended image of its position under
    /// the bone transforms; vertex normals are recomputed afterwards. The
    /// input mesh is not modified.
    ///
    /// # Errors
    ///
    /// Returns an error when the mesh or transform count does not match the
    /// attachment.
    pub fn deform(&self, mesh: &Mesh, transforms: &[Transform]) -> AttachResult<Mesh> {
        if mesh.vertex_count() != self.weights.len() {
            return Err(AttachError::MeshMismatch {
                expected: self.weights.len(),
                got: mesh.vertex_count(),
            });
        }
        if transforms.len() != self.bone_count {
            return Err(AttachError::TransformCount {
                expected: self.bone_count,
                got: transforms.len(),
            });
        }

        let mut out = mesh.clone();
        for (i, v) in out.vertices.iter_mut().enumerate() {
            let mut new_pos = Vector3::zeros();
            for &(bone, w) in &self.nonzero[i] {
                let moved = transforms[bone as usize].transform_point(&v.position);
                new_pos += moved.coords * w;
            }
            v.position = Point3::from(new_pos);
        }
        out.compute_vertex_normals();
        Ok(out)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;
    use rig_field::DistanceField;
    use rig_skeleton::SkeletonBuilder;

    /// A subdivided box mesh with welded shared edges and outward winding.
    fn subdivided_box(min: Point3<f64>, max: Point3<f64>, n: usize) -> Mesh {
        use std::collections::HashMap;
        let mut positions: Vec<Point3<f64>> = Vec::new();
        let mut index: HashMap<(i64, i64, i64), u32> = HashMap::new();
        let mut triangles: Vec<[u32; 3]> = Vec::new();

        let mut vert = |p: Point3<f64>| -> u32 {
            let key = (
                (p.x * 1e6).round() as i64,
                (p.y * 1e6).round() as i64,
                (p.z * 1e6).round() as i64,
            );
            *index.entry(key).or_insert_with(|| {
                positions.push(p);
                (positions.len() - 1) as u32
            })
        };

        for (axis, positive) in [(0, false), (0, true), (1, false), (1, true), (2, false), (2, true)]
        {
            let u = (axis + 1) % 3;
            let v = (axis + 2) % 3;
            let corner = |i: usize, j: usize| {
                let mut c = [0.0f64; 3];
                c[axis] = if positive { max[axis] } else { min[axis] };
                c[u] = min[u] + (max[u] - min[u]) * (i as f64) / (n as f64);
                c[v] = min[v] + (max[v] - min[v]) * (j as f64) / (n as f64);
                Point3::new(c[0], c[1], c[2])
            };
            for i in 0..n {
                for j in 0..n {
                    let p00 = vert(corner(i, j));
                    let p10 = vert(corner(i + 1, j));
                    let p11 = vert(corner(i + 1, j + 1));
                    let p01 = vert(corner(i, j + 1));
                    if positive {
                        triangles.push([p00, p10, p11]);
                        triangles.push([p00, p11, p01]);
                    } else {
                        triangles.push([p00, p11, p10]);
                        triangles.push([p00, p01, p11]);
                    }
                }
            }
        }

        Mesh::from_soup(positions, triangles).unwrap()
    }

    /// A tall box with a two-joint (single bone) skeleton down its axis.
    fn boxed_rig() -> (Mesh, Skeleton, Vec<Point3<f64>>) {
        let mesh = subdivided_box(
            Point3::new(0.35, 0.05, 0.35),
            Point3::new(0.65, 0.95, 0.65),
            4,
        );
        let skeleton = SkeletonBuilder::new()
            .joint("base", Point3::new(0.0, -0.5, 0.0), None)
            .joint("tip", Point3::new(0.0, 0.5, 0.0), Some("base"))
            .build()
            .unwrap();
        let embedding = vec![Point3::new(0.5, 0.2, 0.5), Point3::new(0.5, 0.8, 0.5)];
        (mesh, skeleton, embedding)
    }

    #[test]
    fn single_bone_gets_all_the_weight() {
        let (mesh, skeleton, embedding) = boxed_rig();
        let field = DistanceField::build(&mesh);
        let tester = VisibilityTester::new(&field);
        let attachment =
            Attachment::new(&mesh, &skeleton, &embedding, &tester, 1.0).unwrap();

        assert_eq!(attachment.bone_count(), 1);
        for i in 0..mesh.vertex_count() {
            assert_relative_eq!(attachment.weights(i)[0], 1.0, epsilon = 1e-9);
            assert_eq!(attachment.nonzero_weights(i).len(), 1);
        }
    }

    #[test]
    fn weights_partition_unity() {
        let (mesh, skeleton, embedding) = boxed_rig();
        let field = DistanceField::build(&mesh);
        let tester = VisibilityTester::new(&field);
        let attachment =
            Attachment::new(&mesh, &skeleton, &embedding, &tester, 1.0).unwrap();

        for i in 0..mesh.vertex_count() {
            let sum: f64 = attachment.weights(i).iter().sum();
            assert_relative_eq!(sum, 1.0, epsilon = 1e-9);
            for &w in attachment.weights(i) {
                assert!(w >= 0.0);
            }
        }
    }

    #[test]
    fn identity_deformation_is_identity() {
        let (mesh, skeleton, embedding) = boxed_rig();
        let field = DistanceField::build(&mesh);
        let tester = VisibilityTester::new(&field);
        let attachment =
            Attachment::new(&mesh, &skeleton, &embedding, &tester, 1.0).unwrap();

        let out = attachment.deform(&mesh, &[Transform::identity()]).unwrap();
        for (a, b) in out.vertices.iter().zip(&mesh.vertices) {
            assert_relative_eq!((a.position - b.position).norm(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn rotation_commutes_for_a_rigid_single_bone() {
        let (mesh, skeleton, embedding) = boxed_rig();
        let field = DistanceField::build(&mesh);
        let tester = VisibilityTester::new(&field);
        let attachment =
            Attachment::new(&mesh, &skeleton, &embedding, &tester, 1.0).unwrap();

        let rot = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f64::consts::FRAC_PI_2);
        let out = attachment
            .deform(&mesh, &[Transform::from_rotation(rot)])
            .unwrap();
        for (a, b) in out.vertices.iter().zip(&mesh.vertices) {
            let expected = rot.transform_point(&b.position);
            assert_relative_eq!((a.position - expected).norm(), 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn mismatched_transform_count_rejected() {
        let (mesh, skeleton, embedding) = boxed_rig();
        let field = DistanceField::build(&mesh);
        let tester = VisibilityTester::new(&field);
        let attachment =
            Attachment::new(&mesh, &skeleton, &embedding, &tester, 1.0).unwrap();
        assert!(matches!(
            attachment.deform(&mesh, &[]),
            Err(AttachError::TransformCount { .. })
        ));
    }

    #[test]
    fn embedding_size_checked() {
        let (mesh, skeleton, _) = boxed_rig();
        let field = DistanceField::build(&mesh);
        let tester = VisibilityTester::new(&field);
        let result = Attachment::new(&mesh, &skeleton, &[], &tester, 1.0);
        assert!(matches!(result, Err(AttachError::EmbeddingMismatch { .. })));
    }
}
