//! Nearest-point-on-surface queries.

use nalgebra::Point3;
use rig_mesh::Mesh;

use crate::query::closest_point_on_triangle;

/// Axis-aligned box stored per hierarchy node.
#[derive(Debug, Clone, Copy)]
struct Aabb {
    min: Point3<f64>,
    max: Point3<f64>,
}

impl Aabb {
    fn of_triangle(tri: &[Point3<f64>; 3]) -> Self {
        let mut min = tri[0];
        let mut max = tri[0];
        for p in &tri[1..] {
            min = min.inf(p);
            max = max.sup(p);
        }
        Self { min, max }
    }

    fn union(self, other: Self) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    fn distance_squared_to(&self, p: Point3<f64>) -> f64 {
        let mut d = 0.0;
        for k in 0..3 {
            let c = p[k].clamp(self.min[k], self.max[k]);
            d += (p[k] - c) * (p[k] - c);
        }
        d
    }
}

#[derive(Debug, Clone, Copy)]
struct Node {
    rect: Aabb,
    /// −1 marks a leaf, in which case `child2` is the triangle index.
    child1: i32,
    child2: i32,
}

/// A median-split bounding-box hierarchy over mesh triangles answering
/// nearest-point queries.
///
/// Built once per mesh; queries descend best-first and prune subtrees whose
/// boxes are farther than the best point found so far.
#[derive(Debug, Clone)]
pub struct TriangleProjector {
    nodes: Vec<Node>,
    triangles: Vec<[Point3<f64>; 3]>,
}

impl TriangleProjector {
    /// Build the hierarchy for a mesh.
    ///
    /// # Panics
    ///
    /// Does not panic; an empty mesh yields a projector whose queries
    /// return the query point itself.
    #[must_use]
    pub fn new(mesh: &Mesh) -> Self {
        let triangles: Vec<[Point3<f64>; 3]> = mesh
            .triangles()
            .map(|[a, b, c]| {
                [
                    mesh.vertices[a as usize].position,
                    mesh.vertices[b as usize].position,
                    mesh.vertices[c as usize].position,
                ]
            })
            .collect();

        let mut projector = Self {
            nodes: Vec::with_capacity(triangles.len().saturating_mul(2)),
            triangles,
        };
        if !projector.triangles.is_empty() {
            #[allow(clippy::cast_possible_truncation)]
            let order: Vec<u32> = (0..projector.triangles.len() as u32).collect();
            projector.build(order, 0);
        }
        projector
    }

    /// Recursively build a subtree over `order`, splitting at the median
    /// along the cycling dimension. Returns the node index.
    fn build(&mut self, mut order: Vec<u32>, dim: usize) -> i32 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let out = self.nodes.len() as i32;
        self.nodes.push(Node {
            rect: Aabb::of_triangle(&self.triangles[order[0] as usize]),
            child1: -1,
            child2: 0,
        });

        if order.len() == 1 {
            #[allow(clippy::cast_possible_wrap)]
            {
                self.nodes[out as usize].child2 = order[0] as i32;
            }
            return out;
        }

        // median split by triangle centroid along the current dimension
        let centroid = |t: u32| -> f64 {
            let tri = &self.triangles[t as usize];
            tri[0][dim] + tri[1][dim] + tri[2][dim]
        };
        let mid = order.len() / 2;
        order.select_nth_unstable_by(mid, |&a, &b| {
            centroid(a)
                .partial_cmp(&centroid(b))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let right = order.split_off(mid);

        let child1 = self.build(order, (dim + 1) % 3);
        let child2 = self.build(right, (dim + 1) % 3);
        let rect = self.nodes[child1 as usize]
            .rect
            .union(self.nodes[child2 as usize].rect);
        let node = &mut self.nodes[out as usize];
        node.rect = rect;
        node.child1 = child1;
        node.child2 = child2;
        out
    }

    /// Nearest point on the surface to `from`.
    #[must_use]
    pub fn project(&self, from: Point3<f64>) -> Point3<f64> {
        if self.nodes.is_empty() {
            return from;
        }

        let mut best_dist_sq = f64::MAX;
        let mut best = from;

        let mut todo: Vec<(f64, i32)> = Vec::with_capacity(64);
        todo.push((self.nodes[0].rect.distance_squared_to(from), 0));

        while let Some((lower, cur)) = todo.pop() {
            if lower > best_dist_sq {
                continue;
            }
            let node = self.nodes[cur as usize];

            if node.child1 >= 0 {
                let l1 = self.nodes[node.child1 as usize]
                    .rect
                    .distance_squared_to(from);
                if l1 < best_dist_sq {
                    todo.push((l1, node.child1));
                }
                let l2 = self.nodes[node.child2 as usize]
                    .rect
                    .distance_squared_to(from);
                if l2 < best_dist_sq {
                    todo.push((l2, node.child2));
                }
                // visit the closer child first
                let n = todo.len();
                if n >= 2 && todo[n - 1].0 > todo[n - 2].0 {
                    todo.swap(n - 1, n - 2);
                }
                continue;
            }

            let tri = &self.triangles[node.child2 as usize];
            let candidate = closest_point_on_triangle(from, tri[0], tri[1], tri[2]);
            let dist_sq = (from - candidate).norm_squared();
            if dist_sq <= best_dist_sq {
                best_dist_sq = dist_sq;
                best = candidate;
            }
        }

        best
    }

    /// Unsigned distance from `from` to the surface.
    #[must_use]
    pub fn distance(&self, from: Point3<f64>) -> f64 {
        (from - self.project(from)).norm()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tetra() -> Mesh {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        Mesh::from_soup(positions, vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]]).unwrap()
    }

    #[test]
    fn projects_onto_nearest_face() {
        let projector = TriangleProjector::new(&tetra());
        // straight below the z=0 face
        let p = projector.project(Point3::new(0.2, 0.2, -1.0));
        assert_relative_eq!((p - Point3::new(0.2, 0.2, 0.0)).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn projects_onto_vertex() {
        let projector = TriangleProjector::new(&tetra());
        let p = projector.project(Point3::new(2.0, -1.0, -1.0));
        assert_relative_eq!((p - Point3::new(1.0, 0.0, 0.0)).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn matches_brute_force() {
        let mesh = tetra();
        let projector = TriangleProjector::new(&mesh);
        let queries = [
            Point3::new(0.3, 0.3, 0.3),
            Point3::new(-0.5, 0.4, 0.2),
            Point3::new(1.5, 1.5, 1.5),
            Point3::new(0.1, 0.1, 0.05),
        ];
        for q in queries {
            let fast = projector.distance(q);
            let brute = mesh
                .triangles()
                .map(|[a, b, c]| {
                    let t = [
                        mesh.vertices[a as usize].position,
                        mesh.vertices[b as usize].position,
                        mesh.vertices[c as usize].position,
                    ];
                    (q - closest_point_on_triangle(q, t[0], t[1], t[2])).norm()
                })
                .fold(f64::MAX, f64::min);
            assert_relative_eq!(fast, brute, epsilon = 1e-12);
        }
    }
}
