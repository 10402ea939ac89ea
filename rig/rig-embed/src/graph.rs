//! Proximity graph over packed spheres.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rig_field::DistanceField;
use tracing::debug;

use crate::packing::PackedSphere;
use crate::EmbedParams;

/// A weighted graph whose vertices are packed-sphere centers.
///
/// Two spheres are connected when their centers are within the sum of their
/// radii plus a small slack and the midpoint of the connecting segment is
/// interior. Edge lengths are Euclidean distances between centers.
#[derive(Debug, Clone)]
pub struct SphereGraph {
    spheres: Vec<PackedSphere>,
    adjacency: Vec<Vec<u32>>,
}

#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    distance: f64,
    vertex: u32,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.vertex == other.vertex && (self.distance - other.distance).abs() < f64::EPSILON
    }
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed: BinaryHeap is a max-heap
        other
            .distance
            .partial_cmp(&self.distance)
            .unwrap_or(Ordering::Equal)
    }
}

impl SphereGraph {
    /// Connect packed spheres into a proximity graph.
    #[must_use]
    pub fn connect(
        spheres: Vec<PackedSphere>,
        field: &DistanceField,
        params: &EmbedParams,
    ) -> Self {
        let n = spheres.len();
        let mut adjacency: Vec<Vec<u32>> = vec![Vec::new(); n];

        #[allow(clippy::cast_possible_truncation)]
        for i in 0..n {
            for j in (i + 1)..n {
                let a = &spheres[i];
                let b = &spheres[j];
                let gap = (a.center - b.center).norm();
                if gap > a.radius + b.radius + params.sphere_slack {
                    continue;
                }
                let mid = nalgebra::center(&a.center, &b.center);
                if field.evaluate(mid) >= 0.0 {
                    continue; // the connecting segment surfaces
                }
                adjacency[i].push(j as u32);
                adjacency[j].push(i as u32);
            }
        }

        let edges = adjacency.iter().map(Vec::len).sum::<usize>() / 2;
        debug!(vertices = n, edges, "connected sphere graph");

        Self { spheres, adjacency }
    }

    /// Number of vertices.
    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.spheres.len()
    }

    /// The packed spheres, indexed by vertex.
    #[must_use]
    pub fn spheres(&self) -> &[PackedSphere] {
        &self.spheres
    }

    /// Neighbors of a vertex.
    #[must_use]
    pub fn neighbors(&self, v: usize) -> &[u32] {
        &self.adjacency[v]
    }

    /// Single-source shortest path distances by Dijkstra's algorithm.
    ///
    /// Unreachable vertices get `f64::INFINITY`.
    #[must_use]
    pub fn distances_from(&self, source: usize) -> Vec<f64> {
        let n = self.spheres.len();
        let mut dist = vec![f64::INFINITY; n];
        dist[source] = 0.0;

        let mut heap = BinaryHeap::new();
        #[allow(clippy::cast_possible_truncation)]
        heap.push(HeapEntry {
            distance: 0.0,
            vertex: source as u32,
        });

        while let Some(HeapEntry { distance, vertex }) = heap.pop() {
            let v = vertex as usize;
            if distance > dist[v] {
                continue;
            }
            for &u in &self.adjacency[v] {
                let edge =
                    (self.spheres[v].center - self.spheres[u as usize].center).norm();
                let next = distance + edge;
                if next < dist[u as usize] {
                    dist[u as usize] = next;
                    heap.push(HeapEntry {
                        distance: next,
                        vertex: u,
                    });
                }
            }
        }

        dist
    }

    /// All-pairs shortest path distances.
    #[must_use]
    pub fn all_pairs_distances(&self) -> Vec<Vec<f64>> {
        (0..self.spheres.len())
            .map(|v| self.distances_from(v))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use nalgebra::Point3;
    use rig_mesh::Mesh;

    fn slab_field() -> DistanceField {
        // a wide flat box so several spheres pack side by side
        let positions = vec![
            Point3::new(0.05, 0.35, 0.35),
            Point3::new(0.95, 0.35, 0.35),
            Point3::new(0.95, 0.65, 0.35),
            Point3::new(0.05, 0.65, 0.35),
            Point3::new(0.05, 0.35, 0.65),
            Point3::new(0.95, 0.35, 0.65),
            Point3::new(0.95, 0.65, 0.65),
            Point3::new(0.05, 0.65, 0.65),
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
        let mesh = Mesh::from_soup(positions, triangles).unwrap();
        DistanceField::build(&mesh)
    }

    #[test]
    fn graph_is_connected_along_the_slab() {
        let field = slab_field();
        let params = EmbedParams::default();
        let spheres = crate::pack_spheres(&field, &params);
        assert!(spheres.len() >= 2, "expected several spheres in the slab");

        let graph = SphereGraph::connect(spheres, &field, &params);
        let dist = graph.distances_from(0);
        let reachable = dist.iter().filter(|d| d.is_finite()).count();
        assert_eq!(reachable, graph.vertex_count());
    }

    #[test]
    fn distances_satisfy_triangle_inequality_to_neighbors() {
        let field = slab_field();
        let params = EmbedParams::default();
        let spheres = crate::pack_spheres(&field, &params);
        let graph = SphereGraph::connect(spheres, &field, &params);

        let all = graph.all_pairs_distances();
        for v in 0..graph.vertex_count() {
            assert_eq!(all[v][v], 0.0);
            for &u in graph.neighbors(v) {
                let edge = (graph.spheres()[v].center - graph.spheres()[u as usize].center).norm();
                assert!(all[v][u as usize] <= edge + 1e-12);
            }
        }
    }
}
