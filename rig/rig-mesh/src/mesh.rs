//! Half-edge mesh construction and validation.

use hashbrown::{HashMap, HashSet};
use nalgebra::{Point3, UnitQuaternion, Vector3};
use tracing::{debug, warn};

use crate::error::{MeshError, MeshResult};

/// Sentinel index for a half-edge reference that has not been linked yet.
///
/// A fully built mesh never contains this value; the integrity check treats
/// it as out of range.
pub const INVALID_EDGE: u32 = u32::MAX;

/// A mesh vertex: position, accumulated normal, and one outgoing half-edge.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vertex {
    /// Position in the current mesh frame.
    pub position: Point3<f64>,
    /// Unit vertex normal (sum of incident face normals, normalized).
    pub normal: Vector3<f64>,
    /// Index of one half-edge whose source is this vertex.
    pub edge: u32,
}

/// A directed half-edge belonging to exactly one triangle.
///
/// Half-edges are stored three per triangle, so the triangle of edge `e` is
/// `e / 3` and `next(e) = prev(prev(e))`.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HalfEdge {
    /// Target vertex of this half-edge.
    pub vertex: u32,
    /// Previous half-edge within the same triangle.
    pub prev: u32,
    /// The oppositely directed half-edge in the adjacent triangle.
    pub twin: u32,
}

/// A closed manifold triangle mesh with half-edge connectivity.
///
/// Built once from raw triangle soup via [`Mesh::from_soup`] and immutable
/// afterwards except for frame changes ([`Mesh::normalize_bounding_box`],
/// [`Mesh::apply_rotation`]) and normal recomputation.
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Vertex records.
    pub vertices: Vec<Vertex>,
    /// Half-edge arena; three consecutive entries per triangle.
    pub edges: Vec<HalfEdge>,
    /// Accumulated uniform scale applied by normalization.
    pub scale: f64,
    /// Accumulated translation applied by normalization.
    pub to_add: Vector3<f64>,
}

/// Sort a triangle's vertex indices to get an orientation-free key.
fn unordered_key(tri: [u32; 3]) -> [u32; 3] {
    let mut key = tri;
    key.sort_unstable();
    key
}

impl Mesh {
    /// Build a mesh from raw positions and triangles.
    ///
    /// Performs, in order: index validation, pairwise duplicate-face removal
    /// (two identical unordered triangles cancel; an odd copy survives),
    /// unreferenced-vertex compaction, half-edge construction with twin
    /// matching, the full integrity check, and vertex normal computation.
    ///
    /// # Errors
    ///
    /// Returns an error if a triangle references an out-of-range vertex, if
    /// two triangles induce the same directed edge, or if the resulting
    /// connectivity is not a closed orientable manifold.
    pub fn from_soup(positions: Vec<Point3<f64>>, triangles: Vec<[u32; 3]>) -> MeshResult<Self> {
        let vertex_count = positions.len();
        for tri in &triangles {
            for &index in tri {
                if index as usize >= vertex_count {
                    return Err(MeshError::InvalidVertexIndex {
                        index,
                        vertex_count,
                    });
                }
            }
        }

        let triangles = remove_duplicate_faces(triangles);
        let (positions, triangles) = compact_vertices(positions, triangles);

        if triangles.is_empty() {
            return Err(MeshError::Empty);
        }

        let mut mesh = Self {
            vertices: positions
                .into_iter()
                .map(|position| Vertex {
                    position,
                    normal: Vector3::zeros(),
                    edge: INVALID_EDGE,
                })
                .collect(),
            edges: Vec::with_capacity(triangles.len() * 3),
            scale: 1.0,
            to_add: Vector3::zeros(),
        };

        #[allow(clippy::cast_possible_truncation)]
        // Truncation: edge indices are u32; meshes with >1.4B triangles are unsupported
        for tri in &triangles {
            let base = mesh.edges.len() as u32;
            for (k, &vertex) in tri.iter().enumerate() {
                mesh.edges.push(HalfEdge {
                    vertex,
                    prev: base + ((k as u32) + 2) % 3,
                    twin: INVALID_EDGE,
                });
            }
        }

        mesh.compute_topology()?;
        mesh.integrity_check()?;
        mesh.compute_vertex_normals();

        debug!(
            vertices = mesh.vertices.len(),
            triangles = mesh.triangle_count(),
            "built half-edge mesh"
        );

        Ok(mesh)
    }

    /// Number of vertices.
    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    #[inline]
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.edges.len() / 3
    }

    /// Vertex indices of triangle `t`.
    #[inline]
    #[must_use]
    pub fn triangle(&self, t: usize) -> [u32; 3] {
        [
            self.edges[3 * t].vertex,
            self.edges[3 * t + 1].vertex,
            self.edges[3 * t + 2].vertex,
        ]
    }

    /// Iterator over the vertex-index triples of all triangles.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        (0..self.triangle_count()).map(|t| self.triangle(t))
    }

    /// Match twins and assign each vertex an outgoing half-edge.
    fn compute_topology(&mut self) -> MeshResult<()> {
        let mut directed: HashMap<(u32, u32), u32> = HashMap::with_capacity(self.edges.len());

        #[allow(clippy::cast_possible_truncation)]
        // Truncation: edge arena is indexed by u32 by construction
        for i in 0..self.edges.len() as u32 {
            let target = self.edges[i as usize].vertex;
            let source = self.edges[self.edges[i as usize].prev as usize].vertex;

            // next(i) leaves `target`, making it a valid outgoing edge.
            let prev = self.edges[i as usize].prev;
            self.vertices[target as usize].edge = self.edges[prev as usize].prev;

            if directed.insert((source, target), i).is_some() {
                warn!(from = source, to = target, "duplicate directed edge");
                return Err(MeshError::DuplicateDirectedEdge {
                    from: source,
                    to: target,
                });
            }
            if let Some(&twin) = directed.get(&(target, source)) {
                self.edges[twin as usize].twin = i;
                self.edges[i as usize].twin = twin;
            }
        }
        Ok(())
    }

    /// Verify all half-edge invariants.
    ///
    /// Checks index validity, the per-triangle 3-cycle of `prev` pointers,
    /// twin involution, source/target agreement between twins, the vertex
    /// outgoing-edge pointers, and that the edges around every vertex form a
    /// single cycle (manifoldness).
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::IntegrityViolation`] naming the first violated
    /// predicate; the predicate is also logged.
    pub fn integrity_check(&self) -> MeshResult<()> {
        macro_rules! check {
            ($pred:expr) => {
                if !($pred) {
                    warn!(predicate = stringify!($pred), "mesh integrity error");
                    return Err(MeshError::IntegrityViolation {
                        predicate: stringify!($pred),
                    });
                }
            };
        }

        let vs = self.vertices.len();
        let es = self.edges.len();

        if vs == 0 {
            // no vertices: there should be no edges either
            check!(es == 0);
            return Ok(());
        }

        check!(es > 0);

        for v in &self.vertices {
            check!((v.edge as usize) < es);
        }

        for e in &self.edges {
            check!((e.vertex as usize) < vs);
            check!((e.prev as usize) < es);
            check!((e.twin as usize) < es);
        }

        #[allow(clippy::cast_possible_truncation)]
        for i in 0..es as u32 {
            let e = &self.edges[i as usize];
            check!(e.prev != i); // no loops
            check!(self.edges[self.edges[e.prev as usize].prev as usize].prev == i); // triangles only
            check!(e.twin != i); // no self twins
            check!(self.edges[e.twin as usize].twin == i); // twin involution
            // the twin's target is this edge's source
            check!(self.edges[e.twin as usize].vertex == self.edges[e.prev as usize].vertex);
        }

        #[allow(clippy::cast_possible_truncation)]
        for i in 0..vs as u32 {
            let start = self.vertices[i as usize].edge;
            // the outgoing edge really leaves this vertex
            check!(self.edges[self.edges[start as usize].prev as usize].vertex == i);
        }

        // the edges around each vertex must form a single cycle
        let mut incident = vec![0usize; vs];
        for e in &self.edges {
            incident[e.vertex as usize] += 1;
        }

        for (i, &expected) in incident.iter().enumerate() {
            let start = self.vertices[i].edge;
            let mut cur = start;
            let mut count = 0usize;
            loop {
                cur = self.edges[self.edges[cur as usize].prev as usize].twin;
                count += 1;
                if cur == start || count > expected {
                    break;
                }
            }
            check!(count == expected); // single manifold cycle around the vertex
        }

        Ok(())
    }

    /// Check whether every vertex is reachable from vertex 0 along edges.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        if self.vertices.is_empty() {
            return false;
        }

        let mut reached = vec![false; self.vertices.len()];
        let mut todo = vec![0u32];
        reached[0] = true;
        let mut reached_count = 1usize;

        let mut next = 0usize;
        while next < todo.len() {
            let start = self.vertices[todo[next] as usize].edge;
            next += 1;
            let mut cur = start;
            loop {
                cur = self.edges[self.edges[cur as usize].prev as usize].twin;
                let v = self.edges[cur as usize].vertex;
                if !reached[v as usize] {
                    reached[v as usize] = true;
                    reached_count += 1;
                    todo.push(v);
                }
                if cur == start {
                    break;
                }
            }
        }

        reached_count == self.vertices.len()
    }

    /// Ordered 1-ring neighbors of vertex `v`.
    ///
    /// Walks the half-edge fan around the vertex; consecutive entries share
    /// a triangle with `v`.
    #[must_use]
    pub fn one_ring(&self, v: usize) -> Vec<u32> {
        let mut ring = Vec::new();
        let start = self.vertices[v].edge;
        let mut cur = start;
        loop {
            ring.push(self.edges[cur as usize].vertex);
            cur = self.edges[self.edges[cur as usize].prev as usize].twin;
            if cur == start {
                break;
            }
        }
        ring
    }

    /// Recompute vertex normals as the unit-normalized sum of incident face
    /// normals.
    ///
    /// Face normals enter the sum unweighted by area; this matches the
    /// attachment's normal-cone test and is part of the mesh contract.
    pub fn compute_vertex_normals(&mut self) {
        for v in &mut self.vertices {
            v.normal = Vector3::zeros();
        }
        for t in 0..self.triangle_count() {
            let [i1, i2, i3] = self.triangle(t);
            let p1 = self.vertices[i1 as usize].position;
            let p2 = self.vertices[i2 as usize].position;
            let p3 = self.vertices[i3 as usize].position;
            let normal = (p2 - p1)
                .cross(&(p3 - p1))
                .try_normalize(0.0)
                .unwrap_or_else(Vector3::zeros);
            self.vertices[i1 as usize].normal += normal;
            self.vertices[i2 as usize].normal += normal;
            self.vertices[i3 as usize].normal += normal;
        }
        for v in &mut self.vertices {
            v.normal = v.normal.try_normalize(0.0).unwrap_or_else(Vector3::zeros);
        }
    }

    /// Uniformly scale and translate the mesh into `[0.05, 0.95]³`.
    ///
    /// The dominant axis is scaled to extent 0.9 and the mesh is centered in
    /// the unit box. The applied transform accumulates into
    /// [`Mesh::scale`] / [`Mesh::to_add`] so that
    /// `normalized = to_add + original * scale` holds for the composition of
    /// all normalizations applied so far.
    pub fn normalize_bounding_box(&mut self) {
        let Some(first) = self.vertices.first() else {
            return;
        };
        let mut min = first.position;
        let mut max = first.position;
        for v in &self.vertices {
            min = min.inf(&v.position);
            max = max.sup(&v.position);
        }

        let extent = max - min;
        let cscale = 0.9 / extent.amax();
        let center = nalgebra::center(&min, &max);
        let cto_add = Vector3::new(0.5, 0.5, 0.5) - center.coords * cscale;

        for v in &mut self.vertices {
            v.position = Point3::from(cto_add + v.position.coords * cscale);
        }
        self.to_add = cto_add + self.to_add * cscale;
        self.scale *= cscale;
    }

    /// Rotate all vertex positions about the origin.
    ///
    /// Used to reorient the input before normalization; normals are
    /// recomputed afterwards.
    pub fn apply_rotation(&mut self, rotation: &UnitQuaternion<f64>) {
        for v in &mut self.vertices {
            v.position = rotation.transform_point(&v.position);
        }
        self.compute_vertex_normals();
    }

    /// Map a point from the current normalized frame back to the original
    /// input frame.
    #[must_use]
    pub fn to_original_frame(&self, p: Point3<f64>) -> Point3<f64> {
        Point3::from((p.coords - self.to_add) / self.scale)
    }

    /// Map a point from the original input frame into the current normalized
    /// frame.
    #[must_use]
    pub fn from_original_frame(&self, p: Point3<f64>) -> Point3<f64> {
        Point3::from(self.to_add + p.coords * self.scale)
    }
}

/// Remove duplicate faces pairwise: a face appearing an even number of times
/// (as an unordered vertex triple) vanishes entirely; an odd count leaves one
/// copy.
fn remove_duplicate_faces(triangles: Vec<[u32; 3]>) -> Vec<[u32; 3]> {
    let mut counts: HashMap<[u32; 3], usize> = HashMap::with_capacity(triangles.len());
    for tri in &triangles {
        *counts.entry(unordered_key(*tri)).or_insert(0) += 1;
    }

    let before = triangles.len();
    let mut emitted: HashSet<[u32; 3]> = HashSet::new();
    let kept: Vec<[u32; 3]> = triangles
        .into_iter()
        .filter(|tri| {
            let key = unordered_key(*tri);
            counts[&key] % 2 == 1 && emitted.insert(key)
        })
        .collect();

    if kept.len() != before {
        debug!(removed = before - kept.len(), "removed duplicate faces");
    }
    kept
}

/// Drop vertices referenced by no triangle and rewrite indices.
fn compact_vertices(
    positions: Vec<Point3<f64>>,
    triangles: Vec<[u32; 3]>,
) -> (Vec<Point3<f64>>, Vec<[u32; 3]>) {
    let mut referenced = vec![false; positions.len()];
    for tri in &triangles {
        for &i in tri {
            referenced[i as usize] = true;
        }
    }

    let mut new_index = vec![0u32; positions.len()];
    let mut kept = Vec::with_capacity(positions.len());
    #[allow(clippy::cast_possible_truncation)]
    for (i, position) in positions.into_iter().enumerate() {
        if referenced[i] {
            new_index[i] = kept.len() as u32;
            kept.push(position);
        }
    }

    let triangles = triangles
        .into_iter()
        .map(|tri| tri.map(|i| new_index[i as usize]))
        .collect();

    (kept, triangles)
}
