//! Half-edge triangle mesh for automatic rigging.
//!
//! This crate provides the mesh representation the rigging pipeline is built
//! on:
//!
//! - [`Mesh`] - A closed manifold triangle mesh with half-edge connectivity
//! - [`Vertex`] / [`HalfEdge`] - The arena-indexed connectivity records
//! - [`Transform`] - A rigid + uniform-scale transform (rotate, scale, translate)
//!
//! # Connectivity model
//!
//! Every face is a triangle and every edge is represented by two directed
//! half-edges, one per adjacent face. Half-edges reference each other by
//! index into a single arena vector; there are no pointers and no ownership
//! cycles. For a half-edge `e`, `prev(e)` is the previous half-edge within
//! its triangle and `next(e) = prev(prev(e))`.
//!
//! # Coordinate handling
//!
//! All coordinates are `f64`. [`Mesh::normalize_bounding_box`] scales a mesh
//! into the unit box `[0.05, 0.95]³` and records the applied scale and
//! translation so results can be mapped back to the input frame.
//!
//! # Example
//!
//! ```
//! use rig_mesh::{Mesh, Point3};
//!
//! // A tetrahedron: the smallest closed manifold triangle mesh.
//! let positions = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//!     Point3::new(0.0, 0.0, 1.0),
//! ];
//! let triangles = vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]];
//!
//! let mesh = Mesh::from_soup(positions, triangles).unwrap();
//! assert_eq!(mesh.vertex_count(), 4);
//! assert_eq!(mesh.triangle_count(), 4);
//! assert!(mesh.is_connected());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod error;
mod mesh;
mod transform;

pub use error::{MeshError, MeshResult};
pub use mesh::{HalfEdge, Mesh, Vertex, INVALID_EDGE};
pub use transform::Transform;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point3, UnitQuaternion, Vector3};
