//! Interior geometry queries for automatic rigging.
//!
//! The embedding and attachment stages both reason about the *inside* of a
//! character mesh. This crate provides the machinery they share:
//!
//! - [`TriangleProjector`] - nearest-point-on-surface queries through a
//!   bounding-box hierarchy
//! - [`Intersector`] - all intersections of an axis-aligned line with the
//!   mesh, through a 2D grid over the projection plane
//! - [`DistanceField`] - an adaptive octree approximation of signed distance
//!   to the surface (positive outside), built over the normalized unit box
//! - [`VisibilityTester`] - "can `a` see `b` without leaving the interior?"
//!
//! # Example
//!
//! ```
//! use rig_mesh::{Mesh, Point3};
//! use rig_field::DistanceField;
//!
//! # fn tetra() -> Mesh {
//! #     let positions = vec![
//! #         Point3::new(0.2, 0.2, 0.2),
//! #         Point3::new(0.8, 0.2, 0.2),
//! #         Point3::new(0.2, 0.8, 0.2),
//! #         Point3::new(0.2, 0.2, 0.8),
//! #     ];
//! #     Mesh::from_soup(positions, vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]]).unwrap()
//! # }
//! let mesh = tetra();
//! let field = DistanceField::build(&mesh);
//! assert!(field.evaluate(Point3::new(0.3, 0.3, 0.3)) < 0.0); // inside
//! assert!(field.evaluate(Point3::new(0.9, 0.9, 0.9)) > 0.0); // outside
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod distance_field;
mod intersect;
mod project;
mod query;
mod visibility;

pub use distance_field::DistanceField;
pub use intersect::Intersector;
pub use project::TriangleProjector;
pub use query::{
    closest_point_on_segment, closest_point_on_triangle, point_segment_distance_squared,
};
pub use visibility::VisibilityTester;
