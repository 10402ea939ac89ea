//! Template skeletons for automatic rigging.
//!
//! A [`Skeleton`] is a tree of named joints with approximate positions,
//! symmetry pairs, and `foot`/`fat` hints. Alongside the *full* joint graph
//! it carries a derived *reduced* graph in which maximal chains of degree-2
//! interior joints are collapsed; each reduced edge is a **bone**, the unit
//! the embedder places and the attachment weights against.
//!
//! Joint positions are specified in the symmetric `[-1, 1]` range and halved
//! on insert, so built skeletons live in `[-0.5, 0.5]` and scale into a mesh
//! normalized to the unit box.
//!
//! # Example
//!
//! ```
//! use rig_skeleton::Skeleton;
//!
//! let human = Skeleton::human();
//! assert_eq!(human.full_count(), 18);
//! // shoulders, hips, head, two feet, two hands survive the collapse
//! assert_eq!(human.reduced_count(), 7);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod builtin;
mod error;
mod file;
mod skeleton;

pub use error::{SkeletonError, SkeletonResult};
pub use skeleton::{Skeleton, SkeletonBuilder};
