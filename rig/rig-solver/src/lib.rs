//! Sparse linear algebra for the rigging pipeline.
//!
//! Two layers:
//!
//! - [`SpdMatrix`] / [`Llt`] - a sparse symmetric positive-definite matrix
//!   stored as its lower triangle, factored as `P A Pᵀ = L D Lᵀ` with a
//!   fill-reducing minimum-degree permutation, supporting repeated solves
//! - [`LsqSystem`] - sparse linear least squares over opaque variable
//!   handles, with hard equality constraints pivoted out by Gaussian
//!   elimination before the normal equations are formed
//!
//! The attachment stage factors one Laplacian-plus-heat matrix and solves it
//! once per bone, so factorization cost is paid once and solves are cheap
//! triangular passes.
//!
//! # Example
//!
//! ```
//! use rig_solver::SpdMatrix;
//!
//! // the lower triangle of a 2x2 SPD matrix [[4, 1], [1, 5]]
//! let m = SpdMatrix::from_lower_rows(vec![
//!     vec![(0, 4.0)],
//!     vec![(0, 1.0), (1, 5.0)],
//! ]).unwrap();
//! let llt = m.factor().unwrap();
//! let x = llt.solve(&[5.0, 6.0]);
//! assert!((4.0 * x[0] + x[1] - 5.0).abs() < 1e-12);
//! assert!((x[0] + 5.0 * x[1] - 6.0).abs() < 1e-12);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod error;
mod lsq;
mod spd;

pub use error::{SolveError, SolveResult};
pub use lsq::{ConstraintId, LsqSystem, VarId};
pub use spd::{Llt, SpdMatrix};
