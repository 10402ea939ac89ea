//! Error types for skeleton construction.

use thiserror::Error;

/// Result type for skeleton operations.
pub type SkeletonResult<T> = Result<T, SkeletonError>;

/// Errors that can occur while building or reading a skeleton.
#[derive(Debug, Error)]
pub enum SkeletonError {
    /// A joint name was used twice.
    #[error("duplicate joint name `{name}`")]
    DuplicateJoint {
        /// The repeated name.
        name: String,
    },

    /// A parent, symmetry partner, foot, or fat reference names no joint.
    ///
    /// Joints must be declared parent-before-child.
    #[error("unknown joint name `{name}`")]
    UnknownJoint {
        /// The unresolved name.
        name: String,
    },

    /// Foot/fat flags only apply to joints that survive chain collapse.
    #[error("joint `{name}` is a collapsed chain interior and cannot carry foot/fat flags")]
    InteriorJoint {
        /// The flagged interior joint.
        name: String,
    },

    /// A skeleton must have exactly one root.
    #[error("skeleton has {count} root joints, expected exactly 1")]
    BadRootCount {
        /// Number of parentless joints found.
        count: usize,
    },

    /// A malformed row in a skeleton file.
    #[error("parse error on line {line}: {message}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// What was wrong.
        message: String,
    },

    /// I/O error from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
