//! Error types for mesh I/O.

use thiserror::Error;

/// Result type for mesh I/O operations.
pub type IoResult<T> = Result<T, IoError>;

/// Errors that can occur while reading or writing mesh files.
#[derive(Debug, Error)]
pub enum IoError {
    /// Unrecognized file extension.
    #[error("unknown file format: .{extension}")]
    UnknownFormat {
        /// The unrecognized extension.
        extension: String,
    },

    /// A malformed record; the read is aborted.
    #[error("parse error on line {line}: {message}")]
    Parse {
        /// 1-based line number of the offending record.
        line: usize,
        /// What was wrong.
        message: String,
    },

    /// The file parsed but contained no usable geometry.
    #[error("file contains no triangles")]
    NoGeometry,

    /// Topology construction rejected the parsed soup.
    #[error(transparent)]
    Mesh(#[from] rig_mesh::MeshError),

    /// I/O error from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IoError {
    /// Create a `Parse` error for the given line.
    #[must_use]
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}
