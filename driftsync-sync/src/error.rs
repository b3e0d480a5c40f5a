//! Error types for driftsync-sync.

use std::io::ErrorKind;
use std::path::PathBuf;

use thiserror::Error;

/// Failures reported by a [`crate::FileAccessor`].
#[derive(Debug, Error)]
pub enum AccessError {
    /// `read`, `write` of an existing file or `delete` targeted a missing path.
    #[error("file not found: {path}")]
    NotFound { path: PathBuf },

    /// `create` targeted a path that already exists.
    #[error("file already exists: {path}")]
    AlreadyExists { path: PathBuf },

    /// The path is absolute or climbs out of the accessor's root.
    #[error("path escapes the workspace root: {path}")]
    OutsideRoot { path: PathBuf },

    /// Any other I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Map an `io::Error` to the matching [`AccessError`] variant.
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> AccessError {
    let path = path.into();
    match source.kind() {
        ErrorKind::NotFound => AccessError::NotFound { path },
        ErrorKind::AlreadyExists => AccessError::AlreadyExists { path },
        _ => AccessError::Io { path, source },
    }
}
