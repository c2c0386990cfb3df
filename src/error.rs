//! Error types for embedded file access.

use std::io;
use thiserror::Error;

/// Errors raised while looking up or reading embedded files.
#[derive(Debug, Error)]
pub enum StaticError {
    #[error("empty path")]
    EmptyPath,

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to spool {path} into a temporary file: {source}")]
    TempFile {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("walk aborted at {path}: {reason}")]
    Visit { path: String, reason: String },
}

impl StaticError {
    /// Map an io error onto the not-found / other split.
    pub(crate) fn from_io(path: &str, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            StaticError::NotFound(path.to_string())
        } else {
            StaticError::Io {
                path: path.to_string(),
                source: err,
            }
        }
    }

    /// True when the error means "no such file" rather than an I/O fault.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StaticError::NotFound(_) | StaticError::EmptyPath)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let err = StaticError::from_io("a.txt", io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(err.is_not_found());

        let err = StaticError::from_io("a.txt", io::Error::new(io::ErrorKind::PermissionDenied, "no"));
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "failed to read a.txt: no");
    }
}
