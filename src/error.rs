//! Centralized error types for mailrepack.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailrepack library.
#[derive(Error, Debug)]
pub enum RepackError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The metadata root directory does not exist.
    #[error("Metadata directory not found: {0}")]
    MetadataRootMissing(PathBuf),

    /// The metadata root exists but holds no account directories.
    #[error("No account directories found in: {0}")]
    NoAccounts(PathBuf),

    /// The archive sink rejected an operation.
    #[error("Archive error: {0}")]
    Archive(String),

    /// The configuration could not be interpreted.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience alias for `Result<T, RepackError>`.
pub type Result<T> = std::result::Result<T, RepackError>;

impl RepackError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// `true` for the two preconditions that abort a run before packaging.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MetadataRootMissing(_) | Self::NoAccounts(_))
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (prefer `RepackError::io`).
impl From<std::io::Error> for RepackError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(RepackError::MetadataRootMissing(PathBuf::from("x")).is_fatal());
        assert!(RepackError::NoAccounts(PathBuf::from("x")).is_fatal());
        assert!(!RepackError::Archive("boom".into()).is_fatal());
    }

    #[test]
    fn test_io_display_includes_path() {
        let err = RepackError::io(
            "/tmp/a.mbox",
            std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/tmp/a.mbox"));
        assert!(msg.contains("disk full"));
    }
}
