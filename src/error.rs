//! Error types for the index and scan engine

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the engine
///
/// The four named kinds are configuration/invariant violations raised at the
/// point they happen. Filesystem failures are carried through unmodified.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Given path is not a directory: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Invalid status '{0}': expected Safe, Dangerous or Not scanned")]
    InvalidStatus(String),

    #[error("Fingerprint of a file cannot be empty")]
    EmptyFingerprint,

    #[error("Signature source {} is empty", .0.display())]
    EmptySignatureSet(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk directory tree: {0}")]
    Walk(#[from] walkdir::Error),
}

impl EngineError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
