/// Error types for document processing operations.
use std::path::PathBuf;
use thiserror::Error;

/// Result type for document processing operations.
pub type Result<T> = std::result::Result<T, DocError>;

/// Errors arising from the container (ZIP) layer.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The input byte stream is not a valid ZIP-structured container.
    #[error("not a valid document container: {0}")]
    NotAContainer(String),

    /// An entry's path resolves outside the workspace root (zip-slip).
    #[error("entry path escapes the workspace root: {0}")]
    PathEscape(String),

    /// The primary text part is absent from the container.
    #[error("missing document part: {0}")]
    MissingPart(String),
}

/// Top-level error type for the processing pipeline.
///
/// Container-level failures abort the whole call; the workspace is always
/// released before one of these is returned. Token-level match failures are
/// never surfaced here; they are recovered locally by the replacer.
#[derive(Error, Debug)]
pub enum DocError {
    /// Container error
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Read/write failure during extract, mutate, or repack, with the
    /// offending path attached.
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The caller's cancellation signal was observed between stages.
    #[error("processing cancelled")]
    Cancelled,
}

impl DocError {
    /// Attach a path to a bare IO error.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DocError::Io {
            path: path.into(),
            source,
        }
    }
}
