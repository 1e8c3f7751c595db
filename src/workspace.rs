//! Per-job extraction workspace.
//!
//! A [`Workspace`] owns one uniquely named temporary directory for the
//! duration of a single processing call. Ownership is exclusive: the
//! directory is created when the job starts and recursively deleted when the
//! `Workspace` is dropped, on every exit path: success, replacement failure,
//! archive error, or cancellation. Nothing is cached between jobs, so
//! concurrent invocations never share mutable state.

use crate::error::{ArchiveError, DocError, Result};
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;

/// An exclusively owned extraction directory for one processing job.
pub struct Workspace {
    root: TempDir,
}

impl Workspace {
    /// Create a fresh workspace under the system temp directory.
    ///
    /// The directory name is unique per call, so simultaneous jobs cannot
    /// collide.
    pub fn create() -> Result<Self> {
        let root = tempfile::Builder::new()
            .prefix("docstamp-")
            .tempdir()
            .map_err(|e| DocError::io(std::env::temp_dir(), e))?;
        Ok(Self { root })
    }

    /// The workspace root directory.
    #[inline]
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Resolve an archive-relative path against the workspace root,
    /// rejecting anything that would land outside it.
    ///
    /// Absolute paths, drive prefixes, and `..` components are all refused
    /// with [`ArchiveError::PathEscape`]; containment is checked on the
    /// stored path itself, before anything touches the filesystem.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let path = Path::new(relative);
        for component in path.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {},
                _ => {
                    return Err(ArchiveError::PathEscape(relative.to_string()).into());
                },
            }
        }
        Ok(self.root.path().join(path))
    }

    /// Read a file below the root, by archive-relative path.
    ///
    /// Returns [`ArchiveError::MissingPart`] when the file does not exist,
    /// so callers can distinguish an absent part from a read failure.
    pub fn read_part(&self, relative: &str) -> Result<Vec<u8>> {
        let path = self.resolve(relative)?;
        if !path.is_file() {
            return Err(ArchiveError::MissingPart(relative.to_string()).into());
        }
        std::fs::read(&path).map_err(|e| DocError::io(path, e))
    }

    /// Write a file below the root, creating parent directories as needed.
    pub fn write_part(&self, relative: &str, content: &[u8]) -> Result<()> {
        let path = self.resolve(relative)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DocError::io(parent.to_path_buf(), e))?;
        }
        std::fs::write(&path, content).map_err(|e| DocError::io(path, e))
    }

    /// Explicitly tear the workspace down, surfacing any deletion error.
    ///
    /// Dropping the workspace performs the same cleanup with errors ignored;
    /// this variant exists for callers that want to observe them.
    pub fn close(self) -> Result<()> {
        let path = self.root.path().to_path_buf();
        self.root.close().map_err(|e| DocError::io(path, e))
    }
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("root", &self.root.path())
            .finish()
    }
}
