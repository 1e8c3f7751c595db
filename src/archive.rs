//! Container (ZIP) unpacking and repacking.
//!
//! OOXML word documents are ZIP-structured packages. The unpacker expands a
//! container byte stream into a [`Workspace`]; the repacker walks the
//! workspace tree and serializes it back into a complete container. Both
//! directions go through [`Workspace::resolve`], so no entry can ever be
//! written outside the workspace root.

use crate::error::{ArchiveError, DocError, Result};
use crate::workspace::Workspace;
use std::io::{Cursor, Read, Write};
use walkdir::WalkDir;
use zip::write::{SimpleFileOptions, ZipWriter};

/// Expand a container byte stream into the workspace.
///
/// Every entry is containment-checked before extraction; an entry whose
/// stored path escapes the root aborts the whole unpack with
/// [`ArchiveError::PathEscape`]. Directory entries are created empty, file
/// entries are written with their stored unix permission bits preserved.
/// No entry is silently dropped.
pub fn unpack(container: &[u8], workspace: &Workspace) -> Result<()> {
    let mut archive = zip::ZipArchive::new(Cursor::new(container))
        .map_err(|e| ArchiveError::NotAContainer(e.to_string()))?;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| ArchiveError::NotAContainer(e.to_string()))?;

        let name = entry.name().to_string();
        let path = workspace.resolve(&name)?;

        if entry.is_dir() {
            std::fs::create_dir_all(&path).map_err(|e| DocError::io(path, e))?;
            continue;
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DocError::io(parent.to_path_buf(), e))?;
        }

        let mut content = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut content)
            .map_err(|e| DocError::io(&path, e))?;
        std::fs::write(&path, &content).map_err(|e| DocError::io(&path, e))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode))
                .map_err(|e| DocError::io(&path, e))?;
        }
    }

    Ok(())
}

/// Serialize the workspace tree back into a container.
///
/// Each regular file becomes one deflated entry under its path relative to
/// the workspace root, with separators normalized to forward slashes (a
/// requirement of the package format, not a host-filesystem detail). The
/// result is always a complete, closed container or an error.
pub fn pack(workspace: &Workspace) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for item in WalkDir::new(workspace.root()).sort_by_file_name() {
        let item = item.map_err(|e| {
            let path = e
                .path()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| workspace.root().to_path_buf());
            match e.into_io_error() {
                Some(io) => DocError::io(path, io),
                None => DocError::io(path, std::io::Error::other("walk error")),
            }
        })?;

        if !item.file_type().is_file() {
            continue;
        }

        let relative = item
            .path()
            .strip_prefix(workspace.root())
            .expect("walked path is below the workspace root");
        let name = entry_name(relative);

        let content =
            std::fs::read(item.path()).map_err(|e| DocError::io(item.path().to_path_buf(), e))?;

        writer
            .start_file(name, options)
            .map_err(|e| DocError::io(item.path().to_path_buf(), std::io::Error::other(e)))?;
        writer
            .write_all(&content)
            .map_err(|e| DocError::io(item.path().to_path_buf(), e))?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| DocError::io(workspace.root().to_path_buf(), std::io::Error::other(e)))?;
    Ok(cursor.into_inner())
}

/// Join path components with `/`, regardless of the host separator.
fn entry_name(relative: &std::path::Path) -> String {
    let mut name = String::new();
    for component in relative.components() {
        if !name.is_empty() {
            name.push('/');
        }
        name.push_str(&component.as_os_str().to_string_lossy());
    }
    name
}
