//! Input resolution: read the user-supplied Markdown file into memory.
//!
//! The file is opened, read in full and closed before any later stage runs.
//! I/O failures are mapped to distinct [`Md2PdfError`] variants so the CLI
//! can tell "no such file" apart from "no permission".

use crate::error::Md2PdfError;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Read the Markdown source at `path` as UTF-8 text.
pub fn read_source(path: &Path) -> Result<String, Md2PdfError> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Md2PdfError::InputNotFound {
            path: path.to_path_buf(),
        },
        ErrorKind::PermissionDenied => Md2PdfError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => Md2PdfError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    debug!("Read {} bytes from {}", content.len(), path.display());
    Ok(content)
}
