//! File I/O with errors mapped to `internal.io_error`.

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// `operation` ends up in the error's context.
pub fn read_file(path: &Path, operation: &str) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| Error::internal_io(e.to_string(), Some(operation.to_string())))
}

/// Write through a sibling `.tmp` file and rename it into place.
pub fn write_file_atomic(path: &Path, content: &str, operation: &str) -> Result<()> {
    let invalid = || {
        Error::internal_io(
            format!("Invalid path: {}", path.display()),
            Some(operation.to_string()),
        )
    };
    let parent = path.parent().ok_or_else(invalid)?;
    let file_name = path.file_name().ok_or_else(invalid)?;
    let tmp_path = parent.join(format!("{}.tmp", file_name.to_string_lossy()));

    fs::write(&tmp_path, content).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("{} (write temp)", operation)))
    })?;
    fs::rename(&tmp_path, path)
        .map_err(|e| Error::internal_io(e.to_string(), Some(format!("{} (rename)", operation))))
}
