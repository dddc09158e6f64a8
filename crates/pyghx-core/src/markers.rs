//! Small text marker files (sync timestamps, install fingerprints).
//!
//! Writes go through a temp file with a PID suffix, are fsynced, then renamed
//! over the target so a reader never sees a half-written token. There is no
//! compare-and-swap: concurrent writers race and the last rename wins.

use crate::{PyghxError, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::process;
use tracing::debug;

/// Read a marker and return its trimmed contents.
///
/// Returns `None` if the file doesn't exist or is empty.
pub fn read_marker(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path).map_err(|e| PyghxError::Io {
        message: format!("Failed to read {}", path.display()),
        path: Some(path.to_path_buf()),
        source: Some(e),
    })?;

    let token = content.trim();
    if token.is_empty() {
        Ok(None)
    } else {
        Ok(Some(token.to_string()))
    }
}

/// Replace a marker's contents atomically.
pub fn write_marker(path: &Path, token: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| PyghxError::Io {
                message: format!("Failed to create directory {}", parent.display()),
                path: Some(parent.to_path_buf()),
                source: Some(e),
            })?;
        }
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, process::id()));

    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| PyghxError::Io {
                message: format!("Failed to create temp file {}", temp_path.display()),
                path: Some(temp_path.clone()),
                source: Some(e),
            })?;

        file.write_all(token.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| PyghxError::Io {
                message: format!("Failed to write temp file {}", temp_path.display()),
                path: Some(temp_path.clone()),
                source: Some(e),
            })?;
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        PyghxError::Io {
            message: format!("Failed to rename {} to {}", temp_path.display(), path.display()),
            path: Some(path.to_path_buf()),
            source: Some(e),
        }
    })?;

    debug!("Wrote marker {}", path.display());
    Ok(())
}
