//! Platform-specific path utilities.
//!
//! This module provides functions to get platform-specific paths for:
//! - Python virtual environment executables
//! - A package's importable source roots

use crate::config::InstallConfig;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Get the path to the Python executable within a virtual environment.
///
/// # Platform Behavior
/// - **Linux/macOS**: `{package}/{venv_dir}/bin/python`
/// - **Windows**: `{package}/{venv_dir}/Scripts/python.exe`
pub fn venv_python(package_path: &Path, venv_dir_name: &str) -> PathBuf {
    #[cfg(windows)]
    {
        package_path
            .join(venv_dir_name)
            .join("Scripts")
            .join("python.exe")
    }
    #[cfg(not(windows))]
    {
        package_path.join(venv_dir_name).join("bin").join("python")
    }
}

/// Interpreter to run a package with: its own venv when one exists, otherwise
/// `fallback`.
pub fn resolve_python(package_path: &Path, venv_dir_name: &str, fallback: &Path) -> PathBuf {
    let candidate = venv_python(package_path, venv_dir_name);
    if candidate.exists() {
        debug!("Using package virtual environment: {}", candidate.display());
        candidate
    } else {
        fallback.to_path_buf()
    }
}

/// Directories to put on the import path for an uninstalled package, highest
/// priority first: `{package}/src` when present, then the package root.
pub fn source_roots(package_path: &Path) -> Vec<PathBuf> {
    let src = package_path.join(InstallConfig::DEFAULT_SOURCE_DIR_NAME);
    let mut roots = Vec::with_capacity(2);
    if src.is_dir() {
        roots.push(src);
    }
    roots.push(package_path.to_path_buf());
    roots
}
