//! Error types for pyghx.
//!
//! Every fatal stage of a run maps to one variant here. Recoverable
//! conditions (a failed pull, an unreadable metadata file) are logged where
//! they happen and never reach the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the pyghx engine.
#[derive(Debug, Error)]
pub enum PyghxError {
    // Locator errors
    #[error("Invalid GitHub URL format: {input}")]
    InvalidLocator { input: String },

    // Repository cache errors
    #[error("Failed to clone {url} (branch {branch}): {message}")]
    Clone {
        url: String,
        branch: String,
        message: String,
    },

    #[error("Failed to pull branch {branch} in {path:?}: {message}")]
    Sync {
        path: PathBuf,
        branch: String,
        message: String,
    },

    #[error("Package path does not exist in working copy: {0}")]
    PackagePathMissing(PathBuf),

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    // Installation errors
    #[error("Package installation failed: {message}")]
    InstallFailed { message: String },

    // Dispatch errors
    #[error("Failed to launch {program}: {message}")]
    LaunchFailed { program: String, message: String },

    #[error("{program} was terminated by a signal")]
    ProcessTerminated { program: String },

    #[error("Package exited with status {code}")]
    DispatchFailed { code: i32 },
}

/// Result type alias for pyghx operations.
pub type Result<T> = std::result::Result<T, PyghxError>;

impl From<std::io::Error> for PyghxError {
    fn from(err: std::io::Error) -> Self {
        PyghxError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for PyghxError {
    fn from(err: serde_json::Error) -> Self {
        PyghxError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl PyghxError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        PyghxError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Name of the run stage that produced this error, for log output.
    pub fn stage(&self) -> &'static str {
        match self {
            PyghxError::InvalidLocator { .. } => "resolve",
            PyghxError::Clone { .. }
            | PyghxError::Sync { .. }
            | PyghxError::PackagePathMissing(_) => "cache",
            PyghxError::InstallFailed { .. } => "install",
            PyghxError::LaunchFailed { .. }
            | PyghxError::ProcessTerminated { .. }
            | PyghxError::DispatchFailed { .. } => "dispatch",
            PyghxError::Io { .. } | PyghxError::Json { .. } | PyghxError::Config { .. } => {
                "setup"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PyghxError::InvalidLocator {
            input: "https://gitlab.com/".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid GitHub URL format: https://gitlab.com/"
        );

        let err = PyghxError::DispatchFailed { code: 3 };
        assert_eq!(err.to_string(), "Package exited with status 3");
    }

    #[test]
    fn test_io_with_path_keeps_path() {
        let err = PyghxError::io_with_path(
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            "/tmp/pyghx/marker",
        );
        match err {
            PyghxError::Io { path, source, .. } => {
                assert_eq!(path, Some(PathBuf::from("/tmp/pyghx/marker")));
                assert!(source.is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_stages() {
        assert_eq!(
            PyghxError::InvalidLocator { input: String::new() }.stage(),
            "resolve"
        );
        assert_eq!(
            PyghxError::PackagePathMissing(PathBuf::from("x")).stage(),
            "cache"
        );
        assert_eq!(PyghxError::DispatchFailed { code: 1 }.stage(), "dispatch");
    }
}
