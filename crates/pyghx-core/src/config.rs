//! Centralized configuration for pyghx.
//!
//! Fixed constants live on unit structs; user-tunable settings live on
//! [`PyghxConfig`], which layers built-in defaults under an optional JSON file.
//! Per-run state that used to be ambient (the working directory) is captured
//! once into a [`RunContext`] and passed down explicitly.

use crate::error::{PyghxError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    pub const APP_NAME: &'static str = "pyghx";
    pub const CONFIG_FILE_NAME: &'static str = "config.json";
    pub const CACHE_DIR_ENV: &'static str = "PYGHX_CACHE_DIR";
    pub const PYTHON_ENV: &'static str = "PYGHX_PYTHON";
}

/// Configuration for the repository cache.
pub struct CacheConfig;

impl CacheConfig {
    /// Minimum age of a working copy before it is pulled again (5 minutes).
    pub const SYNC_INTERVAL: Duration = Duration::from_secs(300);
    pub const DEFAULT_BRANCH: &'static str = "main";
}

/// Marker files persisted next to working copies.
pub struct MarkerConfig;

impl MarkerConfig {
    /// Epoch milliseconds of the last successful clone or pull, inside the working copy.
    pub const LAST_SYNC_FILE: &'static str = "last-pull.txt";
    /// Commit identity of the last successful install, inside the package path.
    pub const FINGERPRINT_FILE: &'static str = "last-update.txt";
}

/// Configuration for dependency installation.
pub struct InstallConfig;

impl InstallConfig {
    pub const DEFAULT_VENV_DIR_NAME: &'static str = ".venv";
    pub const DEFAULT_SOURCE_DIR_NAME: &'static str = "src";
    #[cfg(windows)]
    pub const DEFAULT_PYTHON: &'static str = "python";
    #[cfg(not(windows))]
    pub const DEFAULT_PYTHON: &'static str = "python3";
    pub const DEFAULT_GIT: &'static str = "git";
    pub const DEFAULT_UV: &'static str = "uv";
}

/// User-tunable settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct PyghxConfig {
    /// Root of the `<owner>/<repo>/<branch>` working-copy tree.
    pub cache_root: PathBuf,
    /// Interpreter used when the package has no virtual environment of its own.
    pub python: PathBuf,
    /// Git executable.
    pub git: PathBuf,
    /// uv executable. Installation falls back to pip when it cannot be run.
    pub uv: PathBuf,
    /// Seconds a working copy is treated as fresh after a sync.
    pub sync_interval_secs: u64,
    /// Name of the per-package virtual environment directory.
    pub venv_dir_name: String,
    /// Emit a warning (rather than a debug line) when a metadata source is
    /// skipped during descriptor discovery.
    pub warn_on_descriptor_fallback: bool,
}

impl Default for PyghxConfig {
    fn default() -> Self {
        Self {
            cache_root: default_cache_root(),
            python: PathBuf::from(InstallConfig::DEFAULT_PYTHON),
            git: PathBuf::from(InstallConfig::DEFAULT_GIT),
            uv: PathBuf::from(InstallConfig::DEFAULT_UV),
            sync_interval_secs: CacheConfig::SYNC_INTERVAL.as_secs(),
            venv_dir_name: InstallConfig::DEFAULT_VENV_DIR_NAME.to_string(),
            warn_on_descriptor_fallback: false,
        }
    }
}

impl PyghxConfig {
    /// Load settings from a JSON file, keeping defaults for absent keys.
    ///
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| PyghxError::io_with_path(e, path))?;
        serde_json::from_str(&content).map_err(|e| PyghxError::Config {
            message: format!("Failed to parse {}: {}", path.display(), e),
        })
    }

    /// Load from the per-user default location.
    pub fn load_default() -> Result<Self> {
        match default_config_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn with_cache_root(mut self, cache_root: impl Into<PathBuf>) -> Self {
        self.cache_root = cache_root.into();
        self
    }

    pub fn with_python(mut self, python: impl Into<PathBuf>) -> Self {
        self.python = python.into();
        self
    }

    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval_secs = interval.as_secs();
        self
    }
}

/// Per-invocation context threaded through the pipeline.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub config: PyghxConfig,
    /// Directory the invoked package runs in.
    pub working_dir: PathBuf,
}

impl RunContext {
    pub fn new(config: PyghxConfig, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            working_dir: working_dir.into(),
        }
    }

    /// Capture the process's current directory.
    pub fn from_current_dir(config: PyghxConfig) -> Result<Self> {
        let working_dir = std::env::current_dir()?;
        Ok(Self::new(config, working_dir))
    }
}

/// `<platform cache dir>/pyghx`, or `~/.cache/pyghx` when the platform has none.
pub fn default_cache_root() -> PathBuf {
    dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join(AppConfig::APP_NAME)
}

/// `<platform config dir>/pyghx/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(AppConfig::APP_NAME).join(AppConfig::CONFIG_FILE_NAME))
}
