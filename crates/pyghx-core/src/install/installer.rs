//! Dependency installation through uv or pip.
//!
//! With uv available the package gets its own virtual environment and is
//! installed into it; otherwise pip installs into whatever interpreter pyghx
//! was configured with. Both paths try an editable install first and fall
//! back to a regular one.

use crate::config::PyghxConfig;
use crate::error::{PyghxError, Result};
use crate::platform::{resolve_python, venv_python};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::{debug, info, warn};

/// Installs a package's dependencies into the environment it will run in.
pub trait PackageInstaller {
    fn install(&self, package_path: &Path) -> Result<()>;
}

/// [`PackageInstaller`] that shells out to `uv` or `python -m pip`.
#[derive(Debug, Clone)]
pub struct PythonInstaller {
    python: PathBuf,
    uv: PathBuf,
    venv_dir_name: String,
}

impl PythonInstaller {
    pub fn new(
        python: impl Into<PathBuf>,
        uv: impl Into<PathBuf>,
        venv_dir_name: impl Into<String>,
    ) -> Self {
        Self {
            python: python.into(),
            uv: uv.into(),
            venv_dir_name: venv_dir_name.into(),
        }
    }

    pub fn from_config(config: &PyghxConfig) -> Self {
        Self::new(
            config.python.clone(),
            config.uv.clone(),
            config.venv_dir_name.clone(),
        )
    }

    /// Whether the uv executable can be run.
    pub fn uv_available(&self) -> bool {
        Command::new(&self.uv)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn install_with_uv(&self, package_path: &Path) -> Result<()> {
        info!("Using uv package manager for installation");

        let mut base = vec!["pip", "install"];
        if !venv_python(package_path, &self.venv_dir_name).exists() {
            info!(
                "Creating virtual environment at {}...",
                package_path.join(&self.venv_dir_name).display()
            );
            match run_captured(&self.uv, &["venv", self.venv_dir_name.as_str()], package_path) {
                Ok(output) if output.status.success() => {
                    info!("Virtual environment created successfully.");
                }
                Ok(output) => {
                    warn!(
                        "Failed to create virtual environment: {}",
                        String::from_utf8_lossy(&output.stderr).trim()
                    );
                    warn!("Falling back to system installation...");
                    base.push("--system");
                }
                Err(e) => {
                    warn!("Failed to create virtual environment: {}", e);
                    warn!("Falling back to system installation...");
                    base.push("--system");
                }
            }
        }

        editable_then_regular(&self.uv, &base, package_path)
    }

    fn install_with_pip(&self, package_path: &Path) -> Result<()> {
        info!("Using pip for installation (uv not found)");
        let python = resolve_python(package_path, &self.venv_dir_name, &self.python);
        editable_then_regular(&python, &["-m", "pip", "install"], package_path)
    }
}

impl PackageInstaller for PythonInstaller {
    fn install(&self, package_path: &Path) -> Result<()> {
        info!("Installing package from {}...", package_path.display());
        if self.uv_available() {
            self.install_with_uv(package_path)?;
        } else {
            self.install_with_pip(package_path)?;
        }
        info!("Package installed successfully.");
        Ok(())
    }
}

fn editable_then_regular(program: &Path, base: &[&str], package_path: &Path) -> Result<()> {
    let mut editable = base.to_vec();
    editable.extend(["-e", "."]);
    let output = run_captured(program, &editable, package_path)?;
    if output.status.success() {
        return Ok(());
    }
    debug!(
        "Editable install failed: {}",
        String::from_utf8_lossy(&output.stderr).trim()
    );

    info!("Development mode installation failed, trying regular install...");
    let mut regular = base.to_vec();
    regular.push(".");
    let output = run_captured(program, &regular, package_path)?;
    if output.status.success() {
        return Ok(());
    }

    Err(PyghxError::InstallFailed {
        message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

fn run_captured<S: AsRef<OsStr>>(program: &Path, args: &[S], cwd: &Path) -> Result<Output> {
    let mut cmd = Command::new(program);
    cmd.args(args).current_dir(cwd);
    debug!(
        "Running {} {}",
        program.display(),
        args.iter()
            .map(|a| a.as_ref().to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    );
    cmd.output().map_err(|e| PyghxError::InstallFailed {
        message: format!("could not run {}: {}", program.display(), e),
    })
}
