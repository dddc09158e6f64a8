//! Version-control collaborator.
//!
//! The cache and the install tracker only need three operations from git:
//! clone one branch, pull it, and report the checked-out commit. They reach
//! git through [`VersionControl`] so tests can substitute a fake.

use crate::error::{PyghxError, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::{debug, info};

/// Operations the engine needs from a version-control client.
pub trait VersionControl {
    /// Clone `branch` of `url` into `dest`, which must not exist yet.
    fn clone_branch(&self, url: &str, branch: &str, dest: &Path) -> Result<()>;

    /// Fetch and merge the latest `branch` into the working copy at `dir`.
    fn pull(&self, dir: &Path, branch: &str) -> Result<()>;

    /// Commit identity currently checked out in `dir`, if it can be determined.
    fn current_revision(&self, dir: &Path) -> Option<String>;
}

/// [`VersionControl`] backed by the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, args: &[&str], cwd: Option<&Path>) -> std::io::Result<Output> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        debug!("Running {} {}", self.program.display(), args.join(" "));
        cmd.output()
    }
}

impl VersionControl for GitCli {
    fn clone_branch(&self, url: &str, branch: &str, dest: &Path) -> Result<()> {
        let dest_str = dest.to_string_lossy();
        let output = self
            .run(&["clone", "--branch", branch, url, dest_str.as_ref()], None)
            .map_err(|e| PyghxError::Clone {
                url: url.to_string(),
                branch: branch.to_string(),
                message: format!("could not run {}: {}", self.program.display(), e),
            })?;

        if !output.status.success() {
            return Err(PyghxError::Clone {
                url: url.to_string(),
                branch: branch.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        info!("Cloned {} ({}) into {}", url, branch, dest.display());
        Ok(())
    }

    fn pull(&self, dir: &Path, branch: &str) -> Result<()> {
        let sync_error = |message: String| PyghxError::Sync {
            path: dir.to_path_buf(),
            branch: branch.to_string(),
            message,
        };

        let output = self
            .run(&["pull", "origin", branch], Some(dir))
            .map_err(|e| sync_error(format!("could not run {}: {}", self.program.display(), e)))?;

        if !output.status.success() {
            return Err(sync_error(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        info!(
            "Pull successful: {}",
            String::from_utf8_lossy(&output.stdout).trim()
        );
        Ok(())
    }

    fn current_revision(&self, dir: &Path) -> Option<String> {
        match self.run(&["rev-parse", "HEAD"], Some(dir)) {
            Ok(output) if output.status.success() => {
                let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
                (!sha.is_empty()).then_some(sha)
            }
            Ok(output) => {
                debug!(
                    "git rev-parse failed: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                None
            }
            Err(e) => {
                debug!("Failed to get current commit: {}", e);
                None
            }
        }
    }
}
