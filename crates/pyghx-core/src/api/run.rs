//! The resolve → cache → describe → install → dispatch pipeline.

use crate::cache::PreparedRepository;
use crate::descriptor::PackageDescriptor;
use crate::dispatch::InstallMode;
use crate::error::{PyghxError, Result};
use crate::locator::RepositoryLocator;
use crate::Pyghx;
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::{debug, info};

/// A package located in a prepared working copy, ready to install and run.
#[derive(Debug, Clone)]
pub struct ResolvedPackage {
    pub repository: PreparedRepository,
    pub package_path: PathBuf,
    pub descriptor: PackageDescriptor,
}

impl Pyghx {
    /// Parse the locator, bring its working copy up to date, and describe the package.
    pub fn resolve(&self, input: &str) -> Result<ResolvedPackage> {
        let locator = RepositoryLocator::parse(input)?;
        debug!(state = "resolved", locator = %locator);

        let repository = self.cache.prepare(&locator)?;
        debug!(state = "cached", outcome = ?repository.outcome);

        let package_path = repository.package_path()?;
        let descriptor = self.extractor.extract(&package_path);
        info!("Package name: {}", descriptor.name);
        debug!(state = "described", entry_points = ?descriptor.entry_points);

        Ok(ResolvedPackage {
            repository,
            package_path,
            descriptor,
        })
    }

    /// Install dependencies unless the fingerprint says the current commit is
    /// already installed. Returns whether an install ran.
    pub fn ensure_installed(&self, package: &ResolvedPackage) -> Result<bool> {
        let repo_path = &package.repository.local_path;
        if !self.tracker.needs_install(&package.package_path, repo_path) {
            info!("Dependencies are up to date, skipping installation.");
            return Ok(false);
        }

        info!("Changes detected or first run, installing dependencies...");
        self.installer.install(&package.package_path)?;
        self.tracker.record_install(&package.package_path, repo_path);
        Ok(true)
    }

    /// Run the package at `input` with `args`.
    ///
    /// A non-zero exit from the package is reported as
    /// [`PyghxError::DispatchFailed`].
    pub fn run(&self, input: &str, mode: InstallMode, args: &[OsString]) -> Result<()> {
        let package = self.resolve(input)?;

        match mode {
            InstallMode::Install => {
                self.ensure_installed(&package)?;
            }
            InstallMode::Skip => info!("Skipping installation as requested."),
        }
        debug!(state = "install-decided", mode = ?mode);

        let code = self
            .dispatcher
            .dispatch(&package.descriptor, &package.package_path, args, mode)?;
        debug!(state = "terminated", code);

        if code != 0 {
            return Err(PyghxError::DispatchFailed { code });
        }
        Ok(())
    }
}
