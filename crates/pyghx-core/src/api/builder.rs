//! Builder for configuring Pyghx initialization.

use crate::config::RunContext;
use crate::descriptor::DescriptorExtractor;
use crate::dispatch::{Dispatcher, ProcessRunner, SystemProcessRunner};
use crate::error::{PyghxError, Result};
use crate::install::{InstallTracker, PackageInstaller, PythonInstaller};
use crate::vcs::{GitCli, VersionControl};
use crate::{cache::RepositoryCache, Pyghx};
use std::sync::Arc;
use tracing::debug;

/// Builder for configuring [`Pyghx`] initialization.
///
/// Every collaborator defaults to its system implementation (`git`, uv/pip,
/// `std::process`). Tests swap them for fakes.
///
/// # Example
///
/// ```rust,ignore
/// use pyghx_core::{Pyghx, PyghxConfig, RunContext};
///
/// let ctx = RunContext::from_current_dir(PyghxConfig::load_default()?)?;
/// let pyghx = Pyghx::builder(ctx).auto_create_dirs(true).build()?;
/// ```
pub struct PyghxBuilder {
    ctx: RunContext,
    auto_create_dirs: bool,
    vcs: Option<Arc<dyn VersionControl>>,
    installer: Option<Box<dyn PackageInstaller>>,
    runner: Option<Box<dyn ProcessRunner>>,
}

impl PyghxBuilder {
    pub fn new(ctx: RunContext) -> Self {
        Self {
            ctx,
            auto_create_dirs: true,
            vcs: None,
            installer: None,
            runner: None,
        }
    }

    /// Create the cache root if it doesn't exist.
    ///
    /// Default: `true`
    pub fn auto_create_dirs(mut self, enable: bool) -> Self {
        self.auto_create_dirs = enable;
        self
    }

    /// Version-control client shared by the cache and the install tracker.
    pub fn with_vcs(mut self, vcs: Arc<dyn VersionControl>) -> Self {
        self.vcs = Some(vcs);
        self
    }

    pub fn with_installer(mut self, installer: Box<dyn PackageInstaller>) -> Self {
        self.installer = Some(installer);
        self
    }

    pub fn with_runner(mut self, runner: Box<dyn ProcessRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Build the Pyghx instance.
    pub fn build(self) -> Result<Pyghx> {
        let config = &self.ctx.config;
        let cache_root = &config.cache_root;

        if self.auto_create_dirs {
            if !cache_root.exists() {
                debug!("Creating cache root {}", cache_root.display());
                std::fs::create_dir_all(cache_root).map_err(|e| PyghxError::Io {
                    message: format!("Failed to create cache root: {}", cache_root.display()),
                    path: Some(cache_root.clone()),
                    source: Some(e),
                })?;
            }
        } else if !cache_root.exists() {
            return Err(PyghxError::Config {
                message: format!("Cache root does not exist: {}", cache_root.display()),
            });
        }

        let vcs = self
            .vcs
            .unwrap_or_else(|| Arc::new(GitCli::new(config.git.clone())));
        let installer = self
            .installer
            .unwrap_or_else(|| Box::new(PythonInstaller::from_config(config)));
        let runner = self
            .runner
            .unwrap_or_else(|| Box::new(SystemProcessRunner));

        Ok(Pyghx {
            cache: RepositoryCache::new(cache_root.clone(), config.sync_interval(), vcs.clone()),
            extractor: DescriptorExtractor::default()
                .warn_on_fallback(config.warn_on_descriptor_fallback),
            tracker: InstallTracker::new(vcs),
            installer,
            dispatcher: Dispatcher::from_context(&self.ctx, runner),
            ctx: self.ctx,
        })
    }
}
