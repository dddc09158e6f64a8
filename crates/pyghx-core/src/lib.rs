//! Pyghx Core - run a Python package straight from its GitHub repository.
//!
//! Given a repository URL this crate keeps a local working copy up to date,
//! works out how the package wants to be invoked, installs its dependencies
//! when the checked-out commit changed, and launches it. It can be used
//! programmatically without the `pyghx` CLI.
//!
//! # Example
//!
//! ```rust,ignore
//! use pyghx_core::{InstallMode, Pyghx, PyghxConfig, RunContext};
//!
//! fn main() -> pyghx_core::Result<()> {
//!     let ctx = RunContext::from_current_dir(PyghxConfig::load_default()?)?;
//!     let pyghx = Pyghx::builder(ctx).build()?;
//!
//!     pyghx.run(
//!         "https://github.com/acme/tool/tree/main/packages/cli",
//!         InstallMode::Install,
//!         &["--help".into()],
//!     )
//! }
//! ```

pub mod cache;
pub mod config;
pub mod descriptor;
pub mod dispatch;
pub mod error;
pub mod install;
pub mod locator;
pub mod markers;
pub mod platform;
pub mod vcs;

mod api;

// Re-export commonly used types
pub use cache::{PreparedRepository, RepositoryCache, SyncOutcome};
pub use config::{PyghxConfig, RunContext};
pub use descriptor::{DescriptorExtractor, DescriptorSource, EntryTarget, PackageDescriptor};
pub use dispatch::{
    CommandSpec, Dispatcher, InstallMode, ProcessRunner, Strategy, SystemProcessRunner,
};
pub use error::{PyghxError, Result};
pub use install::{InstallTracker, PackageInstaller, PythonInstaller};
pub use locator::RepositoryLocator;
pub use vcs::{GitCli, VersionControl};

pub use api::{PyghxBuilder, ResolvedPackage};

/// Main entry point for running remote packages.
///
/// Owns one instance of each pipeline stage, wired to the collaborators chosen
/// in [`PyghxBuilder`].
pub struct Pyghx {
    ctx: RunContext,
    cache: RepositoryCache,
    extractor: DescriptorExtractor,
    tracker: InstallTracker,
    installer: Box<dyn PackageInstaller>,
    dispatcher: Dispatcher,
}

impl Pyghx {
    /// Create a builder for Pyghx.
    pub fn builder(ctx: RunContext) -> PyghxBuilder {
        PyghxBuilder::new(ctx)
    }

    /// Create a Pyghx instance with the system collaborators.
    pub fn new(ctx: RunContext) -> Result<Self> {
        PyghxBuilder::new(ctx).build()
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    pub fn cache(&self) -> &RepositoryCache {
        &self.cache
    }
}
