//! Execution dispatch.
//!
//! A run picks exactly one [`Strategy`] from the package descriptor and the
//! caller's install preference, then launches a single interpreter process for
//! it. Whatever that process exits with is the result; a failed strategy is
//! never retried as another.

mod bootstrap;
mod process;

pub use bootstrap::BootstrapScript;
pub use process::{CommandSpec, ProcessRunner, SystemProcessRunner};

use crate::config::RunContext;
use crate::descriptor::{EntryTarget, PackageDescriptor};
use crate::error::{PyghxError, Result};
use crate::platform::{resolve_python, source_roots};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Whether dependencies are installed before running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstallMode {
    #[default]
    Install,
    /// Run straight from the working copy.
    Skip,
}

/// How the package gets launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Call `module:callable` from the source tree without installing.
    DirectFunction {
        entry: String,
        module: String,
        callable: String,
        search_paths: Vec<PathBuf>,
    },
    /// Call `module:callable` from the installed package.
    InstalledFunction {
        entry: String,
        module: String,
        callable: String,
    },
    /// `python -m module`. `search_paths` go on `PYTHONPATH` when non-empty.
    Module {
        module: String,
        search_paths: Vec<PathBuf>,
    },
}

impl Strategy {
    /// Choose the strategy for a package.
    pub fn select(descriptor: &PackageDescriptor, package_path: &Path, mode: InstallMode) -> Self {
        let roots = || match mode {
            InstallMode::Skip => source_roots(package_path),
            InstallMode::Install => Vec::new(),
        };

        if let Some((entry, target)) = descriptor.primary_entry_point() {
            match EntryTarget::parse(target) {
                Some(EntryTarget::Callable { module, callable }) => {
                    info!("Using entry point: {} -> {}", entry, target);
                    return match mode {
                        InstallMode::Skip => Strategy::DirectFunction {
                            entry: entry.to_string(),
                            module,
                            callable,
                            search_paths: roots(),
                        },
                        InstallMode::Install => Strategy::InstalledFunction {
                            entry: entry.to_string(),
                            module,
                            callable,
                        },
                    };
                }
                Some(EntryTarget::Module(module)) => {
                    info!("Using entry point: {} -> {}", entry, target);
                    return Strategy::Module {
                        module,
                        search_paths: roots(),
                    };
                }
                None => warn!("Entry point {} -> {:?} is not usable", entry, target),
            }
        }

        Strategy::Module {
            module: descriptor.module_name(),
            search_paths: roots(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Strategy::DirectFunction { .. } => "direct-function",
            Strategy::InstalledFunction { .. } => "installed-function",
            Strategy::Module { .. } => "module",
        }
    }
}

/// Launches a package through the selected strategy.
pub struct Dispatcher {
    python: PathBuf,
    venv_dir_name: String,
    working_dir: PathBuf,
    runner: Box<dyn ProcessRunner>,
}

impl Dispatcher {
    pub fn new(
        python: impl Into<PathBuf>,
        venv_dir_name: impl Into<String>,
        working_dir: impl Into<PathBuf>,
        runner: Box<dyn ProcessRunner>,
    ) -> Self {
        Self {
            python: python.into(),
            venv_dir_name: venv_dir_name.into(),
            working_dir: working_dir.into(),
            runner,
        }
    }

    pub fn from_context(ctx: &RunContext, runner: Box<dyn ProcessRunner>) -> Self {
        Self::new(
            ctx.config.python.clone(),
            ctx.config.venv_dir_name.clone(),
            ctx.working_dir.clone(),
            runner,
        )
    }

    /// Run the package and return the child's exit code.
    pub fn dispatch(
        &self,
        descriptor: &PackageDescriptor,
        package_path: &Path,
        args: &[OsString],
        mode: InstallMode,
    ) -> Result<i32> {
        let strategy = Strategy::select(descriptor, package_path, mode);
        self.execute(&strategy, package_path, args)
    }

    /// Run an already-selected strategy.
    pub fn execute(
        &self,
        strategy: &Strategy,
        package_path: &Path,
        args: &[OsString],
    ) -> Result<i32> {
        let python = resolve_python(package_path, &self.venv_dir_name, &self.python);
        info!(strategy = strategy.label(), "Running package");

        match strategy {
            Strategy::DirectFunction {
                entry,
                module,
                callable,
                search_paths,
            } => self.run_callable(&python, entry, module, callable, search_paths, args),
            Strategy::InstalledFunction {
                entry,
                module,
                callable,
            } => self.run_callable(&python, entry, module, callable, &[], args),
            Strategy::Module {
                module,
                search_paths,
            } => {
                info!("Running as module: python -m {}", module);
                let mut spec = CommandSpec::new(&python)
                    .arg("-m")
                    .arg(module)
                    .args(args)
                    .current_dir(&self.working_dir);
                if !search_paths.is_empty() {
                    let inherited = std::env::var_os("PYTHONPATH");
                    let value = python_path(search_paths, inherited.as_deref())?;
                    debug!("PYTHONPATH={}", value.to_string_lossy());
                    spec = spec.env("PYTHONPATH", value);
                }
                self.runner.run(&spec)
            }
        }
    }

    fn run_callable(
        &self,
        python: &Path,
        entry: &str,
        module: &str,
        callable: &str,
        search_paths: &[PathBuf],
        args: &[OsString],
    ) -> Result<i32> {
        info!("Running function {}:{}", module, callable);
        let script = BootstrapScript {
            module: module.to_string(),
            callable: callable.to_string(),
            search_paths: search_paths.to_vec(),
            program_name: entry.to_string(),
        }
        .write_temp()?;

        let spec = CommandSpec::new(python)
            .arg(script.path())
            .args(args)
            .current_dir(&self.working_dir);
        let code = self.runner.run(&spec);

        if let Err(e) = script.close() {
            debug!("Failed to remove bootstrap script: {}", e);
        }
        code
    }
}

/// `roots` followed by any existing `PYTHONPATH` entries.
fn python_path(roots: &[PathBuf], existing: Option<&OsStr>) -> Result<OsString> {
    let inherited = existing
        .map(|v| std::env::split_paths(v).collect::<Vec<_>>())
        .unwrap_or_default();
    std::env::join_paths(roots.iter().cloned().chain(inherited)).map_err(|e| {
        PyghxError::LaunchFailed {
            program: "python".into(),
            message: format!("invalid PYTHONPATH entry: {}", e),
        }
    })
}
