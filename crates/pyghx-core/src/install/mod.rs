//! Dependency installation and the fingerprint that lets repeat runs skip it.

mod installer;
mod tracker;

pub use installer::{PackageInstaller, PythonInstaller};
pub use tracker::InstallTracker;
