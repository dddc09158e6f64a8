//! Package descriptor discovery.
//!
//! Works out a package's name and its declared entry points from whatever
//! metadata the working copy happens to carry. Sources are tried in order and
//! the first one that yields a name wins:
//!
//! 1. `pyproject.toml` - name plus `[project.scripts]` / `[tool.poetry.scripts]`
//! 2. `setup.py` - name only
//! 3. the package directory's own name, hyphens folded to underscores
//!
//! Discovery is best-effort: a source that is missing, unreadable or
//! unparseable is skipped, never reported as an error.

mod pyproject;
mod setup_py;

pub use pyproject::PyprojectSource;
pub use setup_py::SetupPySource;

use crate::error::Result;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

static DOTTED_IDENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*$").unwrap()
});

/// Name and entry points of a package, as declared by its metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageDescriptor {
    pub name: String,
    /// Invocation name -> `module` or `module:callable`.
    pub entry_points: BTreeMap<String, String>,
}

impl PackageDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entry_points: BTreeMap::new(),
        }
    }

    pub fn with_entry_point(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.entry_points.insert(name.into(), target.into());
        self
    }

    /// Importable module name for the package (`acme-tool` -> `acme_tool`).
    pub fn module_name(&self) -> String {
        self.name.replace('-', "_")
    }

    /// The entry point to run when the package declares several.
    ///
    /// An entry point named after the package wins; otherwise the first by name.
    pub fn primary_entry_point(&self) -> Option<(&str, &str)> {
        let wanted = normalize(&self.name);
        self.entry_points
            .iter()
            .find(|(name, _)| normalize(name) == wanted)
            .or_else(|| self.entry_points.iter().next())
            .map(|(name, target)| (name.as_str(), target.as_str()))
    }
}

fn normalize(name: &str) -> String {
    name.to_ascii_lowercase().replace('-', "_")
}

/// A parsed invocation target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryTarget {
    /// `pkg.cli` - run as a module.
    Module(String),
    /// `pkg.cli:main` - import `pkg.cli` and call `main()`.
    Callable { module: String, callable: String },
}

impl EntryTarget {
    /// Parse `module[:callable] [extras]`. Returns `None` when either half is not
    /// a dotted Python identifier.
    pub fn parse(target: &str) -> Option<Self> {
        let target = target.split('[').next().unwrap_or_default().trim();

        match target.split_once(':') {
            Some((module, callable)) => {
                let (module, callable) = (module.trim(), callable.trim());
                (is_dotted_ident(module) && is_dotted_ident(callable)).then(|| {
                    EntryTarget::Callable {
                        module: module.to_string(),
                        callable: callable.to_string(),
                    }
                })
            }
            None => is_dotted_ident(target).then(|| EntryTarget::Module(target.to_string())),
        }
    }
}

pub(crate) fn is_dotted_ident(s: &str) -> bool {
    DOTTED_IDENT_RE.is_match(s)
}

/// One place package metadata can come from.
pub trait DescriptorSource {
    /// Short label for log output.
    fn label(&self) -> &'static str;

    /// `Ok(None)` when this source is absent or declares no name.
    fn describe(&self, package_path: &Path) -> Result<Option<PackageDescriptor>>;
}

/// Last resort: the directory name, which always yields something.
pub struct DirectoryNameSource;

impl DescriptorSource for DirectoryNameSource {
    fn label(&self) -> &'static str {
        "directory name"
    }

    fn describe(&self, package_path: &Path) -> Result<Option<PackageDescriptor>> {
        Ok(Some(descriptor_from_directory(package_path)))
    }
}

fn descriptor_from_directory(package_path: &Path) -> PackageDescriptor {
    let name = package_path
        .file_name()
        .map(|n| n.to_string_lossy().replace('-', "_"))
        .unwrap_or_default();
    info!("Using directory name as package name: {}", name);
    PackageDescriptor::new(name)
}

/// Runs the descriptor sources in priority order.
pub struct DescriptorExtractor {
    sources: Vec<Box<dyn DescriptorSource>>,
    warn_on_fallback: bool,
}

impl Default for DescriptorExtractor {
    fn default() -> Self {
        Self::new(vec![
            Box::new(PyprojectSource),
            Box::new(SetupPySource),
            Box::new(DirectoryNameSource),
        ])
    }
}

impl DescriptorExtractor {
    pub fn new(sources: Vec<Box<dyn DescriptorSource>>) -> Self {
        Self {
            sources,
            warn_on_fallback: false,
        }
    }

    /// Report skipped sources at warn level instead of debug.
    pub fn warn_on_fallback(mut self, enable: bool) -> Self {
        self.warn_on_fallback = enable;
        self
    }

    /// Produce a descriptor for the package. Never fails.
    pub fn extract(&self, package_path: &Path) -> PackageDescriptor {
        for source in &self.sources {
            match source.describe(package_path) {
                Ok(Some(descriptor)) if !descriptor.name.is_empty() => {
                    debug!(
                        source = source.label(),
                        name = %descriptor.name,
                        entry_points = descriptor.entry_points.len(),
                        "Resolved package descriptor"
                    );
                    return descriptor;
                }
                Ok(_) => self.report_fallback(source.label(), "no package name declared"),
                Err(e) => self.report_fallback(source.label(), &e.to_string()),
            }
        }

        descriptor_from_directory(package_path)
    }

    fn report_fallback(&self, label: &str, reason: &str) {
        if self.warn_on_fallback {
            warn!("Skipping {} metadata: {}", label, reason);
        } else {
            debug!("Skipping {} metadata: {}", label, reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PyghxError;
    use tempfile::TempDir;

    #[test]
    fn test_entry_target_parse() {
        assert_eq!(
            EntryTarget::parse("pkg.mod:run"),
            Some(EntryTarget::Callable {
                module: "pkg.mod".into(),
                callable: "run".into()
            })
        );
        assert_eq!(
            EntryTarget::parse("pkg.cli"),
            Some(EntryTarget::Module("pkg.cli".into()))
        );
        assert_eq!(
            EntryTarget::parse("pkg.mod:App.main [cli]"),
            Some(EntryTarget::Callable {
                module: "pkg.mod".into(),
                callable: "App.main".into()
            })
        );
    }

    #[test]
    fn test_entry_target_rejects_non_identifiers() {
        assert_eq!(EntryTarget::parse(""), None);
        assert_eq!(EntryTarget::parse("pkg:"), None);
        assert_eq!(EntryTarget::parse("my-pkg:main"), None);
        assert_eq!(EntryTarget::parse("pkg.mod:run(); import os"), None);
    }

    #[test]
    fn test_primary_entry_point_prefers_package_name() {
        let descriptor = PackageDescriptor::new("acme-tool")
            .with_entry_point("aaa-helper", "acme_tool.helper:main")
            .with_entry_point("acme_tool", "acme_tool.cli:main");
        assert_eq!(
            descriptor.primary_entry_point(),
            Some(("acme_tool", "acme_tool.cli:main"))
        );
    }

    #[test]
    fn test_module_name_folds_hyphens() {
        assert_eq!(PackageDescriptor::new("acme-tool").module_name(), "acme_tool");
        assert_eq!(PackageDescriptor::new("a-b-c").module_name(), "a_b_c");
        assert_eq!(PackageDescriptor::new("plain").module_name(), "plain");
    }

    #[test]
    fn test_primary_entry_point_falls_back_to_first() {
        let descriptor = PackageDescriptor::new("acme")
            .with_entry_point("zeta", "acme.z:main")
            .with_entry_point("alpha", "acme.a:main");
        assert_eq!(descriptor.primary_entry_point(), Some(("alpha", "acme.a:main")));
        assert_eq!(PackageDescriptor::new("acme").primary_entry_point(), None);
    }

    struct FailingSource;

    impl DescriptorSource for FailingSource {
        fn label(&self) -> &'static str {
            "broken"
        }

        fn describe(&self, _package_path: &Path) -> Result<Option<PackageDescriptor>> {
            Err(PyghxError::Config {
                message: "unparseable".into(),
            })
        }
    }

    #[test]
    fn test_failing_source_falls_through() {
        let temp = TempDir::new().unwrap();
        let pkg = temp.path().join("my-tool");
        std::fs::create_dir_all(&pkg).unwrap();

        let extractor =
            DescriptorExtractor::new(vec![Box::new(FailingSource)]).warn_on_fallback(true);
        let descriptor = extractor.extract(&pkg);
        assert_eq!(descriptor, PackageDescriptor::new("my_tool"));
    }

    #[test]
    fn test_directory_fallback() {
        let temp = TempDir::new().unwrap();
        let pkg = temp.path().join("cool-pkg");
        std::fs::create_dir_all(&pkg).unwrap();

        let descriptor = DescriptorExtractor::default().extract(&pkg);
        assert_eq!(descriptor.name, "cool_pkg");
        assert!(descriptor.entry_points.is_empty());
    }

    #[test]
    fn test_pyproject_wins_over_setup_py() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("pyproject.toml"),
            "[project]\nname = \"from-pyproject\"\n",
        )
        .unwrap();
        std::fs::write(
            temp.path().join("setup.py"),
            "from setuptools import setup\nsetup(name='from-setup')\n",
        )
        .unwrap();

        let descriptor = DescriptorExtractor::default().extract(temp.path());
        assert_eq!(descriptor.name, "from-pyproject");
    }

    #[test]
    fn test_setup_py_used_when_pyproject_has_no_name() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("pyproject.toml"),
            "[build-system]\nrequires = [\"setuptools\"]\n",
        )
        .unwrap();
        std::fs::write(
            temp.path().join("setup.py"),
            "setup(\n    name=\"legacy-tool\",\n    version=\"1.0\",\n)\n",
        )
        .unwrap();

        let descriptor = DescriptorExtractor::default().extract(temp.path());
        assert_eq!(descriptor, PackageDescriptor::new("legacy-tool"));
    }
}
