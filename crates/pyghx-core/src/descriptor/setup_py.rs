//! Legacy `setup.py` descriptor source. Yields a name only.

use super::{DescriptorSource, PackageDescriptor};
use crate::error::{PyghxError, Result};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::info;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bname\s*=\s*["']([^"']+)["']"#).unwrap());

pub struct SetupPySource;

impl DescriptorSource for SetupPySource {
    fn label(&self) -> &'static str {
        "setup.py"
    }

    fn describe(&self, package_path: &Path) -> Result<Option<PackageDescriptor>> {
        let script = package_path.join("setup.py");
        if !script.is_file() {
            return Ok(None);
        }
        info!("Found setup.py: {}", script.display());

        let content =
            std::fs::read_to_string(&script).map_err(|e| PyghxError::io_with_path(e, &script))?;

        Ok(NAME_RE.captures(&content).map(|caps| {
            let name = caps[1].trim().to_string();
            info!("Package name from setup.py: {}", name);
            PackageDescriptor::new(name)
        }))
    }
}
