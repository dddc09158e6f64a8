//! `pyproject.toml` descriptor source.
//!
//! Pattern-matched rather than parsed as TOML: a manifest that a strict parser
//! would reject can still tell us the package name.

use super::{DescriptorSource, PackageDescriptor};
use crate::error::{PyghxError, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;
use tracing::info;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*name\s*=\s*["']([^"']+)["']"#).unwrap());

const SCRIPT_TABLES: [&str; 2] = ["project.scripts", "tool.poetry.scripts"];

pub struct PyprojectSource;

impl DescriptorSource for PyprojectSource {
    fn label(&self) -> &'static str {
        "pyproject.toml"
    }

    fn describe(&self, package_path: &Path) -> Result<Option<PackageDescriptor>> {
        let manifest = package_path.join("pyproject.toml");
        if !manifest.is_file() {
            return Ok(None);
        }
        info!("Found pyproject.toml: {}", manifest.display());

        let content =
            std::fs::read_to_string(&manifest).map_err(|e| PyghxError::io_with_path(e, &manifest))?;
        Ok(parse_pyproject(&content))
    }
}

/// Extract the package name and scripts from manifest text.
pub fn parse_pyproject(content: &str) -> Option<PackageDescriptor> {
    let name = NAME_RE.captures(content)?.get(1)?.as_str().trim().to_string();
    if name.is_empty() {
        return None;
    }
    info!("Package name from pyproject.toml: {}", name);

    let mut entry_points = BTreeMap::new();
    for table in SCRIPT_TABLES {
        if let Some(section) = table_body(content, table) {
            entry_points.extend(parse_script_lines(section));
        }
    }
    if !entry_points.is_empty() {
        info!("Found entry points: {:?}", entry_points);
    }

    Some(PackageDescriptor { name, entry_points })
}

/// Text between `[table]` and the next table header.
fn table_body<'a>(content: &'a str, table: &str) -> Option<&'a str> {
    let header = format!("[{}]", table);
    let mut offset = 0;
    let mut start = None;

    for line in content.split_inclusive('\n') {
        let trimmed = line.split('#').next().unwrap_or_default().trim();
        match start {
            None if trimmed == header => start = Some(offset + line.len()),
            Some(s) if trimmed.starts_with('[') => return Some(&content[s..offset]),
            _ => {}
        }
        offset += line.len();
    }

    start.map(|s| &content[s..])
}

fn parse_script_lines(section: &str) -> Vec<(String, String)> {
    section
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .filter_map(|(key, value)| {
            let key = unquote(key);
            let value = value.trim();
            // Poetry's `{ reference = ..., type = "file" }` form has no importable target.
            if value.starts_with('{') {
                return None;
            }
            let value = unquote(value);
            (!key.is_empty() && !value.is_empty()).then(|| (key.to_string(), value.to_string()))
        })
        .collect()
}

/// Strip surrounding quotes, or a trailing `# comment` from a bare value.
fn unquote(raw: &str) -> &str {
    let raw = raw.trim();
    for quote in ['"', '\''] {
        if let Some(rest) = raw.strip_prefix(quote) {
            return rest.split(quote).next().unwrap_or_default().trim();
        }
    }
    raw.split('#').next().unwrap_or_default().trim()
}
