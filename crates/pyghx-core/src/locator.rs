//! Repository locator parsing.
//!
//! Turns `https://github.com/<owner>/<repo>[/tree/<branch>[/<subpath>]]` into a
//! [`RepositoryLocator`]. Pure string decomposition; nothing here touches the
//! network or the filesystem.

use crate::config::CacheConfig;
use crate::error::{PyghxError, Result};
use regex::Regex;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::debug;

static LOCATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:https?://)?(?P<host>[^/\s]+)/(?P<owner>[^/\s]+)/(?P<repo>[^/\s]+)(?:/tree/(?P<branch>[^/\s]+)(?:/(?P<subpath>\S+))?)?$",
    )
    .unwrap()
});

/// A parsed reference to a package inside a remote repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryLocator {
    pub host: String,
    pub owner: String,
    /// Repository name with any `.git` suffix removed.
    pub repo: String,
    pub branch: String,
    /// Package directory relative to the repository root; empty means the root.
    pub subpath: String,
}

impl RepositoryLocator {
    /// Parse a locator string.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || PyghxError::InvalidLocator {
            input: input.to_string(),
        };

        let trimmed = input.trim();
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
        let caps = LOCATOR_RE.captures(trimmed).ok_or_else(invalid)?;

        let host = caps["host"].to_string();
        let owner = caps["owner"].to_string();
        let repo = caps["repo"]
            .strip_suffix(".git")
            .unwrap_or(&caps["repo"])
            .to_string();

        let branch = caps
            .name("branch")
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| CacheConfig::DEFAULT_BRANCH.to_string());

        // Each of these becomes one directory level of the cache key.
        if ![&owner, &repo, &branch].iter().all(|s| is_path_segment(s)) {
            return Err(invalid());
        }

        let subpath = match caps.name("subpath") {
            Some(m) => normalize_subpath(m.as_str()).ok_or_else(invalid)?,
            None => String::new(),
        };

        let locator = Self {
            host,
            owner,
            repo,
            branch,
            subpath,
        };
        let shown_subpath = if locator.subpath.is_empty() {
            "(root)"
        } else {
            locator.subpath.as_str()
        };
        debug!(
            owner = %locator.owner,
            repo = %locator.repo,
            branch = %locator.branch,
            subpath = %shown_subpath,
            "Parsed repository locator"
        );
        Ok(locator)
    }

    /// HTTPS clone URL for the repository.
    pub fn clone_url(&self) -> String {
        format!("https://{}/{}/{}.git", self.host, self.owner, self.repo)
    }

    /// Cache-relative directory for this `(owner, repo, branch)` triple.
    pub fn cache_key(&self) -> PathBuf {
        PathBuf::from(&self.owner).join(&self.repo).join(&self.branch)
    }
}

impl FromStr for RepositoryLocator {
    type Err = PyghxError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for RepositoryLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.branch)?;
        if !self.subpath.is_empty() {
            write!(f, ":{}", self.subpath)?;
        }
        Ok(())
    }
}

fn is_path_segment(s: &str) -> bool {
    !s.is_empty() && s != "." && s != ".."
}

/// Collapse empty segments and reject `.`/`..`, which would step outside the
/// working copy.
fn normalize_subpath(raw: &str) -> Option<String> {
    let mut segments = Vec::new();
    for segment in raw.split('/').filter(|s| !s.is_empty()) {
        if !is_path_segment(segment) {
            return None;
        }
        segments.push(segment);
    }
    Some(segments.join("/"))
}
