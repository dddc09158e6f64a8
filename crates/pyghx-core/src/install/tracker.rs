//! Install-state tracking.
//!
//! After a successful install the working copy's commit is written to
//! `<package>/last-update.txt`. A later run skips installation only when that
//! fingerprint is present and equal to the commit now checked out. Anything
//! uncertain (no fingerprint, unknown commit, unreadable marker) means
//! "install again".

use crate::config::MarkerConfig;
use crate::markers::{read_marker, write_marker};
use crate::vcs::VersionControl;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub struct InstallTracker {
    vcs: Arc<dyn VersionControl>,
}

impl InstallTracker {
    pub fn new(vcs: Arc<dyn VersionControl>) -> Self {
        Self { vcs }
    }

    /// Location of the fingerprint marker for a package.
    pub fn fingerprint_path(package_path: &Path) -> PathBuf {
        package_path.join(MarkerConfig::FINGERPRINT_FILE)
    }

    /// Fingerprint recorded by the last successful install, if any.
    pub fn recorded_fingerprint(&self, package_path: &Path) -> Option<String> {
        match read_marker(&Self::fingerprint_path(package_path)) {
            Ok(token) => token,
            Err(e) => {
                warn!("Error checking dependency installation status: {}", e);
                None
            }
        }
    }

    /// Whether dependencies must be (re)installed before running.
    pub fn needs_install(&self, package_path: &Path, repo_path: &Path) -> bool {
        let Some(last) = self.recorded_fingerprint(package_path) else {
            return true;
        };
        let Some(current) = self.vcs.current_revision(repo_path) else {
            return true;
        };

        info!("Last installation commit: {}", last);
        info!("Current commit: {}", current);
        last != current
    }

    /// Persist the current commit as the install fingerprint.
    ///
    /// Returns the recorded commit. When the commit cannot be determined, or
    /// the marker cannot be written, nothing is recorded and the next run
    /// installs again.
    pub fn record_install(&self, package_path: &Path, repo_path: &Path) -> Option<String> {
        let current = self.vcs.current_revision(repo_path)?;
        let marker = Self::fingerprint_path(package_path);
        match write_marker(&marker, &current) {
            Ok(()) => {
                info!("Updated {} with commit SHA: {}", marker.display(), current);
                Some(current)
            }
            Err(e) => {
                warn!("Error updating last dependency installation SHA: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use std::cell::RefCell;
    use tempfile::TempDir;

    struct FixedRevision(RefCell<Option<String>>);

    impl VersionControl for FixedRevision {
        fn clone_branch(&self, _url: &str, _branch: &str, _dest: &Path) -> Result<()> {
            Ok(())
        }

        fn pull(&self, _dir: &Path, _branch: &str) -> Result<()> {
            Ok(())
        }

        fn current_revision(&self, _dir: &Path) -> Option<String> {
            self.0.borrow().clone()
        }
    }

    fn tracker(rev: Option<&str>) -> (InstallTracker, Arc<FixedRevision>) {
        let vcs = Arc::new(FixedRevision(RefCell::new(rev.map(String::from))));
        (InstallTracker::new(vcs.clone()), vcs)
    }

    #[test]
    fn test_no_fingerprint_needs_install() {
        let temp = TempDir::new().unwrap();
        let (tracker, _) = tracker(Some("abc"));
        assert!(tracker.needs_install(temp.path(), temp.path()));
    }

    #[test]
    fn test_matching_fingerprint_skips_install() {
        let temp = TempDir::new().unwrap();
        let (tracker, vcs) = tracker(Some("abc"));

        assert_eq!(
            tracker.record_install(temp.path(), temp.path()),
            Some("abc".to_string())
        );
        assert!(!tracker.needs_install(temp.path(), temp.path()));

        *vcs.0.borrow_mut() = Some("def".to_string());
        assert!(tracker.needs_install(temp.path(), temp.path()));
    }

    #[test]
    fn test_unknown_revision_needs_install() {
        let temp = TempDir::new().unwrap();
        std::fs::write(InstallTracker::fingerprint_path(temp.path()), "abc").unwrap();
        let (tracker, _) = tracker(None);
        assert!(tracker.needs_install(temp.path(), temp.path()));
    }

    #[test]
    fn test_unknown_revision_records_nothing() {
        let temp = TempDir::new().unwrap();
        let (tracker, _) = tracker(None);
        assert_eq!(tracker.record_install(temp.path(), temp.path()), None);
        assert!(!InstallTracker::fingerprint_path(temp.path()).exists());
    }
}
