//! Repository cache.
//!
//! Keeps one working copy per `(owner, repo, branch)` under the cache root:
//!
//! ```text
//! <cache_root>/
//! └── <owner>/<repo>/<branch>/     # working copy
//!     ├── last-pull.txt            # epoch millis of the last clone/pull
//!     └── ...
//! ```
//!
//! A working copy younger than the sync interval is reused untouched. An older
//! one is pulled; if the pull fails the stale copy is used anyway. Only a
//! failed first clone is fatal.

use crate::config::MarkerConfig;
use crate::error::{PyghxError, Result};
use crate::locator::RepositoryLocator;
use crate::markers::{read_marker, write_marker};
use crate::vcs::VersionControl;
use chrono::{DateTime, TimeZone, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How `prepare` brought the working copy up to date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No local copy existed; a fresh clone was made.
    Cloned,
    /// The last sync was recent enough that no network call was made.
    Fresh { age: Duration },
    /// The working copy was pulled successfully.
    Pulled,
    /// The pull failed; the existing copy is used as-is.
    Stale { reason: String },
}

/// A working copy ready for use.
#[derive(Debug, Clone)]
pub struct PreparedRepository {
    pub locator: RepositoryLocator,
    pub local_path: PathBuf,
    pub outcome: SyncOutcome,
}

impl PreparedRepository {
    /// Directory of the package inside the working copy.
    pub fn package_path(&self) -> Result<PathBuf> {
        let path = if self.locator.subpath.is_empty() {
            self.local_path.clone()
        } else {
            self.local_path.join(&self.locator.subpath)
        };

        if !path.is_dir() {
            return Err(PyghxError::PackagePathMissing(path));
        }
        debug!("Package path: {}", path.display());
        Ok(path)
    }

    /// Whether `prepare` emitted a stale-copy warning.
    pub fn is_stale(&self) -> bool {
        matches!(self.outcome, SyncOutcome::Stale { .. })
    }
}

/// Maps locators to local working copies.
pub struct RepositoryCache {
    root: PathBuf,
    sync_interval: Duration,
    vcs: Arc<dyn VersionControl>,
}

impl RepositoryCache {
    pub fn new(
        root: impl Into<PathBuf>,
        sync_interval: Duration,
        vcs: Arc<dyn VersionControl>,
    ) -> Self {
        Self {
            root: root.into(),
            sync_interval,
            vcs,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Working-copy directory for a locator.
    pub fn repo_dir(&self, locator: &RepositoryLocator) -> PathBuf {
        self.root.join(locator.cache_key())
    }

    /// Ensure a usable working copy exists and return it.
    ///
    /// Safe to call repeatedly: within the sync interval no version-control
    /// operation is performed at all.
    pub fn prepare(&self, locator: &RepositoryLocator) -> Result<PreparedRepository> {
        let repo_dir = self.repo_dir(locator);
        info!("Repository directory: {}", repo_dir.display());

        let outcome = if repo_dir.exists() {
            self.refresh(locator, &repo_dir)
        } else {
            self.clone_fresh(locator, &repo_dir)?
        };

        Ok(PreparedRepository {
            locator: locator.clone(),
            local_path: repo_dir,
            outcome,
        })
    }

    /// When the working copy was last synced, if recorded.
    pub fn last_sync(&self, locator: &RepositoryLocator) -> Option<DateTime<Utc>> {
        read_sync_time(&self.repo_dir(locator).join(MarkerConfig::LAST_SYNC_FILE))
    }

    fn clone_fresh(&self, locator: &RepositoryLocator, repo_dir: &Path) -> Result<SyncOutcome> {
        info!("Cloning repository {}...", locator);
        if let Some(parent) = repo_dir.parent() {
            fs::create_dir_all(parent).map_err(|e| PyghxError::io_with_path(e, parent))?;
        }

        if let Err(e) = self
            .vcs
            .clone_branch(&locator.clone_url(), &locator.branch, repo_dir)
        {
            // A half-written clone would be mistaken for a cached copy next run.
            if repo_dir.exists() {
                if let Err(rm) = fs::remove_dir_all(repo_dir) {
                    warn!("Failed to remove partial clone {}: {}", repo_dir.display(), rm);
                }
            }
            return Err(e);
        }

        self.record_sync(repo_dir);
        Ok(SyncOutcome::Cloned)
    }

    fn refresh(&self, locator: &RepositoryLocator, repo_dir: &Path) -> SyncOutcome {
        info!("Repository already exists. Checking for updates...");
        let marker = repo_dir.join(MarkerConfig::LAST_SYNC_FILE);

        if let Some(last) = read_sync_time(&marker) {
            // A timestamp in the future counts as "just synced".
            let age = (Utc::now() - last).to_std().unwrap_or(Duration::ZERO);
            debug!("Last pull was {:.2} minutes ago", age.as_secs_f64() / 60.0);
            if age < self.sync_interval {
                info!(
                    "Skipping pull, last sync was less than {} seconds ago",
                    self.sync_interval.as_secs()
                );
                return SyncOutcome::Fresh { age };
            }
        }

        info!("Pulling latest changes...");
        match self.vcs.pull(repo_dir, &locator.branch) {
            Ok(()) => {
                self.record_sync(repo_dir);
                SyncOutcome::Pulled
            }
            Err(e) => {
                warn!("Failed to pull latest changes: {}", e);
                warn!("Continuing with existing repository...");
                SyncOutcome::Stale {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn record_sync(&self, repo_dir: &Path) {
        let marker = repo_dir.join(MarkerConfig::LAST_SYNC_FILE);
        let now = Utc::now().timestamp_millis();
        match write_marker(&marker, &now.to_string()) {
            Ok(()) => debug!("Updated {} with timestamp: {}", marker.display(), now),
            Err(e) => warn!("Failed to record sync time: {}", e),
        }
    }
}

/// Parse the epoch-millis sync marker. Unreadable or garbled markers read as
/// "never synced", which forces a pull.
fn read_sync_time(marker: &Path) -> Option<DateTime<Utc>> {
    let token = match read_marker(marker) {
        Ok(Some(token)) => token,
        Ok(None) => return None,
        Err(e) => {
            warn!("Error reading last pull time: {}", e);
            return None;
        }
    };

    match token.parse::<i64>() {
        Ok(millis) => Utc.timestamp_millis_opt(millis).single(),
        Err(e) => {
            warn!("Error reading last pull time from {}: {}", marker.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Records calls; clone creates the destination directory.
    #[derive(Default)]
    struct ScriptedVcs {
        fail_clone: bool,
        fail_pull: bool,
        calls: RefCell<Vec<String>>,
    }

    impl VersionControl for ScriptedVcs {
        fn clone_branch(&self, _url: &str, branch: &str, dest: &Path) -> Result<()> {
            self.calls.borrow_mut().push(format!("clone {branch}"));
            fs::create_dir_all(dest).unwrap();
            if self.fail_clone {
                return Err(PyghxError::Clone {
                    url: "u".into(),
                    branch: branch.into(),
                    message: "remote not found".into(),
                });
            }
            Ok(())
        }

        fn pull(&self, dir: &Path, branch: &str) -> Result<()> {
            self.calls.borrow_mut().push(format!("pull {branch}"));
            if self.fail_pull {
                return Err(PyghxError::Sync {
                    path: dir.to_path_buf(),
                    branch: branch.into(),
                    message: "network unreachable".into(),
                });
            }
            Ok(())
        }

        fn current_revision(&self, _dir: &Path) -> Option<String> {
            None
        }
    }

    fn locator() -> RepositoryLocator {
        RepositoryLocator::parse("https://github.com/acme/tool").unwrap()
    }

    #[test]
    fn test_read_sync_time_garbage() {
        let temp = TempDir::new().unwrap();
        let marker = temp.path().join("last-pull.txt");
        std::fs::write(&marker, "yesterday").unwrap();
        assert_eq!(read_sync_time(&marker), None);
    }

    #[test]
    fn test_read_sync_time_roundtrip() {
        let temp = TempDir::new().unwrap();
        let marker = temp.path().join("last-pull.txt");
        std::fs::write(&marker, "1700000000000").unwrap();
        let ts = read_sync_time(&marker).unwrap();
        assert_eq!(ts.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_failed_clone_leaves_no_directory() {
        let temp = TempDir::new().unwrap();
        let vcs = Arc::new(ScriptedVcs {
            fail_clone: true,
            ..Default::default()
        });
        let cache = RepositoryCache::new(temp.path(), Duration::from_secs(300), vcs);

        let result = cache.prepare(&locator());
        assert!(matches!(result, Err(PyghxError::Clone { .. })));
        assert!(!cache.repo_dir(&locator()).exists());
    }

    #[test]
    fn test_missing_marker_forces_pull() {
        let temp = TempDir::new().unwrap();
        let vcs = Arc::new(ScriptedVcs::default());
        let cache = RepositoryCache::new(temp.path(), Duration::from_secs(300), vcs.clone());
        std::fs::create_dir_all(cache.repo_dir(&locator())).unwrap();

        let prepared = cache.prepare(&locator()).unwrap();
        assert_eq!(prepared.outcome, SyncOutcome::Pulled);
        assert_eq!(*vcs.calls.borrow(), vec!["pull main".to_string()]);
        assert!(cache.last_sync(&locator()).is_some());
    }

    #[test]
    fn test_package_path_missing_subpath() {
        let temp = TempDir::new().unwrap();
        let prepared = PreparedRepository {
            locator: RepositoryLocator::parse("https://github.com/acme/tool/tree/main/nope")
                .unwrap(),
            local_path: temp.path().to_path_buf(),
            outcome: SyncOutcome::Cloned,
        };
        assert!(matches!(
            prepared.package_path(),
            Err(PyghxError::PackagePathMissing(_))
        ));
    }
}
