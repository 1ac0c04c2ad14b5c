//! Version-control access: status, per-file diffs, staging and commits.

pub mod diff;
pub mod lock;
pub mod repository;

use async_trait::async_trait;

use crate::error::VcsError;

pub use diff::{FileDiff, FileStatus};
pub use lock::{DEFAULT_LOCK_POLL_INTERVAL, DEFAULT_LOCK_TIMEOUT, wait_for_index_unlock};
pub use repository::GitRepository;

/// Pending changes grouped the way `git status` reports them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingTreeStatus {
    pub staged: Vec<String>,
    pub unstaged: Vec<String>,
    pub untracked: Vec<String>,
}

impl WorkingTreeStatus {
    /// Unstaged and untracked paths, sorted and deduplicated.
    ///
    /// These are the files a batch run commits one by one.
    pub fn pending_files(&self) -> Vec<String> {
        let mut files: Vec<String> = self
            .unstaged
            .iter()
            .chain(self.untracked.iter())
            .cloned()
            .collect();
        files.sort();
        files.dedup();
        files
    }

    pub fn is_clean(&self) -> bool {
        self.staged.is_empty() && self.unstaged.is_empty() && self.untracked.is_empty()
    }
}

/// Operations the commit pipeline needs from the version-control system.
///
/// This abstraction allows the batch orchestrator to run against an
/// in-memory repository in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Report staged, unstaged and untracked paths.
    async fn status(&self) -> Result<WorkingTreeStatus, VcsError>;

    /// Read the diff of a single file, from the index (`staged`) or the working tree.
    async fn diff(&self, path: &str, staged: bool) -> Result<FileDiff, VcsError>;

    /// Stage a single file (or its deletion).
    async fn stage(&self, path: &str) -> Result<(), VcsError>;

    /// Restore the index entry of `path` to HEAD, dropping it on an unborn branch.
    async fn unstage(&self, path: &str) -> Result<(), VcsError>;

    /// Commit the current index and return the new commit id.
    async fn commit(&self, message: &str) -> Result<String, VcsError>;

    /// Whether another process currently holds the index lock.
    fn index_locked(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_files_merges_unstaged_and_untracked() {
        let status = WorkingTreeStatus {
            staged: vec!["staged.rs".into()],
            unstaged: vec!["src/b.rs".into(), "src/a.rs".into()],
            untracked: vec!["new.txt".into(), "src/a.rs".into()],
        };
        assert_eq!(
            status.pending_files(),
            vec!["new.txt".to_string(), "src/a.rs".into(), "src/b.rs".into()]
        );
    }

    #[test]
    fn test_default_status_is_clean() {
        assert!(WorkingTreeStatus::default().is_clean());
    }
}
