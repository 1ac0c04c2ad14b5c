//! git2-backed implementation of [`VersionControl`].
//!
//! Every operation opens the repository inside `spawn_blocking`, so several
//! diffs can be read concurrently without sharing a `git2::Repository`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use git2::{ErrorCode, ObjectType, Oid, Repository, Status, StatusOptions};
use tracing::debug;

use crate::error::VcsError;

use super::diff::{FileDiff, collect_file_diff};
use super::{VersionControl, WorkingTreeStatus};

/// A repository on disk, addressed by path.
#[derive(Debug, Clone)]
pub struct GitRepository {
    workdir: PathBuf,
    git_dir: PathBuf,
}

impl GitRepository {
    /// Discover the repository containing `path`.
    pub fn discover(path: impl AsRef<Path>) -> Result<Self, VcsError> {
        let repo = Repository::discover(path.as_ref()).map_err(VcsError::OpenRepository)?;
        let git_dir = repo.path().to_path_buf();
        let workdir = repo
            .workdir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| git_dir.clone());
        Ok(Self { workdir, git_dir })
    }

    /// Root of the working tree.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn open(&self) -> Result<Repository, VcsError> {
        Repository::open(&self.workdir).map_err(VcsError::OpenRepository)
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, VcsError>
    where
        T: Send + 'static,
        F: FnOnce(GitRepository) -> Result<T, VcsError> + Send + 'static,
    {
        let this = self.clone();
        tokio::task::spawn_blocking(move || op(this))
            .await
            .map_err(|e| VcsError::TaskFailed(e.to_string()))?
    }
}

#[async_trait]
impl VersionControl for GitRepository {
    async fn status(&self) -> Result<WorkingTreeStatus, VcsError> {
        self.blocking(|this| read_status(&this.open()?)).await
    }

    async fn diff(&self, path: &str, staged: bool) -> Result<FileDiff, VcsError> {
        let path = path.to_string();
        self.blocking(move |this| collect_file_diff(&this.open()?, &path, staged))
            .await
    }

    async fn stage(&self, path: &str) -> Result<(), VcsError> {
        let path = path.to_string();
        self.blocking(move |this| stage_path(&this.open()?, &this.workdir, &path))
            .await
    }

    async fn unstage(&self, path: &str) -> Result<(), VcsError> {
        let path = path.to_string();
        self.blocking(move |this| unstage_path(&this.open()?, &path))
            .await
    }

    async fn commit(&self, message: &str) -> Result<String, VcsError> {
        let message = message.to_string();
        self.blocking(move |this| commit_index(&this.open()?, &message).map(|oid| oid.to_string()))
            .await
    }

    fn index_locked(&self) -> bool {
        self.git_dir.join("index.lock").exists()
    }
}

/// Read the working tree status, grouped the way `git status` shows it.
fn read_status(repo: &Repository) -> Result<WorkingTreeStatus, VcsError> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false)
        .renames_head_to_index(true);

    let statuses = repo
        .statuses(Some(&mut opts))
        .map_err(VcsError::StatusFailed)?;

    let staged_mask = Status::INDEX_NEW
        | Status::INDEX_MODIFIED
        | Status::INDEX_DELETED
        | Status::INDEX_RENAMED
        | Status::INDEX_TYPECHANGE;
    let unstaged_mask =
        Status::WT_MODIFIED | Status::WT_DELETED | Status::WT_RENAMED | Status::WT_TYPECHANGE;

    let mut result = WorkingTreeStatus::default();
    for entry in statuses.iter() {
        let Some(path) = entry.path() else {
            continue;
        };
        let status = entry.status();

        if status.intersects(staged_mask) {
            result.staged.push(path.to_string());
        }
        if status.intersects(unstaged_mask) {
            result.unstaged.push(path.to_string());
        }
        if status.contains(Status::WT_NEW) {
            result.untracked.push(path.to_string());
        }
    }

    Ok(result)
}

/// Stage one path: add it if it exists on disk, otherwise record its deletion.
fn stage_path(repo: &Repository, workdir: &Path, path: &str) -> Result<(), VcsError> {
    let to_stage_err = |e| index_error(path, e);

    let mut index = repo.index().map_err(to_stage_err)?;
    let relative = Path::new(path);

    if workdir.join(relative).exists() {
        index.add_path(relative).map_err(to_stage_err)?;
    } else {
        index.remove_path(relative).map_err(to_stage_err)?;
    }
    index.write().map_err(to_stage_err)?;

    debug!("Staged {}", path);
    Ok(())
}

/// Put the index entry of `path` back to what HEAD has.
///
/// On an unborn branch there is nothing to go back to, so the entry is removed.
fn unstage_path(repo: &Repository, path: &str) -> Result<(), VcsError> {
    let head = match repo.head() {
        Ok(head) => Some(
            head.peel(ObjectType::Commit)
                .map_err(|e| index_error(path, e))?,
        ),
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => None,
        Err(e) => return Err(index_error(path, e)),
    };

    match head {
        Some(commit) => repo
            .reset_default(Some(&commit), [path])
            .map_err(|e| index_error(path, e))?,
        None => {
            let mut index = repo.index().map_err(|e| index_error(path, e))?;
            index
                .remove_path(Path::new(path))
                .map_err(|e| index_error(path, e))?;
            index.write().map_err(|e| index_error(path, e))?;
        }
    }

    debug!("Unstaged {}", path);
    Ok(())
}

fn index_error(path: &str, e: git2::Error) -> VcsError {
    if e.code() == ErrorCode::Locked {
        VcsError::LockContention { waited_ms: 0 }
    } else {
        VcsError::StagingFailed {
            path: path.to_string(),
            source: e,
        }
    }
}

/// Create a commit on HEAD from the current index.
///
/// Works on an unborn branch as well, producing a root commit.
fn commit_index(repo: &Repository, message: &str) -> Result<Oid, VcsError> {
    let mut index = repo.index().map_err(VcsError::CommitFailed)?;
    let tree_id = index.write_tree().map_err(VcsError::CommitFailed)?;
    let tree = repo.find_tree(tree_id).map_err(VcsError::CommitFailed)?;

    let sig = repo.signature().map_err(VcsError::ConfigError)?;

    let parent = match repo.head() {
        Ok(head) => Some(head.peel_to_commit().map_err(VcsError::CommitFailed)?),
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => None,
        Err(e) => return Err(VcsError::CommitFailed(e)),
    };
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .map_err(VcsError::CommitFailed)
}
