//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use git2::{Oid, Repository, Signature};

use commitsmith::error::{GenerationError, VcsError};
use commitsmith::git::{FileDiff, VersionControl, WorkingTreeStatus};
use commitsmith::llm::TextGenerator;

/// A test git repository builder for integration tests.
pub struct TestRepo {
    pub dir: tempfile::TempDir,
    pub repo: Repository,
}

impl TestRepo {
    /// Create a new empty git repository with a committer identity configured.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let repo = Repository::init(dir.path()).expect("Failed to init git repo");
        {
            let mut config = repo.config().expect("Failed to open repo config");
            config
                .set_str("user.name", "Test User")
                .expect("Failed to set user.name");
            config
                .set_str("user.email", "test@example.com")
                .expect("Failed to set user.email");
        }
        Self { dir, repo }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file relative to the repository root, creating parent directories.
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let full = self.dir.path().join(rel);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&full, content).expect("Failed to write test file");
        full
    }

    pub fn remove(&self, rel: &str) {
        std::fs::remove_file(self.dir.path().join(rel)).expect("Failed to remove test file");
    }

    /// Stage every file in the working tree and commit. Returns the commit OID.
    pub fn commit_all(&self, message: &str) -> Oid {
        let sig =
            Signature::now("Test User", "test@example.com").expect("Failed to create signature");

        let mut index = self.repo.index().expect("Failed to get index");
        index
            .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
            .expect("Failed to add files");
        index.write().expect("Failed to write index");
        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = self.repo.find_tree(tree_id).expect("Failed to find tree");

        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("Failed to create commit")
    }

    /// Messages of every commit reachable from HEAD, newest first.
    pub fn log(&self) -> Vec<String> {
        let Ok(mut walk) = self.repo.revwalk() else {
            return Vec::new();
        };
        if walk.push_head().is_err() {
            return Vec::new();
        }
        walk.filter_map(|oid| oid.ok())
            .filter_map(|oid| self.repo.find_commit(oid).ok())
            .map(|c| c.message().unwrap_or_default().to_string())
            .collect()
    }

    /// Paths touched by the commit `oid`, compared to its first parent.
    pub fn files_in_commit(&self, oid: Oid) -> Vec<String> {
        let commit = self.repo.find_commit(oid).expect("Failed to find commit");
        let tree = commit.tree().expect("Failed to read tree");
        let parent_tree = commit.parent(0).ok().and_then(|p| p.tree().ok());
        let diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)
            .expect("Failed to diff commit");
        diff.deltas()
            .filter_map(|d| {
                d.new_file()
                    .path()
                    .or_else(|| d.old_file().path())
                    .map(|p| p.to_string_lossy().to_string())
            })
            .collect()
    }

    pub fn lock_index(&self) -> PathBuf {
        let lock = self.dir.path().join(".git/index.lock");
        std::fs::write(&lock, "").expect("Failed to create index.lock");
        lock
    }
}

/// In-memory repository with instrumentation for concurrency and lock tests.
#[derive(Default)]
pub struct FakeVcs {
    pub files: BTreeMap<String, FileDiff>,
    /// How long each diff read takes.
    pub diff_delay: Duration,
    pub locked: Arc<AtomicBool>,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub staged: Mutex<Vec<String>>,
    pub commits: Mutex<Vec<String>>,
}

impl FakeVcs {
    pub fn with_files(files: impl IntoIterator<Item = FileDiff>) -> Self {
        Self {
            files: files.into_iter().map(|f| (f.path.clone(), f)).collect(),
            ..Default::default()
        }
    }

    pub fn committed_messages(&self) -> Vec<String> {
        self.commits.lock().unwrap().clone()
    }
}

#[async_trait]
impl VersionControl for FakeVcs {
    async fn status(&self) -> Result<WorkingTreeStatus, VcsError> {
        Ok(WorkingTreeStatus {
            untracked: self.files.keys().cloned().collect(),
            ..Default::default()
        })
    }

    async fn diff(&self, path: &str, _staged: bool) -> Result<FileDiff, VcsError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.diff_delay.is_zero() {
            tokio::time::sleep(self.diff_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| VcsError::NoChanges(path.to_string()))
    }

    async fn stage(&self, path: &str) -> Result<(), VcsError> {
        self.staged.lock().unwrap().push(path.to_string());
        Ok(())
    }

    async fn unstage(&self, path: &str) -> Result<(), VcsError> {
        self.staged.lock().unwrap().retain(|p| p != path);
        Ok(())
    }

    async fn commit(&self, message: &str) -> Result<String, VcsError> {
        let mut commits = self.commits.lock().unwrap();
        commits.push(message.to_string());
        Ok(format!("{:040x}", commits.len()))
    }

    fn index_locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }
}

/// Generator replaying canned responses and recording every prompt.
///
/// Clones share state, so a test can keep a handle after moving one into a client.
#[derive(Clone, Default)]
pub struct FakeGenerator {
    responses: Arc<Mutex<VecDeque<Result<String, GenerationError>>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl FakeGenerator {
    pub fn replying(responses: impl IntoIterator<Item = Result<String, GenerationError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into_iter().collect())),
            prompts: Arc::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(
        &self,
        _model: &str,
        prompt: &str,
        _timeout: Duration,
    ) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(GenerationError::EmptyResponse))
    }
}
