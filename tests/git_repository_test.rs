//! Integration tests against real git repositories.

mod common;

use std::time::Duration;

use async_trait::async_trait;
use commitsmith::commit::{BatchOutcome, FailureStage};
use commitsmith::error::VcsError;
use commitsmith::git::{FileDiff, FileStatus, VersionControl, WorkingTreeStatus};
use commitsmith::{
    BatchOptions, BatchOrchestrator, GenerationClient, GenerationConfig, GitRepository,
    PrivacySanitizer,
};

use common::{FakeGenerator, TestRepo};

#[tokio::test]
async fn test_status_lists_modified_and_untracked_files() {
    let test_repo = TestRepo::new();
    test_repo.write("src/lib.rs", "pub fn one() {}\n");
    test_repo.commit_all("Initial commit");

    test_repo.write("src/lib.rs", "pub fn one() {}\npub fn two() {}\n");
    test_repo.write("notes/todo.txt", "ship it\n");

    let git = GitRepository::discover(test_repo.path()).unwrap();
    let status = git.status().await.unwrap();

    assert_eq!(status.unstaged, vec!["src/lib.rs".to_string()]);
    assert_eq!(status.untracked, vec!["notes/todo.txt".to_string()]);
    assert_eq!(
        status.pending_files(),
        vec!["notes/todo.txt".to_string(), "src/lib.rs".to_string()]
    );
}

#[tokio::test]
async fn test_diff_reports_counts_and_status() {
    let test_repo = TestRepo::new();
    test_repo.write("a.txt", "one\ntwo\nthree\n");
    test_repo.commit_all("Initial commit");

    test_repo.write("a.txt", "one\n2\nthree\nfour\n");
    test_repo.write("b.txt", "brand new\n");

    let git = GitRepository::discover(test_repo.path()).unwrap();

    let modified = git.diff("a.txt", false).await.unwrap();
    assert_eq!(modified.status, FileStatus::Modified);
    assert_eq!(modified.additions, 2);
    assert_eq!(modified.deletions, 1);
    assert!(modified.content.contains("+four"));

    let added = git.diff("b.txt", false).await.unwrap();
    assert_eq!(added.status, FileStatus::Added);
    assert_eq!(added.additions, 1);
    assert!(added.content.contains("+brand new"));
}

#[tokio::test]
async fn test_diff_of_deleted_file() {
    let test_repo = TestRepo::new();
    test_repo.write("old.md", "# Old\n\nGone soon\n");
    test_repo.commit_all("Initial commit");
    test_repo.remove("old.md");

    let git = GitRepository::discover(test_repo.path()).unwrap();
    let diff = git.diff("old.md", false).await.unwrap();

    assert!(diff.is_deleted());
    assert_eq!(diff.deletions, 3);
}

#[tokio::test]
async fn test_stage_and_commit_single_file() {
    let test_repo = TestRepo::new();
    test_repo.write("a.txt", "a\n");
    test_repo.write("b.txt", "b\n");

    let git = GitRepository::discover(test_repo.path()).unwrap();
    git.stage("a.txt").await.unwrap();
    let id = git.commit("Added the a file").await.unwrap();

    let oid = git2::Oid::from_str(&id).unwrap();
    assert_eq!(test_repo.files_in_commit(oid), vec!["a.txt".to_string()]);

    let status = git.status().await.unwrap();
    assert_eq!(status.untracked, vec!["b.txt".to_string()]);
}

#[tokio::test]
async fn test_batch_commits_each_file_separately() {
    let test_repo = TestRepo::new();
    test_repo.write("README.md", "# Project\n");
    test_repo.commit_all("Initial commit");

    test_repo.write("README.md", "# Project\n\nUsage notes\n");
    test_repo.write("src/lib.rs", "pub fn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n");
    test_repo.write("Cargo.lock", "# generated\nversion = 3\n");
    test_repo.write(".env", "API_KEY=abc123\n");

    let git = GitRepository::discover(test_repo.path()).unwrap();
    let sanitizer = PrivacySanitizer::new(Some(git.workdir().to_path_buf()));
    let generator = FakeGenerator::replying([Ok(r#"{"kind": "batch", "files": {"src/lib.rs": {"suggestions": [{"message": "Added an add function for summing two integers", "confidence": 0.9}]}}}"#.to_string())]);
    let client = GenerationClient::new(
        generator.clone(),
        GenerationConfig::new("test-key"),
        sanitizer.clone(),
    );
    let mut batch = BatchOrchestrator::new(git, client, sanitizer, BatchOptions::default());

    let report = batch.run().await.unwrap();

    assert_eq!(report.outcome, BatchOutcome::Completed);
    assert_eq!(report.attempted, 3);
    assert_eq!(report.processed(), 3);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].path, ".env");
    assert_eq!(generator.calls(), 1);

    for record in &report.committed {
        let oid = git2::Oid::from_str(record.commit_id.as_deref().unwrap()).unwrap();
        assert_eq!(test_repo.files_in_commit(oid), vec![record.path.clone()]);
    }

    let log = test_repo.log();
    assert_eq!(log.len(), 4);
    assert_eq!(log[3], "Initial commit");
    assert!(log.contains(&"Added an add function for summing two integers".to_string()));
    assert!(log.contains(&"Added dependencies lock file Cargo.lock".to_string()));
    assert!(log.contains(&"Updated documentation in README.md".to_string()));

    // The withheld file stays untracked.
    let status = batch.vcs().status().await.unwrap();
    assert_eq!(status.untracked, vec![".env".to_string()]);
}

#[tokio::test]
async fn test_batch_reports_lock_contention() {
    let test_repo = TestRepo::new();
    test_repo.write("notes.txt", "hello\n");

    let git = GitRepository::discover(test_repo.path()).unwrap();
    let sanitizer = PrivacySanitizer::new(Some(git.workdir().to_path_buf()));
    let client = GenerationClient::new(
        FakeGenerator::default(),
        GenerationConfig::new("test-key"),
        sanitizer.clone(),
    );
    let options = BatchOptions {
        lock_timeout: Duration::from_millis(50),
        ..Default::default()
    };
    let mut batch = BatchOrchestrator::new(git, client, sanitizer, options);

    // Analysis reads the index without locking it, so only staging collides.
    let lock = test_repo.lock_index();
    let report = batch.run().await.unwrap();
    std::fs::remove_file(lock).unwrap();

    assert_eq!(report.processed(), 0);
    assert_eq!(report.failed.len(), 1);
    assert!(test_repo.log().is_empty());
}

/// Real repository whose commit is rejected for one message, as a failing hook would.
struct RejectingRepository {
    inner: GitRepository,
    rejected_message: String,
}

#[async_trait]
impl VersionControl for RejectingRepository {
    async fn status(&self) -> Result<WorkingTreeStatus, VcsError> {
        self.inner.status().await
    }

    async fn diff(&self, path: &str, staged: bool) -> Result<FileDiff, VcsError> {
        self.inner.diff(path, staged).await
    }

    async fn stage(&self, path: &str) -> Result<(), VcsError> {
        self.inner.stage(path).await
    }

    async fn unstage(&self, path: &str) -> Result<(), VcsError> {
        self.inner.unstage(path).await
    }

    async fn commit(&self, message: &str) -> Result<String, VcsError> {
        if message == self.rejected_message {
            return Err(VcsError::CommitFailed(git2::Error::from_str(
                "pre-commit hook rejected the commit",
            )));
        }
        self.inner.commit(message).await
    }

    fn index_locked(&self) -> bool {
        self.inner.index_locked()
    }
}

#[tokio::test]
async fn test_failed_commit_does_not_leak_into_next_commit() {
    let test_repo = TestRepo::new();
    test_repo.write("docs/a.md", "# A\n");
    test_repo.write("docs/b.md", "# B\n");
    test_repo.commit_all("Initial commit");

    test_repo.write("docs/a.md", "# A\n\nMore about a\n");
    test_repo.write("docs/b.md", "# B\n\nMore about b\n");

    let git = GitRepository::discover(test_repo.path()).unwrap();
    let sanitizer = PrivacySanitizer::new(Some(git.workdir().to_path_buf()));
    let client = GenerationClient::new(
        FakeGenerator::default(),
        GenerationConfig::new("test-key"),
        sanitizer.clone(),
    );
    let vcs = RejectingRepository {
        inner: git,
        rejected_message: "Updated documentation in a.md".to_string(),
    };
    let mut batch = BatchOrchestrator::new(vcs, client, sanitizer, BatchOptions::default());

    let report = batch.run().await.unwrap();

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].path, "docs/a.md");
    assert_eq!(report.failed[0].stage, FailureStage::Commit);
    assert_eq!(report.processed(), 1);

    let record = &report.committed[0];
    assert_eq!(record.path, "docs/b.md");
    let oid = git2::Oid::from_str(record.commit_id.as_deref().unwrap()).unwrap();
    assert_eq!(test_repo.files_in_commit(oid), vec!["docs/b.md".to_string()]);

    // The rejected file is back to an unstaged modification.
    let status = batch.vcs().status().await.unwrap();
    assert!(status.staged.is_empty());
    assert_eq!(status.unstaged, vec!["docs/a.md".to_string()]);
}
