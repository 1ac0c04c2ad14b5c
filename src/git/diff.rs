//! Per-file diff collection using git2.

use std::fmt;
use std::path::Path;

use git2::{Delta, Diff, DiffFindOptions, DiffFormat, DiffOptions, ErrorCode, Repository, Tree};
use tracing::warn;

use crate::error::VcsError;

/// Maximum characters of diff text kept per file.
const MAX_DIFF_LENGTH: usize = 30_000;

/// Status of a changed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl FileStatus {
    /// Lowercase label used in prompts.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Added => "new",
            FileStatus::Modified => "modified",
            FileStatus::Deleted => "deleted",
            FileStatus::Renamed => "renamed",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Added => write!(f, "Added"),
            FileStatus::Modified => write!(f, "Modified"),
            FileStatus::Deleted => write!(f, "Deleted"),
            FileStatus::Renamed => write!(f, "Renamed"),
        }
    }
}

/// The recorded change of one file. Immutable once read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: String,
    pub status: FileStatus,
    /// Old path for renamed files (None for non-rename changes).
    pub old_path: Option<String>,
    pub additions: usize,
    pub deletions: usize,
    /// Unified diff text, prefixed with `+`/`-`/` ` origins.
    pub content: String,
    pub truncated: bool,
}

impl FileDiff {
    /// Build a modified-file diff. Mostly useful for tests and fakes.
    pub fn modified(path: &str, additions: usize, deletions: usize, content: &str) -> Self {
        Self {
            path: path.to_string(),
            status: FileStatus::Modified,
            old_path: None,
            additions,
            deletions,
            content: content.to_string(),
            truncated: false,
        }
    }

    /// Same diff with a different status.
    pub fn with_status(mut self, status: FileStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_new(&self) -> bool {
        self.status == FileStatus::Added
    }

    pub fn is_deleted(&self) -> bool {
        self.status == FileStatus::Deleted
    }

    pub fn is_renamed(&self) -> bool {
        self.status == FileStatus::Renamed
    }

    /// Additions plus deletions.
    pub fn total_changes(&self) -> usize {
        self.additions + self.deletions
    }

    /// Base filename of the path.
    pub fn file_name(&self) -> &str {
        Path::new(&self.path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.path)
    }

    /// True when the diff carries neither line changes nor content.
    pub fn is_empty_change(&self) -> bool {
        self.total_changes() == 0 && self.content.trim().is_empty()
    }
}

/// Resolve the HEAD tree, distinguishing empty-repo errors from real failures.
///
/// Returns `Ok(None)` for repos with no commits (unborn branch / not found).
fn resolve_head_tree<'r>(repo: &'r Repository, path: &str) -> Result<Option<Tree<'r>>, VcsError> {
    let head_ref = match repo.head() {
        Ok(r) => r,
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
            return Ok(None);
        }
        Err(e) => {
            return Err(VcsError::DiffFailed {
                path: path.to_string(),
                source: e,
            });
        }
    };

    let tree = head_ref.peel_to_tree().map_err(|e| VcsError::DiffFailed {
        path: path.to_string(),
        source: e,
    })?;
    Ok(Some(tree))
}

/// Collect the diff of a single file.
///
/// `staged` selects HEAD→index; otherwise index→working tree, including the
/// full content of untracked files.
pub fn collect_file_diff(
    repo: &Repository,
    path: &str,
    staged: bool,
) -> Result<FileDiff, VcsError> {
    let to_diff_err = |e: git2::Error| VcsError::DiffFailed {
        path: path.to_string(),
        source: e,
    };

    let mut opts = DiffOptions::new();
    opts.pathspec(path).disable_pathspec_match(true);

    let mut diff = if staged {
        let head_tree = resolve_head_tree(repo, path)?;
        repo.diff_tree_to_index(head_tree.as_ref(), None, Some(&mut opts))
            .map_err(to_diff_err)?
    } else {
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .show_untracked_content(true);
        repo.diff_index_to_workdir(None, Some(&mut opts))
            .map_err(to_diff_err)?
    };

    if staged {
        let mut find = DiffFindOptions::new();
        find.renames(true);
        diff.find_similar(Some(&mut find)).map_err(to_diff_err)?;
    }

    let Some((status, new_path, old_path)) = first_delta(&diff) else {
        return Err(VcsError::NoChanges(path.to_string()));
    };

    let mut file = FileDiff {
        path: new_path.unwrap_or_else(|| path.to_string()),
        status,
        old_path,
        additions: 0,
        deletions: 0,
        content: String::new(),
        truncated: false,
    };
    append_diff_text(&diff, &mut file);

    Ok(file)
}

/// Status and paths of the first delta in a diff.
fn first_delta(diff: &Diff<'_>) -> Option<(FileStatus, Option<String>, Option<String>)> {
    let delta = diff.deltas().next()?;
    let status = match delta.status() {
        Delta::Added | Delta::Untracked => FileStatus::Added,
        Delta::Modified => FileStatus::Modified,
        Delta::Deleted => FileStatus::Deleted,
        Delta::Renamed => FileStatus::Renamed,
        _ => FileStatus::Modified,
    };

    let new_path = delta
        .new_file()
        .path()
        .map(|p| p.to_string_lossy().to_string());
    let old_path = delta
        .old_file()
        .path()
        .map(|p| p.to_string_lossy().to_string());

    match status {
        FileStatus::Renamed => Some((status, new_path, old_path)),
        FileStatus::Deleted => Some((status, old_path.or(new_path), None)),
        _ => Some((status, new_path.or(old_path), None)),
    }
}

/// Append unified diff text and line counts, respecting the max length.
fn append_diff_text(diff: &Diff<'_>, file: &mut FileDiff) {
    let FileDiff {
        content,
        additions,
        deletions,
        truncated,
        ..
    } = file;

    if let Err(e) = diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        let origin = line.origin();
        match origin {
            '+' => *additions += 1,
            '-' => *deletions += 1,
            _ => {}
        }

        // Keep counting after truncation so totals stay accurate.
        if *truncated {
            return true;
        }

        let text = std::str::from_utf8(line.content()).unwrap_or("");
        if content.len() + text.len() + 2 > MAX_DIFF_LENGTH {
            *truncated = true;
            return true;
        }

        if origin == '+' || origin == '-' || origin == ' ' {
            content.push(origin);
        }
        content.push_str(text);

        true
    }) {
        warn!("Failed to collect diff text: {e}");
        *truncated = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_repo_with_commit(dir: &Path, files: &[(&str, &str)]) -> Repository {
        let repo = Repository::init(dir).unwrap();
        {
            let mut index = repo.index().unwrap();
            for (name, body) in files {
                std::fs::write(dir.join(name), body).unwrap();
                index.add_path(Path::new(name)).unwrap();
            }
            index.write().unwrap();
            let tree_id = index.write_tree().unwrap();
            let tree = repo.find_tree(tree_id).unwrap();
            let sig = git2::Signature::now("Test", "test@test.com").unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, "init", &tree, &[]).unwrap();
        }
        repo
    }

    #[test]
    fn test_file_status_labels() {
        assert_eq!(FileStatus::Added.to_string(), "Added");
        assert_eq!(FileStatus::Added.as_str(), "new");
        assert_eq!(FileStatus::Deleted.as_str(), "deleted");
        assert_eq!(FileStatus::Renamed.as_str(), "renamed");
        assert_eq!(FileStatus::Modified.as_str(), "modified");
    }

    #[test]
    fn test_file_diff_helpers() {
        let diff = FileDiff::modified("src/deep/mod.rs", 3, 2, "+a\n");
        assert_eq!(diff.file_name(), "mod.rs");
        assert_eq!(diff.total_changes(), 5);
        assert!(!diff.is_new());
        assert!(!diff.is_empty_change());
        assert!(FileDiff::modified("x", 0, 0, "  ").is_empty_change());
    }

    #[test]
    fn test_untracked_file_reports_full_content() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo_with_commit(dir.path(), &[("keep.txt", "keep\n")]);
        std::fs::write(dir.path().join("new.rs"), "fn a() {}\nfn b() {}\n").unwrap();

        let diff = collect_file_diff(&repo, "new.rs", false).unwrap();
        assert_eq!(diff.status, FileStatus::Added);
        assert_eq!(diff.additions, 2);
        assert_eq!(diff.deletions, 0);
        assert!(diff.content.contains("+fn a() {}"));
    }

    #[test]
    fn test_modified_file_counts_lines() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo_with_commit(dir.path(), &[("file.txt", "one\ntwo\n")]);
        std::fs::write(dir.path().join("file.txt"), "one\nthree\nfour\n").unwrap();

        let diff = collect_file_diff(&repo, "file.txt", false).unwrap();
        assert_eq!(diff.status, FileStatus::Modified);
        assert_eq!(diff.additions, 2);
        assert_eq!(diff.deletions, 1);
        assert!(diff.content.contains("-two"));
    }

    #[test]
    fn test_deleted_file_is_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo_with_commit(dir.path(), &[("gone.txt", "bye\n")]);
        std::fs::remove_file(dir.path().join("gone.txt")).unwrap();

        let diff = collect_file_diff(&repo, "gone.txt", false).unwrap();
        assert!(diff.is_deleted());
        assert_eq!(diff.path, "gone.txt");
        assert_eq!(diff.deletions, 1);
    }

    #[test]
    fn test_unchanged_path_returns_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo_with_commit(dir.path(), &[("same.txt", "same\n")]);

        let result = collect_file_diff(&repo, "same.txt", false);
        assert!(matches!(result, Err(VcsError::NoChanges(_))));
    }

    #[test]
    fn test_staged_diff_on_empty_repo() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        std::fs::write(dir.path().join("first.txt"), "hello\n").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("first.txt")).unwrap();
        index.write().unwrap();

        let diff = collect_file_diff(&repo, "first.txt", true).unwrap();
        assert!(diff.is_new());
        assert_eq!(diff.additions, 1);
    }

    #[test]
    fn test_large_diff_is_truncated_but_counted() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo_with_commit(dir.path(), &[("keep.txt", "keep\n")]);
        let body: String = (0..5_000).map(|i| format!("line number {i}\n")).collect();
        std::fs::write(dir.path().join("big.txt"), &body).unwrap();

        let diff = collect_file_diff(&repo, "big.txt", false).unwrap();
        assert!(diff.truncated);
        assert!(diff.content.len() <= MAX_DIFF_LENGTH);
        assert_eq!(diff.additions, 5_000);
    }
}
