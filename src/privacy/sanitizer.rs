//! Skip decisions and redaction of paths and diff content.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::git::{FileDiff, FileStatus};

use super::patterns::{
    COMMENT_LINE, CONTENT_PATTERNS, REDACTION_PREFIX, SENSITIVE_COMMENT_WORDS,
    SENSITIVE_DIRECTORIES, SENSITIVE_EXTENSIONS, SENSITIVE_FILENAMES, SENSITIVE_JSON_FILES,
};
use super::report::PrivacyReport;

const COMMENT_CATEGORY: &str = "sensitive-comment";

/// Why a file is withheld from the text-generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    SensitiveFileType(String),
    SensitiveJsonFile(String),
    SensitiveDirectory(String),
    SensitiveContent(Vec<&'static str>),
    PathEscapesRepository,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::SensitiveFileType(kind) => write!(f, "sensitive file type ({kind})"),
            SkipReason::SensitiveJsonFile(name) => {
                write!(f, "sensitive configuration file ({name})")
            }
            SkipReason::SensitiveDirectory(dir) => {
                write!(f, "located in sensitive directory '{dir}'")
            }
            SkipReason::SensitiveContent(categories) => {
                write!(f, "contains sensitive content ({})", categories.join(", "))
            }
            SkipReason::PathEscapesRepository => write!(f, "path escapes the repository"),
        }
    }
}

/// A diff that is safe to send: sanitized path, redacted content, warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct SanitizedDiff {
    /// Path as the repository knows it. Stays local, never sent.
    pub original_path: String,
    /// Repository-relative, home-relative or bare file name.
    pub path: String,
    pub status: FileStatus,
    pub old_path: Option<String>,
    pub additions: usize,
    pub deletions: usize,
    pub content: String,
    pub truncated: bool,
    /// True when path or content differ from the original.
    pub was_modified: bool,
    pub warnings: Vec<String>,
}

impl SanitizedDiff {
    pub fn total_changes(&self) -> usize {
        self.additions + self.deletions
    }

    /// Base filename of the sanitized path.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Result of a content redaction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentRedaction {
    pub content: String,
    /// Redaction count per category.
    pub counts: BTreeMap<&'static str, usize>,
}

impl ContentRedaction {
    pub fn is_modified(&self) -> bool {
        !self.counts.is_empty()
    }

    /// One warning per redacted category.
    pub fn warnings(&self) -> Vec<String> {
        self.counts
            .iter()
            .map(|(category, count)| format!("Redacted {count} {category} match(es)"))
            .collect()
    }
}

/// Decides what may leave the machine and redacts the rest.
#[derive(Debug, Clone, Default)]
pub struct PrivacySanitizer {
    repo_root: Option<PathBuf>,
    home: Option<PathBuf>,
}

impl PrivacySanitizer {
    /// Sanitizer for a repository rooted at `repo_root`, using the user's home directory.
    pub fn new(repo_root: Option<PathBuf>) -> Self {
        Self {
            repo_root,
            home: dirs::home_dir(),
        }
    }

    /// Sanitizer with an explicit home directory.
    pub fn with_home(mut self, home: Option<PathBuf>) -> Self {
        self.home = home;
        self
    }

    /// Decide whether a file must be withheld entirely.
    ///
    /// Checked in order: path escape, sensitive file type, sensitive JSON
    /// file, sensitive directory, sensitive content.
    pub fn skip_reason(&self, diff: &FileDiff) -> Option<SkipReason> {
        let path = Path::new(&diff.path);

        if escapes_repository(path, self.repo_root.as_deref()) {
            return Some(SkipReason::PathEscapesRepository);
        }

        let file_name = diff.file_name().to_lowercase();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        if file_name.starts_with(".env") {
            return Some(SkipReason::SensitiveFileType(".env".to_string()));
        }
        if SENSITIVE_FILENAMES.contains(&file_name.as_str()) {
            return Some(SkipReason::SensitiveFileType(file_name));
        }
        if let Some(ext) = extension.as_deref()
            && SENSITIVE_EXTENSIONS.contains(&ext)
        {
            return Some(SkipReason::SensitiveFileType(format!(".{ext}")));
        }

        if extension.as_deref() == Some("json")
            && SENSITIVE_JSON_FILES.contains(&file_name.as_str())
        {
            return Some(SkipReason::SensitiveJsonFile(file_name));
        }

        for component in path.components() {
            if let Component::Normal(segment) = component
                && let Some(segment) = segment.to_str()
                && SENSITIVE_DIRECTORIES.contains(&segment.to_lowercase().as_str())
                && segment != diff.file_name()
            {
                return Some(SkipReason::SensitiveDirectory(segment.to_string()));
            }
        }

        let categories = matching_categories(&diff.content);
        if !categories.is_empty() {
            return Some(SkipReason::SensitiveContent(categories));
        }

        None
    }

    /// Sanitize path and content of a diff.
    pub fn sanitize(&self, diff: &FileDiff) -> SanitizedDiff {
        let path = sanitize_path(&diff.path, self.repo_root.as_deref(), self.home.as_deref());
        let old_path = diff
            .old_path
            .as_deref()
            .map(|p| sanitize_path(p, self.repo_root.as_deref(), self.home.as_deref()));

        let redaction = sanitize_content(&diff.content);
        let mut warnings = redaction.warnings();
        if path != diff.path {
            warnings.push(format!("Path rewritten to '{path}'"));
        }

        let was_modified =
            redaction.is_modified() || path != diff.path || old_path != diff.old_path;
        if was_modified {
            debug!("Sanitized {}: {} warning(s)", diff.path, warnings.len());
        }

        SanitizedDiff {
            original_path: diff.path.clone(),
            path,
            status: diff.status.clone(),
            old_path,
            additions: diff.additions,
            deletions: diff.deletions,
            content: redaction.content,
            truncated: diff.truncated,
            was_modified,
            warnings,
        }
    }

    /// Aggregate the outcome of a sanitization pass.
    pub fn report(&self, total_files: usize, sanitized: &[SanitizedDiff]) -> PrivacyReport {
        PrivacyReport::from_sanitized(total_files, sanitized)
    }
}

/// Categories of content patterns that match, deduplicated, in table order.
fn matching_categories(content: &str) -> Vec<&'static str> {
    let mut categories: Vec<&'static str> = Vec::new();
    for pattern in CONTENT_PATTERNS.iter() {
        let hit = pattern
            .regex
            .find_iter(content)
            .any(|m| !m.as_str().contains(REDACTION_PREFIX));
        if hit && !categories.contains(&pattern.category) {
            categories.push(pattern.category);
        }
    }
    categories
}

/// Redact every content pattern match, then every comment mentioning secrets.
///
/// Existing redaction markers are left untouched, so sanitizing already
/// sanitized content is a no-op.
pub fn sanitize_content(content: &str) -> ContentRedaction {
    let mut redacted = content.to_string();
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();

    for pattern in CONTENT_PATTERNS.iter() {
        let marker = pattern.marker();
        let mut hits = 0usize;
        let replaced = pattern.regex.replace_all(&redacted, |caps: &regex_lite::Captures<'_>| {
            let matched = &caps[0];
            if matched.contains(REDACTION_PREFIX) {
                matched.to_string()
            } else {
                hits += 1;
                marker.clone()
            }
        });
        if hits > 0 {
            redacted = replaced.into_owned();
            *counts.entry(pattern.category).or_default() += hits;
        }
    }

    let comment_marker = format!("{REDACTION_PREFIX}comment]");
    let mut comment_hits = 0usize;
    let replaced = COMMENT_LINE.replace_all(&redacted, |caps: &regex_lite::Captures<'_>| {
        let prefix = &caps[1];
        let body = &caps[2];
        let trimmed = prefix.trim_start();
        let is_diff_header = trimmed.starts_with("---") || trimmed.starts_with("+++");
        if is_diff_header
            || body.contains(REDACTION_PREFIX)
            || !SENSITIVE_COMMENT_WORDS.is_match(body)
        {
            caps[0].to_string()
        } else {
            comment_hits += 1;
            format!("{prefix}{comment_marker}")
        }
    });
    if comment_hits > 0 {
        redacted = replaced.into_owned();
        counts.insert(COMMENT_CATEGORY, comment_hits);
    }

    ContentRedaction {
        content: redacted,
        counts,
    }
}

/// Rewrite a path to a form that reveals nothing about the local machine.
///
/// Relative paths inside the repository are kept. Absolute paths become
/// repository-relative, else home-relative (`~/...`), else the bare file name.
pub fn sanitize_path(path: &str, repo_root: Option<&Path>, home: Option<&Path>) -> String {
    let p = Path::new(path);

    if p.is_relative() {
        if p.components().any(|c| matches!(c, Component::ParentDir)) {
            return base_name(p, path);
        }
        return to_forward_slashes(p);
    }

    if let Some(root) = repo_root
        && let Ok(relative) = p.strip_prefix(root)
    {
        return to_forward_slashes(relative);
    }

    if let Some(home) = home
        && let Ok(relative) = p.strip_prefix(home)
    {
        return format!("~/{}", to_forward_slashes(relative));
    }

    base_name(p, path)
}

fn base_name(p: &Path, fallback: &str) -> String {
    p.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(fallback)
        .to_string()
}

fn to_forward_slashes(p: &Path) -> String {
    p.components()
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// True when a relative path climbs above its root or an absolute path lies outside it.
fn escapes_repository(path: &Path, repo_root: Option<&Path>) -> bool {
    if path.is_absolute() {
        return repo_root.is_some_and(|root| !path.starts_with(root));
    }

    let mut depth: i32 = 0;
    for component in path.components() {
        match component {
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return true;
                }
            }
            Component::Normal(_) => depth += 1,
            _ => {}
        }
    }
    false
}
