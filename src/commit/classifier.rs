//! Decides per file whether a commit message needs the text-generation
//! service or can be derived deterministically.
//!
//! Rules are an ordered table; the first matching rule wins. Lock-file and
//! generated-file rules come before the generic size and file-type rules so a
//! huge generated JSON file is reported as generated, not merely large.

use std::fmt;
use std::path::Path;

use crate::git::FileDiff;
use crate::privacy::SkipReason;

/// Package manifests with more changed lines than this are summarized.
pub const MANIFEST_CHANGE_THRESHOLD: usize = 20;

/// Any file with more changed lines than this is summarized.
pub const LARGE_CHANGE_THRESHOLD: usize = 1000;

const LOCK_FILES: &[&str] = &[
    "cargo.lock",
    "package-lock.json",
    "npm-shrinkwrap.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "bun.lockb",
    "composer.lock",
    "gemfile.lock",
    "poetry.lock",
    "pipfile.lock",
    "uv.lock",
    "go.sum",
    "flake.lock",
    "mix.lock",
    "pubspec.lock",
    "podfile.lock",
    "packages.lock.json",
    "gradle.lockfile",
];

const GENERATED_MARKERS: &[&str] = &[
    ".min.",
    ".generated.",
    "_generated.",
    ".g.dart",
    ".freezed.dart",
    ".pb.go",
    "_pb2.py",
    ".pb.rs",
    ".designer.cs",
];

const COMPILED_EXTENSIONS: &[&str] = &[
    "class", "pyc", "pyo", "o", "obj", "so", "dll", "dylib", "exe", "a", "lib", "wasm", "jar",
    "war", "rlib", "beam",
];

const BUILD_DIRECTORIES: &[&str] = &[
    "dist",
    "build",
    "out",
    "target",
    "node_modules",
    ".next",
    ".nuxt",
    "coverage",
    "__pycache__",
    ".gradle",
];

const SOURCE_EXTENSIONS: &[&str] = &[
    "rs", "js", "mjs", "cjs", "ts", "jsx", "tsx", "py", "go", "java", "kt", "kts", "c", "h",
    "cc", "cpp", "hpp", "cs", "rb", "php", "swift", "scala", "sh", "vue", "svelte", "dart",
    "ex", "exs", "lua", "zig",
];

const CHANGELOG_STEMS: &[&str] = &[
    "changelog",
    "changes",
    "history",
    "release_notes",
    "release-notes",
    "releases",
    "news",
];

/// Changelog-style documents are plain text; `history.rs` is source code.
const CHANGELOG_EXTENSIONS: &[&str] = &["md", "txt", "rst", "adoc"];

const LOG_TEMP_EXTENSIONS: &[&str] = &["log", "tmp", "temp", "cache", "swp", "swo", "bak"];

const BUNDLE_SUFFIXES: &[&str] = &[".bundle.js", ".chunk.js", ".bundle.css", ".map"];

const MANIFEST_FILES: &[&str] = &[
    "package.json",
    "cargo.toml",
    "pyproject.toml",
    "setup.py",
    "setup.cfg",
    "requirements.txt",
    "composer.json",
    "gemfile",
    "go.mod",
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    "pubspec.yaml",
    "mix.exs",
];

/// Coarse file type derived from the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Source,
    Markdown,
    Json,
    Xml,
    Css,
    Scss,
    Less,
    Config,
    Unknown,
}

impl FileType {
    pub fn from_extension(ext: Option<&str>) -> Self {
        match ext {
            Some("md" | "markdown" | "mdx") => FileType::Markdown,
            Some("json" | "jsonc") => FileType::Json,
            Some("xml" | "xsd" | "xsl" | "svg") => FileType::Xml,
            Some("css") => FileType::Css,
            Some("scss" | "sass") => FileType::Scss,
            Some("less") => FileType::Less,
            Some("toml" | "yaml" | "yml" | "ini" | "cfg") => FileType::Config,
            Some(ext) if SOURCE_EXTENSIONS.contains(&ext) => FileType::Source,
            _ => FileType::Unknown,
        }
    }
}

/// Why a file gets a deterministic summary message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryReason {
    LockFile,
    Generated,
    CompiledArtifact,
    BuildOutput,
    Changelog,
    LogOrTemp,
    Bundle,
    PackageManifest,
    LargeChange,
    DataFormat,
    Documentation,
}

impl fmt::Display for SummaryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SummaryReason::LockFile => "dependency lock file",
            SummaryReason::Generated => "generated file",
            SummaryReason::CompiledArtifact => "compiled artifact",
            SummaryReason::BuildOutput => "build output",
            SummaryReason::Changelog => "changelog",
            SummaryReason::LogOrTemp => "log or temporary file",
            SummaryReason::Bundle => "bundled asset",
            SummaryReason::PackageManifest => "package manifest",
            SummaryReason::LargeChange => "large change",
            SummaryReason::DataFormat => "data or style file",
            SummaryReason::Documentation => "documentation",
        };
        f.write_str(label)
    }
}

/// Outcome of classifying one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Summary(SummaryReason),
    AiEligible,
}

/// Path facts every rule predicate looks at.
struct FileFacts {
    path: String,
    file_name: String,
    extension: Option<String>,
    file_type: FileType,
    segments: Vec<String>,
    changes: usize,
}

impl FileFacts {
    fn new(path: &str, changes: usize) -> Self {
        let lower = path.replace('\\', "/").to_lowercase();
        let p = Path::new(&lower);
        let file_name = p
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&lower)
            .to_string();
        let extension = p.extension().and_then(|e| e.to_str()).map(str::to_string);
        let file_type = FileType::from_extension(extension.as_deref());
        let mut segments: Vec<String> = lower.split('/').map(str::to_string).collect();
        segments.pop();

        Self {
            path: lower,
            file_name,
            extension,
            file_type,
            segments,
            changes,
        }
    }

    fn has_extension(&self, list: &[&str]) -> bool {
        self.extension.as_deref().is_some_and(|e| list.contains(&e))
    }

    fn stem(&self) -> &str {
        self.file_name.split('.').next().unwrap_or(&self.file_name)
    }
}

struct Rule {
    name: &'static str,
    applies: fn(&FileFacts) -> bool,
    reason: SummaryReason,
}

const RULES: &[Rule] = &[
    Rule {
        name: "lock-file",
        applies: |f| LOCK_FILES.contains(&f.file_name.as_str()),
        reason: SummaryReason::LockFile,
    },
    Rule {
        name: "generated",
        applies: |f| {
            GENERATED_MARKERS.iter().any(|m| f.file_name.contains(m))
                || f.segments.iter().any(|s| s == "generated" || s == "__generated__")
        },
        reason: SummaryReason::Generated,
    },
    Rule {
        name: "compiled-artifact",
        applies: |f| f.has_extension(COMPILED_EXTENSIONS),
        reason: SummaryReason::CompiledArtifact,
    },
    Rule {
        name: "build-output",
        applies: |f| {
            f.segments.iter().any(|s| BUILD_DIRECTORIES.contains(&s.as_str()))
                && f.file_type != FileType::Source
        },
        reason: SummaryReason::BuildOutput,
    },
    Rule {
        name: "changelog",
        applies: |f| {
            CHANGELOG_STEMS.contains(&f.stem())
                && (f.extension.is_none() || f.has_extension(CHANGELOG_EXTENSIONS))
        },
        reason: SummaryReason::Changelog,
    },
    Rule {
        name: "log-or-temp",
        applies: |f| f.has_extension(LOG_TEMP_EXTENSIONS) || f.file_name == ".ds_store",
        reason: SummaryReason::LogOrTemp,
    },
    Rule {
        name: "bundle",
        applies: |f| BUNDLE_SUFFIXES.iter().any(|s| f.path.ends_with(s)),
        reason: SummaryReason::Bundle,
    },
    Rule {
        name: "package-manifest",
        applies: |f| {
            MANIFEST_FILES.contains(&f.file_name.as_str()) && f.changes > MANIFEST_CHANGE_THRESHOLD
        },
        reason: SummaryReason::PackageManifest,
    },
    Rule {
        name: "large-change",
        applies: |f| f.changes > LARGE_CHANGE_THRESHOLD,
        reason: SummaryReason::LargeChange,
    },
    Rule {
        name: "data-format",
        applies: |f| {
            matches!(
                f.file_type,
                FileType::Json | FileType::Xml | FileType::Css | FileType::Scss | FileType::Less
            )
        },
        reason: SummaryReason::DataFormat,
    },
    Rule {
        name: "documentation",
        applies: |f| {
            matches!(f.file_type, FileType::Markdown | FileType::Unknown)
                && f.has_extension(&["md", "txt", "rst"])
        },
        reason: SummaryReason::Documentation,
    },
];

/// Classify a file by path and total changed lines.
pub fn classify(path: &str, total_changes: usize) -> Classification {
    let facts = FileFacts::new(path, total_changes);
    RULES
        .iter()
        .find(|rule| (rule.applies)(&facts))
        .map(|rule| {
            tracing::trace!("{} matched rule '{}'", path, rule.name);
            Classification::Summary(rule.reason)
        })
        .unwrap_or(Classification::AiEligible)
}

/// A file withheld from the pipeline, with the reason shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFile {
    pub path: String,
    pub reason: SkipReason,
}

/// Files of one run, split into three disjoint groups.
#[derive(Debug, Clone, Default)]
pub struct ClassificationResult {
    pub ai_eligible: Vec<FileDiff>,
    pub summary: Vec<(FileDiff, SummaryReason)>,
    pub skipped: Vec<SkippedFile>,
}

impl ClassificationResult {
    /// Route a diff into the AI-eligible or summary group.
    pub fn push(&mut self, diff: FileDiff) {
        match classify(&diff.path, diff.total_changes()) {
            Classification::AiEligible => self.ai_eligible.push(diff),
            Classification::Summary(reason) => self.summary.push((diff, reason)),
        }
    }

    pub fn skip(&mut self, path: impl Into<String>, reason: SkipReason) {
        self.skipped.push(SkippedFile {
            path: path.into(),
            reason,
        });
    }

    /// Number of files that will be committed.
    pub fn committable(&self) -> usize {
        self.ai_eligible.len() + self.summary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.committable() == 0
    }
}
