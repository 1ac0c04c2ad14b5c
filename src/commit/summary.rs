//! Deterministic commit messages: summaries for classified files and the
//! fallback used when generation fails.

use crate::git::{FileDiff, FileStatus};

use super::classifier::SummaryReason;
use super::suggestion::Suggestion;

/// Confidence attached to every deterministic fallback.
pub const FALLBACK_CONFIDENCE: f64 = 0.3;

/// Summary message for a file the classifier kept away from generation.
pub fn summary_message(diff: &FileDiff, reason: SummaryReason) -> String {
    let name = diff.file_name();

    match diff.status {
        FileStatus::Added => return format!("Added {} {name}", noun(reason)),
        FileStatus::Deleted => return format!("Removed {} {name}", noun(reason)),
        FileStatus::Renamed => {
            if let Some(old) = diff.old_path.as_deref() {
                return format!("Renamed {} {old} to {}", noun(reason), diff.path);
            }
        }
        FileStatus::Modified => {}
    }

    match reason {
        SummaryReason::LockFile => format!("Updated project dependencies in {name}"),
        SummaryReason::PackageManifest => {
            format!("Updated package configuration and dependencies in {name}")
        }
        SummaryReason::Generated => format!("Regenerated {name} from its source definitions"),
        SummaryReason::CompiledArtifact => format!("Rebuilt compiled artifact {name}"),
        SummaryReason::BuildOutput => format!("Updated build output {}", diff.path),
        SummaryReason::Changelog => format!("Updated {name} with latest release notes"),
        SummaryReason::LogOrTemp => format!("Updated log and temporary file {name}"),
        SummaryReason::Bundle => format!("Rebuilt bundled asset {name}"),
        SummaryReason::LargeChange => format!(
            "Updated {name} with large-scale changes (+{} -{})",
            diff.additions, diff.deletions
        ),
        SummaryReason::DataFormat => format!("Updated data and style definitions in {name}"),
        SummaryReason::Documentation => format!("Updated documentation in {name}"),
    }
}

fn noun(reason: SummaryReason) -> &'static str {
    match reason {
        SummaryReason::LockFile => "dependencies lock file",
        SummaryReason::PackageManifest => "package manifest",
        SummaryReason::Generated => "generated file",
        SummaryReason::CompiledArtifact => "compiled artifact",
        SummaryReason::BuildOutput => "build output",
        SummaryReason::Changelog => "changelog",
        SummaryReason::LogOrTemp => "log file",
        SummaryReason::Bundle => "bundled asset",
        SummaryReason::LargeChange => "file",
        SummaryReason::DataFormat => "data file",
        SummaryReason::Documentation => "documentation",
    }
}

/// Fallback message derived from the change shape alone.
pub fn fallback_message(diff: &FileDiff) -> String {
    describe_change(diff.file_name(), &diff.status, diff.additions, diff.deletions)
}

/// Fallback wording for a file given its name, status and line counts.
pub fn describe_change(
    name: &str,
    status: &FileStatus,
    additions: usize,
    deletions: usize,
) -> String {
    match status {
        FileStatus::Added => format!("Created new {name} file with initial implementation"),
        FileStatus::Deleted => format!("Removed {name} file as it is no longer needed"),
        _ if additions > deletions * 2 => format!("Added new functionality to {name} file"),
        _ if deletions > additions * 2 => format!("Removed unused code from {name} file"),
        _ => format!("Updated {name} file with code improvements"),
    }
}

pub fn fallback_suggestion(diff: &FileDiff) -> Suggestion {
    Suggestion::new(fallback_message(diff), FALLBACK_CONFIDENCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_file_summary_mentions_dependencies() {
        let diff = FileDiff::modified("package-lock.json", 500, 200, "+x\n");
        assert!(summary_message(&diff, SummaryReason::LockFile).contains("dependencies"));

        let added = diff.clone().with_status(FileStatus::Added);
        assert!(summary_message(&added, SummaryReason::LockFile).contains("dependencies"));
    }

    #[test]
    fn test_summary_for_renamed_file_names_both_paths() {
        let mut diff = FileDiff::modified("docs/new.md", 0, 0, "").with_status(FileStatus::Renamed);
        diff.old_path = Some("docs/old.md".into());
        assert_eq!(
            summary_message(&diff, SummaryReason::Documentation),
            "Renamed documentation docs/old.md to docs/new.md"
        );
    }

    #[test]
    fn test_fallback_messages() {
        let new = FileDiff::modified("src/a.rs", 10, 0, "").with_status(FileStatus::Added);
        let gone = FileDiff::modified("src/a.rs", 0, 10, "").with_status(FileStatus::Deleted);
        assert_eq!(
            fallback_message(&new),
            "Created new a.rs file with initial implementation"
        );
        assert_eq!(
            fallback_message(&gone),
            "Removed a.rs file as it is no longer needed"
        );
        assert_eq!(
            fallback_message(&FileDiff::modified("a.rs", 7, 3, "")),
            "Added new functionality to a.rs file"
        );
        assert_eq!(
            fallback_message(&FileDiff::modified("a.rs", 3, 7, "")),
            "Removed unused code from a.rs file"
        );
        assert_eq!(
            fallback_message(&FileDiff::modified("a.rs", 4, 4, "")),
            "Updated a.rs file with code improvements"
        );
    }

    #[test]
    fn test_fallback_suggestion_confidence() {
        let s = fallback_suggestion(&FileDiff::modified("a.rs", 1, 1, ""));
        assert_eq!(s.confidence, FALLBACK_CONFIDENCE);
    }
}
