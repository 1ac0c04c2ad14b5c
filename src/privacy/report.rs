use std::fmt;

use super::sanitizer::SanitizedDiff;

const RECOMMENDATIONS: &[&str] = &[
    "Keep credentials in environment variables or a secret manager, not in source files",
    "Add sensitive files (.env, keys, certificates) to .gitignore",
    "Review redacted files before pushing; redaction only protects the generation request",
];

/// Summary of what the sanitizer changed during one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrivacyReport {
    pub total_files: usize,
    pub sanitized_files: usize,
    /// Warnings prefixed with the file they belong to.
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
}

impl PrivacyReport {
    pub fn from_sanitized(total_files: usize, sanitized: &[SanitizedDiff]) -> Self {
        let modified: Vec<&SanitizedDiff> = sanitized.iter().filter(|d| d.was_modified).collect();
        let warnings = modified
            .iter()
            .flat_map(|d| d.warnings.iter().map(move |w| format!("{}: {w}", d.path)))
            .collect();
        let recommendations = if modified.is_empty() {
            Vec::new()
        } else {
            RECOMMENDATIONS.iter().map(|r| r.to_string()).collect()
        };

        Self {
            total_files,
            sanitized_files: modified.len(),
            warnings,
            recommendations,
        }
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: PrivacyReport) {
        self.total_files += other.total_files;
        self.sanitized_files += other.sanitized_files;
        self.warnings.extend(other.warnings);
        if self.recommendations.is_empty() {
            self.recommendations = other.recommendations;
        }
    }

    pub fn has_findings(&self) -> bool {
        self.sanitized_files > 0
    }
}

impl fmt::Display for PrivacyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Privacy: {} of {} file(s) sanitized before generation",
            self.sanitized_files, self.total_files
        )?;
        for warning in &self.warnings {
            writeln!(f, "  - {warning}")?;
        }
        if !self.recommendations.is_empty() {
            writeln!(f, "Recommendations:")?;
            for rec in &self.recommendations {
                writeln!(f, "  * {rec}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::FileDiff;
    use crate::privacy::PrivacySanitizer;

    #[test]
    fn test_report_counts_only_modified_files() {
        let sanitizer = PrivacySanitizer::new(None).with_home(None);
        let diffs = vec![
            sanitizer.sanitize(&FileDiff::modified("a.rs", 1, 0, "+fn a() {}\n")),
            sanitizer.sanitize(&FileDiff::modified("b.rs", 1, 0, "+// secret sauce\n")),
        ];

        let report = sanitizer.report(2, &diffs);
        assert_eq!(report.total_files, 2);
        assert_eq!(report.sanitized_files, 1);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("b.rs: "));
        assert!(!report.recommendations.is_empty());

        let rendered = report.to_string();
        assert!(rendered.contains("1 of 2 file(s) sanitized"));
        assert!(rendered.contains("Recommendations:"));
    }

    #[test]
    fn test_clean_report_has_no_recommendations() {
        let report = PrivacyReport::from_sanitized(3, &[]);
        assert!(!report.has_findings());
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn test_merge_accumulates() {
        let mut a = PrivacyReport {
            total_files: 1,
            sanitized_files: 1,
            warnings: vec!["x".into()],
            recommendations: vec!["r".into()],
        };
        a.merge(PrivacyReport {
            total_files: 2,
            sanitized_files: 0,
            warnings: vec![],
            recommendations: vec![],
        });
        assert_eq!(a.total_files, 3);
        assert_eq!(a.sanitized_files, 1);
        assert_eq!(a.recommendations, vec!["r".to_string()]);
    }
}
