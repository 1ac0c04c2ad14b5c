//! Privacy protection for content sent to the text-generation service.
//!
//! Files are first checked for a skip decision: sensitive file types,
//! credential JSON files, sensitive directories, paths outside the repository
//! and any sensitive content withhold the file entirely. Everything else is
//! sanitized: paths are made relative and content matches are replaced with
//! `[REDACTED:<category>]` markers.

pub mod patterns;
pub mod report;
pub mod sanitizer;

pub use report::PrivacyReport;
pub use sanitizer::{
    ContentRedaction, PrivacySanitizer, SanitizedDiff, SkipReason, sanitize_content,
    sanitize_path,
};
