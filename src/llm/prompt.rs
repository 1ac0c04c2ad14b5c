//! Request documents for the text-generation service.
//!
//! A request is one JSON document: instructions, examples, one section per
//! file and the exact response shape expected back. Only sanitized diffs are
//! accepted, so nothing here can leak unredacted content.

use serde::Serialize;
use serde_json::json;

use crate::error::GenerationError;
use crate::privacy::SanitizedDiff;

/// Characters of diff text included per file.
pub const MAX_EXCERPT_CHARS: usize = 3_000;

const ROLE: &str = "You write concise, accurate git commit messages for individual files.";

const REQUIREMENTS: &[&str] = &[
    "Describe what changed in the file and why, in a single sentence",
    "Use between 7 and 25 words per message",
    "Start with a past-tense verb such as Added, Fixed, Updated, Removed or Refactored",
    "Do not use conventional-commit prefixes such as 'feat:' or 'fix:'",
    "Do not mention redaction markers, credentials, personal data or file contents verbatim",
    "Return up to 3 suggestions per file, best first, each with a confidence between 0 and 1",
    "Respond with the JSON document described in response_format and nothing else",
];

const GOOD_EXAMPLES: &[&str] = &[
    "Added retry with exponential backoff to the payment client for transient failures",
    "Fixed off-by-one error in pagination that skipped the last result page",
    "Removed deprecated session helpers that were replaced by the token middleware",
];

const BAD_EXAMPLES: &[&str] = &[
    "Update file",
    "fix: stuff",
    "Changed some code in several places to make things work better than before overall",
];

#[derive(Serialize)]
struct Examples {
    good: &'static [&'static str],
    bad: &'static [&'static str],
}

#[derive(Serialize)]
struct FileSection<'a> {
    id: usize,
    name: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_name: Option<&'a str>,
    additions: usize,
    deletions: usize,
    content: String,
    truncated: bool,
}

#[derive(Serialize)]
struct RequestDocument<'a> {
    role: &'static str,
    task: String,
    requirements: &'static [&'static str],
    examples: Examples,
    files: Vec<FileSection<'a>>,
    response_format: serde_json::Value,
}

/// Build the request document for one or more sanitized files.
///
/// A single file asks for the `single` response shape, several files for the
/// `batch` shape keyed by file name. Fails with a validation error for an
/// empty file set or when the document exceeds `max_chars`.
pub fn build_prompt(diffs: &[SanitizedDiff], max_chars: usize) -> Result<String, GenerationError> {
    if diffs.is_empty() {
        return Err(GenerationError::Validation(
            "No files to generate commit messages for".to_string(),
        ));
    }

    let batch = diffs.len() > 1;
    let task = if batch {
        format!(
            "Write commit message suggestions for each of the {} files below. \
             Each file is committed separately.",
            diffs.len()
        )
    } else {
        "Write commit message suggestions for the file below.".to_string()
    };

    let files = diffs
        .iter()
        .enumerate()
        .map(|(idx, diff)| file_section(idx + 1, diff))
        .collect();

    let document = RequestDocument {
        role: ROLE,
        task,
        requirements: REQUIREMENTS,
        examples: Examples {
            good: GOOD_EXAMPLES,
            bad: BAD_EXAMPLES,
        },
        files,
        response_format: response_format(diffs, batch),
    };

    let prompt = serde_json::to_string_pretty(&document)
        .map_err(|e| GenerationError::Validation(format!("Failed to encode request: {e}")))?;

    let size = prompt.chars().count();
    if size > max_chars {
        return Err(GenerationError::Validation(format!(
            "Request of {size} characters exceeds the maximum of {max_chars}"
        )));
    }

    Ok(prompt)
}

fn file_section(id: usize, diff: &SanitizedDiff) -> FileSection<'_> {
    let (content, cut) = excerpt(&diff.content, MAX_EXCERPT_CHARS);
    FileSection {
        id,
        name: &diff.path,
        status: diff.status.as_str(),
        previous_name: diff.old_path.as_deref(),
        additions: diff.additions,
        deletions: diff.deletions,
        content,
        truncated: cut || diff.truncated,
    }
}

fn response_format(diffs: &[SanitizedDiff], batch: bool) -> serde_json::Value {
    let suggestion = json!({
        "message": "Past-tense summary of the change in 7 to 25 words",
        "description": "Optional longer explanation",
        "type": "Optional change type such as feature, fix, refactor, docs, test",
        "scope": "Optional affected area",
        "confidence": 0.9
    });

    if batch {
        let files: serde_json::Map<String, serde_json::Value> = diffs
            .iter()
            .map(|d| (d.path.clone(), json!({ "suggestions": [suggestion.clone()] })))
            .collect();
        json!({ "kind": "batch", "files": files })
    } else {
        json!({ "kind": "single", "suggestions": [suggestion] })
    }
}

/// First `max` characters of `text` with control characters removed, and
/// whether anything was cut.
fn excerpt(text: &str, max: usize) -> (String, bool) {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();
    let total = cleaned.chars().count();
    if total <= max {
        (cleaned, false)
    } else {
        (cleaned.chars().take(max).collect(), true)
    }
}
