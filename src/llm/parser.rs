//! Turning generated text into validated suggestions.
//!
//! Parsing never fails. A response that cannot be decoded as the expected
//! JSON document falls back to line parsing, and from there to deterministic
//! messages, so message generation never blocks committing.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex_lite::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::commit::Suggestion;
use crate::commit::summary::{FALLBACK_CONFIDENCE, describe_change};
use crate::privacy::SanitizedDiff;
use crate::privacy::patterns::REDACTION_PREFIX;

/// Longest message accepted from the service before any shaping.
pub const MAX_SCHEMA_CHARS: usize = 500;
pub const MIN_WORDS: usize = 7;
pub const MAX_WORDS: usize = 25;
/// Hard cap on the final message length, ellipsis included.
pub const MAX_MESSAGE_CHARS: usize = 150;
/// Suggestions kept per file.
pub const MAX_SUGGESTIONS: usize = 3;

const DEFAULT_CONFIDENCE: f64 = 0.8;
const LINE_CONFIDENCE: f64 = 0.5;
const SHORT_PENALTY: f64 = 0.2;
const SHORT_FLOOR: f64 = 0.3;
/// Applied instead of the penalty once confidence is already at or below the floor.
const SHORT_SCALE: f64 = 0.5;
const LONG_PENALTY: f64 = 0.1;
const LONG_FLOOR: f64 = 0.6;

static NUMBERED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:\d+[.):]|[-*•])\s+(.+)$").expect("Invalid regex")
});

const MESSAGE_VERBS: &[&str] = &[
    "added", "add", "fixed", "fix", "updated", "update", "removed", "remove", "refactored",
    "refactor", "implemented", "implement", "improved", "improve", "created", "create",
    "renamed", "rename", "moved", "move", "replaced", "replace", "introduced", "introduce",
    "changed", "change", "deleted", "delete", "simplified", "simplify", "optimized",
    "optimize", "extended", "extend", "adjusted", "adjust", "corrected", "correct",
    "cleaned", "documented", "upgraded", "bumped", "reverted", "enabled", "disabled",
];

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ResponseDocument {
    Single {
        #[serde(default)]
        suggestions: Vec<RawSuggestion>,
    },
    Batch {
        #[serde(default)]
        files: HashMap<String, FileEntry>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FileEntry {
    Wrapped {
        #[serde(default)]
        suggestions: Vec<RawSuggestion>,
    },
    List(Vec<RawSuggestion>),
}

impl FileEntry {
    fn into_suggestions(self) -> Vec<RawSuggestion> {
        match self {
            FileEntry::Wrapped { suggestions } | FileEntry::List(suggestions) => suggestions,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawSuggestion {
    #[serde(default)]
    message: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, rename = "type")]
    commit_type: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default = "default_confidence")]
    confidence: f64,
}

fn default_confidence() -> f64 {
    DEFAULT_CONFIDENCE
}

/// A decoded and validated response document.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResponse {
    Single(Vec<Suggestion>),
    Batch(HashMap<String, Vec<Suggestion>>),
}

/// Decode the JSON document embedded in `response`.
pub fn parse_document(response: &str) -> Option<ParsedResponse> {
    let json = super::extract_json(response)?;
    let document: ResponseDocument = match serde_json::from_str(&json) {
        Ok(doc) => doc,
        Err(e) => {
            debug!("Response is not a suggestion document: {e}");
            return None;
        }
    };

    Some(match document {
        ResponseDocument::Single { suggestions } => {
            ParsedResponse::Single(validate_all(suggestions))
        }
        ResponseDocument::Batch { files } => ParsedResponse::Batch(
            files
                .into_iter()
                .map(|(name, entry)| (name, validate_all(entry.into_suggestions())))
                .collect(),
        ),
    })
}

/// Suggestions for a single request, never empty.
pub fn parse_single(response: &str, diffs: &[SanitizedDiff]) -> Vec<Suggestion> {
    let from_document = match parse_document(response) {
        Some(ParsedResponse::Single(list)) => list,
        Some(ParsedResponse::Batch(mut files)) => diffs
            .iter()
            .find_map(|d| files.remove(&d.path).filter(|l| !l.is_empty()))
            .unwrap_or_default(),
        None => Vec::new(),
    };
    if !from_document.is_empty() {
        return from_document;
    }

    let from_lines = parse_lines(response);
    if !from_lines.is_empty() {
        debug!("Recovered {} suggestion(s) from plain lines", from_lines.len());
        return from_lines;
    }

    warn!("Could not parse any suggestion from the response; using a generic message");
    vec![generic_fallback(diffs)]
}

/// Suggestions per sanitized file name, with an entry for every requested file.
pub fn parse_batch(response: &str, diffs: &[SanitizedDiff]) -> BTreeMap<String, Vec<Suggestion>> {
    match parse_document(response) {
        Some(ParsedResponse::Batch(mut files)) => diffs
            .iter()
            .map(|d| {
                let list = files
                    .remove(&d.path)
                    .filter(|l| !l.is_empty())
                    .unwrap_or_else(|| {
                        debug!("No suggestion for {} in batch response", d.path);
                        vec![file_fallback(d)]
                    });
                (d.path.clone(), list)
            })
            .collect(),
        Some(ParsedResponse::Single(list)) if !list.is_empty() => {
            diffs.iter().map(|d| (d.path.clone(), list.clone())).collect()
        }
        _ => {
            let lines = parse_lines(response);
            if lines.is_empty() {
                warn!("Could not parse the batch response; using fallback messages");
            }
            diffs
                .iter()
                .map(|d| {
                    let list = if lines.is_empty() {
                        vec![file_fallback(d)]
                    } else {
                        lines.clone()
                    };
                    (d.path.clone(), list)
                })
                .collect()
        }
    }
}

/// Suggestions recovered from numbered lines or lines starting with a verb.
pub fn parse_lines(response: &str) -> Vec<Suggestion> {
    let candidates = response.lines().filter_map(|line| {
        let trimmed = line.trim();
        if trimmed.is_empty() || looks_like_json(trimmed) {
            return None;
        }
        let text = match NUMBERED_LINE.captures(trimmed) {
            Some(caps) => caps.get(1).map(|m| m.as_str())?,
            None if starts_with_verb(trimmed) => trimmed,
            None => return None,
        };
        let text = text.trim().trim_matches(|c: char| c == '"' || c == '`' || c == '\'');
        Some(RawSuggestion {
            message: text.to_string(),
            description: None,
            commit_type: None,
            scope: None,
            confidence: LINE_CONFIDENCE,
        })
    });
    validate_all(candidates.collect())
}

fn looks_like_json(line: &str) -> bool {
    line.starts_with('{')
        || line.starts_with('}')
        || line.starts_with('[')
        || line.starts_with(']')
        || line.contains("\":")
}

fn starts_with_verb(line: &str) -> bool {
    line.split_whitespace()
        .next()
        .map(|w| w.trim_end_matches(':').to_lowercase())
        .is_some_and(|w| MESSAGE_VERBS.contains(&w.as_str()))
}

/// The last-resort suggestion when nothing could be parsed.
pub fn generic_fallback(diffs: &[SanitizedDiff]) -> Suggestion {
    let message = match diffs {
        [only] => format!(
            "Updated {} with changes to existing functionality",
            only.file_name()
        ),
        many => format!(
            "Updated {} files with changes to existing functionality",
            many.len()
        ),
    };
    Suggestion::new(message, FALLBACK_CONFIDENCE)
}

/// Deterministic fallback for one file of a batch.
pub fn file_fallback(diff: &SanitizedDiff) -> Suggestion {
    Suggestion::new(
        describe_change(diff.file_name(), &diff.status, diff.additions, diff.deletions),
        FALLBACK_CONFIDENCE,
    )
}

fn validate_all(raw: Vec<RawSuggestion>) -> Vec<Suggestion> {
    let mut out: Vec<Suggestion> = Vec::new();
    for suggestion in raw.into_iter().filter_map(validate) {
        if !out.iter().any(|s| s.message == suggestion.message) {
            out.push(suggestion);
        }
    }
    out.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    out.truncate(MAX_SUGGESTIONS);
    out
}

/// Check schema and shape of one suggestion, adjusting confidence.
fn validate(raw: RawSuggestion) -> Option<Suggestion> {
    let message = raw.message.split_whitespace().collect::<Vec<_>>().join(" ");

    if message.is_empty() || message.chars().count() > MAX_SCHEMA_CHARS {
        warn!(
            "Dropping suggestion with invalid length ({} chars)",
            message.chars().count()
        );
        return None;
    }
    if message.contains(REDACTION_PREFIX) {
        warn!("Dropping suggestion that echoes redacted content");
        return None;
    }

    let mut confidence = if raw.confidence.is_finite() {
        raw.confidence.clamp(0.0, 1.0)
    } else {
        DEFAULT_CONFIDENCE
    };

    let words: Vec<&str> = message.split(' ').collect();
    let message = if words.len() < MIN_WORDS {
        confidence = if confidence > SHORT_FLOOR {
            (confidence - SHORT_PENALTY).max(SHORT_FLOOR)
        } else {
            confidence * SHORT_SCALE
        };
        message
    } else if words.len() > MAX_WORDS {
        confidence = (confidence - LONG_PENALTY).max(LONG_FLOOR);
        words[..MAX_WORDS].join(" ")
    } else {
        message
    };

    Some(Suggestion {
        message: cap_length(message),
        description: non_empty(raw.description),
        commit_type: non_empty(raw.commit_type),
        scope: non_empty(raw.scope),
        confidence,
    })
}

fn cap_length(message: String) -> String {
    if message.chars().count() <= MAX_MESSAGE_CHARS {
        return message;
    }
    let head: String = message.chars().take(MAX_MESSAGE_CHARS - 3).collect();
    format!("{}...", head.trim_end())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
