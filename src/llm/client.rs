//! Generation client: privacy filtering, caching, timeouts and retries around
//! a [`TextGenerator`].

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::commit::Suggestion;
use crate::config::GenerationConfig;
use crate::error::GenerationError;
use crate::git::FileDiff;
use crate::privacy::{PrivacyReport, PrivacySanitizer, SanitizedDiff};

use super::cache::{ResultCache, batch_fingerprint, fingerprint};
use super::generator::TextGenerator;
use super::parser::{file_fallback, parse_batch, parse_single};
use super::prompt::build_prompt;
use super::retry::retry_with_backoff;

const BASE_TIMEOUT_SECS: u64 = 30;
const PROMPT_CHARS_PER_SEC: usize = 1_000;
const SECS_PER_FILE: u64 = 2;
const CHANGES_PER_SEC: usize = 100;

/// Timeout for one request, scaled by its size and clamped to `[min, max]`.
///
/// 30s base, plus 1s per 1000 prompt characters, 2s per file and 1s per 100
/// changed lines.
pub fn compute_timeout(
    prompt_chars: usize,
    file_count: usize,
    total_changes: usize,
    min: Duration,
    max: Duration,
) -> Duration {
    let secs = BASE_TIMEOUT_SECS
        + (prompt_chars / PROMPT_CHARS_PER_SEC) as u64
        + SECS_PER_FILE * file_count as u64
        + (total_changes / CHANGES_PER_SEC) as u64;
    Duration::from_secs(secs).clamp(min, max.max(min))
}

/// Produces suggestions for diffs, one request per call.
///
/// Owns the caches and the most recent privacy report.
pub struct GenerationClient<G: TextGenerator> {
    generator: G,
    config: GenerationConfig,
    sanitizer: PrivacySanitizer,
    cache: ResultCache,
    last_report: Option<PrivacyReport>,
}

impl<G: TextGenerator> GenerationClient<G> {
    pub fn new(generator: G, config: GenerationConfig, sanitizer: PrivacySanitizer) -> Self {
        Self {
            generator,
            config,
            sanitizer,
            cache: ResultCache::default(),
            last_report: None,
        }
    }

    /// Privacy report of the most recent call.
    pub fn privacy_report(&self) -> Option<&PrivacyReport> {
        self.last_report.as_ref()
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Suggestions for the given diffs taken as one change.
    pub async fn generate(
        &mut self,
        diffs: &[FileDiff],
    ) -> Result<Vec<Suggestion>, GenerationError> {
        let prepared = self.prepare(diffs)?;
        let key = match prepared.as_slice() {
            [only] => fingerprint(only),
            many => batch_fingerprint(many),
        };

        if let Some(hit) = self.cache.single.get(&key) {
            debug!("Cache hit for {} file(s)", prepared.len());
            return Ok(hit);
        }

        let response = self.request(&prepared).await?;
        let suggestions = parse_single(&response, &prepared);
        self.cache.single.insert(key, suggestions.clone());
        Ok(suggestions)
    }

    /// Suggestions per file, keyed by the path each diff was given with.
    ///
    /// Files withheld by the privacy check are absent from the result. Every
    /// other file has an entry, falling back to a deterministic message when
    /// the response does not cover it.
    pub async fn generate_batch(
        &mut self,
        diffs: &[FileDiff],
    ) -> Result<BTreeMap<String, Vec<Suggestion>>, GenerationError> {
        let prepared = self.prepare(diffs)?;
        let key = batch_fingerprint(&prepared);

        let by_name = match self.cache.batch.get(&key) {
            Some(hit) => {
                debug!("Batch cache hit for {} file(s)", prepared.len());
                hit
            }
            None => {
                let response = self.request(&prepared).await?;
                let parsed = parse_batch(&response, &prepared);
                self.cache.batch.insert(key, parsed.clone());
                parsed
            }
        };

        Ok(prepared
            .iter()
            .map(|d| {
                let list = by_name
                    .get(&d.path)
                    .filter(|l| !l.is_empty())
                    .cloned()
                    .unwrap_or_else(|| vec![file_fallback(d)]);
                (d.original_path.clone(), list)
            })
            .collect())
    }

    /// Validate input, withhold sensitive files and sanitize the rest.
    fn prepare(&mut self, diffs: &[FileDiff]) -> Result<Vec<SanitizedDiff>, GenerationError> {
        if diffs.is_empty() {
            return Err(GenerationError::Validation(
                "No diffs provided for commit message generation".to_string(),
            ));
        }

        let mut prepared = Vec::with_capacity(diffs.len());
        for diff in diffs {
            if let Some(reason) = self.sanitizer.skip_reason(diff) {
                warn!("Not sending {} to the generation service: {}", diff.path, reason);
                continue;
            }
            prepared.push(self.sanitizer.sanitize(diff));
        }

        let report = self.sanitizer.report(diffs.len(), &prepared);
        if report.has_findings() {
            info!(
                "Sanitized {} of {} file(s) before generation",
                report.sanitized_files, report.total_files
            );
        }
        self.last_report = Some(report);

        if prepared.is_empty() {
            return Err(GenerationError::Validation(
                "Every file was withheld for privacy reasons; nothing left to send".to_string(),
            ));
        }
        Ok(prepared)
    }

    /// Build the prompt and call the generator with timeout and retries.
    async fn request(&self, prepared: &[SanitizedDiff]) -> Result<String, GenerationError> {
        self.config.validate()?;
        let prompt = build_prompt(prepared, self.config.max_prompt_chars)?;
        let total_changes: usize = prepared.iter().map(SanitizedDiff::total_changes).sum();
        let timeout = compute_timeout(
            prompt.chars().count(),
            prepared.len(),
            total_changes,
            self.config.min_timeout,
            self.config.max_timeout,
        );
        debug!(
            "Generating for {} file(s), prompt {} chars, timeout {}s",
            prepared.len(),
            prompt.len(),
            timeout.as_secs()
        );

        let generator = &self.generator;
        let model = self.config.model.as_str();
        let prompt = prompt.as_str();

        retry_with_backoff(
            || async move {
                let text = tokio::time::timeout(timeout, generator.generate(model, prompt, timeout))
                    .await
                    .map_err(|_| GenerationError::Timeout(timeout.as_secs()))??;
                if text.trim().is_empty() {
                    return Err(GenerationError::EmptyResponse);
                }
                Ok::<String, GenerationError>(text)
            },
            GenerationError::is_recoverable,
            |e| GenerationError::RetriesExhausted(Box::new(e)),
        )
        .await
    }
}
