//! Batch run: commit every pending file separately.
//!
//! A run moves through four phases. Analyze reads diffs chunk by chunk,
//! concurrently within a chunk, and sorts files into AI-eligible, summary and
//! skipped. Generate asks the service once for all AI-eligible files. Commit
//! stages and commits each file in turn. Report returns what happened to every
//! file. No per-file failure aborts the run.

use std::fmt;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::error::{BatchError, VcsError};
use crate::git::{
    DEFAULT_LOCK_POLL_INTERVAL, DEFAULT_LOCK_TIMEOUT, FileDiff, VersionControl,
    wait_for_index_unlock,
};
use crate::llm::{GenerationClient, TextGenerator};
use crate::privacy::{PrivacyReport, PrivacySanitizer};

use super::classifier::{ClassificationResult, SkippedFile, SummaryReason};
use super::summary::{fallback_suggestion, summary_message};

/// Files whose diffs are read concurrently.
pub const DEFAULT_CHUNK_SIZE: usize = 10;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub chunk_size: usize,
    /// How long to wait for a foreign index lock before giving up on a file.
    pub lock_timeout: Duration,
    pub lock_poll_interval: Duration,
    /// Compute messages without staging or committing.
    pub dry_run: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            lock_poll_interval: DEFAULT_LOCK_POLL_INTERVAL,
            dry_run: false,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The working tree had no unstaged or untracked files.
    NoChanges,
    /// Changes existed but none survived filtering.
    NothingToCommit,
    Completed,
}

/// Where a commit message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSource {
    Generated,
    Fallback,
    Summary(SummaryReason),
}

/// A file that was committed (or would have been, in a dry run).
#[derive(Debug, Clone, PartialEq)]
pub struct CommitRecord {
    pub path: String,
    pub message: String,
    pub source: MessageSource,
    /// None in a dry run.
    pub commit_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Analyze,
    Commit,
}

/// A file that could not be processed, with advice for the user.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedFile {
    pub path: String,
    pub stage: FailureStage,
    pub error: String,
    pub guidance: &'static str,
}

/// Everything a run did, file by file.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub outcome: BatchOutcome,
    /// Files the run tried to commit, including those whose diff could not be read.
    pub attempted: usize,
    pub committed: Vec<CommitRecord>,
    pub failed: Vec<FailedFile>,
    pub skipped: Vec<SkippedFile>,
    /// Size of every analyzed chunk, in order.
    pub chunk_sizes: Vec<usize>,
    /// Set when generation failed and fallback messages were used.
    pub generation_error: Option<String>,
    pub privacy: Option<PrivacyReport>,
    pub dry_run: bool,
}

impl BatchReport {
    fn new(outcome: BatchOutcome, dry_run: bool) -> Self {
        Self {
            outcome,
            attempted: 0,
            committed: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
            chunk_sizes: Vec::new(),
            generation_error: None,
            privacy: None,
            dry_run,
        }
    }

    /// Files successfully committed.
    pub fn processed(&self) -> usize {
        self.committed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            BatchOutcome::NoChanges => return writeln!(f, "No changes detected."),
            BatchOutcome::NothingToCommit => {
                writeln!(f, "Nothing to commit after filtering.")?;
            }
            BatchOutcome::Completed => {
                let verb = if self.dry_run { "Planned" } else { "Committed" };
                writeln!(
                    f,
                    "{verb} {} of {} file(s).",
                    self.processed(),
                    self.attempted
                )?;
            }
        }

        for record in &self.committed {
            let id = record
                .commit_id
                .as_deref()
                .map(|id| &id[..id.len().min(7)])
                .unwrap_or("dry-run");
            writeln!(f, "  ✓ {id} {}: {}", record.path, record.message)?;
        }
        for failure in &self.failed {
            writeln!(f, "  ✗ {}: {} ({})", failure.path, failure.error, failure.guidance)?;
        }
        for skipped in &self.skipped {
            writeln!(f, "  - {} skipped: {}", skipped.path, skipped.reason)?;
        }
        if let Some(err) = &self.generation_error {
            writeln!(f, "Generation failed, fallback messages used: {err}")?;
        }
        Ok(())
    }
}

/// Advice shown next to a per-file failure.
fn guidance(err: &VcsError) -> &'static str {
    match err {
        VcsError::LockContention { .. } => {
            "another git process holds the index lock; retry when it finishes or remove a stale .git/index.lock"
        }
        VcsError::ConfigError(_) => "set user.name and user.email with git config",
        VcsError::StagingFailed { .. } => "check that the file still exists and is not ignored",
        VcsError::DiffFailed { .. } => "run git diff on the file to inspect it",
        _ => "run git status to inspect the repository state",
    }
}

/// Drives Analyze → Generate → Commit → Report over a repository.
pub struct BatchOrchestrator<V: VersionControl, G: TextGenerator> {
    vcs: V,
    client: GenerationClient<G>,
    sanitizer: PrivacySanitizer,
    options: BatchOptions,
}

impl<V: VersionControl, G: TextGenerator> BatchOrchestrator<V, G> {
    pub fn new(
        vcs: V,
        client: GenerationClient<G>,
        sanitizer: PrivacySanitizer,
        options: BatchOptions,
    ) -> Self {
        Self {
            vcs,
            client,
            sanitizer,
            options,
        }
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    pub fn client(&self) -> &GenerationClient<G> {
        &self.client
    }

    /// Run the whole batch.
    ///
    /// Only a failure to read the repository status is an error; everything
    /// that goes wrong for a single file ends up in the report.
    pub async fn run(&mut self) -> Result<BatchReport, BatchError> {
        let status = self.vcs.status().await.map_err(BatchError::Status)?;
        let files = status.pending_files();
        if files.is_empty() {
            info!("No unstaged or untracked changes");
            return Ok(BatchReport::new(BatchOutcome::NoChanges, self.options.dry_run));
        }

        let mut report = BatchReport::new(BatchOutcome::Completed, self.options.dry_run);
        let classified = self.analyze(&files, &mut report).await;
        report.skipped = classified.skipped.clone();

        if classified.is_empty() {
            report.outcome = BatchOutcome::NothingToCommit;
            return Ok(report);
        }

        let plan = self.generate(&classified, &mut report).await;
        self.commit_all(plan, &mut report).await;

        info!(
            "Batch finished: {} of {} file(s) committed",
            report.processed(),
            report.attempted
        );
        Ok(report)
    }

    /// Read diffs chunk by chunk and sort files into groups.
    async fn analyze(&self, files: &[String], report: &mut BatchReport) -> ClassificationResult {
        let mut result = ClassificationResult::default();
        let chunk_size = self.options.chunk_size.max(1);

        for chunk in files.chunks(chunk_size) {
            report.chunk_sizes.push(chunk.len());
            debug!("Reading {} diff(s) concurrently", chunk.len());

            let vcs = &self.vcs;
            let diffs = join_all(
                chunk
                    .iter()
                    .map(|path| async move { (path, vcs.diff(path, false).await) }),
            )
            .await;

            for (path, diff) in diffs {
                match diff {
                    Ok(diff) => self.route(diff, &mut result),
                    Err(VcsError::NoChanges(_)) => debug!("{path} has no changes; dropping"),
                    Err(e) => {
                        warn!("Failed to read diff for {path}: {e}");
                        report.attempted += 1;
                        eprintln!("\x1b[33m⚠ Could not read changes for {path}: {e}\x1b[0m");
                        report.failed.push(FailedFile {
                            path: path.clone(),
                            stage: FailureStage::Analyze,
                            guidance: guidance(&e),
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        result
    }

    fn route(&self, diff: FileDiff, result: &mut ClassificationResult) {
        if let Some(reason) = self.sanitizer.skip_reason(&diff) {
            eprintln!("\x1b[33m⚠ Skipping {}: {reason}\x1b[0m", diff.path);
            result.skip(diff.path, reason);
            return;
        }
        if diff.is_empty_change() && !diff.is_deleted() {
            debug!("{} has no structural change; dropping", diff.path);
            return;
        }
        result.push(diff);
    }

    /// Choose a message for every committable file, AI-eligible files first.
    async fn generate(
        &mut self,
        classified: &ClassificationResult,
        report: &mut BatchReport,
    ) -> Vec<(String, String, MessageSource)> {
        let mut plan = Vec::with_capacity(classified.committable());

        if !classified.ai_eligible.is_empty() {
            let generated = match self.client.generate_batch(&classified.ai_eligible).await {
                Ok(map) => map,
                Err(e) => {
                    warn!("Message generation failed, using fallback messages: {e}");
                    eprintln!(
                        "\x1b[33m⚠ Message generation failed ({e}); using fallback messages\x1b[0m"
                    );
                    report.generation_error = Some(e.to_string());
                    Default::default()
                }
            };
            report.privacy = self.client.privacy_report().cloned();

            for diff in &classified.ai_eligible {
                let (message, source) = match generated.get(&diff.path).and_then(|l| l.first()) {
                    Some(best) => (best.message.clone(), MessageSource::Generated),
                    None => (fallback_suggestion(diff).message, MessageSource::Fallback),
                };
                plan.push((diff.path.clone(), message, source));
            }
        }

        for (diff, reason) in &classified.summary {
            plan.push((
                diff.path.clone(),
                summary_message(diff, *reason),
                MessageSource::Summary(*reason),
            ));
        }

        plan
    }

    /// Stage and commit each file in order.
    ///
    /// A file whose commit fails after staging is unstaged again so that it
    /// cannot ride along with the next file's commit.
    async fn commit_all(
        &self,
        plan: Vec<(String, String, MessageSource)>,
        report: &mut BatchReport,
    ) {
        report.attempted += plan.len();
        let mut still_staged: Vec<String> = Vec::new();

        for (path, message, source) in plan {
            if self.options.dry_run {
                report.committed.push(CommitRecord {
                    path,
                    message,
                    source,
                    commit_id: None,
                });
                continue;
            }

            let result = match self.restore_index(&mut still_staged).await {
                Ok(()) => self.commit_one(&path, &message, &mut still_staged).await,
                Err(e) => {
                    warn!("Index still holds {still_staged:?}; not committing {path}");
                    Err(e)
                }
            };

            match result {
                Ok(id) => {
                    debug!("Committed {path} as {id}");
                    report.committed.push(CommitRecord {
                        path,
                        message,
                        source,
                        commit_id: Some(id),
                    });
                }
                Err(e) => {
                    let guidance = guidance(&e);
                    warn!("Failed to commit {path}: {e}");
                    eprintln!("\x1b[33m⚠ Failed to commit {path}: {e}\n  {guidance}\x1b[0m");
                    report.failed.push(FailedFile {
                        path,
                        stage: FailureStage::Commit,
                        error: e.to_string(),
                        guidance,
                    });
                }
            }
        }

        if !still_staged.is_empty() {
            let paths = still_staged.join(", ");
            warn!("Left staged after failed commits: {paths}");
            eprintln!(
                "\x1b[33m⚠ Still staged: {paths}\n  run git restore --staged on them\x1b[0m"
            );
        }
    }

    /// Stage one file and commit it alone.
    ///
    /// The index lock is awaited before staging and again before committing.
    /// If anything fails once the file is staged, its index entry goes back
    /// to HEAD; when that is impossible the path lands in `still_staged`.
    async fn commit_one(
        &self,
        path: &str,
        message: &str,
        still_staged: &mut Vec<String>,
    ) -> Result<String, VcsError> {
        self.wait_for_unlock().await?;
        self.vcs.stage(path).await?;

        let committed = match self.wait_for_unlock().await {
            Ok(()) => self.vcs.commit(message).await,
            Err(e) => Err(e),
        };
        if committed.is_err() {
            still_staged.push(path.to_string());
            if let Err(e) = self.restore_index(still_staged).await {
                warn!("Could not unstage {path} after a failed commit: {e}");
            }
        }
        committed
    }

    /// Unstage every path left behind by an earlier failed commit.
    async fn restore_index(&self, still_staged: &mut Vec<String>) -> Result<(), VcsError> {
        while let Some(path) = still_staged.last() {
            self.wait_for_unlock().await?;
            self.vcs.unstage(path).await?;
            debug!("Restored index entry of {path}");
            still_staged.pop();
        }
        Ok(())
    }

    async fn wait_for_unlock(&self) -> Result<(), VcsError> {
        wait_for_index_unlock(
            &self.vcs,
            self.options.lock_timeout,
            self.options.lock_poll_interval,
        )
        .await
        .map(drop)
    }
}
