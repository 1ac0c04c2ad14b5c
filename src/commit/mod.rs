//! Per-file commits: classification, deterministic messages and the batch run.

pub mod batch;
pub mod classifier;
pub mod suggestion;
pub mod summary;

pub use batch::{
    BatchOptions, BatchOrchestrator, BatchOutcome, BatchReport, CommitRecord, DEFAULT_CHUNK_SIZE,
    FailedFile, FailureStage, MessageSource,
};
pub use classifier::{
    Classification, ClassificationResult, SkippedFile, SummaryReason, classify,
};
pub use suggestion::Suggestion;
pub use summary::{fallback_message, fallback_suggestion, summary_message};
