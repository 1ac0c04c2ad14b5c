//! Error types for commitsmith modules using thiserror.

use thiserror::Error;

/// Errors from version-control operations.
#[derive(Error, Debug)]
pub enum VcsError {
    #[error("Failed to open repository: {0}")]
    OpenRepository(#[source] git2::Error),

    #[error("Failed to read working tree status: {0}")]
    StatusFailed(#[source] git2::Error),

    #[error("Failed to collect diff for '{path}': {source}")]
    DiffFailed {
        path: String,
        #[source]
        source: git2::Error,
    },

    #[error("No changes found for '{0}'")]
    NoChanges(String),

    #[error("Failed to stage '{path}': {source}")]
    StagingFailed {
        path: String,
        #[source]
        source: git2::Error,
    },

    #[error("Failed to create commit: {0}")]
    CommitFailed(#[source] git2::Error),

    #[error("Git config error (missing user.name or user.email): {0}")]
    ConfigError(#[source] git2::Error),

    #[error(
        "Repository index is locked (index.lock still present after {waited_ms}ms). \
         Another git process may be running; wait for it to finish or remove the stale lock file."
    )]
    LockContention { waited_ms: u64 },

    #[error("Background git task failed: {0}")]
    TaskFailed(String),
}

/// Errors from loading generation configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error(
        "No API key configured for the text-generation service. \
         Set COMMITSMITH_API_KEY (or GEMINI_API_KEY)."
    )]
    MissingApiKey,

    #[error("Model identifier must not be empty")]
    MissingModel,

    #[error("Invalid timeout bounds: minimum {min_secs}s exceeds maximum {max_secs}s")]
    InvalidTimeoutBounds { min_secs: u64, max_secs: u64 },
}

/// Errors from commit message generation.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Invalid generation request: {0}")]
    Validation(String),

    #[error("Refused to send content: {0}")]
    Security(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Text-generation request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Network error talking to the text-generation service: {0}")]
    Network(String),

    #[error("Text-generation service returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Text-generation service returned an empty response")]
    EmptyResponse,

    #[error("All retry attempts failed: {0}")]
    RetriesExhausted(#[source] Box<GenerationError>),
}

impl GenerationError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Timeouts, transport failures, rate limits and server-side errors are
    /// recoverable. Validation, security and configuration failures are not.
    pub fn is_recoverable(&self) -> bool {
        match self {
            GenerationError::Timeout(_) | GenerationError::Network(_) => true,
            GenerationError::Api { status, .. } => *status == 429 || *status >= 500,
            GenerationError::EmptyResponse => true,
            GenerationError::Validation(_)
            | GenerationError::Security(_)
            | GenerationError::Config(_)
            | GenerationError::RetriesExhausted(_) => false,
        }
    }
}

/// Errors that abort a whole batch run.
///
/// Per-file failures never surface here; they are recorded in the report.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Failed to read repository status: {0}")]
    Status(#[source] VcsError),
}
