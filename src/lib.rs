//! commitsmith - commit every pending file on its own, with a generated message.
//!
//! # Overview
//!
//! commitsmith reads the unstaged and untracked files of a repository, keeps
//! secrets and sensitive files away from the network, asks a text-generation
//! service for one-line commit messages where that is worth it, derives the
//! rest deterministically, and creates one commit per file.

pub mod commit;
pub mod config;
pub mod error;
pub mod git;
pub mod llm;
pub mod privacy;

// Re-export commonly used types
pub use commit::{BatchOptions, BatchOrchestrator, BatchReport, Suggestion};
pub use config::GenerationConfig;
pub use error::{BatchError, ConfigError, GenerationError, VcsError};
pub use git::{FileDiff, FileStatus, GitRepository, VersionControl};
pub use llm::{GenerationClient, HttpGenerator, TextGenerator};
pub use privacy::{PrivacyReport, PrivacySanitizer};
