//! Commit message generation through a remote text-generation service.

pub mod cache;
pub mod client;
pub mod generator;
pub mod json;
pub mod parser;
pub mod prompt;
pub mod retry;

pub use cache::{LruCache, ResultCache, batch_fingerprint, fingerprint};
pub use client::{GenerationClient, compute_timeout};
pub use generator::{HttpGenerator, TextGenerator};
pub use json::extract_json;
pub use parser::{ParsedResponse, parse_batch, parse_lines, parse_single};
pub use prompt::{MAX_EXCERPT_CHARS, build_prompt};
