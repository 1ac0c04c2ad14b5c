//! Generation configuration loaded from the environment.

use std::env;
use std::time::Duration;

use tracing::warn;

use crate::error::ConfigError;

/// Primary environment variable holding the service API key.
pub const API_KEY_ENV_VAR: &str = "COMMITSMITH_API_KEY";
/// Secondary API key variable, checked when the primary one is unset.
pub const FALLBACK_API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";
const MODEL_ENV_VAR: &str = "COMMITSMITH_MODEL";
const BASE_URL_ENV_VAR: &str = "COMMITSMITH_BASE_URL";
const MAX_PROMPT_ENV_VAR: &str = "COMMITSMITH_MAX_PROMPT_CHARS";
const MIN_TIMEOUT_ENV_VAR: &str = "COMMITSMITH_MIN_TIMEOUT";
const MAX_TIMEOUT_ENV_VAR: &str = "COMMITSMITH_MAX_TIMEOUT";

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MAX_PROMPT_CHARS: usize = 120_000;
const DEFAULT_MIN_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_TIMEOUT_SECS: u64 = 180;

/// Everything the generation client needs to talk to the remote service.
#[derive(Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Largest request document the prompt builder will accept.
    pub max_prompt_chars: usize,
    pub min_timeout: Duration,
    pub max_timeout: Duration,
}

// Manual impl so the API key never ends up in logs.
impl std::fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("max_prompt_chars", &self.max_prompt_chars)
            .field("min_timeout", &self.min_timeout)
            .field("max_timeout", &self.max_timeout)
            .finish()
    }
}

impl GenerationConfig {
    /// Create a config with the given key and default settings.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_prompt_chars: DEFAULT_MAX_PROMPT_CHARS,
            min_timeout: Duration::from_secs(DEFAULT_MIN_TIMEOUT_SECS),
            max_timeout: Duration::from_secs(DEFAULT_MAX_TIMEOUT_SECS),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// The API key is mandatory. Every other setting falls back to its
    /// default; unparseable numeric values log a warning and use the default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = non_empty_var(API_KEY_ENV_VAR)
            .or_else(|| non_empty_var(FALLBACK_API_KEY_ENV_VAR))
            .ok_or(ConfigError::MissingApiKey)?;

        let mut config = Self::new(api_key);

        if let Some(model) = non_empty_var(MODEL_ENV_VAR) {
            config.model = model;
        }
        if let Some(url) = non_empty_var(BASE_URL_ENV_VAR) {
            config.base_url = url.trim_end_matches('/').to_string();
        }

        config.max_prompt_chars = parse_var(MAX_PROMPT_ENV_VAR, DEFAULT_MAX_PROMPT_CHARS);
        config.min_timeout =
            Duration::from_secs(parse_var(MIN_TIMEOUT_ENV_VAR, DEFAULT_MIN_TIMEOUT_SECS));
        config.max_timeout =
            Duration::from_secs(parse_var(MAX_TIMEOUT_ENV_VAR, DEFAULT_MAX_TIMEOUT_SECS));

        config.validate()?;
        Ok(config)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_max_prompt_chars(mut self, max: usize) -> Self {
        self.max_prompt_chars = max;
        self
    }

    pub fn with_timeout_bounds(mut self, min: Duration, max: Duration) -> Self {
        self.min_timeout = min;
        self.max_timeout = max;
        self
    }

    /// Check the invariants every consumer relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::MissingModel);
        }
        if self.min_timeout > self.max_timeout {
            return Err(ConfigError::InvalidTimeoutBounds {
                min_secs: self.min_timeout.as_secs(),
                max_secs: self.max_timeout.as_secs(),
            });
        }
        Ok(())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match env::var(name) {
        Ok(v) if !v.is_empty() => match v.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!("Invalid {} value '{}', using default {}", name, v, default);
                default
            }
        },
        _ => default,
    }
}
