use serde::{Deserialize, Serialize};

/// A candidate commit message for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub commit_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Always within [0, 1].
    pub confidence: f64,
}

impl Suggestion {
    pub fn new(message: impl Into<String>, confidence: f64) -> Self {
        Self {
            message: message.into(),
            description: None,
            commit_type: None,
            scope: None,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn word_count(&self) -> usize {
        self.message.split_whitespace().count()
    }
}
