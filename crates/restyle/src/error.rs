use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures surfaced by a rewrite attempt. All variants are terminal for
/// the container they occur on; none are retried automatically.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum RewriteError {
    /// No usable credential before any network call was made.
    #[error("{0}")]
    Configuration(String),

    /// The remote service was unreachable or returned a non-success status.
    #[error("{0}")]
    Remote(String),

    /// The remote response did not contain the expected result shape.
    #[error("{0}")]
    Format(String),
}

pub type RewriteResult<T> = Result<T, RewriteError>;

impl RewriteError {
    pub fn missing_api_key() -> Self {
        RewriteError::Configuration(
            "Gemini API key not configured. Please set it in the extension settings.".to_string(),
        )
    }

    pub fn invalid_response() -> Self {
        RewriteError::Format("Invalid response format from Gemini API".to_string())
    }
}
