//! LLM error types.

use thiserror::Error;

/// Errors that can occur when making LLM API calls.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP request failed
    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// API returned an error response
    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The call did not complete within the configured deadline
    #[error("llm call timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The API returned a response with no choices
    #[error("empty completion response")]
    EmptyResponse,
}
