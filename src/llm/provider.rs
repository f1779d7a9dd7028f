//! LLM provider trait.

use async_trait::async_trait;

use super::error::LlmError;
use super::types::{ChatRequest, ChatResponse};

/// Trait for chat completion providers.
///
/// Both the answer generator and the intent classifier fallback go through
/// this seam, which keeps them testable with canned providers.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Make a chat completion request.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError>;
}
