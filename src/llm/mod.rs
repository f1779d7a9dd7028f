//! LLM provider client for chat completions.

mod error;
mod openai;
mod provider;
mod types;

pub use error::LlmError;
pub use openai::OpenAiCompatibleProvider;
pub use provider::LlmProvider;
pub use types::{ChatRequest, ChatResponse, Choice, Message, Role, Usage};
