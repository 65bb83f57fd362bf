//! Memobot AI - LLM client layer and prompt assembly
//!
//! This crate provides:
//! - OpenRouter chat completion client with bounded retries
//! - Prompt envelope assembly from recalled conversation turns
//! - Error taxonomy shared with the turn pipeline

pub mod error;
mod http_client;
pub mod llm;
pub mod prompt;

// Re-export commonly used types
pub use error::{AiError, Result};
pub use llm::{
    CompletionRequest, CompletionResponse, FinishReason, LlmClient, LlmRetryConfig, Message,
    OpenRouterClient, Role, TokenUsage,
};
pub use prompt::{ContextLine, PromptEnvelope};

#[cfg(any(test, feature = "test-utils"))]
pub use llm::mock_client::{MockLlmClient, MockReply};
