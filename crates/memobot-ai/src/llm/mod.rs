//! LLM module - chat completion client abstraction

mod client;
mod openrouter;
mod retry;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock_client;

pub use client::{
    CompletionRequest, CompletionResponse, FinishReason, LlmClient, Message, Role, TokenUsage,
};
pub use openrouter::OpenRouterClient;
pub use retry::LlmRetryConfig;
