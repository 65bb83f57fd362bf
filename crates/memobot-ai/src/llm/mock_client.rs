//! Deterministic mock LLM client for pipeline tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{Duration, sleep};

use crate::error::{AiError, Result};

use super::{CompletionRequest, CompletionResponse, FinishReason, LlmClient, Role, TokenUsage};

/// Scripted outcome for one completion call.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return a plain assistant message.
    Text(String),
    /// Return an LLM error.
    Error(String),
    /// Sleep far past any reasonable deadline.
    Hang,
}

/// A deterministic mock LLM client driven by scripted replies.
///
/// Unscripted calls echo the last user message, which keeps happy-path
/// tests short. Every request is recorded so tests can inspect the
/// prompt that was actually sent.
#[derive(Debug, Clone)]
pub struct MockLlmClient {
    model: String,
    script: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            script: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn from_replies(replies: Vec<MockReply>) -> Self {
        Self {
            model: "mock-model".to_string(),
            script: Arc::new(Mutex::new(VecDeque::from(replies))),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn push_reply(&self, reply: MockReply) {
        self.script.lock().await.push_back(reply);
    }

    /// Requests seen so far, in call order.
    pub async fn seen_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    fn usage_for(content_len: usize) -> TokenUsage {
        let completion_tokens = content_len as u32;
        TokenUsage {
            prompt_tokens: 1,
            completion_tokens,
            total_tokens: 1 + completion_tokens,
        }
    }

    fn fallback_response(request: &CompletionRequest) -> CompletionResponse {
        let text = request
            .messages
            .iter()
            .rev()
            .find(|msg| matches!(msg.role, Role::User))
            .map(|msg| format!("mock-echo: {}", msg.content))
            .unwrap_or_else(|| "mock-ok".to_string());

        CompletionResponse {
            content: Some(text.clone()),
            finish_reason: FinishReason::Stop,
            usage: Some(Self::usage_for(text.len())),
        }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.requests.lock().await.push(request.clone());

        let reply = self.script.lock().await.pop_front();
        match reply {
            Some(MockReply::Text(content)) => Ok(CompletionResponse {
                content: Some(content.clone()),
                finish_reason: FinishReason::Stop,
                usage: Some(Self::usage_for(content.len())),
            }),
            Some(MockReply::Error(message)) => Err(AiError::Llm(message)),
            Some(MockReply::Hang) => {
                sleep(Duration::from_secs(3600)).await;
                Ok(Self::fallback_response(&request))
            }
            None => Ok(Self::fallback_response(&request)),
        }
    }
}
