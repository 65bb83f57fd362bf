//! OpenRouter LLM provider
//!
//! OpenRouter fronts many upstream models behind one OpenAI-compatible
//! chat completions endpoint, so the wire types here are the plain
//! OpenAI shapes without tool calling.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AiError, Result};
use crate::http_client::build_http_client;
use crate::llm::client::{
    CompletionRequest, CompletionResponse, FinishReason, LlmClient, Role, TokenUsage,
};
use crate::llm::retry::{LlmRetryConfig, response_to_error};

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// OpenRouter client
pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    referer: Option<String>,
    title: Option<String>,
    retry_config: LlmRetryConfig,
}

impl OpenRouterClient {
    /// Create a new OpenRouter client
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: build_http_client(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            referer: None,
            title: None,
            retry_config: LlmRetryConfig::default(),
        }
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set custom base URL (for gateways and tests)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the optional attribution headers OpenRouter uses for app rankings
    pub fn with_attribution(
        mut self,
        referer: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        self.referer = Some(referer.into());
        self.title = Some(title.into());
        self
    }

    pub fn with_retry_config(mut self, config: LlmRetryConfig) -> Self {
        self.retry_config = config;
        self
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    fn provider(&self) -> &str {
        "openrouter"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let messages: Vec<ChatMessage> = request
            .messages
            .iter()
            .map(|m| ChatMessage {
                role: match m.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                }
                .to_string(),
                content: m.content.clone(),
            })
            .collect();

        let body = ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let mut last_error = None;

        for attempt in 0..=self.retry_config.max_retries {
            let mut builder = self
                .client
                .post(format!("{}/chat/completions", self.base_url))
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json");
            if let Some(referer) = &self.referer {
                builder = builder.header("HTTP-Referer", referer);
            }
            if let Some(title) = &self.title {
                builder = builder.header("X-Title", title);
            }

            let response = match builder.json(&body).send().await {
                Ok(resp) => resp,
                Err(e) => {
                    let error = AiError::Http(e);
                    if !error.is_retryable() || attempt == self.retry_config.max_retries {
                        return Err(error);
                    }
                    let delay = self.retry_config.delay_for(attempt + 1, None);
                    tracing::warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis(),
                        "Retrying OpenRouter request after connection error"
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(error);
                    continue;
                }
            };

            if response.status().is_success() {
                let data: ChatResponse = response.json().await?;
                let choice = data
                    .choices
                    .into_iter()
                    .next()
                    .ok_or_else(|| AiError::Llm("No choices in OpenRouter response".to_string()))?;

                let finish_reason = match choice.finish_reason.as_deref() {
                    Some("stop") | None => FinishReason::Stop,
                    Some("length") => FinishReason::MaxTokens,
                    Some(_) => FinishReason::Error,
                };

                let usage = data.usage.map(|u| TokenUsage {
                    prompt_tokens: u.prompt_tokens,
                    completion_tokens: u.completion_tokens,
                    total_tokens: u.total_tokens,
                });

                return Ok(CompletionResponse {
                    content: choice.message.content,
                    finish_reason,
                    usage,
                });
            }

            let error = response_to_error(response, "OpenRouter").await;
            if !error.is_retryable() || attempt == self.retry_config.max_retries {
                return Err(error);
            }

            let delay = self
                .retry_config
                .delay_for(attempt + 1, error.retry_after());
            tracing::warn!(
                attempt = attempt + 1,
                delay_ms = delay.as_millis(),
                "Retrying OpenRouter request"
            );
            tokio::time::sleep(delay).await;
            last_error = Some(error);
        }

        Err(last_error
            .unwrap_or_else(|| AiError::Llm("OpenRouter request failed after retries".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::Message;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_retries(max_retries: u32) -> LlmRetryConfig {
        LlmRetryConfig {
            max_retries,
            initial_delay_ms: 1,
            max_delay_ms: 5,
            backoff_multiplier: 2.0,
        }
    }

    fn completion_body(content: &str) -> serde_json::Value {
        json!({
            "id": "gen-123",
            "choices": [{
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16 }
        })
    }

    #[tokio::test]
    async fn test_complete_returns_content_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "test/model",
                "messages": [
                    { "role": "system", "content": "be brief" },
                    { "role": "user", "content": "hello" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("hi there")))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenRouterClient::new("test-key")
            .with_model("test/model")
            .with_base_url(server.uri());

        let request = CompletionRequest::new(vec![
            Message::system("be brief"),
            Message::user("hello"),
        ]);
        let response = client.complete(request).await.unwrap();

        assert_eq!(response.content.as_deref(), Some("hi there"));
        assert_eq!(response.finish_reason, FinishReason::Stop);
        assert_eq!(response.usage.unwrap().total_tokens, 16);
    }

    #[tokio::test]
    async fn test_complete_retries_rate_limit_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("recovered")))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenRouterClient::new("test-key")
            .with_base_url(server.uri())
            .with_retry_config(fast_retries(2));

        let request = CompletionRequest::new(vec![Message::user("hello")]);
        let response = client.complete(request).await.unwrap();
        assert_eq!(response.content.as_deref(), Some("recovered"));
    }

    #[tokio::test]
    async fn test_complete_fails_fast_on_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenRouterClient::new("wrong-key")
            .with_base_url(server.uri())
            .with_retry_config(fast_retries(3));

        let request = CompletionRequest::new(vec![Message::user("hello")]);
        let error = client.complete(request).await.unwrap_err();
        match error {
            AiError::LlmHttp {
                provider, status, ..
            } => {
                assert_eq!(provider, "OpenRouter");
                assert_eq!(status, 401);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_complete_exhausts_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
            .expect(3)
            .mount(&server)
            .await;

        let client = OpenRouterClient::new("test-key")
            .with_base_url(server.uri())
            .with_retry_config(fast_retries(2));

        let request = CompletionRequest::new(vec![Message::user("hello")]);
        let error = client.complete(request).await.unwrap_err();
        match error {
            AiError::LlmHttp { status, .. } => assert_eq!(status, 503),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_attribution_headers_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("HTTP-Referer", "https://memobot.example"))
            .and(header("X-Title", "memobot"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("ok")))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenRouterClient::new("test-key")
            .with_base_url(server.uri())
            .with_attribution("https://memobot.example", "memobot");

        let request = CompletionRequest::new(vec![Message::user("hello")]);
        client.complete(request).await.unwrap();
    }
}
