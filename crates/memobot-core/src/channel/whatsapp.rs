//! WhatsApp Channel Implementation
//!
//! Sends replies through the WhatsApp Cloud API (Graph API) and parses
//! inbound webhook payloads into channel messages. Receiving is
//! webhook-only; there is no polling mode.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::Channel;
use super::types::{InboundMessage, OutboundMessage};

const GRAPH_API_BASE: &str = "https://graph.facebook.com/v23.0";
/// Default timeout for Graph API calls (seconds)
const API_TIMEOUT_SECS: u64 = 10;

/// WhatsApp channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    /// System-user access token for the WhatsApp Business account
    pub access_token: String,
    /// Phone number ID the messages are sent from
    pub phone_number_id: String,
    /// Graph API base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String {
    GRAPH_API_BASE.to_string()
}

impl WhatsAppConfig {
    /// Create a new config from credentials
    pub fn new(access_token: impl Into<String>, phone_number_id: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            phone_number_id: phone_number_id.into(),
            api_base: default_api_base(),
        }
    }

    /// Set a custom Graph API base URL (for tests)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

/// WhatsApp channel implementation
pub struct WhatsAppChannel {
    config: WhatsAppConfig,
    client: Client,
}

impl WhatsAppChannel {
    /// Create a new WhatsApp channel
    pub fn new(config: WhatsAppConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    /// Create from credentials
    pub fn from_credentials(
        access_token: impl Into<String>,
        phone_number_id: impl Into<String>,
    ) -> Self {
        Self::new(WhatsAppConfig::new(access_token, phone_number_id))
    }

    /// Get the messages endpoint URL
    fn api_url(&self) -> String {
        format!(
            "{}/{}/messages",
            self.config.api_base, self.config.phone_number_id
        )
    }

    /// Send a text message via the Graph API, returning the provider
    /// message ID
    async fn send_message(&self, to: &str, text: &str) -> Result<String> {
        let request = SendMessageRequest {
            messaging_product: "whatsapp",
            to,
            kind: "text",
            text: TextPayload { body: text },
        };

        let response = self
            .client
            .post(self.api_url())
            .header(
                "Authorization",
                format!("Bearer {}", self.config.access_token),
            )
            .json(&request)
            .timeout(std::time::Duration::from_secs(API_TIMEOUT_SECS))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            return Err(anyhow!("WhatsApp API error {}: {}", status, error));
        }

        let body: SendMessageResponse = response.json().await?;
        Ok(body
            .messages
            .into_iter()
            .next()
            .map(|m| m.id)
            .unwrap_or_default())
    }

    /// Mark an inbound message as read (the blue double tick)
    ///
    /// Best-effort courtesy call; callers log and ignore failures.
    pub async fn mark_read(&self, message_id: &str) -> Result<()> {
        let request = MarkReadRequest {
            messaging_product: "whatsapp",
            status: "read",
            message_id,
        };

        let response = self
            .client
            .post(self.api_url())
            .header(
                "Authorization",
                format!("Bearer {}", self.config.access_token),
            )
            .json(&request)
            .timeout(std::time::Duration::from_secs(API_TIMEOUT_SECS))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            return Err(anyhow!("WhatsApp API error {}: {}", status, error));
        }

        Ok(())
    }

    /// Extract text messages from a webhook payload
    ///
    /// Non-text messages and status-only notifications (delivery and
    /// read receipts) yield nothing.
    pub fn extract_messages(payload: &WhatsAppWebhookPayload) -> Vec<InboundMessage> {
        let mut messages = Vec::new();

        for entry in &payload.entry {
            for change in &entry.changes {
                let value = &change.value;
                for message in &value.messages {
                    if message.kind != "text" {
                        debug!(kind = %message.kind, "Skipping non-text WhatsApp message");
                        continue;
                    }
                    let Some(text) = &message.text else {
                        continue;
                    };

                    let sender_name = value
                        .contacts
                        .iter()
                        .find(|c| c.wa_id.as_deref() == Some(message.from.as_str()))
                        .or_else(|| value.contacts.first())
                        .and_then(|c| c.profile.as_ref())
                        .and_then(|p| p.name.clone());

                    let timestamp = message
                        .timestamp
                        .as_deref()
                        .and_then(|t| t.parse::<i64>().ok())
                        .map(|secs| secs * 1000)
                        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());

                    let mut inbound =
                        InboundMessage::new(&message.id, &message.from, &text.body)
                            .with_timestamp(timestamp);
                    if let Some(name) = sender_name {
                        inbound = inbound.with_sender_name(name);
                    }
                    messages.push(inbound);
                }
            }
        }

        messages
    }
}

#[async_trait]
impl Channel for WhatsAppChannel {
    fn name(&self) -> &str {
        "WhatsApp"
    }

    fn is_configured(&self) -> bool {
        !self.config.access_token.is_empty() && !self.config.phone_number_id.is_empty()
    }

    async fn send(&self, message: OutboundMessage) -> Result<()> {
        let message_id = self.send_message(&message.to, &message.content).await?;
        debug!(to = %message.to, message_id = %message_id, "Delivered WhatsApp message");
        Ok(())
    }
}

// ============================================================================
// WhatsApp Cloud API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    messaging_product: &'a str,
    to: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    text: TextPayload<'a>,
}

#[derive(Debug, Serialize)]
struct TextPayload<'a> {
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct MarkReadRequest<'a> {
    messaging_product: &'a str,
    status: &'a str,
    message_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    #[serde(default)]
    messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

/// Webhook notification payload
///
/// Every field is optional on the wire; unknown event shapes must still
/// deserialize so the handler can acknowledge them.
#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppWebhookPayload {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub value: ChangeValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub contacts: Vec<WebhookContact>,
    #[serde(default)]
    pub messages: Vec<WebhookMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookContact {
    #[serde(default)]
    pub wa_id: Option<String>,
    #[serde(default)]
    pub profile: Option<ContactProfile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactProfile {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookMessage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<MessageText>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageText {
    #[serde(default)]
    pub body: String,
}

// ============================================================================
// Tests
// ============================================================================
