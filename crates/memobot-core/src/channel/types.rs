//! Channel message types
//!
//! Plain-text message values exchanged with the delivery transport.

use serde::{Deserialize, Serialize};

/// Inbound message from the webhook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Provider message ID (wamid for WhatsApp)
    pub id: String,
    /// Sender address (phone number in E.164 without the plus)
    pub sender_id: String,
    /// Sender display name (if the provider sent one)
    pub sender_name: Option<String>,
    /// Message text
    pub content: String,
    /// Timestamp (milliseconds since epoch)
    pub timestamp: i64,
}

impl InboundMessage {
    /// Create a new inbound message
    pub fn new(
        id: impl Into<String>,
        sender_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            sender_id: sender_id.into(),
            sender_name: None,
            content: content.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Set sender name
    pub fn with_sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = Some(name.into());
        self
    }

    /// Set timestamp
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Outbound message to a sender address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Target address
    pub to: String,
    /// Message text
    pub content: String,
}

impl OutboundMessage {
    /// Create a new outbound message
    pub fn new(to: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_message_builder() {
        let msg = InboundMessage::new("wamid.1", "15551234567", "Hello world")
            .with_sender_name("John")
            .with_timestamp(1_700_000_000_000);

        assert_eq!(msg.id, "wamid.1");
        assert_eq!(msg.sender_id, "15551234567");
        assert_eq!(msg.sender_name, Some("John".to_string()));
        assert_eq!(msg.content, "Hello world");
        assert_eq!(msg.timestamp, 1_700_000_000_000);
    }

    #[test]
    fn test_inbound_message_defaults_now() {
        let msg = InboundMessage::new("wamid.2", "15551234567", "hi");
        assert!(msg.timestamp > 0);
        assert!(msg.sender_name.is_none());
    }

    #[test]
    fn test_outbound_message() {
        let msg = OutboundMessage::new("15551234567", "A reply");
        assert_eq!(msg.to, "15551234567");
        assert_eq!(msg.content, "A reply");
    }
}
