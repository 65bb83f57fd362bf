//! Delivery Channel Layer
//!
//! Plain-text messaging between the turn pipeline and WhatsApp.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            TurnPipeline                 │
//! │  - sends the generated reply            │
//! └─────────────────────────────────────────┘
//!              │
//!              ▼
//! ┌─────────────────────────────────────────┐
//! │         trait Channel                   │
//! │  - send(message)                        │
//! └─────────────────────────────────────────┘
//!              │
//!              ▼
//!       WhatsAppChannel (Graph API)
//! ```
//!
//! Inbound traffic does not flow through the trait: the HTTP webhook
//! handler parses Cloud API payloads with
//! [`WhatsAppChannel::extract_messages`] and feeds the pipeline
//! directly.

mod traits;
mod types;
pub mod whatsapp;

pub use traits::Channel;
pub use types::{InboundMessage, OutboundMessage};
pub use whatsapp::{WhatsAppChannel, WhatsAppConfig, WhatsAppWebhookPayload};

#[cfg(test)]
pub use traits::mock;
