//! Channel trait definition
//!
//! The delivery seam between the turn pipeline and the transport.

use anyhow::Result;
use async_trait::async_trait;

use super::types::OutboundMessage;

/// Outbound delivery transport
///
/// One call per reply; the pipeline never batches or retries delivery.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Get channel display name
    fn name(&self) -> &str;

    /// Check if channel is properly configured
    fn is_configured(&self) -> bool;

    /// Send a message to the channel
    async fn send(&self, message: OutboundMessage) -> Result<()>;

    /// Send a simple text message
    async fn send_text(&self, to: &str, text: &str) -> Result<()> {
        self.send(OutboundMessage::new(to, text)).await
    }
}
