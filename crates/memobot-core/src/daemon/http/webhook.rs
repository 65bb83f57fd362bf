//! WhatsApp webhook endpoints
//!
//! GET serves the Cloud API subscription handshake; POST receives event
//! notifications and drives one pipeline turn per extracted text
//! message. A 500 from POST tells the platform to redeliver the event,
//! which is safe because every persisted record gets a fresh id.

use crate::AppCore;
use crate::channel::{WhatsAppChannel, WhatsAppWebhookPayload};
use crate::runtime::TurnError;
use axum::{
    Json,
    extract::{Extension, Query},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::ApiError;

/// Query parameters of the verification handshake
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

/// GET /webhook
pub async fn verify(
    Extension(core): Extension<Arc<AppCore>>,
    Query(params): Query<VerifyParams>,
) -> Result<String, ApiError> {
    let mode_ok = params.mode.as_deref() == Some("subscribe");
    let token_ok = params.verify_token.as_deref() == Some(core.config.verify_token.as_str());

    if mode_ok && token_ok {
        info!("Webhook verification handshake accepted");
        Ok(params.challenge.unwrap_or_default())
    } else {
        warn!("Webhook verification handshake rejected");
        Err(ApiError::forbidden("verification failed"))
    }
}

/// POST /webhook
pub async fn receive(
    Extension(core): Extension<Arc<AppCore>>,
    Json(payload): Json<WhatsAppWebhookPayload>,
) -> Result<StatusCode, ApiError> {
    let messages = WhatsAppChannel::extract_messages(&payload);
    if messages.is_empty() {
        // Status updates and non-text notifications are acknowledged
        // without further action.
        return Ok(StatusCode::OK);
    }

    for inbound in &messages {
        if let Err(e) = core.whatsapp.mark_read(&inbound.id).await {
            warn!(message_id = %inbound.id, error = %e, "Failed to mark message as read");
        }

        match core.pipeline.handle_inbound(inbound).await {
            Ok(_) => {}
            Err(TurnError::InvalidEvent(reason)) => {
                warn!(message_id = %inbound.id, reason = %reason, "Skipping invalid inbound event");
            }
            Err(err) => {
                error!(message_id = %inbound.id, error = %err, "Turn failed");
                return Err(ApiError::internal(err.to_string()));
            }
        }
    }

    Ok(StatusCode::OK)
}
