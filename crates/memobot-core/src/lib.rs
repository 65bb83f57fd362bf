pub mod channel;
pub mod config;
pub mod daemon;
pub mod memory;
pub mod runtime;

pub use config::{AppConfig, ConfigError};

use std::sync::Arc;
use tracing::info;

use memobot_ai::OpenRouterClient;

use channel::{WhatsAppChannel, WhatsAppConfig};
use memory::{ClockIdGenerator, PineconeConfig, PineconeStore};
use runtime::{TurnPipeline, TurnPipelineConfig};

/// Core application state shared by every webhook request
///
/// Owns the configured transports and the turn pipeline wired over
/// them. Built once at startup, then shared behind an Arc.
pub struct AppCore {
    pub config: AppConfig,
    pub whatsapp: Arc<WhatsAppChannel>,
    pub pipeline: TurnPipeline,
}

impl AppCore {
    pub fn new(config: AppConfig) -> Self {
        let mut whatsapp_config = WhatsAppConfig::new(
            &config.whatsapp_access_token,
            &config.whatsapp_phone_number_id,
        );
        if let Some(base) = &config.graph_api_base {
            whatsapp_config = whatsapp_config.with_api_base(base);
        }
        let whatsapp = Arc::new(WhatsAppChannel::new(whatsapp_config));

        let store = Arc::new(PineconeStore::new(PineconeConfig::new(
            &config.pinecone_api_key,
            &config.pinecone_index_host,
        )));

        let mut llm =
            OpenRouterClient::new(&config.openrouter_api_key).with_model(&config.openrouter_model);
        if let Some(base) = &config.openrouter_api_base {
            llm = llm.with_base_url(base);
        }

        let pipeline = TurnPipeline::new(
            store,
            Arc::new(llm),
            whatsapp.clone(),
            Arc::new(ClockIdGenerator),
        )
        .with_config(TurnPipelineConfig {
            context_top_k: config.context_top_k,
            turn_timeout_secs: config.turn_timeout_secs,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            ..TurnPipelineConfig::default()
        });

        info!(model = %config.openrouter_model, "Initializing Memobot core");

        Self {
            config,
            whatsapp,
            pipeline,
        }
    }
}
