//! Startup configuration
//!
//! Everything the process needs is read from the environment exactly
//! once, before the listener binds. Request-handling code receives this
//! struct by injection and never consults the environment again, so a
//! missing credential can only fail the process at startup, never
//! mid-turn.

use thiserror::Error;

/// A configuration problem that must stop startup
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    InvalidVar { name: &'static str, value: String },
}

const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 512;
const DEFAULT_CONTEXT_TOP_K: usize = 6;
const DEFAULT_TURN_TIMEOUT_SECS: u64 = 30;
const DEFAULT_HTTP_HOST: &str = "0.0.0.0";
const DEFAULT_HTTP_PORT: u16 = 3000;

/// Immutable application configuration built once at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Secret echoed against the webhook verification handshake
    pub verify_token: String,
    /// WhatsApp system-user access token
    pub whatsapp_access_token: String,
    /// WhatsApp phone number ID replies are sent from
    pub whatsapp_phone_number_id: String,
    /// Graph API base override (tests and proxies)
    pub graph_api_base: Option<String>,
    /// OpenRouter API key
    pub openrouter_api_key: String,
    /// Model identifier, fixed for the process lifetime
    pub openrouter_model: String,
    /// OpenRouter base URL override (tests and gateways)
    pub openrouter_api_base: Option<String>,
    /// Completion temperature
    pub temperature: f32,
    /// Completion output cap in tokens
    pub max_tokens: u32,
    /// Pinecone project API key
    pub pinecone_api_key: String,
    /// Pinecone index host
    pub pinecone_index_host: String,
    /// Recalled turns per completion (K)
    pub context_top_k: usize,
    /// Deadline for the completion call, seconds
    pub turn_timeout_secs: u64,
    /// HTTP bind host
    pub http_host: String,
    /// HTTP bind port
    pub http_port: u16,
}

impl AppConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an injected lookup
    ///
    /// Tests use this to avoid mutating process-global environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| -> Result<String, ConfigError> {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::MissingVar(name))
        };
        let optional = |name: &'static str| -> Option<String> {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        fn parsed<T: std::str::FromStr>(
            name: &'static str,
            value: Option<String>,
            default: T,
        ) -> Result<T, ConfigError> {
            match value {
                Some(raw) => raw
                    .parse()
                    .map_err(|_| ConfigError::InvalidVar { name, value: raw }),
                None => Ok(default),
            }
        }

        Ok(Self {
            verify_token: required("WEBHOOK_VERIFY_TOKEN")?,
            whatsapp_access_token: required("WHATSAPP_ACCESS_TOKEN")?,
            whatsapp_phone_number_id: required("WHATSAPP_PHONE_NUMBER_ID")?,
            graph_api_base: optional("GRAPH_API_BASE"),
            openrouter_api_key: required("OPENROUTER_API_KEY")?,
            openrouter_model: optional("OPENROUTER_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            openrouter_api_base: optional("OPENROUTER_API_BASE"),
            temperature: parsed(
                "OPENROUTER_TEMPERATURE",
                optional("OPENROUTER_TEMPERATURE"),
                DEFAULT_TEMPERATURE,
            )?,
            max_tokens: parsed(
                "OPENROUTER_MAX_TOKENS",
                optional("OPENROUTER_MAX_TOKENS"),
                DEFAULT_MAX_TOKENS,
            )?,
            pinecone_api_key: required("PINECONE_API_KEY")?,
            pinecone_index_host: required("PINECONE_INDEX_HOST")?,
            context_top_k: parsed(
                "MEMOBOT_CONTEXT_TOP_K",
                optional("MEMOBOT_CONTEXT_TOP_K"),
                DEFAULT_CONTEXT_TOP_K,
            )?,
            turn_timeout_secs: parsed(
                "MEMOBOT_TURN_TIMEOUT_SECS",
                optional("MEMOBOT_TURN_TIMEOUT_SECS"),
                DEFAULT_TURN_TIMEOUT_SECS,
            )?,
            http_host: optional("MEMOBOT_HTTP_HOST")
                .unwrap_or_else(|| DEFAULT_HTTP_HOST.to_string()),
            http_port: parsed(
                "MEMOBOT_HTTP_PORT",
                optional("MEMOBOT_HTTP_PORT"),
                DEFAULT_HTTP_PORT,
            )?,
        })
    }
}
