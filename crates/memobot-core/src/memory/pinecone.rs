//! Pinecone records store
//!
//! Talks to the records data plane of an integrated-embedding index:
//! the index embeds record text server-side on both write and query, so
//! this client never computes a vector itself. One namespace per
//! sender, one record per turn.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::store::ConversationStore;
use super::types::{MessageRecord, RecalledTurn, TurnRole};

/// Default timeout for store calls (seconds)
const API_TIMEOUT_SECS: u64 = 10;

/// Records data plane API version header value
const API_VERSION: &str = "2025-04";

/// Pinecone store configuration
#[derive(Debug, Clone)]
pub struct PineconeConfig {
    /// Project API key
    pub api_key: String,
    /// Index host, scheme included
    pub index_host: String,
}

impl PineconeConfig {
    /// Create a config, defaulting the scheme to https when the host
    /// comes without one (the console shows bare hosts)
    pub fn new(api_key: impl Into<String>, index_host: impl Into<String>) -> Self {
        let index_host = index_host.into();
        let index_host = if index_host.starts_with("http://") || index_host.starts_with("https://")
        {
            index_host
        } else {
            format!("https://{index_host}")
        };
        Self {
            api_key: api_key.into(),
            index_host,
        }
    }
}

/// Conversation store backed by a Pinecone integrated-embedding index
pub struct PineconeStore {
    config: PineconeConfig,
    client: Client,
}

impl PineconeStore {
    /// Create a new store client
    pub fn new(config: PineconeConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    /// Create from credentials
    pub fn from_credentials(
        api_key: impl Into<String>,
        index_host: impl Into<String>,
    ) -> Self {
        Self::new(PineconeConfig::new(api_key, index_host))
    }

    /// Records endpoint URL for a namespace operation
    fn records_url(&self, namespace: &str, operation: &str) -> String {
        format!(
            "{}/records/namespaces/{}/{}",
            self.config.index_host, namespace, operation
        )
    }
}

#[async_trait]
impl ConversationStore for PineconeStore {
    async fn upsert_turn(&self, namespace: &str, record: &MessageRecord) -> Result<()> {
        let line = UpsertRecord {
            id: &record.id,
            text: &record.content,
            role: record.role.as_str(),
            timestamp: &record.timestamp,
            owner: &record.owner,
        };
        // The endpoint takes NDJSON, one record per line.
        let mut body = serde_json::to_string(&line)?;
        body.push('\n');

        let response = self
            .client
            .post(self.records_url(namespace, "upsert"))
            .header("Api-Key", &self.config.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .header("Content-Type", "application/x-ndjson")
            .timeout(Duration::from_secs(API_TIMEOUT_SECS))
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Pinecone upsert error {}: {}", status, error_text);
        }

        debug!(namespace = %namespace, record_id = %record.id, "Upserted message record");
        Ok(())
    }

    async fn search_turns(
        &self,
        namespace: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RecalledTurn>> {
        let request = SearchRequest {
            query: SearchQuery {
                inputs: SearchInputs { text: query },
                top_k,
            },
        };

        let response = self
            .client
            .post(self.records_url(namespace, "search"))
            .header("Api-Key", &self.config.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .header("Content-Type", "application/json")
            .timeout(Duration::from_secs(API_TIMEOUT_SECS))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Pinecone search error {}: {}", status, error_text);
        }

        let data: SearchResponse = response.json().await?;
        let turns = data
            .result
            .hits
            .into_iter()
            .map(|hit| RecalledTurn {
                // Records written by us always carry a role tag; anything
                // else reads as a user turn rather than being dropped.
                role: TurnRole::parse(&hit.fields.role).unwrap_or(TurnRole::User),
                id: hit.id,
                score: hit.score,
                content: hit.fields.text,
            })
            .collect();

        Ok(turns)
    }
}

// ============================================================================
// Records API Types
// ============================================================================

#[derive(Serialize)]
struct UpsertRecord<'a> {
    #[serde(rename = "_id")]
    id: &'a str,
    text: &'a str,
    role: &'a str,
    timestamp: &'a str,
    owner: &'a str,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: SearchQuery<'a>,
}

#[derive(Serialize)]
struct SearchQuery<'a> {
    inputs: SearchInputs<'a>,
    top_k: usize,
}

#[derive(Serialize)]
struct SearchInputs<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: SearchResult,
}

#[derive(Default, Deserialize)]
struct SearchResult {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score", default)]
    score: f32,
    #[serde(default)]
    fields: HitFields,
}

#[derive(Default, Deserialize)]
struct HitFields {
    #[serde(default)]
    text: String,
    #[serde(default)]
    role: String,
}

// ============================================================================
// Tests
// ============================================================================
