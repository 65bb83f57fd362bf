//! Conversation store trait

use anyhow::Result;
use async_trait::async_trait;

use super::types::{MessageRecord, RecalledTurn};

/// Remote vector store holding message records
///
/// One write or one similarity query per call; nothing here batches.
/// Implementations own the wire format and return hits in their own
/// relevance order, which callers never re-rank.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Persist one record into a namespace
    async fn upsert_turn(&self, namespace: &str, record: &MessageRecord) -> Result<()>;

    /// Return up to `top_k` semantically similar records from a
    /// namespace, most relevant first
    async fn search_turns(
        &self,
        namespace: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RecalledTurn>>;
}
