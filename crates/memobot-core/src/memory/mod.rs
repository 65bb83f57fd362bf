//! Conversational Memory Layer
//!
//! Long-term memory lives in a remote vector store, partitioned into
//! one namespace per sender. Each turn becomes one write-once
//! [`MessageRecord`]; recall is a single similarity query returning the
//! store's own relevance order.

mod id;
pub mod pinecone;
mod store;
mod types;

pub use id::{ClockIdGenerator, RecordIdGenerator};
pub use pinecone::{PineconeConfig, PineconeStore};
pub use store::ConversationStore;
pub use types::{MessageRecord, RecalledTurn, TurnRole, namespace_for_sender};

#[cfg(test)]
pub use store::mock;
