//! Message records and recall types

use serde::{Deserialize, Serialize};

/// Who authored a conversational turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Parse a stored role tag
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One persisted conversational turn
///
/// Records are write-once; nothing in the system updates or deletes
/// them after the initial upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Record identifier, unique within the namespace
    pub id: String,
    /// Turn text
    pub content: String,
    /// Turn author
    pub role: TurnRole,
    /// RFC 3339 creation time
    pub timestamp: String,
    /// Sender address the record belongs to
    pub owner: String,
}

impl MessageRecord {
    /// Create a record stamped with the current time
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        role: TurnRole,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            role,
            timestamp: chrono::Utc::now().to_rfc3339(),
            owner: owner.into(),
        }
    }
}

/// One similarity hit returned from the store
#[derive(Debug, Clone)]
pub struct RecalledTurn {
    pub id: String,
    pub score: f32,
    pub role: TurnRole,
    pub content: String,
}

/// Logical store partition for one sender
///
/// Every read and write for a sender goes through this namespace and no
/// other, which is the whole isolation story: distinct senders can
/// never leak context into each other's prompts.
pub fn namespace_for_sender(sender: &str) -> String {
    format!("user_{sender}")
}
