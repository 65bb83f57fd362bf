//! Prompt envelope assembly
//!
//! One envelope per turn: a fixed instruction, then either the recalled
//! turns serialized as role-prefixed lines or an explicit note that the
//! conversation is new. The envelope becomes the system message of the
//! completion request; the inbound text rides separately as the user
//! message.

use crate::llm::Role;

/// Default ceiling on the serialized context block, in characters.
pub const DEFAULT_CONTEXT_CHAR_BUDGET: usize = 4_000;

const INSTRUCTION: &str = "You are a helpful assistant chatting with a user over WhatsApp. \
Keep replies short and conversational. Use the conversation memory below when it is \
relevant; do not mention that it exists.";

const CONTEXT_HEADER: &str = "Relevant earlier messages from this conversation:";

const NEW_CONVERSATION_NOTE: &str =
    "This is a new conversation. There is no prior history with this user.";

/// One recalled turn serialized into the envelope.
#[derive(Debug, Clone)]
pub struct ContextLine {
    pub role: Role,
    pub text: String,
}

impl ContextLine {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    fn render(&self) -> String {
        let prefix = match self.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        format!("{}: {}", prefix, self.text)
    }
}

/// The assembled system instruction for one completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptEnvelope {
    text: String,
    context_lines: usize,
}

impl PromptEnvelope {
    /// Assemble an envelope with the default context budget.
    pub fn build(context: &[ContextLine]) -> Self {
        Self::build_with_budget(context, DEFAULT_CONTEXT_CHAR_BUDGET)
    }

    /// Assemble an envelope with an explicit character budget for the
    /// context block.
    ///
    /// Lines arrive in descending relevance, so whole lines are dropped
    /// from the tail until the block fits. A first line that alone
    /// exceeds the budget is cut mid-line instead of dropped, so a
    /// non-empty context never collapses into the new-conversation note.
    pub fn build_with_budget(context: &[ContextLine], budget: usize) -> Self {
        let mut kept: Vec<String> = Vec::new();
        let mut used = 0usize;

        for line in context {
            let rendered = line.render();
            let cost = rendered.chars().count() + 1;
            if used + cost > budget {
                if kept.is_empty() && budget > 0 {
                    kept.push(truncate_line(&rendered, budget));
                }
                break;
            }
            used += cost;
            kept.push(rendered);
        }

        let context_lines = kept.len();
        let text = if kept.is_empty() {
            format!("{INSTRUCTION}\n\n{NEW_CONVERSATION_NOTE}")
        } else {
            format!("{INSTRUCTION}\n\n{CONTEXT_HEADER}\n{}", kept.join("\n"))
        };

        Self {
            text,
            context_lines,
        }
    }

    /// Number of context lines that made it into the envelope.
    pub fn context_lines(&self) -> usize {
        self.context_lines
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

fn truncate_line(line: &str, budget: usize) -> String {
    let mut out: String = line.chars().take(budget.saturating_sub(3)).collect();
    out.push_str("...");
    out
}
