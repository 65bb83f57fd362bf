//! One inbound message, end to end
//!
//! The pipeline owns the order of operations for a turn: persist the
//! inbound text, recall similar prior turns, assemble the prompt
//! envelope, complete, persist the reply, deliver it. Memory traffic is
//! best effort; completion and delivery failures fail the turn.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use memobot_ai::prompt::DEFAULT_CONTEXT_CHAR_BUDGET;
use memobot_ai::{
    AiError, CompletionRequest, ContextLine, LlmClient, Message, PromptEnvelope, Role,
};

use crate::channel::{Channel, InboundMessage, OutboundMessage};
use crate::memory::{
    ConversationStore, MessageRecord, RecalledTurn, RecordIdGenerator, TurnRole,
    namespace_for_sender,
};

/// Why a turn could not produce a delivered reply
#[derive(Error, Debug)]
pub enum TurnError {
    /// The event has no usable sender or text
    #[error("invalid inbound event: {0}")]
    InvalidEvent(String),

    /// The completion provider failed after retries
    #[error("completion failed: {0}")]
    Completion(#[source] AiError),

    /// The completion did not return within the turn deadline
    #[error("completion timed out after {0}s")]
    CompletionTimeout(u64),

    /// The provider answered with no usable text
    #[error("completion returned no text")]
    EmptyCompletion,

    /// The reply could not be handed to the channel
    #[error("delivery failed: {0}")]
    Delivery(#[source] anyhow::Error),
}

/// Tunables for turn handling
#[derive(Debug, Clone)]
pub struct TurnPipelineConfig {
    /// Prior turns recalled per completion
    pub context_top_k: usize,
    /// Deadline for the completion call, seconds
    pub turn_timeout_secs: u64,
    /// Character ceiling for the recalled context block
    pub context_char_budget: usize,
    /// Completion temperature
    pub temperature: f32,
    /// Completion output cap in tokens
    pub max_tokens: u32,
}

impl Default for TurnPipelineConfig {
    fn default() -> Self {
        Self {
            context_top_k: 6,
            turn_timeout_secs: 30,
            context_char_budget: DEFAULT_CONTEXT_CHAR_BUDGET,
            temperature: 0.7,
            max_tokens: 512,
        }
    }
}

/// What a completed turn produced
#[derive(Debug)]
pub struct TurnOutcome {
    /// Text delivered back to the sender
    pub reply: String,
    /// ID of the persisted inbound record, when the write succeeded
    pub user_record_id: Option<String>,
    /// ID of the persisted reply record, when the write succeeded
    pub assistant_record_id: Option<String>,
    /// Recalled turns that made it into the prompt
    pub context_turns: usize,
}

/// Orchestrates one conversational turn against injected seams
pub struct TurnPipeline {
    store: Arc<dyn ConversationStore>,
    llm: Arc<dyn LlmClient>,
    channel: Arc<dyn Channel>,
    ids: Arc<dyn RecordIdGenerator>,
    config: TurnPipelineConfig,
}

impl TurnPipeline {
    /// Create a pipeline with default tunables
    pub fn new(
        store: Arc<dyn ConversationStore>,
        llm: Arc<dyn LlmClient>,
        channel: Arc<dyn Channel>,
        ids: Arc<dyn RecordIdGenerator>,
    ) -> Self {
        Self {
            store,
            llm,
            channel,
            ids,
            config: TurnPipelineConfig::default(),
        }
    }

    /// Override the tunables
    pub fn with_config(mut self, config: TurnPipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Run one inbound message through the whole turn
    pub async fn handle_inbound(&self, inbound: &InboundMessage) -> Result<TurnOutcome, TurnError> {
        let sender = inbound.sender_id.trim();
        if sender.is_empty() {
            return Err(TurnError::InvalidEvent("event has no sender".to_string()));
        }
        let content = inbound.content.trim();
        if content.is_empty() {
            return Err(TurnError::InvalidEvent("event has no text".to_string()));
        }

        let namespace = namespace_for_sender(sender);

        // 1. Persist the inbound turn. Memory writes are best effort.
        let user_record = MessageRecord::new(
            self.ids.next_id(TurnRole::User),
            content,
            TurnRole::User,
            sender,
        );
        let user_record_id = self.persist_best_effort(&namespace, &user_record).await;

        // 2. Recall similar prior turns. The record written above may
        //    already be visible to search, so its id is dropped from
        //    the hits.
        let mut recalled = self.recall_best_effort(&namespace, content).await;
        recalled.retain(|turn| Some(&turn.id) != user_record_id.as_ref());

        // 3. Assemble the prompt envelope.
        let lines: Vec<ContextLine> = recalled
            .iter()
            .map(|turn| ContextLine::new(prompt_role(turn.role), &turn.content))
            .collect();
        let envelope = PromptEnvelope::build_with_budget(&lines, self.config.context_char_budget);
        let context_turns = envelope.context_lines();

        // 4. Complete. Failures here fail the turn.
        let request = CompletionRequest::new(vec![
            Message::system(envelope.as_str()),
            Message::user(content),
        ])
        .with_temperature(self.config.temperature)
        .with_max_tokens(self.config.max_tokens);

        let deadline = Duration::from_secs(self.config.turn_timeout_secs);
        let response = tokio::time::timeout(deadline, self.llm.complete(request))
            .await
            .map_err(|_| TurnError::CompletionTimeout(self.config.turn_timeout_secs))?
            .map_err(TurnError::Completion)?;

        let reply = response
            .content
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .ok_or(TurnError::EmptyCompletion)?
            .to_string();

        // 5. Persist the reply before delivery so the next turn can
        //    recall it even when the send fails.
        let assistant_record = MessageRecord::new(
            self.ids.next_id(TurnRole::Assistant),
            &reply,
            TurnRole::Assistant,
            sender,
        );
        let assistant_record_id = self.persist_best_effort(&namespace, &assistant_record).await;

        // 6. Deliver. Failures here fail the turn.
        self.channel
            .send(OutboundMessage::new(sender, &reply))
            .await
            .map_err(TurnError::Delivery)?;

        info!(
            sender = %sender,
            context_turns,
            reply_chars = reply.len(),
            "Turn completed"
        );

        Ok(TurnOutcome {
            reply,
            user_record_id,
            assistant_record_id,
            context_turns,
        })
    }

    async fn persist_best_effort(&self, namespace: &str, record: &MessageRecord) -> Option<String> {
        match self.store.upsert_turn(namespace, record).await {
            Ok(()) => Some(record.id.clone()),
            Err(e) => {
                warn!(namespace = %namespace, error = %e, "Memory write failed, continuing without it");
                None
            }
        }
    }

    async fn recall_best_effort(&self, namespace: &str, query: &str) -> Vec<RecalledTurn> {
        match self
            .store
            .search_turns(namespace, query, self.config.context_top_k)
            .await
        {
            Ok(turns) => turns,
            Err(e) => {
                warn!(namespace = %namespace, error = %e, "Memory search failed, treating turn as a new conversation");
                Vec::new()
            }
        }
    }
}

fn prompt_role(role: TurnRole) -> Role {
    match role {
        TurnRole::User => Role::User,
        TurnRole::Assistant => Role::Assistant,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::mock::MockChannel;
    use crate::memory::mock::{MockStore, hit};
    use crate::memory::ClockIdGenerator;
    use memobot_ai::{MockLlmClient, MockReply};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SENDER: &str = "15551234567";

    fn inbound(text: &str) -> InboundMessage {
        InboundMessage::new("wamid.test.1", SENDER, text)
    }

    fn build(
        store: MockStore,
        llm: MockLlmClient,
        channel: MockChannel,
    ) -> (
        TurnPipeline,
        Arc<MockStore>,
        Arc<MockLlmClient>,
        Arc<MockChannel>,
    ) {
        let store = Arc::new(store);
        let llm = Arc::new(llm);
        let channel = Arc::new(channel);
        let pipeline = TurnPipeline::new(
            store.clone(),
            llm.clone(),
            channel.clone(),
            Arc::new(ClockIdGenerator),
        );
        (pipeline, store, llm, channel)
    }

    /// Counting generator so tests can predict record ids
    struct SeqIds {
        counter: AtomicUsize,
    }

    impl SeqIds {
        fn new() -> Self {
            Self {
                counter: AtomicUsize::new(0),
            }
        }
    }

    impl RecordIdGenerator for SeqIds {
        fn next_id(&self, role: TurnRole) -> String {
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            format!("seq{}-{}", n, role.as_str())
        }
    }

    #[tokio::test]
    async fn test_turn_persists_both_sides_and_delivers() {
        let llm = MockLlmClient::from_replies(vec![MockReply::Text("Nice to meet you!".into())]);
        let (pipeline, store, llm, channel) = build(MockStore::new(), llm, MockChannel::new());

        let outcome = pipeline.handle_inbound(&inbound("Hello there")).await.unwrap();

        assert_eq!(outcome.reply, "Nice to meet you!");
        assert!(outcome.user_record_id.is_some());
        assert!(outcome.assistant_record_id.is_some());
        assert_eq!(outcome.context_turns, 0);

        let upserts = store.recorded_upserts().await;
        assert_eq!(upserts.len(), 2);
        assert_eq!(upserts[0].0, "user_15551234567");
        assert_eq!(upserts[0].1.role, TurnRole::User);
        assert_eq!(upserts[0].1.content, "Hello there");
        assert_eq!(upserts[1].0, "user_15551234567");
        assert_eq!(upserts[1].1.role, TurnRole::Assistant);
        assert_eq!(upserts[1].1.content, "Nice to meet you!");

        let sent = channel.get_sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, SENDER);
        assert_eq!(sent[0].content, "Nice to meet you!");

        // Without prior history the system message marks a fresh start.
        let requests = llm.seen_requests().await;
        assert_eq!(requests.len(), 1);
        assert!(requests[0].messages[0].content.contains("new conversation"));
        assert_eq!(requests[0].messages[1].content, "Hello there");
    }

    #[tokio::test]
    async fn test_search_uses_configured_top_k() {
        let (pipeline, store, _llm, _channel) =
            build(MockStore::new(), MockLlmClient::new(), MockChannel::new());

        pipeline.handle_inbound(&inbound("query text")).await.unwrap();

        let searches = store.recorded_searches().await;
        assert_eq!(searches.len(), 1);
        assert_eq!(searches[0].0, "user_15551234567");
        assert_eq!(searches[0].1, "query text");
        assert_eq!(searches[0].2, 6);
    }

    #[tokio::test]
    async fn test_recalled_turns_reach_the_prompt() {
        let store = MockStore::new().with_hits(vec![
            hit("m1", TurnRole::User, "I collect model trains"),
            hit("m2", TurnRole::Assistant, "Noted, model trains it is"),
        ]);
        let (pipeline, _store, llm, _channel) = build(store, MockLlmClient::new(), MockChannel::new());

        let outcome = pipeline
            .handle_inbound(&inbound("What hobby did I mention?"))
            .await
            .unwrap();

        assert_eq!(outcome.context_turns, 2);
        let requests = llm.seen_requests().await;
        let system = &requests[0].messages[0].content;
        assert!(system.contains("user: I collect model trains"));
        assert!(system.contains("assistant: Noted, model trains it is"));
        assert!(!system.contains("new conversation"));
    }

    #[tokio::test]
    async fn test_fresh_record_filtered_from_recall() {
        // SeqIds makes the inbound record id "seq0-user"; a search hit
        // with that id is the turn itself echoed back by the store.
        let store = MockStore::new().with_hits(vec![
            hit("seq0-user", TurnRole::User, "the message being handled"),
            hit("old-7", TurnRole::Assistant, "an actual prior reply"),
        ]);
        let store = Arc::new(store);
        let llm = Arc::new(MockLlmClient::new());
        let pipeline = TurnPipeline::new(
            store.clone(),
            llm.clone(),
            Arc::new(MockChannel::new()),
            Arc::new(SeqIds::new()),
        );

        let outcome = pipeline
            .handle_inbound(&inbound("the message being handled"))
            .await
            .unwrap();

        assert_eq!(outcome.user_record_id.as_deref(), Some("seq0-user"));
        assert_eq!(outcome.context_turns, 1);
        let requests = llm.seen_requests().await;
        let system = &requests[0].messages[0].content;
        assert!(system.contains("an actual prior reply"));
        assert!(!system.contains("user: the message being handled"));
    }

    #[tokio::test]
    async fn test_failed_write_does_not_fail_the_turn() {
        let (pipeline, store, _llm, channel) = build(
            MockStore::new().failing_upserts(),
            MockLlmClient::from_replies(vec![MockReply::Text("still here".into())]),
            MockChannel::new(),
        );

        let outcome = pipeline.handle_inbound(&inbound("hi")).await.unwrap();

        assert_eq!(outcome.reply, "still here");
        assert!(outcome.user_record_id.is_none());
        assert!(outcome.assistant_record_id.is_none());
        assert!(store.recorded_upserts().await.is_empty());
        assert_eq!(channel.get_sent_messages().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_search_degrades_to_new_conversation() {
        let (pipeline, _store, llm, channel) = build(
            MockStore::new().failing_searches(),
            MockLlmClient::new(),
            MockChannel::new(),
        );

        let outcome = pipeline.handle_inbound(&inbound("hi")).await.unwrap();

        assert_eq!(outcome.context_turns, 0);
        let requests = llm.seen_requests().await;
        assert!(requests[0].messages[0].content.contains("new conversation"));
        assert_eq!(channel.get_sent_messages().await.len(), 1);
    }

    #[tokio::test]
    async fn test_completion_failure_fails_the_turn() {
        let (pipeline, store, _llm, channel) = build(
            MockStore::new(),
            MockLlmClient::from_replies(vec![MockReply::Error("provider down".into())]),
            MockChannel::new(),
        );

        let err = pipeline.handle_inbound(&inbound("hi")).await.unwrap_err();

        assert!(matches!(err, TurnError::Completion(_)));
        // The inbound turn was already persisted; no reply exists.
        assert_eq!(store.recorded_upserts().await.len(), 1);
        assert!(channel.get_sent_messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_completion_deadline_is_enforced() {
        let llm = MockLlmClient::from_replies(vec![MockReply::Hang]);
        let pipeline = TurnPipeline::new(
            Arc::new(MockStore::new()),
            Arc::new(llm),
            Arc::new(MockChannel::new()),
            Arc::new(ClockIdGenerator),
        )
        .with_config(TurnPipelineConfig {
            turn_timeout_secs: 1,
            ..TurnPipelineConfig::default()
        });

        let err = pipeline.handle_inbound(&inbound("hi")).await.unwrap_err();
        assert!(matches!(err, TurnError::CompletionTimeout(1)));
    }

    #[tokio::test]
    async fn test_blank_completion_fails_the_turn() {
        let (pipeline, _store, _llm, channel) = build(
            MockStore::new(),
            MockLlmClient::from_replies(vec![MockReply::Text("   ".into())]),
            MockChannel::new(),
        );

        let err = pipeline.handle_inbound(&inbound("hi")).await.unwrap_err();
        assert!(matches!(err, TurnError::EmptyCompletion));
        assert!(channel.get_sent_messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_delivery_failure_fails_the_turn_after_persisting() {
        let (pipeline, store, _llm, _channel) = build(
            MockStore::new(),
            MockLlmClient::from_replies(vec![MockReply::Text("a reply".into())]),
            MockChannel::failing(),
        );

        let err = pipeline.handle_inbound(&inbound("hi")).await.unwrap_err();

        assert!(matches!(err, TurnError::Delivery(_)));
        // Both sides of the turn are in memory even though delivery failed.
        assert_eq!(store.recorded_upserts().await.len(), 2);
    }

    #[tokio::test]
    async fn test_blank_sender_and_text_are_rejected_before_any_io() {
        let (pipeline, store, llm, channel) =
            build(MockStore::new(), MockLlmClient::new(), MockChannel::new());

        let no_sender = InboundMessage::new("wamid.x", "  ", "hello");
        assert!(matches!(
            pipeline.handle_inbound(&no_sender).await,
            Err(TurnError::InvalidEvent(_))
        ));

        let no_text = InboundMessage::new("wamid.y", SENDER, "   ");
        assert!(matches!(
            pipeline.handle_inbound(&no_text).await,
            Err(TurnError::InvalidEvent(_))
        ));

        assert!(store.recorded_upserts().await.is_empty());
        assert!(llm.seen_requests().await.is_empty());
        assert!(channel.get_sent_messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_delivery_mints_fresh_records() {
        let (pipeline, store, _llm, channel) =
            build(MockStore::new(), MockLlmClient::new(), MockChannel::new());

        let event = inbound("same event twice");
        pipeline.handle_inbound(&event).await.unwrap();
        pipeline.handle_inbound(&event).await.unwrap();

        let upserts = store.recorded_upserts().await;
        assert_eq!(upserts.len(), 4);
        let mut ids: Vec<&str> = upserts.iter().map(|(_, r)| r.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 4);
        assert_eq!(channel.get_sent_messages().await.len(), 2);
    }

    #[tokio::test]
    async fn test_inbound_text_is_trimmed_before_persisting() {
        let (pipeline, store, llm, _channel) =
            build(MockStore::new(), MockLlmClient::new(), MockChannel::new());

        pipeline.handle_inbound(&inbound("  padded text  ")).await.unwrap();

        let upserts = store.recorded_upserts().await;
        assert_eq!(upserts[0].1.content, "padded text");
        let requests = llm.seen_requests().await;
        assert_eq!(requests[0].messages[1].content, "padded text");
    }
}
