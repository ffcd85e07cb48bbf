//! Conversation session orchestration
//!
//! The controller owns the active conversation and drives the per-turn
//! flow: append the user turn, compose the effective system prompt from
//! stored memory, stream the assistant reply, and persist exactly one
//! snapshot when the stream completes. The done action runs synthesis and
//! memory extraction concurrently; synthesis failure aborts the wrap-up
//! while extraction failure only costs new memory entries.

use crate::config::SessionConfig;
use crate::error::{ConfideError, Result};
use crate::memory::{MemoryExtractor, MemoryStore};
use crate::prompts::{compose_system_prompt, DEFAULT_SYSTEM_PROMPT};
use crate::providers::{ChatMessage, CompletionParams, Provider};
use crate::session::{Conversation, EndScreen, SessionSynthesizer, TurnRole};
use crate::storage::{ConversationStore, KvStore, PromptStore, StorageKeys};
use std::sync::Arc;
use std::time::Duration;

/// Working memory is unscoped to real identity; see DESIGN.md
const DEFAULT_USER_ID: &str = "default";

/// Lifecycle of a chat session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No conversation yet
    Idle,
    /// Conversation in progress
    Active,
    /// Wrap-up calls in flight
    Synthesizing,
    /// Conversation wrapped up; artifact attached and immutable
    Closed,
}

/// Orchestrates a single chat session over one conversation
///
/// One model call is outstanding at a time: the busy flag makes `send` and
/// `done` mutually exclusive while either is in flight.
pub struct SessionController {
    provider: Arc<dyn Provider>,
    conversations: ConversationStore,
    memory: MemoryStore,
    prompts: PromptStore,
    synthesizer: SessionSynthesizer,
    extractor: MemoryExtractor,
    config: SessionConfig,
    conversation: Option<Conversation>,
    state: SessionState,
    busy: bool,
}

impl SessionController {
    /// Create a controller over the given provider and storage backend
    ///
    /// # Arguments
    ///
    /// * `provider` - Model provider shared by chat, synthesis, and extraction
    /// * `kv` - Key-value persistence backend
    /// * `keys` - Logical storage keys
    /// * `config` - Session behavior configuration
    pub fn new(
        provider: Arc<dyn Provider>,
        kv: Arc<dyn KvStore>,
        keys: &StorageKeys,
        config: SessionConfig,
    ) -> Self {
        let timeout = Duration::from_secs(config.request_timeout_seconds);
        let synthesizer =
            SessionSynthesizer::new(Arc::clone(&provider), config.synthesis_temperature, timeout);
        let extractor =
            MemoryExtractor::new(Arc::clone(&provider), config.extraction_temperature, timeout);

        Self {
            provider,
            conversations: ConversationStore::new(Arc::clone(&kv), keys),
            memory: MemoryStore::new(Arc::clone(&kv), keys, DEFAULT_USER_ID),
            prompts: PromptStore::new(kv, keys, DEFAULT_SYSTEM_PROMPT),
            synthesizer,
            extractor,
            config,
            conversation: None,
            state: SessionState::Idle,
            busy: false,
        }
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The active conversation, if any
    pub fn conversation(&self) -> Option<&Conversation> {
        self.conversation.as_ref()
    }

    /// The conversation store (for listing and deletion commands)
    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    /// The memory store (for show and clear commands)
    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    /// The prompt store (for show, set, and reset commands)
    pub fn prompts(&self) -> &PromptStore {
        &self.prompts
    }

    /// Start a fresh conversation seeded with the greeting turn
    ///
    /// # Returns
    ///
    /// Returns a reference to the new conversation
    ///
    /// # Errors
    ///
    /// Returns `ConfideError::Session` while a model call is in flight
    pub fn start_new(&mut self) -> Result<&Conversation> {
        self.ensure_not_busy()?;
        let conversation = Conversation::new(&self.config.greeting);
        tracing::info!("Started conversation {}", conversation.id);
        self.conversation = Some(conversation);
        self.state = SessionState::Active;
        Ok(self.conversation.as_ref().expect("conversation just set"))
    }

    /// Resume a stored conversation by id or unambiguous prefix
    ///
    /// A wrapped-up conversation resumes as `Closed`: it can be viewed and
    /// exported, but its artifact is immutable and it accepts no turns.
    ///
    /// # Arguments
    ///
    /// * `id` - Conversation id or prefix
    ///
    /// # Errors
    ///
    /// Returns `ConfideError::Session` if the id matches nothing
    pub fn resume(&mut self, id: &str) -> Result<&Conversation> {
        self.ensure_not_busy()?;
        let conversation = self.conversations.get(id).ok_or_else(|| {
            ConfideError::Session(format!("No conversation matches '{}'", id))
        })?;

        self.state = if conversation.is_closed() {
            SessionState::Closed
        } else {
            SessionState::Active
        };
        tracing::info!("Resumed conversation {}", conversation.id);
        self.conversation = Some(conversation);
        Ok(self.conversation.as_ref().expect("conversation just set"))
    }

    /// Send a user message and stream the assistant reply
    ///
    /// Creates the conversation on first use. Fragments are delivered to
    /// `on_fragment` in strict arrival order; the assistant turn is
    /// provisional until the stream completes, at which point exactly one
    /// persistence write occurs. An interrupted stream persists nothing.
    ///
    /// # Arguments
    ///
    /// * `content` - The user message
    /// * `on_fragment` - Called for each reply fragment as it arrives
    ///
    /// # Errors
    ///
    /// Returns `ConfideError::Session` when busy or closed and
    /// `ConfideError::Provider` when the model call or stream fails
    pub async fn send_message(
        &mut self,
        content: &str,
        mut on_fragment: impl FnMut(&str),
    ) -> Result<()> {
        self.ensure_not_busy()?;
        if self.state == SessionState::Closed {
            return Err(ConfideError::Session(
                "This conversation is wrapped up; start a new one to keep talking".to_string(),
            )
            .into());
        }

        if self.conversation.is_none() {
            self.start_new()?;
        }

        let conversation = self.conversation.as_mut().expect("conversation ensured");
        conversation.push_user(content);

        // Compose the effective system prompt from stored memory
        let base_prompt = self.prompts.current();
        let memory = self.memory.read();
        let system_prompt = compose_system_prompt(&base_prompt, &memory);

        let mut messages = Vec::with_capacity(conversation.messages.len() + 1);
        messages.push(ChatMessage::system(system_prompt));
        messages.extend(conversation.messages.iter().map(|turn| match turn.role {
            TurnRole::User => ChatMessage::user(&turn.content),
            TurnRole::Assistant => ChatMessage::assistant(&turn.content),
        }));

        let params = CompletionParams::new(self.config.chat_temperature)
            .with_max_output_tokens(self.config.max_response_tokens);

        self.busy = true;
        let reply = self.stream_reply(&messages, &params, &mut on_fragment).await;
        self.busy = false;

        let reply = reply?;

        let conversation = self.conversation.as_mut().expect("conversation ensured");
        conversation.push_assistant(reply);
        self.conversations.save(conversation)?;

        Ok(())
    }

    /// Drain the fragment stream into the full reply text
    ///
    /// On interruption the partial content is discarded, never persisted.
    async fn stream_reply(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
        on_fragment: &mut impl FnMut(&str),
    ) -> Result<String> {
        let mut stream = self.provider.complete_streaming(messages, params).await?;
        let mut reply = String::new();

        while let Some(fragment) = stream.next_fragment().await {
            match fragment {
                Ok(fragment) => {
                    on_fragment(&fragment);
                    reply.push_str(&fragment);
                }
                Err(e) => {
                    tracing::warn!("Discarding partial reply after stream failure");
                    return Err(e);
                }
            }
        }

        if reply.is_empty() {
            return Err(
                ConfideError::Provider("Stream ended without any content".to_string()).into(),
            );
        }

        Ok(reply)
    }

    /// Wrap up the conversation
    ///
    /// Runs synthesis and memory extraction concurrently. Synthesis
    /// failure aborts the wrap-up and returns the session to `Active`.
    /// Extraction failure is logged and swallowed: the end screen still
    /// appears, working memory simply gains nothing this round.
    ///
    /// # Returns
    ///
    /// Returns the end-of-conversation artifact
    ///
    /// # Errors
    ///
    /// - `ConfideError::EmptyConversation` when there are no turns
    /// - `ConfideError::Session` when busy or already closed
    /// - `ConfideError::Synthesis` when the summary cannot be produced
    pub async fn done(&mut self) -> Result<EndScreen> {
        self.ensure_not_busy()?;
        if self.state == SessionState::Closed {
            return Err(ConfideError::Session(
                "This conversation is already wrapped up".to_string(),
            )
            .into());
        }

        let Some(conversation) = self.conversation.as_ref() else {
            return Err(ConfideError::EmptyConversation.into());
        };
        if conversation.is_empty() {
            return Err(ConfideError::EmptyConversation.into());
        }

        let turns = conversation.messages.clone();
        let existing_memory = self.memory.read();

        self.state = SessionState::Synthesizing;
        self.busy = true;

        // Independent calls: neither depends on the other's result
        let (synthesis, extraction) = tokio::join!(
            self.synthesizer.synthesize(&turns, &self.config.tone),
            self.extractor.extract(&turns, &existing_memory),
        );

        self.busy = false;

        let end_screen = match synthesis {
            Ok(end_screen) => end_screen,
            Err(e) => {
                self.state = SessionState::Active;
                return Err(e);
            }
        };

        // Best-effort by design: a failed extraction never blocks the wrap-up
        match extraction {
            Ok(delta) if !delta.is_empty() => match self.memory.merge(&delta) {
                Ok(merged) => {
                    tracing::info!("Working memory now holds {} entries", merged.len());
                }
                Err(e) => {
                    tracing::warn!("Skipping memory update, merge failed: {}", e);
                }
            },
            Ok(_) => {
                tracing::debug!("Extraction proposed nothing new");
            }
            Err(e) => {
                tracing::warn!("Skipping memory update: {}", e);
            }
        }

        let conversation = self.conversation.as_mut().expect("conversation checked");
        conversation.attach_end_screen(end_screen.clone())?;

        if let Err(e) = self.conversations.save(conversation) {
            // Undo the attach so the user can retry the wrap-up
            conversation.end_screen = None;
            self.state = SessionState::Active;
            return Err(e);
        }

        self.state = SessionState::Closed;
        tracing::info!("Closed conversation {}", conversation.id);
        Ok(end_screen)
    }

    fn ensure_not_busy(&self) -> Result<()> {
        if self.busy {
            return Err(ConfideError::Session(
                "A request is already in flight for this conversation".to_string(),
            )
            .into());
        }
        Ok(())
    }
}
