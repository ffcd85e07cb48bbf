//! Base provider trait and common types for Confide
//!
//! This module defines the Provider trait that all model providers must
//! implement, along with the message type, completion parameters, and the
//! fragment stream used for incremental chat replies.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Default buffer size for fragment stream channels
const STREAM_CHANNEL_CAPACITY: usize = 32;

/// Message structure for model conversations
///
/// Represents a message sent to the model provider. Messages can be from
/// the user, assistant, or system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (user, assistant, system)
    pub role: String,
    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    /// Creates a new user message
    ///
    /// # Arguments
    ///
    /// * `content` - The message content
    ///
    /// # Examples
    ///
    /// ```
    /// use confide::providers::ChatMessage;
    ///
    /// let msg = ChatMessage::user("Hello!");
    /// assert_eq!(msg.role, "user");
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Creates a new assistant message
    ///
    /// # Arguments
    ///
    /// * `content` - The message content
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }

    /// Creates a new system message
    ///
    /// # Arguments
    ///
    /// * `content` - The message content
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

/// Parameters for a single completion call
///
/// The provider holds the model identifier; callers control sampling
/// temperature, output length, and whether the response must be a single
/// JSON object.
#[derive(Debug, Clone)]
pub struct CompletionParams {
    /// Sampling temperature (0.0 to 1.0)
    pub temperature: f32,
    /// Maximum tokens in the completion, if bounded
    pub max_output_tokens: Option<u32>,
    /// Request a single JSON object as output
    pub json_mode: bool,
}

impl CompletionParams {
    /// Create parameters with the given temperature
    ///
    /// # Examples
    ///
    /// ```
    /// use confide::providers::CompletionParams;
    ///
    /// let params = CompletionParams::new(0.8);
    /// assert_eq!(params.temperature, 0.8);
    /// assert!(!params.json_mode);
    /// ```
    pub fn new(temperature: f32) -> Self {
        Self {
            temperature,
            max_output_tokens: None,
            json_mode: false,
        }
    }

    /// Request JSON object output
    pub fn with_json_mode(mut self) -> Self {
        self.json_mode = true;
        self
    }

    /// Bound the completion length
    ///
    /// # Arguments
    ///
    /// * `max_tokens` - Maximum tokens in the completion
    pub fn with_max_output_tokens(mut self, max_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_tokens);
        self
    }
}

/// A lazy, finite, non-restartable sequence of reply fragments
///
/// Fragments arrive in strict order through a bounded channel. The stream
/// ends when the channel closes; an `Err` item signals the stream failed
/// mid-flight and no further fragments will arrive. Dropping the stream
/// cancels the producing task: its next send fails and it stops.
pub struct FragmentStream {
    rx: mpsc::Receiver<Result<String>>,
}

impl FragmentStream {
    /// Create a channel pair for a fragment stream
    ///
    /// # Returns
    ///
    /// Returns the sender half for the producing task and the stream for
    /// the consumer
    pub fn channel() -> (mpsc::Sender<Result<String>>, Self) {
        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        (tx, Self { rx })
    }

    /// Receive the next fragment
    ///
    /// # Returns
    ///
    /// Returns `Some(Ok(fragment))` for each fragment in arrival order,
    /// `Some(Err(_))` if the stream failed, and `None` at end of stream
    pub async fn next_fragment(&mut self) -> Option<Result<String>> {
        self.rx.recv().await
    }

    /// Build a stream from fragments already in hand
    ///
    /// Useful for tests and for providers that do not stream natively.
    ///
    /// # Arguments
    ///
    /// * `fragments` - The fragments to yield, in order
    ///
    /// # Examples
    ///
    /// ```
    /// use confide::providers::FragmentStream;
    ///
    /// # tokio_test::block_on(async {
    /// let mut stream = FragmentStream::from_fragments(vec!["Hel".into(), "lo".into()]);
    /// assert_eq!(stream.next_fragment().await.unwrap().unwrap(), "Hel");
    /// assert_eq!(stream.next_fragment().await.unwrap().unwrap(), "lo");
    /// assert!(stream.next_fragment().await.is_none());
    /// # });
    /// ```
    pub fn from_fragments(fragments: Vec<String>) -> Self {
        let (tx, rx) = mpsc::channel(fragments.len().max(1));
        for fragment in fragments {
            // Capacity covers every fragment, so try_send cannot fail here
            let _ = tx.try_send(Ok(fragment));
        }
        Self { rx }
    }
}

/// Provider trait for language-model backends
///
/// A provider accepts an ordered list of role/content messages and either
/// returns the complete reply text or a stream of reply fragments. Confide
/// uses `complete` with JSON mode for extraction, synthesis, and sentiment,
/// and `complete_streaming` for conversational turns.
///
/// # Examples
///
/// ```no_run
/// use confide::providers::{ChatMessage, CompletionParams, FragmentStream, Provider};
/// use confide::error::Result;
/// use async_trait::async_trait;
///
/// struct MyProvider;
///
/// #[async_trait]
/// impl Provider for MyProvider {
///     async fn complete(
///         &self,
///         _messages: &[ChatMessage],
///         _params: &CompletionParams,
///     ) -> Result<String> {
///         Ok("Response".to_string())
///     }
///
///     async fn complete_streaming(
///         &self,
///         _messages: &[ChatMessage],
///         _params: &CompletionParams,
///     ) -> Result<FragmentStream> {
///         Ok(FragmentStream::from_fragments(vec!["Response".to_string()]))
///     }
/// }
/// ```
#[async_trait]
pub trait Provider: Send + Sync {
    /// Complete a conversation and return the full reply text
    ///
    /// # Arguments
    ///
    /// * `messages` - Ordered conversation history including the system message
    /// * `params` - Sampling and output-shape parameters
    ///
    /// # Errors
    ///
    /// Returns `ConfideError::Provider` if the API call fails and
    /// `ConfideError::MalformedOutput` if the response shape is invalid
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
    ) -> Result<String>;

    /// Complete a conversation as a stream of reply fragments
    ///
    /// The returned stream yields fragments in arrival order and ends with
    /// channel closure; errors mid-stream surface as an `Err` item.
    ///
    /// # Arguments
    ///
    /// * `messages` - Ordered conversation history including the system message
    /// * `params` - Sampling and output-shape parameters
    ///
    /// # Errors
    ///
    /// Returns `ConfideError::Provider` if the stream cannot be opened
    async fn complete_streaming(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
    ) -> Result<FragmentStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_user() {
        let msg = ChatMessage::user("Hello");
        assert_eq!(msg.role, "user");
        assert_eq!(msg.content, "Hello");
    }

    #[test]
    fn test_message_assistant() {
        let msg = ChatMessage::assistant("Hi there");
        assert_eq!(msg.role, "assistant");
        assert_eq!(msg.content, "Hi there");
    }

    #[test]
    fn test_message_system() {
        let msg = ChatMessage::system("You are supportive");
        assert_eq!(msg.role, "system");
        assert_eq!(msg.content, "You are supportive");
    }

    #[test]
    fn test_message_serialization() {
        let msg = ChatMessage::user("Test");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"role\":\"user\""));
        assert!(json.contains("\"content\":\"Test\""));
    }

    #[test]
    fn test_completion_params_new() {
        let params = CompletionParams::new(0.3);
        assert_eq!(params.temperature, 0.3);
        assert!(params.max_output_tokens.is_none());
        assert!(!params.json_mode);
    }

    #[test]
    fn test_completion_params_builders() {
        let params = CompletionParams::new(0.8)
            .with_json_mode()
            .with_max_output_tokens(200);
        assert!(params.json_mode);
        assert_eq!(params.max_output_tokens, Some(200));
    }

    #[tokio::test]
    async fn test_fragment_stream_yields_in_order() {
        let mut stream = FragmentStream::from_fragments(vec![
            "one ".to_string(),
            "two ".to_string(),
            "three".to_string(),
        ]);

        let mut collected = String::new();
        while let Some(fragment) = stream.next_fragment().await {
            collected.push_str(&fragment.unwrap());
        }
        assert_eq!(collected, "one two three");
    }

    #[tokio::test]
    async fn test_fragment_stream_empty() {
        let mut stream = FragmentStream::from_fragments(vec![]);
        assert!(stream.next_fragment().await.is_none());
    }

    #[tokio::test]
    async fn test_fragment_stream_channel_error_item() {
        let (tx, mut stream) = FragmentStream::channel();

        tx.send(Ok("partial".to_string())).await.unwrap();
        tx.send(Err(crate::error::ConfideError::Provider("connection reset".to_string()).into()))
            .await
            .unwrap();
        drop(tx);

        assert_eq!(stream.next_fragment().await.unwrap().unwrap(), "partial");
        assert!(stream.next_fragment().await.unwrap().is_err());
        assert!(stream.next_fragment().await.is_none());
    }

    #[tokio::test]
    async fn test_fragment_stream_drop_cancels_producer() {
        let (tx, stream) = FragmentStream::channel();
        drop(stream);

        // The producer observes the closed channel on its next send
        assert!(tx.send(Ok("late".to_string())).await.is_err());
    }
}
