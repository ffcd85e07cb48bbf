//! Test utilities for Confide
//!
//! This module provides common test helpers: in-memory storage setup and
//! a scripted provider that routes completions by prompt kind.

use crate::error::{ConfideError, Result};
use crate::providers::{ChatMessage, CompletionParams, FragmentStream, Provider};
use crate::storage::{KvStore, MemoryKv, StorageKeys};
use async_trait::async_trait;
use std::sync::Arc;

/// Create an isolated in-memory storage backend
///
/// # Returns
///
/// Returns the backend and default keys, independent of any other test
///
/// # Examples
///
/// ```ignore
/// use confide::test_utils::memory_backend;
///
/// let (kv, keys) = memory_backend();
/// ```
pub fn memory_backend() -> (Arc<dyn KvStore>, StorageKeys) {
    (Arc::new(MemoryKv::new()), StorageKeys::default())
}

/// A provider that scripts each kind of call independently
///
/// Chat turns stream the configured fragments; synthesis, extraction, and
/// sentiment calls are told apart by their system messages, so concurrent
/// calls resolve deterministically.
pub struct ScriptedProvider {
    /// Fragments streamed for chat turns
    pub fragments: Vec<String>,
    /// Outcome of synthesis completions
    pub synthesis: std::result::Result<String, String>,
    /// Outcome of extraction completions
    pub extraction: std::result::Result<String, String>,
    /// Outcome of sentiment completions
    pub sentiment: std::result::Result<String, String>,
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self {
            fragments: vec!["Hello".to_string()],
            synthesis: Ok(crate::test_utils::payloads::SYNTHESIS.to_string()),
            extraction: Ok(crate::test_utils::payloads::EXTRACTION.to_string()),
            sentiment: Ok(crate::test_utils::payloads::SENTIMENT.to_string()),
        }
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _params: &CompletionParams,
    ) -> Result<String> {
        let system = &messages[0].content;
        let outcome = if system.contains("end-of-conversation") {
            &self.synthesis
        } else if system.contains("extracting") {
            &self.extraction
        } else if system.contains("sentiment") {
            &self.sentiment
        } else {
            return Err(ConfideError::Provider(format!(
                "Unexpected completion prompt: {}",
                system
            ))
            .into());
        };

        match outcome {
            Ok(payload) => Ok(payload.clone()),
            Err(message) => Err(ConfideError::Provider(message.clone()).into()),
        }
    }

    async fn complete_streaming(
        &self,
        _messages: &[ChatMessage],
        _params: &CompletionParams,
    ) -> Result<FragmentStream> {
        Ok(FragmentStream::from_fragments(self.fragments.clone()))
    }
}

/// Canonical model payloads shared across tests
pub mod payloads {
    /// A valid synthesis response
    pub const SYNTHESIS: &str = r#"{
        "validation": "You gave words to something heavy today.",
        "reflection": "You looked at where the tiredness is really coming from.",
        "themes": ["rest", "expectations"],
        "encouragement": "I'm here whenever you want to pick this back up.",
        "emotional_tone": "calm"
    }"#;

    /// A valid extraction response
    pub const EXTRACTION: &str =
        r#"{"facts":["recently moved cities"],"preferences":["recharges alone"],"topics":["burnout"]}"#;

    /// A valid sentiment response
    pub const SENTIMENT: &str =
        r#"{"sentiment":"negative","confidence":0.8,"summary":"Worn down but reflective."}"#;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend_is_isolated() {
        let (a, _) = memory_backend();
        let (b, _) = memory_backend();
        a.set("k", "v").unwrap();
        assert!(b.get("k").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_scripted_provider_routes_by_prompt() {
        let provider = ScriptedProvider::default();
        let params = CompletionParams::new(0.3).with_json_mode();

        let synthesis = provider
            .complete(
                &[
                    ChatMessage::system("personalized end-of-conversation experiences"),
                    ChatMessage::user("..."),
                ],
                &params,
            )
            .await
            .unwrap();
        assert!(synthesis.contains("validation"));

        let extraction = provider
            .complete(
                &[
                    ChatMessage::system("expert at extracting personal information"),
                    ChatMessage::user("..."),
                ],
                &params,
            )
            .await
            .unwrap();
        assert!(extraction.contains("facts"));
    }

    #[tokio::test]
    async fn test_scripted_provider_rejects_unknown_prompt() {
        let provider = ScriptedProvider::default();
        let params = CompletionParams::new(0.3);
        let result = provider
            .complete(
                &[ChatMessage::system("something else"), ChatMessage::user("...")],
                &params,
            )
            .await;
        assert!(result.is_err());
    }
}
