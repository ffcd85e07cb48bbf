//! Shared helpers for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use confide::error::{ConfideError, Result};
use confide::providers::{ChatMessage, CompletionParams, FragmentStream, Provider};
use confide::storage::{KvStore, SledStore, StorageKeys};
use std::sync::Arc;
use tempfile::TempDir;

/// Create a sled store in a temporary directory
///
/// The TempDir must be kept alive for the duration of the test.
pub fn create_temp_storage() -> (Arc<dyn KvStore>, StorageKeys, TempDir) {
    let dir = TempDir::new().expect("create temp dir");
    let store = SledStore::open_at(dir.path().join("store")).expect("open store");
    (Arc::new(store), StorageKeys::default(), dir)
}

/// A valid synthesis payload
pub const SYNTHESIS_PAYLOAD: &str = r#"{
    "validation": "You gave words to something heavy today.",
    "reflection": "You looked at where the tiredness is really coming from.",
    "themes": ["rest", "expectations"],
    "encouragement": "I'm here whenever you want to pick this back up.",
    "key_moment": "Admitting the weekends stopped feeling restful.",
    "emotional_tone": "calm",
    "suggested_next_step": "Notice what actually recharges you this week."
}"#;

/// A valid extraction payload
pub const EXTRACTION_PAYLOAD: &str =
    r#"{"facts":["works night shifts"],"preferences":["recharges alone"],"topics":["burnout"]}"#;

/// Scripted mock provider for session flows
///
/// Chat turns stream the configured fragments (optionally failing after
/// the first one); synthesis and extraction calls are told apart by their
/// system messages, so the concurrent done-flow resolves deterministically.
pub struct MockProvider {
    pub fragments: Vec<String>,
    pub fail_stream_after_first: bool,
    pub synthesis: std::result::Result<String, String>,
    pub extraction: std::result::Result<String, String>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            fragments: vec!["Hel".to_string(), "lo ".to_string(), "there".to_string()],
            fail_stream_after_first: false,
            synthesis: Ok(SYNTHESIS_PAYLOAD.to_string()),
            extraction: Ok(EXTRACTION_PAYLOAD.to_string()),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
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
        if self.fail_stream_after_first {
            let (tx, stream) = FragmentStream::channel();
            let first = self.fragments.first().cloned().unwrap_or_default();
            tx.send(Ok(first)).await.expect("send first fragment");
            tx.send(Err(
                ConfideError::Provider("connection reset".to_string()).into()
            ))
            .await
            .expect("send stream error");
            drop(tx);
            Ok(stream)
        } else {
            Ok(FragmentStream::from_fragments(self.fragments.clone()))
        }
    }
}
