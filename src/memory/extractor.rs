//! Memory extraction from completed conversations
//!
//! The extractor asks the model for genuinely new facts, preferences, and
//! topics that are absent from existing memory. It is best-effort by
//! design: failures surface as `ConfideError::Extraction` and the caller
//! treats them as non-fatal, so a bad extraction can never block the
//! user-visible conversation flow. The extractor returns a delta and never
//! mutates the memory store itself.

use crate::error::{ConfideError, Result};
use crate::memory::{MemoryDelta, WorkingMemory};
use crate::providers::{ChatMessage, CompletionParams, Provider};
use crate::session::{render_transcript, Turn};
use std::sync::Arc;
use std::time::Duration;

/// Extracts new memory entries from a conversation transcript
pub struct MemoryExtractor {
    provider: Arc<dyn Provider>,
    temperature: f32,
    timeout: Duration,
}

impl MemoryExtractor {
    /// Create a new extractor
    ///
    /// # Arguments
    ///
    /// * `provider` - Model provider
    /// * `temperature` - Sampling temperature (kept low: factual task)
    /// * `timeout` - Upper bound on the model call
    pub fn new(provider: Arc<dyn Provider>, temperature: f32, timeout: Duration) -> Self {
        Self {
            provider,
            temperature,
            timeout,
        }
    }

    /// Extract new memory entries from a transcript
    ///
    /// # Arguments
    ///
    /// * `turns` - The conversation turns
    /// * `existing` - Current working memory, so the model only proposes
    ///   entries not already present
    ///
    /// # Returns
    ///
    /// Returns a delta of candidate new entries; all collections may be
    /// empty when the conversation held nothing new
    ///
    /// # Errors
    ///
    /// Returns `ConfideError::Extraction` on transport failure, timeout,
    /// or malformed model output. Callers treat this as non-fatal.
    pub async fn extract(
        &self,
        turns: &[Turn],
        existing: &WorkingMemory,
    ) -> Result<MemoryDelta> {
        let prompt = build_extraction_prompt(turns, existing)?;
        let messages = vec![
            ChatMessage::system(
                "You are an expert at extracting and organizing personal information \
                 from conversations. Always output valid JSON.",
            ),
            ChatMessage::user(prompt),
        ];
        let params = CompletionParams::new(self.temperature).with_json_mode();

        let response = tokio::time::timeout(
            self.timeout,
            self.provider.complete(&messages, &params),
        )
        .await
        .map_err(|_| {
            ConfideError::Extraction(format!(
                "Timed out after {} seconds",
                self.timeout.as_secs()
            ))
        })?
        .map_err(|e| ConfideError::Extraction(e.to_string()))?;

        let delta: MemoryDelta = serde_json::from_str(&response)
            .map_err(|e| ConfideError::Extraction(format!("Output is not a valid delta: {}", e)))?;

        tracing::debug!(
            "Extracted {} facts, {} preferences, {} topics",
            delta.facts.len(),
            delta.preferences.len(),
            delta.topics.len()
        );

        Ok(delta)
    }
}

/// Build the extraction instruction for a transcript and existing memory
fn build_extraction_prompt(turns: &[Turn], existing: &WorkingMemory) -> Result<String> {
    let transcript = render_transcript(turns);
    let existing_json = serde_json::to_string_pretty(existing)?;

    Ok(format!(
        "You are analyzing a conversation to extract key information about the user for future conversations.\n\
         \n\
         CONVERSATION TRANSCRIPT:\n\
         {transcript}\n\
         \n\
         EXISTING MEMORY:\n\
         {existing_json}\n\
         \n\
         Extract and return ONLY NEW information that isn't already in the existing memory:\n\
         \n\
         {{\n\
         \x20 \"facts\": [\"fact1\", \"fact2\"],\n\
         \x20 \"preferences\": [\"preference1\", \"preference2\"],\n\
         \x20 \"topics\": [\"topic1\", \"topic2\"]\n\
         }}\n\
         \n\
         GUIDELINES:\n\
         - Facts: Concrete information about the user (job, location, relationships, hobbies, etc.)\n\
         - Preferences: What they like/dislike, values, how they prefer to handle things\n\
         - Topics: Main themes discussed (work stress, anxiety, relationships, health, etc.)\n\
         - Keep items concise (5-10 words max each)\n\
         - Only extract meaningful, relevant information\n\
         - Don't include generic statements\n\
         - Don't duplicate what's already in existing memory\n\
         - If nothing new, return empty arrays\n\
         \n\
         Output ONLY valid JSON, no other text."
    ))
}
