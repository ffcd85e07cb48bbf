//! End-of-conversation synthesis
//!
//! When the user wraps up a conversation, the synthesizer asks the model
//! for a personalized seven-field summary. Unlike memory extraction this
//! IS fatal on failure: the end screen is the whole point of the done
//! action, so the caller surfaces `ConfideError::Synthesis` instead of
//! degrading silently.

use crate::error::{ConfideError, Result};
use crate::providers::{ChatMessage, CompletionParams, Provider};
use crate::session::{render_transcript, EndScreen, Turn};
use std::sync::Arc;
use std::time::Duration;

/// Bounds on the themes list the model may return
const MIN_THEMES: usize = 1;
const MAX_THEMES: usize = 5;

/// Produces the end-of-conversation artifact
pub struct SessionSynthesizer {
    provider: Arc<dyn Provider>,
    temperature: f32,
    timeout: Duration,
}

impl SessionSynthesizer {
    /// Create a new synthesizer
    ///
    /// # Arguments
    ///
    /// * `provider` - Model provider
    /// * `temperature` - Sampling temperature (kept high so phrasing does
    ///   not repeat across conversations)
    /// * `timeout` - Upper bound on the model call
    pub fn new(provider: Arc<dyn Provider>, temperature: f32, timeout: Duration) -> Self {
        Self {
            provider,
            temperature,
            timeout,
        }
    }

    /// Synthesize the end-of-conversation artifact
    ///
    /// # Arguments
    ///
    /// * `turns` - The completed conversation
    /// * `tone` - Style hint for the summary (e.g. "warm and supportive")
    ///
    /// # Returns
    ///
    /// Returns a validated `EndScreen`
    ///
    /// # Errors
    ///
    /// Returns `ConfideError::Synthesis` on transport failure, timeout,
    /// malformed output, or output that fails field validation
    pub async fn synthesize(&self, turns: &[Turn], tone: &str) -> Result<EndScreen> {
        let prompt = build_synthesis_prompt(turns, tone);
        let messages = vec![
            ChatMessage::system(
                "You are an expert at creating emotionally resonant, personalized \
                 end-of-conversation experiences. Always output valid JSON.",
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
            ConfideError::Synthesis(format!(
                "Timed out after {} seconds",
                self.timeout.as_secs()
            ))
        })?
        .map_err(|e| ConfideError::Synthesis(e.to_string()))?;

        let end_screen: EndScreen = serde_json::from_str(&response).map_err(|e| {
            ConfideError::Synthesis(format!("Output is not a valid end screen: {}", e))
        })?;

        validate_end_screen(&end_screen)?;

        tracing::debug!(
            "Synthesized end screen: tone={}, {} themes",
            end_screen.emotional_tone,
            end_screen.themes.len()
        );

        Ok(end_screen)
    }
}

/// Check the decoded artifact against the contract
///
/// The serde decode already enforces required fields and the closed
/// emotional-tone set; this rejects blank required text and out-of-range
/// theme counts.
fn validate_end_screen(end_screen: &EndScreen) -> Result<()> {
    for (field, value) in [
        ("validation", &end_screen.validation),
        ("reflection", &end_screen.reflection),
        ("encouragement", &end_screen.encouragement),
    ] {
        if value.trim().is_empty() {
            return Err(ConfideError::Synthesis(format!("Field '{}' is empty", field)).into());
        }
    }

    let themes = end_screen.themes.len();
    if !(MIN_THEMES..=MAX_THEMES).contains(&themes) {
        return Err(ConfideError::Synthesis(format!(
            "Expected {} to {} themes, got {}",
            MIN_THEMES, MAX_THEMES, themes
        ))
        .into());
    }

    Ok(())
}

/// Build the synthesis instruction for a transcript and tone
fn build_synthesis_prompt(turns: &[Turn], tone: &str) -> String {
    let transcript = render_transcript(turns);

    format!(
        "You are analyzing a conversation from an emotional support companion. The user just chose to end their conversation.\n\
         \n\
         Your task is to create a personalized end-of-conversation summary that:\n\
         1. Validates their emotional experience\n\
         2. Reflects on what was discussed\n\
         3. Encourages them to return\n\
         \n\
         CONVERSATION TRANSCRIPT:\n\
         {transcript}\n\
         \n\
         Generate a JSON response with these fields:\n\
         \n\
         {{\n\
         \x20 \"validation\": \"A warm, empathetic statement that validates what they shared (1-2 sentences)\",\n\
         \x20 \"reflection\": \"A gentle reflection on the conversation - what did they explore? (2-3 sentences)\",\n\
         \x20 \"themes\": [\"theme1\", \"theme2\", \"theme3\"],\n\
         \x20 \"encouragement\": \"An encouraging message that motivates them to return (1-2 sentences)\",\n\
         \x20 \"key_moment\": \"One particularly meaningful moment from the conversation (1 sentence, optional)\",\n\
         \x20 \"emotional_tone\": \"One word: calm/hopeful/relieved/understood/lighter/clearer\",\n\
         \x20 \"suggested_next_step\": \"A gentle suggestion for when they return (1 sentence, optional)\"\n\
         }}\n\
         \n\
         Style: {tone}\n\
         \n\
         IMPORTANT:\n\
         - Be genuine and specific to their conversation\n\
         - Avoid generic platitudes\n\
         - Focus on emotional relief and feeling heard\n\
         - Make it feel personal, not templated\n\
         - Output ONLY valid JSON, no other text"
    )
}
