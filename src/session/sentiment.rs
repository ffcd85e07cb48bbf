//! Conversation sentiment analysis
//!
//! Classifies the dominant emotional tone of a conversation into one of
//! four classes with a confidence score and a one-line summary. Sentiment
//! is an optional overlay on the chat session: conversations that are too
//! short are skipped, and a model reply naming an unknown class degrades
//! to "no reading" rather than an error.

use crate::error::{ConfideError, Result};
use crate::providers::{ChatMessage, CompletionParams, Provider};
use crate::session::{render_transcript, Turn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Minimum turns before sentiment is worth reading
const MIN_TURNS_FOR_SENTIMENT: usize = 2;

/// Sentiment classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Mixed,
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positive => write!(f, "positive"),
            Self::Negative => write!(f, "negative"),
            Self::Neutral => write!(f, "neutral"),
            Self::Mixed => write!(f, "mixed"),
        }
    }
}

/// A sentiment reading for a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentAnalysis {
    /// Dominant sentiment class
    pub sentiment: Sentiment,
    /// Model confidence in the classification (0.0 to 1.0)
    pub confidence: f32,
    /// One-line summary of the emotional tone
    pub summary: String,
}

/// Classifies conversation sentiment
pub struct SentimentAnalyzer {
    provider: Arc<dyn Provider>,
    temperature: f32,
    timeout: Duration,
}

impl SentimentAnalyzer {
    /// Create a new analyzer
    ///
    /// # Arguments
    ///
    /// * `provider` - Model provider
    /// * `temperature` - Sampling temperature (kept low: classification task)
    /// * `timeout` - Upper bound on the model call
    pub fn new(provider: Arc<dyn Provider>, temperature: f32, timeout: Duration) -> Self {
        Self {
            provider,
            temperature,
            timeout,
        }
    }

    /// Analyze the sentiment of a conversation
    ///
    /// # Arguments
    ///
    /// * `turns` - The conversation turns
    ///
    /// # Returns
    ///
    /// Returns `None` when the conversation is too short for a meaningful
    /// reading or when the model output does not fit the expected shape
    ///
    /// # Errors
    ///
    /// Returns `ConfideError::Provider` only on transport failure or
    /// timeout; shape problems degrade to `None`
    pub async fn analyze(&self, turns: &[Turn]) -> Result<Option<SentimentAnalysis>> {
        if turns.len() < MIN_TURNS_FOR_SENTIMENT {
            return Ok(None);
        }

        let prompt = build_sentiment_prompt(turns);
        let messages = vec![
            ChatMessage::system(
                "You are an expert at analyzing emotional sentiment in conversations. \
                 Always output valid JSON with exactly one of the four sentiment values: \
                 positive, negative, neutral, or mixed.",
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
            ConfideError::Provider(format!(
                "Sentiment analysis timed out after {} seconds",
                self.timeout.as_secs()
            ))
        })??;

        match serde_json::from_str::<SentimentAnalysis>(&response) {
            Ok(mut analysis) => {
                analysis.confidence = analysis.confidence.clamp(0.0, 1.0);
                Ok(Some(analysis))
            }
            Err(e) => {
                tracing::warn!("Sentiment output did not fit the expected shape: {}", e);
                Ok(None)
            }
        }
    }
}

/// Build the classification instruction for a transcript
fn build_sentiment_prompt(turns: &[Turn]) -> String {
    let transcript = render_transcript(turns);

    format!(
        "Analyze the emotional sentiment of this conversation and classify it into exactly ONE of these four categories: positive, negative, neutral, or mixed.\n\
         \n\
         CONVERSATION:\n\
         {transcript}\n\
         \n\
         Consider the overall emotional tone of the conversation, especially the user's messages. Look for:\n\
         - Positive: joy, excitement, gratitude, relief, accomplishment, hope\n\
         - Negative: sadness, disappointment, grief, loneliness, worry, anxiety, frustration\n\
         - Neutral: matter-of-fact sharing without a strong emotional charge\n\
         - Mixed: clearly competing emotions, e.g. grief threaded with gratitude\n\
         \n\
         Respond with ONLY a JSON object in this exact format:\n\
         {{\n\
         \x20 \"sentiment\": \"positive\" | \"negative\" | \"neutral\" | \"mixed\",\n\
         \x20 \"confidence\": 0.0,\n\
         \x20 \"summary\": \"One short sentence describing the emotional tone\"\n\
         }}\n\
         \n\
         Choose the sentiment that best represents the dominant emotional tone of the conversation."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::FragmentStream;
    use async_trait::async_trait;

    struct FixedProvider {
        payload: std::result::Result<String, String>,
    }

    impl FixedProvider {
        fn ok(payload: &str) -> Self {
            Self {
                payload: Ok(payload.to_string()),
            }
        }

        fn err(message: &str) -> Self {
            Self {
                payload: Err(message.to_string()),
            }
        }
    }

    #[async_trait]
    impl Provider for FixedProvider {
        async fn complete(
            &self,
            _messages: &[ChatMessage],
            _params: &CompletionParams,
        ) -> Result<String> {
            match &self.payload {
                Ok(payload) => Ok(payload.clone()),
                Err(message) => Err(ConfideError::Provider(message.clone()).into()),
            }
        }

        async fn complete_streaming(
            &self,
            _messages: &[ChatMessage],
            _params: &CompletionParams,
        ) -> Result<FragmentStream> {
            Ok(FragmentStream::from_fragments(vec![]))
        }
    }

    fn analyzer(provider: FixedProvider) -> SentimentAnalyzer {
        SentimentAnalyzer::new(Arc::new(provider), 0.3, Duration::from_secs(5))
    }

    fn sample_turns() -> Vec<Turn> {
        vec![
            Turn::assistant("What's on your mind?"),
            Turn::user("I got the promotion but I'm terrified of the new role"),
        ]
    }

    #[tokio::test]
    async fn test_analyze_parses_reading() {
        let analyzer = analyzer(FixedProvider::ok(
            r#"{"sentiment":"mixed","confidence":0.85,"summary":"Pride tangled with fear about the new role."}"#,
        ));

        let analysis = analyzer.analyze(&sample_turns()).await.unwrap().unwrap();
        assert_eq!(analysis.sentiment, Sentiment::Mixed);
        assert_eq!(analysis.confidence, 0.85);
        assert!(analysis.summary.contains("Pride"));
    }

    #[tokio::test]
    async fn test_analyze_skips_short_conversations() {
        let analyzer = analyzer(FixedProvider::ok(
            r#"{"sentiment":"neutral","confidence":0.5,"summary":"n/a"}"#,
        ));

        let turns = vec![Turn::assistant("What's on your mind?")];
        assert!(analyzer.analyze(&turns).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_analyze_unknown_class_degrades_to_none() {
        let analyzer = analyzer(FixedProvider::ok(
            r#"{"sentiment":"jubilant","confidence":0.9,"summary":"?"}"#,
        ));

        assert!(analyzer.analyze(&sample_turns()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_analyze_malformed_output_degrades_to_none() {
        let analyzer = analyzer(FixedProvider::ok("The mood seems upbeat."));
        assert!(analyzer.analyze(&sample_turns()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_analyze_clamps_confidence() {
        let analyzer = analyzer(FixedProvider::ok(
            r#"{"sentiment":"positive","confidence":1.7,"summary":"Very upbeat."}"#,
        ));

        let analysis = analyzer.analyze(&sample_turns()).await.unwrap().unwrap();
        assert_eq!(analysis.confidence, 1.0);
    }

    #[tokio::test]
    async fn test_analyze_transport_failure_propagates() {
        let analyzer = analyzer(FixedProvider::err("gateway timeout"));
        assert!(analyzer.analyze(&sample_turns()).await.is_err());
    }

    #[test]
    fn test_sentiment_display() {
        assert_eq!(Sentiment::Positive.to_string(), "positive");
        assert_eq!(Sentiment::Mixed.to_string(), "mixed");
    }

    #[test]
    fn test_prompt_lists_four_classes() {
        let prompt = build_sentiment_prompt(&sample_turns());
        for class in ["positive", "negative", "neutral", "mixed"] {
            assert!(prompt.contains(class));
        }
    }
}
