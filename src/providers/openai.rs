//! OpenAI-compatible provider implementation for Confide
//!
//! This module implements the Provider trait against an OpenAI-compatible
//! `/chat/completions` endpoint, supporting both JSON-object completions
//! (used for extraction, synthesis, and sentiment) and SSE streaming
//! (used for conversational turns).

use crate::config::OpenAiConfig;
use crate::error::{ConfideError, Result};
use crate::providers::{ChatMessage, CompletionParams, FragmentStream, Provider};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// OpenAI-compatible API provider
///
/// Connects to any server exposing the OpenAI chat-completions API. The
/// API key is read from the environment variable named in the config,
/// which keeps credentials out of config files.
///
/// # Examples
///
/// ```no_run
/// use confide::config::OpenAiConfig;
/// use confide::providers::OpenAiProvider;
///
/// let config = OpenAiConfig::default();
/// let provider = OpenAiProvider::new(config);
/// ```
#[derive(Debug)]
pub struct OpenAiProvider {
    client: Client,
    api_base: Url,
    api_key: String,
    model: String,
}

/// Request structure for the chat-completions endpoint
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

/// Response format selector (`{"type": "json_object"}`)
#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

impl ResponseFormat {
    fn json_object() -> Self {
        Self {
            format_type: "json_object".to_string(),
        }
    }
}

/// Response structure from the chat-completions endpoint
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<CompletionChoice>,
}

/// A single completion choice
#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

/// Message payload within a completion choice
#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// A streamed chunk from the chat-completions endpoint
#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    choices: Vec<ChunkChoice>,
}

/// A single choice within a streamed chunk
#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
}

/// Incremental content within a streamed choice
#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiProvider {
    /// Create a new provider instance
    ///
    /// # Arguments
    ///
    /// * `config` - Endpoint configuration (base URL, model, API key env var)
    ///
    /// # Returns
    ///
    /// Returns a new OpenAiProvider instance
    ///
    /// # Errors
    ///
    /// Returns `ConfideError::Config` if the base URL is invalid,
    /// `ConfideError::MissingCredentials` if the API key environment
    /// variable is unset, or `ConfideError::Provider` if HTTP client
    /// initialization fails
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let api_base = Url::parse(&config.api_base)
            .map_err(|e| ConfideError::Config(format!("Invalid api_base: {}", e)))?;

        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            ConfideError::MissingCredentials(format!(
                "{} is not set in the environment",
                config.api_key_env
            ))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent("confide/0.1.0")
            .build()
            .map_err(|e| ConfideError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Initialized OpenAI-compatible provider: base={}, model={}",
            config.api_base,
            config.model
        );

        Ok(Self {
            client,
            api_base,
            api_key,
            model: config.model,
        })
    }

    /// Get the configured model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the chat-completions endpoint URL
    fn completions_url(&self) -> String {
        let base = self.api_base.as_str().trim_end_matches('/');
        format!("{}/chat/completions", base)
    }

    /// Build the request body for a completion call
    fn build_request(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
        stream: bool,
    ) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
            temperature: params.temperature,
            stream,
            max_tokens: params.max_output_tokens,
            response_format: params.json_mode.then(ResponseFormat::json_object),
        }
    }

    /// Issue a request and fail on a non-success status
    async fn send_request(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| ConfideError::Provider(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConfideError::Provider(format!(
                "API returned {}: {}",
                status,
                truncate_body(&body)
            ))
            .into());
        }

        Ok(response)
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
    ) -> Result<String> {
        let request = self.build_request(messages, params, false);
        let response = self.send_request(&request).await?;

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ConfideError::MalformedOutput(format!("Invalid response body: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                ConfideError::MalformedOutput("Response contained no content".to_string()).into()
            })
    }

    async fn complete_streaming(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
    ) -> Result<FragmentStream> {
        let request = self.build_request(messages, params, true);
        let response = self.send_request(&request).await?;

        let (tx, stream) = FragmentStream::channel();

        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk) = byte_stream.next().await {
                let chunk = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ConfideError::Provider(format!(
                                "Stream interrupted: {}",
                                e
                            ))
                            .into()))
                            .await;
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&chunk));

                // Process complete SSE lines; a partial line stays buffered
                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim().to_string();
                    buffer.drain(..=line_end);

                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };

                    if data == "[DONE]" {
                        return;
                    }

                    let fragment = match serde_json::from_str::<ChatCompletionChunk>(data) {
                        Ok(chunk) => chunk
                            .choices
                            .into_iter()
                            .next()
                            .and_then(|choice| choice.delta.content),
                        Err(e) => {
                            tracing::warn!("Skipping unparseable stream chunk: {}", e);
                            None
                        }
                    };

                    if let Some(fragment) = fragment {
                        if !fragment.is_empty() && tx.send(Ok(fragment)).await.is_err() {
                            // Consumer dropped the stream: abandon the read
                            tracing::debug!("Fragment stream cancelled by consumer");
                            return;
                        }
                    }
                }
            }
        });

        Ok(stream)
    }
}

/// Truncate an error body so provider failures stay readable in logs
fn truncate_body(body: &str) -> String {
    const MAX_LEN: usize = 200;
    if body.len() <= MAX_LEN {
        body.to_string()
    } else {
        let mut truncated: String = body.chars().take(MAX_LEN).collect();
        truncated.push_str("...");
        truncated
    }
}
