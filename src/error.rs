//! Error types for Confide
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Confide operations
///
/// This enum encompasses all possible errors that can occur during
/// chat sessions, provider interactions, memory extraction, session
/// synthesis, and storage operations.
#[derive(Error, Debug)]
pub enum ConfideError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider-related errors (API unreachable, non-success status)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider returned success but its content does not parse as the
    /// expected structured shape, or required fields are missing
    #[error("Malformed model output: {0}")]
    MalformedOutput(String),

    /// Memory extraction failed (non-fatal: the session continues and
    /// working memory simply gains no new entries this round)
    #[error("Memory extraction failed: {0}")]
    Extraction(String),

    /// Session synthesis failed (fatal to the done action: the
    /// conversation stays active and the failure is surfaced)
    #[error("Session synthesis failed: {0}")]
    Synthesis(String),

    /// Conversation and memory storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Session state machine misuse (busy, closed, no active conversation)
    #[error("Session error: {0}")]
    Session(String),

    /// The done action was requested on a conversation with no turns
    #[error("Nothing to wrap up yet: the conversation has no messages")]
    EmptyConversation,

    /// Missing credentials for the provider
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Confide operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
