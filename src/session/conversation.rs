//! Conversation data model and transcript rendering
//!
//! This module defines the turn and conversation structures persisted by
//! the storage layer, the end-of-conversation artifact attached when a
//! session is wrapped up, and the plain-text transcript rendering used for
//! all analysis prompts.

use crate::error::{ConfideError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Maximum length of a title derived from the first user turn
const TITLE_MAX_LEN: usize = 50;

/// Author of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// The person seeking support
    User,
    /// The companion
    Assistant,
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "User"),
            Self::Assistant => write!(f, "Assistant"),
        }
    }
}

/// One message in a conversation
///
/// Immutable once created; ordering is insertion order and defines the
/// transcript order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Who authored the turn
    pub role: TurnRole,
    /// Message text
    pub content: String,
    /// When the turn was created
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Create a user turn stamped with the current time
    ///
    /// # Arguments
    ///
    /// * `content` - The message text
    ///
    /// # Examples
    ///
    /// ```
    /// use confide::session::{Turn, TurnRole};
    ///
    /// let turn = Turn::user("I had a rough day");
    /// assert_eq!(turn.role, TurnRole::User);
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create an assistant turn stamped with the current time
    ///
    /// # Arguments
    ///
    /// * `content` - The message text
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// The emotional tone named by the end-of-conversation artifact
///
/// A closed set: model output naming any other tone fails validation
/// rather than being carried through as free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionalTone {
    Calm,
    Hopeful,
    Relieved,
    Understood,
    Lighter,
    Clearer,
}

impl fmt::Display for EmotionalTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Calm => write!(f, "calm"),
            Self::Hopeful => write!(f, "hopeful"),
            Self::Relieved => write!(f, "relieved"),
            Self::Understood => write!(f, "understood"),
            Self::Lighter => write!(f, "lighter"),
            Self::Clearer => write!(f, "clearer"),
        }
    }
}

/// End-of-conversation artifact
///
/// Produced once per conversation when the user wraps up; immutable
/// afterward and attached to the owning conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndScreen {
    /// Warm, empathetic statement validating what was shared
    pub validation: String,
    /// Gentle reflection on what the conversation explored
    pub reflection: String,
    /// Main themes of the conversation (2-4 entries)
    pub themes: Vec<String>,
    /// Encouragement to return
    pub encouragement: String,
    /// One particularly meaningful moment, when the model found one
    #[serde(default, alias = "keyMoment", skip_serializing_if = "Option::is_none")]
    pub key_moment: Option<String>,
    /// Single-word emotional tone from the closed set
    #[serde(alias = "emotionalTone")]
    pub emotional_tone: EmotionalTone,
    /// Gentle suggestion for the next visit, when the model offered one
    #[serde(
        default,
        alias = "suggestedNextStep",
        skip_serializing_if = "Option::is_none"
    )]
    pub suggested_next_step: Option<String>,
}

/// A chat conversation with its turns and optional wrap-up artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// User-facing title, seeded from the first user turn
    pub title: String,
    /// Ordered turns
    pub messages: Vec<Turn>,
    /// When the conversation was created
    pub created_at: DateTime<Utc>,
    /// When the conversation was last mutated
    pub updated_at: DateTime<Utc>,
    /// Wrap-up artifact, present once the conversation is closed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_screen: Option<EndScreen>,
}

impl Conversation {
    /// Create a new conversation seeded with an assistant greeting
    ///
    /// # Arguments
    ///
    /// * `greeting` - Opening assistant turn
    ///
    /// # Examples
    ///
    /// ```
    /// use confide::session::Conversation;
    ///
    /// let conv = Conversation::new("What's on your mind?");
    /// assert_eq!(conv.messages.len(), 1);
    /// assert_eq!(conv.title, "New Conversation");
    /// assert!(conv.end_screen.is_none());
    /// ```
    pub fn new(greeting: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: "New Conversation".to_string(),
            messages: vec![Turn::assistant(greeting)],
            created_at: now,
            updated_at: now,
            end_screen: None,
        }
    }

    /// Append a user turn
    ///
    /// The first user turn also seeds the title with a prefix of its
    /// content; the title is never recomputed afterward.
    ///
    /// # Arguments
    ///
    /// * `content` - The message text
    pub fn push_user(&mut self, content: impl Into<String>) {
        let content = content.into();
        if !self.messages.iter().any(|t| t.role == TurnRole::User) {
            self.title = title_from(&content);
        }
        self.messages.push(Turn::user(content));
        self.updated_at = Utc::now();
    }

    /// Append an assistant turn
    ///
    /// # Arguments
    ///
    /// * `content` - The message text
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Turn::assistant(content));
        self.updated_at = Utc::now();
    }

    /// Attach the end-of-conversation artifact
    ///
    /// # Arguments
    ///
    /// * `end_screen` - The artifact produced by synthesis
    ///
    /// # Errors
    ///
    /// Returns `ConfideError::Session` if an artifact is already attached;
    /// the artifact is immutable once set
    pub fn attach_end_screen(&mut self, end_screen: EndScreen) -> Result<()> {
        if self.end_screen.is_some() {
            return Err(ConfideError::Session(
                "conversation already has an end-of-conversation summary".to_string(),
            )
            .into());
        }
        self.end_screen = Some(end_screen);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Whether the conversation has been wrapped up
    pub fn is_closed(&self) -> bool {
        self.end_screen.is_some()
    }

    /// Whether the conversation has no turns at all
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Render the turns as a plain-text transcript for prompt construction
    ///
    /// Each turn becomes one role-prefixed paragraph, in insertion order.
    ///
    /// # Examples
    ///
    /// ```
    /// use confide::session::Conversation;
    ///
    /// let mut conv = Conversation::new("What's on your mind?");
    /// conv.push_user("Work has been heavy");
    /// let transcript = conv.transcript();
    /// assert!(transcript.contains("Assistant: What's on your mind?"));
    /// assert!(transcript.contains("User: Work has been heavy"));
    /// ```
    pub fn transcript(&self) -> String {
        render_transcript(&self.messages)
    }
}

/// Render a sequence of turns as a plain-text transcript
///
/// # Arguments
///
/// * `turns` - The turns to render, in order
///
/// # Returns
///
/// One role-prefixed paragraph per turn, separated by blank lines
pub fn render_transcript(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|turn| format!("{}: {}", turn.role, turn.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Derive a conversation title from the first user turn
fn title_from(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.chars().count() <= TITLE_MAX_LEN {
        trimmed.to_string()
    } else {
        trimmed.chars().take(TITLE_MAX_LEN).collect()
    }
}
