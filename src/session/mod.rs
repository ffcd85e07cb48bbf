//! Chat session management
//!
//! This module contains the conversation data model, the session
//! controller state machine, end-of-conversation synthesis, and sentiment
//! analysis.

pub mod controller;
pub mod conversation;
pub mod sentiment;
pub mod synthesizer;

pub use controller::{SessionController, SessionState};
pub use conversation::{render_transcript, Conversation, EmotionalTone, EndScreen, Turn, TurnRole};
pub use sentiment::{Sentiment, SentimentAnalysis, SentimentAnalyzer};
pub use synthesizer::SessionSynthesizer;
