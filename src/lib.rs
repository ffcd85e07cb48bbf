//! Confide - emotional-support chat companion library
//!
//! This library provides the core functionality for the Confide chat
//! companion: streamed conversations with a model provider, a persisted
//! working memory about the user, and end-of-conversation synthesis.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `session`: Conversation model, session controller, synthesis, sentiment
//! - `memory`: Working memory store and the extractor that feeds it
//! - `providers`: Model provider abstraction and OpenAI-compatible client
//! - `prompts`: Default system prompt and memory-aware prompt composition
//! - `storage`: Key-value persistence for conversations, memory, and prompt
//! - `export`: Conversation export formats
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use confide::config::Config;
//! use confide::providers::create_provider;
//! use confide::session::SessionController;
//! use confide::storage::{MemoryKv, StorageKeys};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml")?;
//!     config.validate()?;
//!
//!     let provider = Arc::from(create_provider(&config.provider)?);
//!     let mut controller = SessionController::new(
//!         provider,
//!         Arc::new(MemoryKv::new()),
//!         &StorageKeys::default(),
//!         config.session,
//!     );
//!
//!     controller
//!         .send_message("I had a long day", |fragment| print!("{}", fragment))
//!         .await?;
//!     let end_screen = controller.done().await?;
//!     println!("{}", end_screen.validation);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod export;
pub mod memory;
pub mod prompts;
pub mod providers;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use error::{ConfideError, Result};
pub use memory::{MemoryDelta, MemoryStore, WorkingMemory};
pub use session::{Conversation, EndScreen, SessionController, SessionState, Turn, TurnRole};

#[cfg(test)]
pub mod test_utils;
