//! Command-line interface definition for Confide
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for chat, conversation history, working memory,
//! export, and system prompt management.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Confide - emotional-support chat companion
///
/// Talk through what's on your mind in brief, personal conversations.
/// Confide remembers what matters across sessions and wraps each
/// conversation up with a personalized summary.
#[derive(Parser, Debug, Clone)]
#[command(name = "confide")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: String,

    /// Override the data directory (also settable via CONFIDE_DATA_DIR)
    #[arg(long, env = "CONFIDE_DATA_DIR")]
    pub data_dir: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Confide
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Style hint for the end-of-conversation summary
        #[arg(short, long)]
        tone: Option<String>,

        /// Resume a stored conversation by id or prefix
        #[arg(short, long)]
        resume: Option<String>,
    },

    /// Manage stored conversations
    History {
        /// History subcommand
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// Inspect or clear working memory
    Memory {
        /// Memory subcommand
        #[command(subcommand)]
        command: MemoryCommand,
    },

    /// Export a conversation to a file
    Export {
        /// Conversation id or prefix
        id: String,

        /// Output format: json, text, or html
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Output file or directory (defaults to the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Manage the base system prompt
    Prompt {
        /// Prompt subcommand
        #[command(subcommand)]
        command: PromptCommand,
    },
}

/// Conversation history subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    /// List stored conversations
    List,

    /// Show a conversation transcript
    Show {
        /// Conversation id or prefix
        id: String,
    },

    /// Delete a conversation
    Delete {
        /// Conversation id or prefix
        id: String,
    },

    /// Delete all conversations and working memory
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

/// Working memory subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum MemoryCommand {
    /// Show what the companion remembers
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Forget everything
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

/// System prompt subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum PromptCommand {
    /// Show the effective base prompt
    Show,

    /// Replace the base prompt with the contents of a file
    Set {
        /// File holding the replacement prompt
        file: PathBuf,
    },

    /// Restore the default base prompt
    Reset,
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
