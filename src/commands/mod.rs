//! Command handlers for the Confide CLI
//!
//! Each subcommand gets a handler module. The chat handler runs the
//! interactive readline loop; the rest are one-shot operations over the
//! stores.

use crate::config::Config;
use crate::error::Result;
use crate::storage::{KvStore, SledStore, StorageKeys};
use std::sync::Arc;

/// Open the persistence backend for the configured data directory
///
/// # Arguments
///
/// * `config` - Application configuration
///
/// # Returns
///
/// Returns the key-value backend and the logical storage keys
pub fn open_backend(config: &Config) -> Result<(Arc<dyn KvStore>, StorageKeys)> {
    let store = SledStore::open(config.storage.data_dir.as_deref())?;
    Ok((Arc::new(store), StorageKeys::default()))
}

/// Read a yes/no confirmation from stdin
///
/// # Arguments
///
/// * `question` - The question to print
///
/// # Returns
///
/// Returns true when the user answered yes
fn confirm(question: &str) -> bool {
    use std::io::Write;

    print!("{} [y/N] ", question);
    let _ = std::io::stdout().flush();

    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

// Interactive chat handler
pub mod chat {
    //! Interactive chat session handler.
    //!
    //! Instantiates the provider and session controller, then runs a
    //! readline-based loop that streams replies and dispatches slash
    //! commands (/done, /new, /memory, /sentiment, /help, /exit).

    use super::*;
    use crate::providers::create_provider;
    use crate::session::{
        Conversation, EndScreen, SentimentAnalyzer, SessionController, SessionState,
    };
    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;
    use std::io::Write;
    use std::time::Duration;

    /// Slash commands recognized inside the chat loop
    #[derive(Debug, Clone, PartialEq, Eq)]
    enum SpecialCommand {
        /// Wrap up the conversation
        Done,
        /// Start a fresh conversation
        New,
        /// Show working memory
        Memory,
        /// Show a sentiment reading for the conversation so far
        Sentiment,
        /// Show help
        Help,
        /// Leave the session
        Exit,
        /// Not a special command
        None,
    }

    /// Parse a line into a special command
    fn parse_special_command(line: &str) -> SpecialCommand {
        match line.trim().to_lowercase().as_str() {
            "/done" => SpecialCommand::Done,
            "/new" => SpecialCommand::New,
            "/memory" => SpecialCommand::Memory,
            "/sentiment" => SpecialCommand::Sentiment,
            "/help" => SpecialCommand::Help,
            "/exit" | "/quit" => SpecialCommand::Exit,
            _ => SpecialCommand::None,
        }
    }

    /// Start an interactive chat session
    ///
    /// # Arguments
    ///
    /// * `config` - Application configuration (consumed)
    /// * `tone` - Optional override for the summary style hint
    /// * `resume` - Optional conversation id to resume
    pub async fn run_chat(
        mut config: Config,
        tone: Option<String>,
        resume: Option<String>,
    ) -> Result<()> {
        tracing::info!("Starting interactive chat session");

        if let Some(tone) = tone {
            config.session.tone = tone;
        }

        let provider: Arc<dyn crate::providers::Provider> =
            Arc::from(create_provider(&config.provider)?);
        let (kv, keys) = open_backend(&config)?;

        let sentiment = SentimentAnalyzer::new(
            Arc::clone(&provider),
            config.session.extraction_temperature,
            Duration::from_secs(config.session.request_timeout_seconds),
        );
        let mut controller =
            SessionController::new(provider, kv, &keys, config.session.clone());

        if let Some(id) = resume {
            let conversation = controller.resume(&id)?;
            println!("Resumed: {}\n", conversation.title.bold());
            replay_transcript(conversation);
        } else {
            print_welcome_banner(&config.session.greeting);
        }

        let mut rl = DefaultEditor::new()?;

        loop {
            match rl.readline(">> ") {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    rl.add_history_entry(trimmed)?;

                    match parse_special_command(trimmed) {
                        SpecialCommand::Done => {
                            handle_done(&mut controller).await;
                            continue;
                        }
                        SpecialCommand::New => {
                            let conversation = controller.start_new()?;
                            println!();
                            println!("{}", conversation.messages[0].content.cyan());
                            println!();
                            continue;
                        }
                        SpecialCommand::Memory => {
                            print_memory(&controller);
                            continue;
                        }
                        SpecialCommand::Sentiment => {
                            handle_sentiment(&controller, &sentiment).await;
                            continue;
                        }
                        SpecialCommand::Help => {
                            print_help();
                            continue;
                        }
                        SpecialCommand::Exit => break,
                        SpecialCommand::None => {}
                    }

                    // Regular message: stream the reply as it arrives
                    println!();
                    let result = controller
                        .send_message(trimmed, |fragment| {
                            print!("{}", fragment.cyan());
                            let _ = std::io::stdout().flush();
                        })
                        .await;
                    println!("\n");

                    if let Err(e) = result {
                        eprintln!("{}", format!("Couldn't send that: {}", e).red());
                        eprintln!(
                            "{}",
                            "Check your connection and API key, then try again.".red()
                        );
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => {
                    tracing::error!("Readline error: {}", e);
                    break;
                }
            }
        }

        println!("Take care.");
        Ok(())
    }

    /// Run the done flow and print the end screen or the failure
    async fn handle_done(controller: &mut SessionController) {
        println!("{}", "Thinking...".dimmed());
        match controller.done().await {
            Ok(end_screen) => {
                print_end_screen(&end_screen);
                println!(
                    "{}",
                    "This conversation is wrapped up. /new starts a fresh one.".dimmed()
                );
            }
            Err(e) => {
                eprintln!("{}", format!("{}", e).red());
                if controller.state() == SessionState::Active {
                    eprintln!(
                        "{}",
                        "The conversation is still open; you can keep talking or try /done again."
                            .yellow()
                    );
                }
            }
        }
    }

    /// Run sentiment analysis over the current conversation
    async fn handle_sentiment(
        controller: &SessionController,
        sentiment: &SentimentAnalyzer,
    ) {
        let Some(conversation) = controller.conversation() else {
            println!("{}", "Nothing to read yet.".dimmed());
            return;
        };

        match sentiment.analyze(&conversation.messages).await {
            Ok(Some(analysis)) => {
                let label = analysis.sentiment.to_string();
                let confidence = (analysis.confidence * 100.0).round() as u32;
                println!(
                    "{} ({}% confident) - {}",
                    label.bold(),
                    confidence,
                    analysis.summary
                );
            }
            Ok(None) => {
                println!("{}", "Not enough conversation for a reading yet.".dimmed());
            }
            Err(e) => {
                eprintln!("{}", format!("Sentiment reading failed: {}", e).red());
            }
        }
    }

    /// Print the stored turns of a resumed conversation
    fn replay_transcript(conversation: &Conversation) {
        for turn in &conversation.messages {
            match turn.role {
                crate::session::TurnRole::User => println!(">> {}", turn.content),
                crate::session::TurnRole::Assistant => {
                    println!("{}", turn.content.cyan())
                }
            }
        }
        println!();
    }

    /// Print what the companion currently remembers
    fn print_memory(controller: &SessionController) {
        let memory = controller.memory().read();
        if memory.is_empty() {
            println!("{}", "No working memory yet.".dimmed());
            return;
        }

        for (header, entries) in [
            ("Facts", &memory.facts),
            ("Preferences", &memory.preferences),
            ("Topics", &memory.topics),
        ] {
            if entries.is_empty() {
                continue;
            }
            println!("{}", header.bold());
            for entry in entries {
                println!("  - {}", entry);
            }
        }
    }

    /// Print the end-of-conversation summary
    fn print_end_screen(end_screen: &EndScreen) {
        println!();
        println!("{}", end_screen.validation.bold());
        println!();
        println!("{}", end_screen.reflection);
        println!();
        println!(
            "{} {}",
            "Themes:".bold(),
            end_screen.themes.join(", ")
        );
        if let Some(key_moment) = &end_screen.key_moment {
            println!("{} {}", "A moment that stood out:".bold(), key_moment);
        }
        println!("{} {}", "Leaving feeling:".bold(), end_screen.emotional_tone);
        if let Some(next_step) = &end_screen.suggested_next_step {
            println!("{} {}", "For next time:".bold(), next_step);
        }
        println!();
        println!("{}", end_screen.encouragement.italic());
        println!();
    }

    /// Print the welcome banner with the opening question
    fn print_welcome_banner(greeting: &str) {
        println!("{}", "confide".bold());
        println!("{}", "Type /help for commands. /done wraps up.".dimmed());
        println!();
        println!("{}", greeting.cyan());
        println!();
    }

    /// Print the command reference
    fn print_help() {
        println!("Commands:");
        println!("  /done       wrap up and get your summary");
        println!("  /new        start a fresh conversation");
        println!("  /memory     see what I remember about you");
        println!("  /sentiment  read the emotional tone so far");
        println!("  /exit       leave (your conversation is saved)");
    }

}

// Conversation history handler
pub mod history {
    //! List, show, delete, and clear stored conversations.

    use super::*;
    use crate::cli::HistoryCommand;
    use crate::memory::MemoryStore;
    use crate::storage::ConversationStore;
    use colored::Colorize;

    /// Handle a history subcommand
    ///
    /// # Arguments
    ///
    /// * `config` - Application configuration
    /// * `command` - The subcommand to run
    pub fn handle_history(config: &Config, command: HistoryCommand) -> Result<()> {
        let (kv, keys) = open_backend(config)?;
        let store = ConversationStore::new(Arc::clone(&kv), &keys);

        match command {
            HistoryCommand::List => {
                let conversations = store.list();
                if conversations.is_empty() {
                    println!("No conversations yet.");
                    return Ok(());
                }
                for conversation in conversations {
                    let short_id = &conversation.id[..conversation.id.len().min(8)];
                    let status = if conversation.is_closed() {
                        "closed"
                    } else {
                        "open"
                    };
                    println!(
                        "{}  {}  [{} messages, {}]  {}",
                        short_id.bold(),
                        conversation.updated_at.format("%Y-%m-%d %H:%M"),
                        conversation.messages.len(),
                        status,
                        conversation.title
                    );
                }
            }
            HistoryCommand::Show { id } => {
                let conversation = store.get(&id).ok_or_else(|| {
                    crate::error::ConfideError::Session(format!(
                        "No conversation matches '{}'",
                        id
                    ))
                })?;
                println!("{}\n", conversation.title.bold());
                println!("{}", conversation.transcript());
                if let Some(end_screen) = &conversation.end_screen {
                    println!();
                    println!("{} {}", "Wrapped up:".bold(), end_screen.validation);
                }
            }
            HistoryCommand::Delete { id } => {
                let conversation = store.get(&id).ok_or_else(|| {
                    crate::error::ConfideError::Session(format!(
                        "No conversation matches '{}'",
                        id
                    ))
                })?;
                store.delete(&conversation.id)?;
                println!("Deleted '{}'.", conversation.title);
            }
            HistoryCommand::Clear { yes } => {
                if !yes && !confirm("Delete all conversations and working memory?") {
                    println!("Nothing deleted.");
                    return Ok(());
                }
                store.clear()?;
                // A full purge also forgets the user: memory without its
                // source conversations is stale
                MemoryStore::new(kv, &keys, "default").clear()?;
                println!("All conversations and working memory deleted.");
            }
        }

        Ok(())
    }
}

// Working memory handler
pub mod memory {
    //! Show and clear the persisted working memory.

    use super::*;
    use crate::cli::MemoryCommand;
    use crate::memory::MemoryStore;
    use colored::Colorize;

    /// Handle a memory subcommand
    ///
    /// # Arguments
    ///
    /// * `config` - Application configuration
    /// * `command` - The subcommand to run
    pub fn handle_memory(config: &Config, command: MemoryCommand) -> Result<()> {
        let (kv, keys) = open_backend(config)?;
        let store = MemoryStore::new(kv, &keys, "default");

        match command {
            MemoryCommand::Show { json } => {
                let memory = store.read();
                if json {
                    println!("{}", serde_json::to_string_pretty(&memory)?);
                    return Ok(());
                }
                if memory.is_empty() {
                    println!("No working memory yet.");
                    return Ok(());
                }
                for (header, entries) in [
                    ("Facts", &memory.facts),
                    ("Preferences", &memory.preferences),
                    ("Topics", &memory.topics),
                ] {
                    if entries.is_empty() {
                        continue;
                    }
                    println!("{}", header.bold());
                    for entry in entries {
                        println!("  - {}", entry);
                    }
                }
            }
            MemoryCommand::Clear { yes } => {
                if !yes && !confirm("Forget everything the companion remembers?") {
                    println!("Nothing forgotten.");
                    return Ok(());
                }
                store.clear()?;
                println!("Working memory cleared.");
            }
        }

        Ok(())
    }
}

// Export handler
pub mod export {
    //! Export a stored conversation to a file.

    use super::*;
    use crate::export::{export_to_file, ExportFormat};
    use crate::storage::ConversationStore;
    use std::path::PathBuf;

    /// Handle the export command
    ///
    /// # Arguments
    ///
    /// * `config` - Application configuration
    /// * `id` - Conversation id or prefix
    /// * `format` - Output format name
    /// * `output` - Optional output file or directory
    pub fn handle_export(
        config: &Config,
        id: &str,
        format: &str,
        output: Option<PathBuf>,
    ) -> Result<()> {
        let format: ExportFormat = format.parse()?;
        let (kv, keys) = open_backend(config)?;
        let store = ConversationStore::new(kv, &keys);

        let conversation = store.get(id).ok_or_else(|| {
            crate::error::ConfideError::Session(format!("No conversation matches '{}'", id))
        })?;

        let path = export_to_file(&conversation, format, output.as_deref())?;
        println!("Exported to {}", path.display());
        Ok(())
    }
}

// System prompt handler
pub mod prompt {
    //! Show, replace, and reset the base system prompt.

    use super::*;
    use crate::cli::PromptCommand;
    use crate::prompts::DEFAULT_SYSTEM_PROMPT;
    use crate::storage::PromptStore;
    use std::path::Path;

    /// Handle a prompt subcommand
    ///
    /// # Arguments
    ///
    /// * `config` - Application configuration
    /// * `command` - The subcommand to run
    pub fn handle_prompt(config: &Config, command: PromptCommand) -> Result<()> {
        let (kv, keys) = open_backend(config)?;
        let store = PromptStore::new(kv, &keys, DEFAULT_SYSTEM_PROMPT);

        match command {
            PromptCommand::Show => {
                if store.is_overridden() {
                    println!("# custom prompt override\n");
                } else {
                    println!("# default prompt\n");
                }
                println!("{}", store.current());
            }
            PromptCommand::Set { file } => {
                let prompt = read_prompt_file(&file)?;
                store.set(&prompt)?;
                println!("Base prompt replaced from {}.", file.display());
            }
            PromptCommand::Reset => {
                store.reset()?;
                println!("Base prompt reset to the default.");
            }
        }

        Ok(())
    }

    fn read_prompt_file(path: &Path) -> Result<String> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            crate::error::ConfideError::Config(format!(
                "Failed to read prompt file {}: {}",
                path.display(),
                e
            ))
        })?;
        if contents.trim().is_empty() {
            return Err(crate::error::ConfideError::Config(
                "Prompt file is empty".to_string(),
            )
            .into());
        }
        Ok(contents)
    }

}
