//! Confide - emotional-support chat companion
//!
#![doc = "Confide - emotional-support chat companion"]
#![doc = "Main entry point for the Confide CLI."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use confide::cli::{Cli, Commands};
use confide::commands;
use confide::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load and validate configuration
    let mut config = Config::load(&cli.config)?;
    if let Some(data_dir) = &cli.data_dir {
        tracing::info!("Using data directory override: {}", data_dir);
        config.storage.data_dir = Some(data_dir.clone());
    }
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat { tone, resume } => {
            tracing::info!("Starting chat session");
            commands::chat::run_chat(config, tone, resume).await?;
            Ok(())
        }
        Commands::History { command } => {
            commands::history::handle_history(&config, command)?;
            Ok(())
        }
        Commands::Memory { command } => {
            commands::memory::handle_memory(&config, command)?;
            Ok(())
        }
        Commands::Export { id, format, output } => {
            commands::export::handle_export(&config, &id, &format, output)?;
            Ok(())
        }
        Commands::Prompt { command } => {
            commands::prompt::handle_prompt(&config, command)?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("confide=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
