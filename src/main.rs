use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use sessiondesk::config::Config;

mod cli;

#[derive(Parser)]
#[command(name = "sessiondesk")]
#[command(about = "Supervise agent sessions - task grouping and daemon event reconciliation")]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to ~/.sessiondesk/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Follow a running daemon and emit notifications
    Watch {
        /// Daemon URL (overrides the config file)
        #[arg(long)]
        url: Option<String>,
    },

    /// Run recorded daemon events against a recorded snapshot
    Replay {
        /// JSON snapshot with sessions and conversations
        snapshot: PathBuf,

        /// NDJSON file with one daemon event per line
        events: PathBuf,
    },

    /// Show how a recorded conversation groups into tasks
    Groups {
        /// JSON array of conversation events
        conversation: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    match cli.command {
        Commands::Init { force } => {
            let path = cli.config.unwrap_or_else(Config::global_config_path);
            cli::init::init_command(&path, force)?;
        }
        Commands::Watch { url } => {
            let mut config = Config::load_or_default(cli.config.as_deref())?;
            if let Some(url) = url {
                config.daemon.url = url;
            }
            cli::watch::watch_command(config).await?;
        }
        Commands::Replay { snapshot, events } => {
            let config = Config::load_or_default(cli.config.as_deref())?;
            cli::replay::replay_command(&config, &snapshot, &events).await?;
        }
        Commands::Groups { conversation } => {
            cli::groups::groups_command(&conversation)?;
        }
    }

    Ok(())
}
