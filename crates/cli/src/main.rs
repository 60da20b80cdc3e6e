//! Stepwise CLI: the main entry point.
//!
//! Commands:
//! - `chat`    : Interactive REPL or single-message mode
//! - `gateway` : Serve the browser chat UI
//! - `onboard` : Write a default config file
//! - `tools`   : List the built-in tools

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "stepwise",
    about = "Stepwise — a plan, act, observe agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.stepwise/config.toml
    #[arg(short, long, global = true, env = "STEPWISE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the agent
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Start the browser chat gateway
    Gateway {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Write a default configuration file
    Onboard,

    /// List the available tools
    Tools,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env is fine
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    tracing::debug!(config = ?config_path, "Stepwise starting");

    match cli.command {
        Commands::Chat { message } => commands::chat::run(config_path, message).await?,
        Commands::Gateway { port } => commands::gateway::run(config_path, port).await?,
        Commands::Onboard => commands::onboard::run(config_path).await?,
        Commands::Tools => commands::tools::run(config_path).await?,
    }

    Ok(())
}
