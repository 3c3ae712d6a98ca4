mod agent;
mod cli;
mod config;
mod db;
mod embedding;
mod kb;
mod llm;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scribe", version, about = "Autonomous journaling agent with a local knowledge base")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the agent and the HTTP monitoring surface
    Serve,
    /// Build the chunk index from the corpus directory
    BuildIndex,
    /// Query the chunk index from the terminal
    Search {
        /// The query text
        query: String,
        /// Maximum number of chunks to return
        #[arg(short = 'k', long, default_value_t = 5)]
        limit: usize,
    },
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the embedding model to ~/.scribe/models/
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = config::ScribeConfig::load()?;

    // Initialize tracing with the configured log level, to stderr so stdout
    // stays clean for CLI output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => {
            server::run(config).await?;
        }
        Command::BuildIndex => {
            cli::build_index(&config)?;
        }
        Command::Search { query, limit } => {
            cli::search(&config, &query, limit)?;
        }
        Command::Model { action } => match action {
            ModelAction::Download => {
                cli::model_download(&config.embedding).await?;
            }
        },
    }

    Ok(())
}
