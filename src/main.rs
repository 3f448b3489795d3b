mod chunker;
mod config;
mod editor;
mod embedding;
mod error;
mod fs;
mod index;
mod locks;
mod manager;
mod search;
mod server;
mod sync;
mod tools;
mod types;

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "engram", version, about = "Persistent markdown memory MCP server for AI agents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server (stdio transport)
    Serve,
    /// Create the base memory structure (main.md, files_index.json)
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::EngramConfig::load()?;

    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => {
            server::serve_stdio(config).await?;
        }
        Command::Init => {
            let root = config.resolved_files_path();
            let files = Arc::new(fs::FileStore::new(&root)?);
            let json_index = Arc::new(fs::JsonIndex::new(
                root.join(fs::json_index::INDEX_FILE),
            ));
            let manager = manager::MemoryManager::new(files, json_index, None);
            let result = manager.initialize().await?;
            println!("{} at {}", result.message, root.display());
        }
    }

    Ok(())
}
