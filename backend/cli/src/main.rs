mod serve;
mod status_cmd;
mod terminal_output;
mod tools_cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ledgerforge")]
#[command(about = "LedgerForge: conversational assistant for small-business bookkeeping")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the chat HTTP server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
        /// Config file (defaults to ~/.ledgerforge/config.yaml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// List the tool catalog offered to the model
    Tools {
        /// Print the catalog as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration with secrets masked
    Config {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Query a running server's health endpoint
    Status {
        #[arg(short, long, default_value_t = ledgerforge_config::defaults::DEFAULT_PORT)]
        port: u16,
    },
}

fn resolve_config_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| ledgerforge_config::config_file_path(&ledgerforge_config::config_dir()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, config } => {
            let path = resolve_config_path(config);
            let mut config = ledgerforge_config::load_and_prepare(&path).await?;
            if let Some(port) = port {
                config.server.port = Some(port);
            }
            serve::run(config).await?;
        }
        Commands::Tools { json } => tools_cmd::run(json)?,
        Commands::Config { config } => {
            let path = resolve_config_path(config);
            let config = ledgerforge_config::load_and_prepare(&path).await?;
            let summary = ledgerforge_config::redacted_summary(&config);
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Status { port } => status_cmd::run(port).await?,
    }

    Ok(())
}
