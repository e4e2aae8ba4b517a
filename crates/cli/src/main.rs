//! RescueMap CLI - database and data management tools.
//!
//! # Usage
//!
//! ```bash
//! # Create or upgrade the database schema
//! rescuemap-cli migrate
//!
//! # Populate a city (no-op if it already has shops)
//! rescuemap-cli load Toulouse
//!
//! # Replace a city's shops with a fresh fetch
//! rescuemap-cli reset Toulouse
//!
//! # Shop counts per city
//! rescuemap-cli status
//!
//! # Exchange reports with another node
//! rescuemap-cli sync export --since 2026-03-01T00:00:00Z --output changes.json
//! rescuemap-cli sync import changes.json
//! rescuemap-cli sync pull http://10.0.0.2:5000
//! ```
//!
//! All commands read the same environment as the server
//! (`RESCUEMAP_DATABASE_URL`, provider URLs, ...).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "rescuemap-cli")]
#[command(author, version, about = "RescueMap CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Populate a city if it has no shops yet
    Load {
        /// City name
        city: String,
    },
    /// Discard a city's shops and fetch them again
    Reset {
        /// City name
        city: String,
    },
    /// Show shop counts per city and sync cursors
    Status,
    /// Exchange status reports with other nodes
    Sync {
        #[command(subcommand)]
        action: SyncAction,
    },
}

#[derive(Subcommand)]
enum SyncAction {
    /// Write rows verified after a timestamp as a change set
    Export {
        /// RFC 3339 timestamp; rows verified strictly after it are exported
        #[arg(short, long)]
        since: Option<String>,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Apply a change set file
    Import {
        /// Change set JSON file
        file: PathBuf,
    },
    /// Pull changes from a peer node since the last pull
    Pull {
        /// Peer base URL, e.g. `http://10.0.0.2:5000`
        peer: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rescue_map_server=info,rescuemap_cli=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Load { city } => commands::city::load(&city).await?,
        Commands::Reset { city } => commands::city::reset(&city).await?,
        Commands::Status => commands::city::status().await?,
        Commands::Sync { action } => match action {
            SyncAction::Export { since, output } => {
                commands::sync::export(since.as_deref(), output.as_deref()).await?;
            }
            SyncAction::Import { file } => commands::sync::import(&file).await?,
            SyncAction::Pull { peer } => commands::sync::pull(&peer).await?,
        },
    }
    Ok(())
}
