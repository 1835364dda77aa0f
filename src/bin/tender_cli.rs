use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tendermatch::app::{App, TenderApi};
use tendermatch::{config, logging};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "tender-cli", about = "Ingest tender documents and inspect matches")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest an eForms notice (.xml) or scanned tender (.pdf) from disk.
    Ingest {
        /// Document to ingest.
        path: PathBuf,
    },
    /// Print ranked matches for a company owner.
    Matches {
        /// Owner account id.
        #[arg(long)]
        owner: Uuid,
        /// Maximum number of matches.
        #[arg(long)]
        limit: Option<i64>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    config::init_config();
    logging::init_tracing();
    let app = App::from_config(config::get_config()).await?;

    match cli.command {
        Command::Ingest { path } => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let tender = app.process_upload(bytes, &filename).await?;
            println!("{}", serde_json::to_string_pretty(&tender)?);
        }
        Command::Matches { owner, limit } => {
            let matches = app.find_matches(owner, limit).await?;
            if matches.is_empty() {
                println!("No matches for owner {owner}");
            }
            for m in matches {
                println!(
                    "{:.3}  {}  {}  ({})",
                    m.score, m.tender_id, m.tender.title, m.reason
                );
            }
        }
    }
    Ok(())
}
