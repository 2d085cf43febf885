//! # Knowbase CLI (`kb`)
//!
//! Two commands cover the whole tool:
//!
//! | Command | Description |
//! |---------|-------------|
//! | `kb ingest` | Pull wiki pages and local files into the vector store |
//! | `kb chat` | Start the local chat web server |
//!
//! Configuration comes from environment variables (a `.env` file is
//! honored): `OPENAI_API_KEY`, `LOCAL_FILES_DIR`, and `VECTOR_DB_DIR` are
//! required; `WIKI_API_KEY` + `WIKI_ROOT_PAGE_ID` enable the wiki
//! connector; `CHUNK_SIZE`, `CHUNK_OVERLAP`, `RETRIEVAL_TOP_K`, and
//! `CHAT_BIND` are optional.
//!
//! `kb ingest` exits 0 even when some connectors fail (failures are
//! logged); it exits non-zero only on total failure such as a missing
//! required variable or an unavailable store.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use knowbase::{config, ingest, server};

/// Knowbase — a personal retrieval-augmented question answering tool for
/// wiki pages and local notes.
#[derive(Parser)]
#[command(
    name = "kb",
    about = "Knowbase — retrieval-augmented question answering over your wiki and notes",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest documents from all configured sources into the vector store.
    ///
    /// Fetches wiki pages and local files, chunks and embeds them, and
    /// replaces prior chunks for documents that still exist. Safe to re-run
    /// on a schedule.
    Ingest {
        /// Drop all indexed data before ingesting.
        #[arg(long)]
        clear: bool,
    },

    /// Start the local chat web server.
    ///
    /// Serves a single-page chat UI answering questions grounded in the
    /// ingested documents. Requires a prior `kb ingest`.
    Chat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config()?;

    match cli.command {
        Commands::Ingest { clear } => {
            let stats = ingest::run_ingest(&cfg, clear).await?;
            println!("ingest");
            println!("  documents indexed: {}", stats.total_documents);
            println!("  wiki documents:    {}", stats.wiki_documents);
            println!("  local documents:   {}", stats.local_documents);
            println!("  chunks written:    {}", stats.chunks_written);
            if stats.failed_connectors > 0 {
                println!("  failed connectors: {}", stats.failed_connectors);
            }
            println!("ok");
        }
        Commands::Chat => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
