//! Environment-variable configuration.
//!
//! All settings are read once at startup into an explicit [`Config`] that is
//! passed to each component; nothing reads the environment after that.
//! A `.env` file in the working directory is honored via `dotenvy`.

use anyhow::{bail, Result};
use std::path::PathBuf;

const DEFAULT_CHUNK_SIZE: usize = 1000;
const DEFAULT_CHUNK_OVERLAP: usize = 100;
const DEFAULT_TOP_K: usize = 5;
const DEFAULT_CHAT_BIND: &str = "127.0.0.1:8501";

#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the embeddings and chat-completions APIs.
    pub openai_api_key: String,
    /// Directory scanned by the local files connector.
    pub local_files_dir: PathBuf,
    /// Directory holding the on-disk vector store.
    pub vector_db_dir: PathBuf,
    /// Wiki connector credentials; the connector is skipped when absent.
    pub wiki: Option<WikiConfig>,
    pub chunking: ChunkingConfig,
    /// Number of chunks retrieved per chat query.
    pub top_k: usize,
    /// Bind address for the chat server.
    pub chat_bind: String,
}

#[derive(Debug, Clone)]
pub struct WikiConfig {
    pub api_key: String,
    pub root_page_id: String,
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub size: usize,
    pub overlap: usize,
}

/// Load configuration from the process environment.
pub fn load_config() -> Result<Config> {
    // A missing .env file is fine; real deployments set variables directly.
    dotenvy::dotenv().ok();
    from_lookup(|name| std::env::var(name).ok())
}

/// Build a [`Config`] from a variable lookup function.
///
/// Split out from [`load_config`] so validation can be tested without
/// mutating the process environment.
pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config> {
    let required = |name: &str| -> Result<String> {
        match lookup(name) {
            Some(v) if !v.trim().is_empty() => Ok(v),
            _ => bail!("Missing required environment variable: {}", name),
        }
    };

    let openai_api_key = required("OPENAI_API_KEY")?;
    let local_files_dir = PathBuf::from(required("LOCAL_FILES_DIR")?);
    let vector_db_dir = PathBuf::from(required("VECTOR_DB_DIR")?);

    let wiki = match (lookup("WIKI_API_KEY"), lookup("WIKI_ROOT_PAGE_ID")) {
        (Some(api_key), Some(root_page_id)) => Some(WikiConfig {
            api_key,
            root_page_id,
        }),
        (None, None) => None,
        _ => bail!("WIKI_API_KEY and WIKI_ROOT_PAGE_ID must be set together"),
    };

    let size = parse_usize(&lookup, "CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?;
    let overlap = parse_usize(&lookup, "CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP)?;
    if size == 0 {
        bail!("CHUNK_SIZE must be > 0");
    }
    if overlap >= size {
        bail!("CHUNK_OVERLAP must be smaller than CHUNK_SIZE");
    }

    let top_k = parse_usize(&lookup, "RETRIEVAL_TOP_K", DEFAULT_TOP_K)?;
    if top_k == 0 {
        bail!("RETRIEVAL_TOP_K must be > 0");
    }

    let chat_bind = lookup("CHAT_BIND").unwrap_or_else(|| DEFAULT_CHAT_BIND.to_string());

    Ok(Config {
        openai_api_key,
        local_files_dir,
        vector_db_dir,
        wiki,
        chunking: ChunkingConfig { size, overlap },
        top_k,
        chat_bind,
    })
}

fn parse_usize(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: usize,
) -> Result<usize> {
    match lookup(name) {
        Some(v) => v
            .trim()
            .parse::<usize>()
            .map_err(|_| anyhow::anyhow!("{} must be a non-negative integer, got '{}'", name, v)),
        None => Ok(default),
    }
}
