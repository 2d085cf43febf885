//! Error taxonomy shared by all pipeline components.
//!
//! Four kinds cover everything that can go wrong at a component seam:
//! remote sources, local paths, the vector store, and the model APIs.
//! Glue code (CLI, server startup) uses `anyhow` on top of these.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A remote source is unreachable or rejected our credentials.
    #[error("connection failed: {0}")]
    Connection(String),

    /// A configured local path does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The persisted index is corrupt or inaccessible.
    #[error("vector store unavailable: {0}")]
    StoreUnavailable(String),

    /// An LLM or embedding API call failed or timed out.
    #[error("model call failed: {0}")]
    Model(String),
}

pub type Result<T> = std::result::Result<T, Error>;

// The store is the only component touching SQLite, so every sqlx error
// maps to StoreUnavailable.
impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Error::StoreUnavailable(e.to_string())
    }
}
