//! Source connector capability.
//!
//! A connector produces documents from one source and never writes back to
//! it. Concrete variants: [`crate::connector_wiki::WikiConnector`] and
//! [`crate::connector_files::LocalFileConnector`].

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Document;

#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// Short name used in logs and stats (e.g. `"wiki"`, `"files"`).
    fn name(&self) -> &str;

    /// Fetch all documents from the source.
    ///
    /// Fails with [`crate::Error::Connection`] if the remote is unreachable
    /// or credentials are invalid, and with [`crate::Error::NotFound`] if a
    /// configured local path does not exist.
    async fn fetch(&self) -> Result<Vec<Document>>;
}
