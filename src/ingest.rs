//! Ingestion pipeline orchestration.
//!
//! Runs every configured connector, chunks each fetched document, and
//! upserts the chunks into the vector store. Re-running supersedes prior
//! chunks for documents that still exist.
//!
//! Failure handling follows the run contract: a connector that fails is
//! logged and counted, but documents already fetched from other connectors
//! are still indexed. Per-document chunking or embedding failures are
//! logged and skipped. Only a misconfiguration or an unavailable store
//! aborts the run.

use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};

use crate::chunk::chunk_text;
use crate::config::{ChunkingConfig, Config};
use crate::connector::SourceConnector;
use crate::connector_files::LocalFileConnector;
use crate::connector_wiki::WikiConnector;
use crate::embedding::{Embedder, OpenAiEmbedder};
use crate::error::Result;
use crate::models::{IngestStats, SourceKind};
use crate::store::VectorStore;

/// Build the connectors named in the configuration.
pub fn connectors_from_config(config: &Config) -> anyhow::Result<Vec<Box<dyn SourceConnector>>> {
    let mut connectors: Vec<Box<dyn SourceConnector>> = Vec::new();

    if let Some(wiki) = &config.wiki {
        connectors.push(Box::new(WikiConnector::new(wiki)?));
    }
    connectors.push(Box::new(LocalFileConnector::new(&config.local_files_dir)?));

    Ok(connectors)
}

/// Full ingestion run: open the store, fetch from every connector, chunk,
/// embed, and upsert.
pub async fn run_ingest(config: &Config, clear: bool) -> anyhow::Result<IngestStats> {
    let embedder = Arc::new(OpenAiEmbedder::new(&config.openai_api_key)?);
    info!(model = embedder.model_name(), "embedding provider ready");
    let store = VectorStore::open(&config.vector_db_dir, embedder)
        .await
        .with_context(|| format!("opening vector store in {}", config.vector_db_dir.display()))?;
    let connectors = connectors_from_config(config)?;

    if clear {
        store.clear().await?;
        info!("vector store cleared");
    }

    let stats = ingest_documents(&store, &connectors, &config.chunking).await?;
    store.close().await;
    Ok(stats)
}

/// Core pipeline over an open store and a set of connectors.
pub async fn ingest_documents(
    store: &VectorStore,
    connectors: &[Box<dyn SourceConnector>],
    chunking: &ChunkingConfig,
) -> Result<IngestStats> {
    let mut stats = IngestStats::default();

    for connector in connectors {
        info!(connector = connector.name(), "fetching documents");

        let documents = match connector.fetch().await {
            Ok(docs) => docs,
            Err(e) => {
                warn!(connector = connector.name(), "connector failed: {}", e);
                stats.failed_connectors += 1;
                continue;
            }
        };

        info!(
            connector = connector.name(),
            count = documents.len(),
            "fetched documents"
        );

        for doc in &documents {
            let key = doc.key();
            let chunks = chunk_text(&key, &doc.body, chunking.size, chunking.overlap);

            match store.upsert_document(doc, &chunks).await {
                Ok(written) => {
                    stats.total_documents += 1;
                    stats.chunks_written += written;
                    match doc.source {
                        SourceKind::Wiki => stats.wiki_documents += 1,
                        SourceKind::LocalFile => stats.local_documents += 1,
                    }
                }
                Err(crate::Error::StoreUnavailable(e)) => {
                    // The store is the one shared resource; losing it ends
                    // the run.
                    return Err(crate::Error::StoreUnavailable(e));
                }
                Err(e) => {
                    warn!(document = %key, "skipping document: {}", e);
                }
            }
        }
    }

    info!(
        total = stats.total_documents,
        wiki = stats.wiki_documents,
        local = stats.local_documents,
        chunks = stats.chunks_written,
        failed_connectors = stats.failed_connectors,
        "ingestion complete"
    );

    Ok(stats)
}
