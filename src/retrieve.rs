//! Top-K chunk retrieval.
//!
//! A thin seam between the chat orchestrator and the vector store: embeds
//! the query and returns chunk texts with their source references. No
//! caching; every call reflects the latest ingested index.

use std::sync::Arc;

use crate::error::Result;
use crate::models::RetrievedChunk;
use crate::store::VectorStore;

pub struct Retriever {
    store: Arc<VectorStore>,
    top_k: usize,
}

impl Retriever {
    pub fn new(store: Arc<VectorStore>, top_k: usize) -> Self {
        Self { store, top_k }
    }

    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedChunk>> {
        self.store.query(query, self.top_k).await
    }
}
