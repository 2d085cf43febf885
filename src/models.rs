//! Core data models used throughout Knowbase.
//!
//! These types represent the documents, chunks, and retrieval results that
//! flow through the ingestion and chat pipeline.

use chrono::{DateTime, Utc};

/// Which connector a document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Wiki,
    LocalFile,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Wiki => "wiki",
            SourceKind::LocalFile => "file",
        }
    }
}

/// A raw document produced by a connector.
///
/// Replaced wholesale on re-ingestion; never patched in place.
#[derive(Debug, Clone)]
pub struct Document {
    pub source: SourceKind,
    /// Page id for wiki documents, relative path for local files.
    pub source_id: String,
    pub title: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub body: String,
}

impl Document {
    /// Stable identity of a document across runs, e.g. `wiki:abc123` or
    /// `file:notes/todo.txt`. Namespacing by source kind means the same
    /// content reached via two connectors is indexed twice.
    pub fn key(&self) -> String {
        format!("{}:{}", self.source.as_str(), self.source_id)
    }
}

/// A chunk of a document's body text.
///
/// The id is derived from the document key, chunk index, and text, so an
/// unchanged document always yields the same chunk ids.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub document_key: String,
    pub chunk_index: i64,
    pub text: String,
}

/// A chunk returned from a similarity query, with its source reference.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub text: String,
    pub document_key: String,
    pub title: Option<String>,
    pub chunk_index: i64,
    pub score: f32,
}

/// Counters reported after an ingestion run.
#[derive(Debug, Clone, Default)]
pub struct IngestStats {
    pub total_documents: usize,
    pub wiki_documents: usize,
    pub local_documents: usize,
    pub chunks_written: usize,
    pub failed_connectors: usize,
}
