//! On-disk vector store backed by SQLite.
//!
//! The store owns the embeddings: it computes them through its [`Embedder`]
//! on upsert and is the only reader at query time. Chunks for a document are
//! replaced wholesale whenever the document is re-ingested.
//!
//! The database file lives inside the configured store directory; its layout
//! is internal and only guaranteed to reopen what the same store wrote.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use crate::embedding::{self, Embedder};
use crate::error::{Error, Result};
use crate::models::{Chunk, Document, RetrievedChunk};

/// Database file name inside the store directory.
pub const DB_FILE: &str = "kb.sqlite";

pub struct VectorStore {
    pool: SqlitePool,
    embedder: Arc<dyn Embedder>,
}

impl VectorStore {
    /// Open (or create) the store in `dir`.
    pub async fn open(dir: &Path, embedder: Arc<dyn Embedder>) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(|e| {
            Error::StoreUnavailable(format!("cannot create {}: {}", dir.display(), e))
        })?;

        let db_path = dir.join(DB_FILE);
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        create_schema(&pool).await?;

        Ok(Self { pool, embedder })
    }

    /// Store a document and its chunks, replacing any prior chunks for the
    /// same document key. Returns the number of chunks written.
    pub async fn upsert_document(&self, doc: &Document, chunks: &[Chunk]) -> Result<usize> {
        // Embed outside the transaction; a model failure leaves the store
        // untouched.
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            self.embedder.embed(&texts).await?
        };
        if embeddings.len() != chunks.len() {
            return Err(Error::Model(format!(
                "embedding count mismatch: {} texts, {} vectors",
                chunks.len(),
                embeddings.len()
            )));
        }

        let key = doc.key();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO documents (key, source, source_id, title, updated_at, body)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                title = excluded.title,
                updated_at = excluded.updated_at,
                body = excluded.body
            "#,
        )
        .bind(&key)
        .bind(doc.source.as_str())
        .bind(&doc.source_id)
        .bind(&doc.title)
        .bind(doc.updated_at.timestamp())
        .bind(&doc.body)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM chunks WHERE document_key = ?")
            .bind(&key)
            .execute(&mut *tx)
            .await?;

        for (chunk, vector) in chunks.iter().zip(embeddings.iter()) {
            sqlx::query(
                "INSERT INTO chunks (id, document_key, chunk_index, text, embedding) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&chunk.id)
            .bind(&chunk.document_key)
            .bind(chunk.chunk_index)
            .bind(&chunk.text)
            .bind(embedding::vec_to_blob(vector))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(chunks.len())
    }

    /// Embed `text` and return the `k` most similar chunks, ordered by
    /// descending cosine similarity with ties broken by insertion order.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        let query_vec = embedding::embed_query(self.embedder.as_ref(), text).await?;

        let rows = sqlx::query(
            r#"
            SELECT c.seq, c.document_key, c.chunk_index, c.text, c.embedding, d.title
            FROM chunks c
            JOIN documents d ON d.key = c.document_key
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        struct Scored {
            seq: i64,
            chunk: RetrievedChunk,
        }

        let mut scored: Vec<Scored> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vec = embedding::blob_to_vec(&blob);
                let score = embedding::cosine_similarity(&query_vec, &vec);
                Scored {
                    seq: row.get("seq"),
                    chunk: RetrievedChunk {
                        text: row.get("text"),
                        document_key: row.get("document_key"),
                        title: row.get("title"),
                        chunk_index: row.get("chunk_index"),
                        score,
                    },
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.chunk
                .score
                .partial_cmp(&a.chunk.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.seq.cmp(&b.seq))
        });
        scored.truncate(k);

        Ok(scored.into_iter().map(|s| s.chunk).collect())
    }

    /// Delete all indexed documents and chunks.
    pub async fn clear(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM chunks").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM documents")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

/// Create tables if they don't exist. Idempotent; runs on every open.
async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            key TEXT PRIMARY KEY,
            source TEXT NOT NULL,
            source_id TEXT NOT NULL,
            title TEXT,
            updated_at INTEGER NOT NULL,
            body TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // seq is AUTOINCREMENT so insertion order survives deletes and can break
    // similarity ties deterministically.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            document_key TEXT NOT NULL,
            chunk_index INTEGER NOT NULL,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL,
            UNIQUE(document_key, chunk_index),
            FOREIGN KEY (document_key) REFERENCES documents(key)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_document_key ON chunks(document_key)")
        .execute(pool)
        .await?;

    Ok(())
}
