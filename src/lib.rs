//! # Knowbase
//!
//! A personal retrieval-augmented question answering tool.
//!
//! Knowbase ingests documents from a workspace wiki and a local notes
//! directory, chunks and embeds them into an on-disk vector store, and
//! serves a single-page chat UI that answers questions grounded in the
//! retrieved chunks.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────┐
//! │ Connectors  │──▶│   Pipeline   │──▶│  SQLite  │
//! │ Wiki/Files  │   │ Chunk+Embed  │   │ Vectors  │
//! └─────────────┘   └──────────────┘   └────┬─────┘
//!                                           │
//!                                           ▼
//!                       ┌───────────┐  ┌──────────┐
//!                       │ Retriever │◀─│ Chat UI  │
//!                       │  + LLM    │  │ (axum)   │
//!                       └───────────┘  └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! kb ingest            # pull wiki pages and local files into the store
//! kb chat              # start the local chat server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Environment-variable configuration |
//! | [`models`] | Core data types |
//! | [`connector`] | Source connector trait |
//! | [`connector_wiki`] | Workspace wiki connector |
//! | [`connector_files`] | Local files connector |
//! | [`chunk`] | Fixed-size overlapping text chunker |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | On-disk vector store |
//! | [`ingest`] | Ingestion pipeline |
//! | [`retrieve`] | Top-K chunk retrieval |
//! | [`chat`] | Conversation state machine and LLM client |
//! | [`server`] | Chat HTTP server |

pub mod chat;
pub mod chunk;
pub mod config;
pub mod connector;
pub mod connector_files;
pub mod connector_wiki;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod models;
pub mod retrieve;
pub mod server;
pub mod store;

pub use error::Error;
