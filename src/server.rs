//! Chat HTTP server.
//!
//! Serves the single-page chat UI and one message endpoint. The chat
//! session lives behind a mutex, so a message is fully processed before the
//! next one is accepted; there is no other shared state.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | The chat page |
//! | `POST` | `/chat` | Send one message, receive the answer |
//!
//! Errors are returned as JSON:
//!
//! ```json
//! { "error": { "code": "model_error", "message": "chat API error 500: ..." } }
//! ```

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::chat::{ChatEngine, OpenAiChatModel};
use crate::config::Config;
use crate::embedding::OpenAiEmbedder;
use crate::error::Error;
use crate::ingest;
use crate::retrieve::Retriever;
use crate::store::{VectorStore, DB_FILE};

/// Chat message that triggers a full re-ingestion instead of an answer.
const REINDEX_COMMAND: &str = "update knowledge base";

#[derive(Clone)]
struct AppState {
    engine: Arc<Mutex<ChatEngine>>,
    config: Arc<Config>,
}

/// Start the chat server. Requires an existing vector store; run
/// `kb ingest` first.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    if !config.vector_db_dir.join(DB_FILE).exists() {
        anyhow::bail!(
            "Vector store not found at {}. Run `kb ingest` first.",
            config.vector_db_dir.display()
        );
    }

    let embedder = Arc::new(OpenAiEmbedder::new(&config.openai_api_key)?);
    let store = Arc::new(VectorStore::open(&config.vector_db_dir, embedder).await?);
    let retriever = Retriever::new(store, config.top_k);
    let model = Box::new(OpenAiChatModel::new(&config.openai_api_key)?);

    let state = AppState {
        engine: Arc::new(Mutex::new(ChatEngine::new(retriever, model))),
        config: Arc::new(config.clone()),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(handle_page))
        .route("/chat", post(handle_chat))
        .layer(cors)
        .with_state(state);

    info!("chat UI listening on http://{}", config.chat_bind);

    let listener = tokio::net::TcpListener::bind(&config.chat_bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

/// Map component errors to HTTP responses. The conversation is already
/// consistent by the time an error reaches here; this only picks the code.
fn classify_error(err: Error) -> AppError {
    let (status, code) = match &err {
        Error::Model(_) => (StatusCode::BAD_GATEWAY, "model_error"),
        Error::StoreUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable"),
        Error::Connection(_) => (StatusCode::BAD_GATEWAY, "connection_failed"),
        Error::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
    };
    AppError {
        status,
        code: code.to_string(),
        message: err.to_string(),
    }
}

// ============ GET / ============

async fn handle_page() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

// ============ POST /chat ============

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    answer: String,
}

async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let message = req.message.trim().to_string();
    if message.is_empty() {
        return Err(bad_request("message must not be empty"));
    }

    // Holding the lock for the whole turn means new input is not accepted
    // while a response is being generated.
    let mut engine = state.engine.lock().await;

    if message.eq_ignore_ascii_case(REINDEX_COMMAND) {
        let stats = ingest::run_ingest(&state.config, true)
            .await
            .map_err(|e| AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "ingest_failed".to_string(),
                message: format!("{:#}", e),
            })?;
        let answer = format!(
            "Knowledge base updated: {} documents indexed ({} wiki, {} local).",
            stats.total_documents, stats.wiki_documents, stats.local_documents
        );
        engine.record_exchange(&message, &answer);
        return Ok(Json(ChatResponse { answer }));
    }

    match engine.respond(&message).await {
        Ok(answer) => Ok(Json(ChatResponse { answer })),
        Err(e) => {
            error!("chat turn failed: {}", e);
            Err(classify_error(e))
        }
    }
}

// ============ Chat page ============

const CHAT_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Knowbase</title>
<style>
  body { font-family: system-ui, sans-serif; max-width: 720px; margin: 2rem auto; padding: 0 1rem; }
  #log { border: 1px solid #ddd; border-radius: 8px; padding: 1rem; min-height: 360px; }
  .turn { margin: 0.5rem 0; white-space: pre-wrap; }
  .user { font-weight: 600; }
  .error { color: #b00020; }
  form { display: flex; gap: 0.5rem; margin-top: 1rem; }
  input { flex: 1; padding: 0.5rem; font-size: 1rem; }
  button { padding: 0.5rem 1rem; }
</style>
</head>
<body>
<h1>Knowbase</h1>
<p>Ask questions about your wiki pages and local notes.
Type <code>update knowledge base</code> to reindex.</p>
<div id="log"></div>
<form id="form">
  <input id="input" autocomplete="off" placeholder="Ask a question..." autofocus>
  <button id="send">Send</button>
</form>
<script>
const log = document.getElementById('log');
const form = document.getElementById('form');
const input = document.getElementById('input');
const send = document.getElementById('send');

function append(cls, text) {
  const div = document.createElement('div');
  div.className = 'turn ' + cls;
  div.textContent = text;
  log.appendChild(div);
  log.scrollTop = log.scrollHeight;
}

form.addEventListener('submit', async (event) => {
  event.preventDefault();
  const message = input.value.trim();
  if (!message) return;
  append('user', 'You: ' + message);
  input.value = '';
  input.disabled = true;
  send.disabled = true;
  try {
    const resp = await fetch('/chat', {
      method: 'POST',
      headers: { 'Content-Type': 'application/json' },
      body: JSON.stringify({ message }),
    });
    const data = await resp.json();
    if (resp.ok) {
      append('assistant', data.answer);
    } else {
      append('error', 'Error: ' + (data.error ? data.error.message : resp.statusText));
    }
  } catch (e) {
    append('error', 'Error: ' + e);
  } finally {
    input.disabled = false;
    send.disabled = false;
    input.focus();
  }
});
</script>
</body>
</html>
"#;
