//! HTTP API for the chat service.
//!
//! Exposes document processing and retrieval-augmented chat as a small
//! JSON API, the surface the web UI talks to.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/chat` | Ask a question with retrieved document context |
//! | `POST` | `/api/clear` | Reset the conversation history |
//! | `POST` | `/api/documents/process` | (Re-)index the documents directory |
//! | `GET`  | `/api/documents/summary` | Corpus summary |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "message must not be empty" } }
//! ```
//!
//! The conversation is a single shared session guarded by a mutex; the
//! service assumes one interactive caller at a time.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::chat::{self, ChatSession};
use crate::config::Config;
use crate::embedding::{create_embedder, Embedder};
use crate::metadata::MetadataStore;
use crate::pipeline::{self, ProcessOutcome};
use crate::store::{SqliteVectorStore, VectorStore};

#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    embedder: Arc<dyn Embedder>,
    store: Arc<SqliteVectorStore>,
    session: Arc<Mutex<ChatSession>>,
}

/// Start the HTTP server on the configured bind address. Runs until the
/// process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let embedder: Arc<dyn Embedder> = Arc::from(create_embedder(&config.embedding)?);
    let store = Arc::new(SqliteVectorStore::open(&config.storage.index_path).await?);
    let session = Arc::new(Mutex::new(ChatSession::new(&config.chat.system_prompt)));

    let state = AppState {
        config: Arc::new(config.clone()),
        embedder,
        store,
        session,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat_handler))
        .route("/api/clear", post(clear_handler))
        .route("/api/documents/process", post(process_handler))
        .route("/api/documents/summary", get(summary_handler))
        .layer(cors)
        .with_state(state);

    println!("docchat server listening on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({ "error": { "code": code, "message": message } })),
    )
        .into_response()
}

async fn health() -> Response {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") })).into_response()
}

#[derive(Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: String,
}

async fn chat_handler(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Response {
    let message = req.message.trim();
    if message.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "bad_request",
            "message must not be empty",
        );
    }

    let mut session = state.session.lock().await;
    match chat::ask(
        &state.config,
        state.embedder.as_ref(),
        state.store.as_ref(),
        &mut session,
        message,
    )
    .await
    {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, "chat_error", &e.to_string()),
    }
}

async fn clear_handler(State(state): State<AppState>) -> Response {
    let mut session = state.session.lock().await;
    session.reset(&state.config.chat.system_prompt);
    Json(json!({ "message": "Chat history cleared" })).into_response()
}

async fn process_handler(State(state): State<AppState>) -> Response {
    let mut meta = MetadataStore::load(&state.config.storage.metadata_path);
    let results = pipeline::process_all(
        &state.config,
        state.embedder.as_ref(),
        state.store.as_ref(),
        &mut meta,
    )
    .await;

    let mut report = serde_json::Map::new();
    for (name, result) in results {
        let entry = match result {
            Ok(ProcessOutcome::Indexed { chunks }) => {
                json!({ "status": "indexed", "chunks": chunks })
            }
            Ok(ProcessOutcome::Unchanged) => json!({ "status": "unchanged" }),
            Err(e) => json!({ "status": "failed", "error": e.to_string() }),
        };
        report.insert(name, entry);
    }

    Json(json!({
        "message": "Document processing completed",
        "results": report,
    }))
    .into_response()
}

async fn summary_handler(State(state): State<AppState>) -> Response {
    let meta = MetadataStore::load(&state.config.storage.metadata_path);
    let indexed_vectors = match state.store.count().await {
        Ok(n) => n,
        Err(e) => {
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal", &e.to_string())
        }
    };

    Json(json!({
        "total_documents": meta.len(),
        "indexed_vectors": indexed_vectors,
        "documents": meta.records(),
    }))
    .into_response()
}
