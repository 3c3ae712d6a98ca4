//! HTTP monitoring surface and `serve` wiring.
//!
//! Read-only axum endpoints over a running agent: current status, the note
//! listing (reverse-chronological), and note content by filename. [`run`]
//! wires config → embedder → knowledge base → LLM client → agent task →
//! HTTP server, all sharing one cancellation token.

use std::path::Path as FsPath;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::agent::{AgentHandle, AgentLifeCycle};
use crate::config::ScribeConfig;
use crate::embedding::{self, EmbeddingProvider};
use crate::kb::KnowledgeBase;
use crate::llm::ollama::OllamaClient;
use crate::llm::TextGenerator;

#[derive(Clone)]
pub struct AppState {
    pub agent: AgentHandle,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: String,
    name: String,
}

#[derive(Debug, Serialize)]
struct NoteResponse {
    filename: String,
    content: String,
}

/// Build the monitoring router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/notes", get(list_notes))
        .route("/notes/{filename}", get(get_note))
        .with_state(state)
}

async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: state.agent.status().to_string(),
        name: state.agent.name.clone(),
    })
}

async fn list_notes(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(list_note_files(&state.agent.notes_dir))
}

async fn get_note(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<NoteResponse>, (StatusCode, String)> {
    if !is_safe_note_name(&filename) {
        return Err((StatusCode::BAD_REQUEST, "Invalid filename.".into()));
    }

    let note_path = state.agent.notes_dir.join(&filename);
    match tokio::fs::read_to_string(&note_path).await {
        Ok(content) => Ok(Json(NoteResponse { filename, content })),
        Err(_) => Err((StatusCode::NOT_FOUND, "Note not found.".into())),
    }
}

/// Reject any filename containing a path separator.
pub fn is_safe_note_name(filename: &str) -> bool {
    !filename.contains('/') && !filename.contains('\\')
}

/// All `.md` note filenames under `notes_dir`, newest first. Timestamped
/// names sort chronologically, so a reverse lexical sort is sufficient.
pub fn list_note_files(notes_dir: &FsPath) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(notes_dir) else {
        return Vec::new();
    };

    let mut notes: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".md"))
        .collect();
    notes.sort();
    notes.reverse();
    notes
}

/// Start the agent and the monitoring surface, and run until interrupted.
pub async fn run(config: ScribeConfig) -> Result<()> {
    let provider = embedding::create_provider(&config.embedding)?;
    let embedder: Arc<dyn EmbeddingProvider> = Arc::from(provider);

    let kb = KnowledgeBase::open(&config, embedder)?;
    info!("preparing knowledge base");
    kb.build_index()?;

    let generator: Arc<dyn TextGenerator> = Arc::new(OllamaClient::new(&config.llm)?);
    let agent = AgentLifeCycle::new(&config, kb, generator)?;
    info!(session = agent.session_id(), "agent session created");
    let handle = agent.handle();

    let cancel = CancellationToken::new();
    let agent_task = tokio::spawn(agent.run(cancel.clone()));

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received, halting agent");
            signal_cancel.cancel();
        }
    });

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "monitoring surface listening");

    let server_cancel = cancel.clone();
    axum::serve(listener, router(AppState { agent: handle }))
        .with_graceful_shutdown(async move {
            server_cancel.cancelled().await;
        })
        .await?;

    agent_task.await??;
    info!("shut down cleanly");
    Ok(())
}
