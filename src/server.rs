//! HTTP surface of the ingest server.

use crate::event::StreamEvent;
use crate::llm::LanguageModel;
use crate::pipeline::{Pipeline, UploadedFile};
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
    routing::{get, post},
    Router,
};
use futures_util::{stream, Stream};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pipeline: Pipeline,
    max_files: usize,
}

impl AppState {
    pub fn new(model: Arc<dyn LanguageModel>, max_files: usize) -> Self {
        Self {
            pipeline: Pipeline::new(model),
            max_files,
        }
    }
}

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/upload", post(upload))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

type ApiError = (StatusCode, Json<Value>);

fn bad_request(message: impl Into<String>) -> ApiError {
    let message = message.into();
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

/// Accept files and stream one event per file, then a completion event.
async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let mut files = Vec::new();
    let mut custom_prompt = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Multipart error: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("files") => {
                let file_name = field.file_name().unwrap_or("document").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(format!("Failed to read file: {}", e)))?
                    .to_vec();
                info!("Received file: {} ({} bytes)", file_name, data.len());
                files.push(UploadedFile { file_name, data });
            }
            Some("prompt") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| bad_request(format!("Failed to read prompt: {}", e)))?;
                custom_prompt = Some(text.trim().to_string()).filter(|p| !p.is_empty());
            }
            _ => {}
        }
    }

    if files.is_empty() {
        return Err(bad_request("No files uploaded"));
    }
    if files.len() > state.max_files {
        return Err(bad_request(format!(
            "You can upload a maximum of {} files at a time.",
            state.max_files
        )));
    }

    let (tx, rx) = mpsc::channel::<StreamEvent>(16);
    let pipeline = state.pipeline.clone();
    tokio::spawn(async move { pipeline.run(files, custom_prompt, tx).await });

    let events = stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        Some((Ok::<_, Infallible>(to_sse(&event)), rx))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn to_sse(event: &StreamEvent) -> Event {
    match serde_json::to_string(event) {
        Ok(data) => Event::default().data(data),
        Err(e) => {
            error!("Failed to serialize stream event: {}", e);
            Event::default().comment("serialization error")
        }
    }
}
