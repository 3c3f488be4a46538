//! HTTP endpoints for proposal generation and cleanup.

use crate::catalog::Catalog;
use crate::generator::{DocumentGenerator, GenerationError};
use crate::janitor::{CleanupGuard, Janitor};
use crate::project::ProjectStore;
use crate::scope::describe_items;
use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncReadExt;

pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const CHUNK_SIZE: usize = 64 * 1024;

pub struct AppState {
    pub generator: DocumentGenerator,
    pub janitor: Arc<Janitor>,
    pub projects: Arc<dyn ProjectStore>,
    pub catalog: Catalog,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Project {0} not found")]
    NotFound(i64),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) | ApiError::Generation(GenerationError::ProjectNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Generation(e) => {
                log::error!("Error generating Word document: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Internal(e) => {
                log::error!("Internal error: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/generate_word/:project_id", post(generate_word))
        .route("/admin/cleanup", post(cleanup))
        .route("/get_price/:item_name", get(get_price))
        .route("/items", get(list_items))
        .route("/scope/:project_id", get(scope))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

/// Generate the proposal and stream it as an attachment. The response body
/// owns a [`CleanupGuard`], so the file is deleted once sending finishes.
async fn generate_word(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<i64>,
) -> Result<Response, ApiError> {
    let worker = Arc::clone(&state);
    let doc = tokio::task::spawn_blocking(move || {
        worker
            .generator
            .generate_for(worker.projects.as_ref(), project_id)
    })
    .await
    .map_err(|e| ApiError::Internal(e.into()))??;

    let guard = CleanupGuard::new(Arc::clone(&state.janitor), doc.path.clone());
    let file = tokio::fs::File::open(&doc.path)
        .await
        .map_err(|e| ApiError::Internal(e.into()))?;

    let stream = futures::stream::unfold(Some((file, guard)), |slot| async move {
        let (mut file, guard) = slot?;
        let mut buf = vec![0u8; CHUNK_SIZE];
        match file.read(&mut buf).await {
            Ok(0) => None,
            Ok(n) => {
                buf.truncate(n);
                Some((Ok(Bytes::from(buf)), Some((file, guard))))
            }
            Err(e) => Some((Err::<Bytes, std::io::Error>(e), None)),
        }
    });

    let disposition = format!("attachment; filename=\"{}\"", doc.download_name);
    Ok((
        [
            (header::CONTENT_TYPE, DOCX_MIME.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

async fn cleanup(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>, ApiError> {
    let janitor = Arc::clone(&state.janitor);
    let files_cleaned = tokio::task::spawn_blocking(move || janitor.clean_all())
        .await
        .map_err(|e| ApiError::Internal(e.into()))?;
    Ok(Json(json!({ "success": true, "files_cleaned": files_cleaned })))
}

async fn get_price(
    State(state): State<Arc<AppState>>,
    Path(item_name): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let worker = Arc::clone(&state);
    let price = tokio::task::spawn_blocking(move || worker.catalog.price(&item_name))
        .await
        .map_err(|e| ApiError::Internal(e.into()))?;
    Ok(Json(json!({ "price": price })))
}

async fn list_items(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({ "items": state.catalog.items() }))
}

async fn scope(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let worker = Arc::clone(&state);
    let project = tokio::task::spawn_blocking(move || worker.projects.project(project_id))
        .await
        .map_err(|e| ApiError::Internal(e.into()))??
        .ok_or(ApiError::NotFound(project_id))?;
    Ok(Json(json!({
        "project_id": project.id,
        "translation": describe_items(&project.items),
    })))
}
