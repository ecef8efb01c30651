//! Route handlers and JSON error mapping.

use std::path::PathBuf;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use modeldock::catalog::{CatalogError, DeleteError, DeleteOutcome, ModelEntry};
use modeldock::transfer::{ProgressState, SubmitError};

use super::events::status_events;
use super::AppState;

const INDEX_HTML: &str = include_str!("../../assets/index.html");

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/favicon.ico", get(favicon))
        .route("/download", post(start_download))
        .route("/cancel", post(cancel))
        .route("/status", get(status))
        .route("/events", get(status_events))
        .route("/api/models", get(list_models))
        .route("/api/models/update", post(update_model))
        .route("/api/models/delete", post(delete_model))
}

/// JSON error body `{"error": "..."}` with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl From<SubmitError> for ApiError {
    fn from(e: SubmitError) -> Self {
        let status = match e {
            SubmitError::AlreadyInProgress { .. } => StatusCode::CONFLICT,
            SubmitError::Invalid(_) => StatusCode::BAD_REQUEST,
            SubmitError::NoRuntime => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::new(status, e.to_string())
    }
}

impl From<DeleteError> for ApiError {
    fn from(e: DeleteError) -> Self {
        let status = match e {
            DeleteError::Invalid(_) => StatusCode::BAD_REQUEST,
            DeleteError::NotFound(_) => StatusCode::NOT_FOUND,
            DeleteError::Busy(_) => StatusCode::CONFLICT,
            DeleteError::PermissionDenied(_) | DeleteError::Io { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        ApiError::new(status, e.to_string())
    }
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        ApiError::internal(e.to_string())
    }
}

#[derive(Debug, Deserialize)]
pub struct TransferBody {
    #[serde(default)]
    repo_id: String,
    #[serde(default)]
    quant_pattern: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteBody {
    path: PathBuf,
    #[serde(default)]
    files: Vec<String>,
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn start_download(
    State(app): State<AppState>,
    body: Result<Json<TransferBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(body) = body?;
    let ticket = app.submit_transfer(body.repo_id.trim(), body.quant_pattern.trim())?;
    Ok(Json(json!({
        "message": format!("Download started for {}", ticket.repository_id)
    })))
}

async fn update_model(
    State(app): State<AppState>,
    body: Result<Json<TransferBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(body) = body?;
    let ticket = app.submit_transfer(body.repo_id.trim(), body.quant_pattern.trim())?;
    info!(repo = %ticket.repository_id, "Model update requested");
    Ok(Json(json!({
        "message": format!("Update started for {}", ticket.repository_id)
    })))
}

async fn cancel(State(app): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "cancelled": app.cancel_transfer() }))
}

async fn status(State(app): State<AppState>) -> Json<ProgressState> {
    Json(app.status())
}

async fn list_models(State(app): State<AppState>) -> Result<Json<Vec<ModelEntry>>, ApiError> {
    let models = tokio::task::spawn_blocking(move || app.list_catalog())
        .await
        .map_err(|e| {
            error!(error = %e, "Catalog task failed");
            ApiError::internal("Failed to list models")
        })??;
    Ok(Json(models))
}

async fn delete_model(
    State(app): State<AppState>,
    body: Result<Json<DeleteBody>, JsonRejection>,
) -> Result<Json<DeleteOutcome>, ApiError> {
    let Json(body) = body?;
    let outcome = tokio::task::spawn_blocking(move || {
        if body.files.is_empty() {
            app.delete_entry(&body.path)
        } else {
            app.delete_matching(&body.path, &body.files)
        }
    })
    .await
    .map_err(|e| {
        error!(error = %e, "Delete task failed");
        ApiError::internal("Failed to delete model")
    })??;
    Ok(Json(outcome))
}
