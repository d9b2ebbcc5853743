//! HTTP surface: `POST /download`, `GET /downloads`, and live progress of
//! running transfers under `GET /progress`.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use dlqueue_core::api::{self, ApiError};
use dlqueue_core::job_store::JobStore;
use dlqueue_core::pool::TransferPool;
use dlqueue_core::transfer::ProgressUpdate;

#[derive(Clone)]
pub struct AppState {
    pub store: JobStore,
    pub download_dir: Arc<PathBuf>,
    /// Pool the scheduler submits to; source of the progress routes.
    pub pool: TransferPool,
}

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub url: Option<String>,
}

type Reply = (StatusCode, Json<Value>);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/download", post(submit_download))
        .route("/downloads", get(list_downloads))
        .route("/progress", get(list_progress))
        .route("/progress/:name", get(file_progress))
        .with_state(state)
}

/// One running transfer, keyed by the artifact's file name.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressView {
    pub file_name: String,
    pub bytes_downloaded: u64,
    pub total_size: Option<u64>,
    /// Percent complete; absent when the size is unknown.
    pub progress: Option<f64>,
}

impl From<&ProgressUpdate> for ProgressView {
    fn from(update: &ProgressUpdate) -> Self {
        Self {
            file_name: update
                .destination
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            bytes_downloaded: update.bytes_downloaded,
            total_size: update.total_size,
            progress: update.fraction().map(|f| (f * 10_000.0).round() / 100.0),
        }
    }
}

fn progress_views(pool: &TransferPool) -> Vec<ProgressView> {
    let mut views: Vec<ProgressView> = pool.progress_snapshot().iter().map(Into::into).collect();
    views.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    views
}

async fn submit_download(
    State(state): State<AppState>,
    Json(body): Json<DownloadRequest>,
) -> Reply {
    let Some(url) = body.url.filter(|u| !u.trim().is_empty()) else {
        return failure(StatusCode::BAD_REQUEST, "URL is required");
    };

    match api::submit(&state.store, &state.download_dir, &url).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({ "success": true, "message": outcome.message() })),
        ),
        Err(ApiError::InvalidUrl(_)) => failure(StatusCode::BAD_REQUEST, "Invalid URL"),
        Err(ApiError::Store(e)) => {
            tracing::error!(url = %url, "error saving URL: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save URL")
        }
    }
}

async fn list_downloads(State(state): State<AppState>) -> Reply {
    match api::list_downloads(&state.store, &state.download_dir).await {
        Ok(downloads) => (
            StatusCode::OK,
            Json(json!({ "success": true, "downloads": downloads })),
        ),
        Err(e) => {
            tracing::error!("error fetching downloads: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch downloads")
        }
    }
}

async fn list_progress(State(state): State<AppState>) -> Reply {
    let progress = progress_views(&state.pool);
    (
        StatusCode::OK,
        Json(json!({ "success": true, "progress": progress })),
    )
}

async fn file_progress(State(state): State<AppState>, Path(name): Path<String>) -> Reply {
    match progress_views(&state.pool)
        .into_iter()
        .find(|v| v.file_name == name)
    {
        Some(view) => (
            StatusCode::OK,
            Json(json!({ "success": true, "progress": view })),
        ),
        None => failure(
            StatusCode::NOT_FOUND,
            &format!("No progress information available for {name}."),
        ),
    }
}

fn failure(status: StatusCode, error: &str) -> Reply {
    (status, Json(json!({ "success": false, "error": error })))
}
