//! Upload web front end.
//!
//! `GET /` serves the upload form. `POST /` takes a multipart upload (a
//! `video` file and an optional `threshold`), runs [`analyze`] on it and
//! renders the results page. `POST /api/scenes` accepts the same form and
//! answers with JSON.
//!
//! Analysis runs on the blocking thread pool. When it exceeds the configured
//! timeout the request fails with 504 and the scan is cancelled through its
//! [`CancellationToken`]; the staged upload is deleted once the worker lets
//! go of it.

pub mod config;
pub mod page;
pub mod upload;

use std::{io, path::PathBuf, sync::Arc};

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartError},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub use config::{ConfigError, LoggingConfig, ServerConfig};
pub use upload::{StagedUpload, allowed_file, secure_filename};

use crate::{
    analysis::{SceneReport, analyze},
    error::SceneCutError,
    preview::Preview,
    progress::CancellationToken,
};

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

struct AppState {
    config: ServerConfig,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why an upload request failed.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("No video file uploaded.")]
    NoFileUploaded,
    #[error("No video file selected.")]
    NoFileSelected,
    #[error("Unsupported file type")]
    UnsupportedFileType,
    #[error("Invalid threshold: {0:?}")]
    InvalidThreshold(String),
    #[error("Malformed upload: {0}")]
    Multipart(#[from] MultipartError),
    #[error("Failed to store upload: {0}")]
    Storage(#[from] io::Error),
    #[error("Could not process video: {0}")]
    Analysis(#[from] SceneCutError),
    #[error("Processing took longer than {0} seconds")]
    Timeout(u64),
    #[error("Processing failed: {0}")]
    Worker(String),
}

impl UploadError {
    pub fn status(&self) -> StatusCode {
        match self {
            UploadError::NoFileUploaded
            | UploadError::NoFileSelected
            | UploadError::UnsupportedFileType
            | UploadError::InvalidThreshold(_)
            | UploadError::Analysis(SceneCutError::InvalidThreshold(_)) => StatusCode::BAD_REQUEST,
            UploadError::Multipart(e) => e.status(),
            UploadError::Timeout(_) | UploadError::Analysis(SceneCutError::Cancelled) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            UploadError::Analysis(_) => StatusCode::UNPROCESSABLE_ENTITY,
            UploadError::Storage(_) | UploadError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to create upload directory {path}: {source}")]
    UploadDir { path: PathBuf, source: io::Error },
    #[error("failed to bind to {address}: {source}")]
    Bind { address: String, source: io::Error },
    #[error("server error: {0}")]
    Io(#[from] io::Error),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// JSON body of `POST /api/scenes`.
#[derive(Debug, Serialize)]
pub struct ScenesResponse {
    pub frames: Vec<u64>,
    pub timestamps: Vec<f64>,
    pub changes: Vec<ChangeEntry>,
}

#[derive(Debug, Serialize)]
pub struct ChangeEntry {
    pub frame_index: u64,
    pub timestamp_seconds: f64,
    pub score: f64,
    /// Base64 PNG, `null` when the preview is unavailable.
    pub preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_error: Option<String>,
}

impl ScenesResponse {
    pub fn from_report(report: &SceneReport) -> Self {
        let changes = report
            .entries()
            .map(|(change, preview)| {
                let (preview, preview_error) = match preview {
                    Preview::Rendered(image) => (Some(image.to_base64()), None),
                    Preview::Unavailable { reason, .. } => (None, Some(reason.clone())),
                };
                ChangeEntry {
                    frame_index: change.frame_index,
                    timestamp_seconds: change.timestamp_seconds,
                    score: change.score,
                    preview,
                    preview_error,
                }
            })
            .collect();

        Self {
            frames: report.frames(),
            timestamps: report.timestamps(),
            changes,
        }
    }
}

struct UploadForm {
    upload: StagedUpload,
    threshold: f64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /
async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(page::index_page(state.config.default_threshold))
}

/// POST / (multipart: video, threshold)
async fn upload_form(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    match process_upload(&state.config, multipart).await {
        Ok((threshold, report)) => Html(page::results_page(threshold, &report)).into_response(),
        Err(e) => {
            let message = e.to_string();
            (
                e.status(),
                Html(page::error_page(state.config.default_threshold, &message)),
            )
                .into_response()
        }
    }
}

/// POST /api/scenes (multipart: video, threshold)
async fn upload_api(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    match process_upload(&state.config, multipart).await {
        Ok((_, report)) => Json(ScenesResponse::from_report(&report)).into_response(),
        Err(e) => (
            e.status(),
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

async fn process_upload(
    config: &ServerConfig,
    multipart: Multipart,
) -> Result<(f64, SceneReport), UploadError> {
    let UploadForm { upload, threshold } = read_form(config, multipart).await?;
    info!(path = %upload.path().display(), threshold, "processing upload");

    let token = CancellationToken::new();
    let mut options = config.analysis_options(threshold);
    options.scan = options.scan.with_cancellation(token.clone());

    let task = tokio::task::spawn_blocking(move || {
        let report = analyze(upload.path(), &options);
        drop(upload);
        report
    });

    let report = match tokio::time::timeout(config.request_timeout(), task).await {
        Ok(Ok(result)) => result?,
        Ok(Err(e)) => {
            error!(error = %e, "analysis worker failed");
            return Err(UploadError::Worker(e.to_string()));
        }
        Err(_) => {
            token.cancel();
            warn!(
                timeout_secs = config.request_timeout_secs,
                "analysis timed out, cancelling"
            );
            return Err(UploadError::Timeout(config.request_timeout_secs));
        }
    };

    info!(changes = report.changes.len(), "upload processed");
    Ok((threshold, report))
}

async fn read_form(
    config: &ServerConfig,
    mut multipart: Multipart,
) -> Result<UploadForm, UploadError> {
    let mut upload = None;
    let mut threshold = config.default_threshold;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("video") => {
                let client_name = field.file_name().unwrap_or_default().to_string();
                if client_name.is_empty() {
                    return Err(UploadError::NoFileSelected);
                }
                if !allowed_file(&client_name, &config.allowed_extensions) {
                    return Err(UploadError::UnsupportedFileType);
                }
                upload =
                    Some(StagedUpload::from_field(&config.upload_dir, &client_name, field).await?);
            }
            Some("threshold") => {
                let text = field.text().await?;
                let text = text.trim();
                if !text.is_empty() {
                    threshold = text
                        .parse()
                        .map_err(|_| UploadError::InvalidThreshold(text.to_string()))?;
                }
            }
            _ => {}
        }
    }

    let upload = upload.ok_or(UploadError::NoFileUploaded)?;
    Ok(UploadForm { upload, threshold })
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Build the router for `config`.
pub fn router(config: ServerConfig) -> Router {
    let body_limit = config.max_upload_bytes;
    let state = Arc::new(AppState { config });

    Router::new()
        .route("/", get(index).post(upload_form))
        .route("/api/scenes", post(upload_api))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Create the upload directory, bind, and serve until Ctrl-C.
pub async fn serve(config: ServerConfig) -> Result<(), ServerError> {
    config.validate()?;

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .map_err(|source| ServerError::UploadDir {
            path: config.upload_dir.clone(),
            source,
        })?;

    let address = config.bind_address.clone();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| ServerError::Bind {
            address: address.clone(),
            source,
        })?;

    info!(
        addr = %address,
        upload_dir = %config.upload_dir.display(),
        "scenecut server starting"
    );

    axum::serve(listener, router(config))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("scenecut server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
