//! Web UI
//!
//! Routes:
//! - `GET /` editor page
//! - `GET /healthz` liveness probe
//! - `POST /api/preview` Markdown preview
//! - `POST /api/review` run the editorial team on a draft

pub mod markdown;
pub mod page;

pub use markdown::render_preview;

use crate::article::ArticleDraft;
use crate::config::{Config, UiConfig};
use crate::editor::{welcome_message, ChatMessage, ReviewService};
use crate::error::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared, read-only state of the web server
#[derive(Clone)]
pub struct AppState {
    review: ReviewService,
    ui: Arc<UiConfig>,
    max_tags: usize,
}

impl AppState {
    /// Create state from its parts
    pub fn new(review: ReviewService, ui: UiConfig, max_tags: usize) -> Self {
        Self {
            review,
            ui: Arc::new(ui),
            max_tags,
        }
    }
}

/// Error returned by API handlers as `{"error": ...}`
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request
    BadRequest(String),
    /// Server-side failure
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Body of `POST /api/preview`
#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    /// Markdown source
    #[serde(default)]
    pub body: String,
}

/// Response of `POST /api/preview`
#[derive(Debug, Serialize, Deserialize)]
pub struct PreviewResponse {
    /// Rendered HTML
    pub html: String,
}

/// Body of `POST /api/review`
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    /// Draft fields
    #[serde(flatten)]
    pub draft: ArticleDraft,
    /// Chat pane contents so far
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

/// Response of `POST /api/review`
#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewResponse {
    /// Chat pane contents after the review
    pub history: Vec<ChatMessage>,
}

/// Build the router
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/api/preview", post(preview))
        .route("/api/review", post(review))
        .with_state(state)
}

async fn index(State(state): State<AppState>) -> ApiResult<Html<String>> {
    page::render_page(&state.ui, state.max_tags, &welcome_message())
        .map(Html)
        .map_err(|e| ApiError::Internal(e.to_string()))
}

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn preview(
    payload: std::result::Result<Json<PreviewRequest>, JsonRejection>,
) -> ApiResult<Json<PreviewResponse>> {
    let Json(request) = payload?;
    Ok(Json(PreviewResponse {
        html: render_preview(&request.body),
    }))
}

async fn review(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ReviewRequest>, JsonRejection>,
) -> ApiResult<Json<ReviewResponse>> {
    let Json(request) = payload?;
    tracing::info!("Review requested for '{}'", request.draft.title.trim());

    let service = state.review.clone();
    let history = tokio::spawn(async move {
        service
            .review_and_post(&request.draft, request.history, None)
            .await
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Review task failed: {}", e)))?;

    Ok(Json(ReviewResponse { history }))
}

/// Serve the editor until Ctrl-C
///
/// # Errors
///
/// Returns error if the listen address cannot be bound
pub async fn serve(config: &Config, review: ReviewService) -> Result<()> {
    let state = AppState::new(review, config.ui.clone(), config.editor.max_article_tags);
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&config.ui.host).await?;
    tracing::info!("Editor listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Editor stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
