pub mod api;
pub mod config;
pub mod server;
pub mod services;
pub mod utils;

use crate::api::handlers::{audio, health};
use crate::api::middleware::request_id::request_id_middleware;
use crate::config::ServerConfig;
use crate::services::processor::AudioProcessor;
use crate::services::upload_handler::UploadCleanupHandler;
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::services::ServeDir;
use utoipa::OpenApi;

/// Headroom on top of `max_file_size` for multipart boundaries and the
/// label field, so oversized files are caught by the staging check.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        audio::process_audio,
        health::health_check,
    ),
    components(
        schemas(
            services::processor::ProcessingResult,
            health::HealthResponse,
        )
    ),
    tags(
        (name = "audio", description = "Audio transcription and summary"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<UploadCleanupHandler>,
    pub config: Arc<ServerConfig>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: ServerConfig, processor: Arc<dyn AudioProcessor>) -> Self {
        let config = Arc::new(config);
        Self {
            handler: Arc::new(UploadCleanupHandler::new(processor, config.clone())),
            config,
            started_at: Utc::now(),
        }
    }
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn create_app(state: AppState) -> Router {
    let body_limit = state.config.max_file_size.saturating_add(MULTIPART_OVERHEAD);
    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/api-docs/openapi.json", get(openapi_json))
        .route("/health", get(health::health_check))
        .route("/process_audio", post(audio::process_audio))
        .fallback_service(static_files)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}
