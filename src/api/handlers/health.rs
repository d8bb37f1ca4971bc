use crate::AppState;
use axum::{Json, extract::State, response::IntoResponse};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub upload_dir: String,
    pub processor: String,
    pub version: String,
    pub uptime_seconds: i64,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "System health status", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let upload_dir_status = match tokio::fs::metadata(&state.config.upload_dir).await {
        Ok(meta) if meta.is_dir() && !meta.permissions().readonly() => "writable",
        Ok(_) => "unavailable",
        Err(_) => "missing",
    };

    let status = if upload_dir_status == "writable" {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        upload_dir: upload_dir_status.to_string(),
        processor: state.handler.processor_name().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: (Utc::now() - state.started_at).num_seconds(),
    })
}
