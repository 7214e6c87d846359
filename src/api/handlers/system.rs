//! System endpoints: health check and storage metadata.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::normalize::format_timestamp;
use crate::service::StorageMetadata;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health`: Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: format_timestamp(&Utc::now()),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// `GET /api/storage`: Active storage configuration.
#[utoipa::path(
    get,
    path = "/api/storage",
    tag = "System",
    summary = "Storage metadata",
    description = "Reports the storage backend, namespace, durability and history limits.",
    responses(
        (status = 200, description = "Storage metadata", body = StorageMetadata),
    )
)]
pub async fn storage_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.service.storage_metadata())
}

/// System routes mounted at the root level (not under /api).
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}

/// System routes mounted under /api.
pub fn api_routes() -> Router<AppState> {
    Router::new().route("/storage", get(storage_handler))
}
