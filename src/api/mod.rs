//! REST API layer: route handlers, DTOs, authentication and router
//! composition.
//!
//! Resource endpoints are mounted under `/api`; `/health` and the OpenAPI
//! document live at the root.

pub mod auth;
pub mod dto;
pub mod handlers;

use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document for every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "pulse-gateway",
        description = "Webhook ingestion gateway that normalizes automation-platform payloads into indicator records."
    ),
    paths(
        handlers::webhook::receive_webhook,
        handlers::webhook::latest_webhook,
        handlers::webhook::webhook_history,
        handlers::indicator::latest_indicator,
        handlers::indicator::indicator_history,
        handlers::system::storage_handler,
        handlers::system::health_handler,
    ),
    components(schemas(
        dto::WebhookEnvelopeDoc,
        dto::WebhookAcceptedResponse,
        dto::WebhookHistoryResponse,
        dto::IndicatorHistoryResponse,
        crate::domain::WebhookRecord,
        crate::domain::IndicatorRecord,
        crate::service::StorageMetadata,
        handlers::system::HealthResponse,
        crate::error::ErrorResponse,
        crate::error::ErrorBody,
    )),
    tags(
        (name = "Webhooks", description = "Webhook ingestion and webhook history"),
        (name = "Indicators", description = "Normalized indicator records"),
        (name = "System", description = "Health and storage metadata"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api", handlers::routes())
        .merge(handlers::system::routes())
        .merge(docs_router())
}

/// Builds the servable application: routes, state and the HTTP middleware
/// stack (tracing, permissive CORS, body limit, request timeout).
pub fn build_app(state: AppState, max_body_bytes: usize, request_timeout: Duration) -> Router {
    build_router()
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(timeout_layer(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Requests running past `timeout` are answered with 408.
fn timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

#[cfg(not(feature = "swagger-ui"))]
fn docs_router() -> Router<AppState> {
    use axum::Json;
    use axum::routing::get;

    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}

#[cfg(feature = "swagger-ui")]
fn docs_router() -> Router<AppState> {
    use utoipa_swagger_ui::SwaggerUi;

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::get;
    use tower::ServiceExt;

    #[tokio::test]
    async fn slow_requests_time_out_with_408() {
        let app = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "done"
                }),
            )
            .layer(timeout_layer(Duration::from_millis(20)));

        let Ok(request) = Request::builder().uri("/slow").body(Body::empty()) else {
            panic!("valid request");
        };
        let Ok(response) = app.oneshot(request).await else {
            panic!("router is infallible");
        };
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }
}
