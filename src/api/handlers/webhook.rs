//! Webhook handlers: ingest, latest, history.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;

use crate::api::dto::{
    HistoryParams, WebhookAcceptedResponse, WebhookEnvelopeDoc, WebhookHistoryResponse,
};
use crate::app_state::AppState;
use crate::domain::{WebhookEnvelope, WebhookRecord};
use crate::error::{ErrorResponse, GatewayError};

/// `POST /zapier-hook`: Accept a webhook.
///
/// The body is parsed before the token check so that malformed JSON is
/// reported as such; the envelope is validated after it.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidJson`], [`GatewayError::Unauthorized`] or
/// [`GatewayError::InvalidRequest`].
#[utoipa::path(
    post,
    path = "/api/zapier-hook",
    tag = "Webhooks",
    summary = "Ingest a webhook",
    description = "Stores the webhook and derives an indicator record from its payload. Indicator extraction is best-effort and never affects the response.",
    request_body = WebhookEnvelopeDoc,
    params(
        ("X-Zapier-Token" = Option<String>, Header, description = "Webhook secret (header name is configurable)"),
    ),
    responses(
        (status = 202, description = "Webhook accepted", body = WebhookAcceptedResponse),
        (status = 400, description = "Malformed JSON or invalid envelope", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    )
)]
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, GatewayError> {
    let value: Value = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(error = %e, "rejecting malformed webhook body");
        GatewayError::InvalidJson
    })?;
    state.auth.verify(&headers)?;
    let envelope = WebhookEnvelope::from_value(value)?;

    let ingested = state.service.ingest(envelope).await;
    Ok((
        StatusCode::ACCEPTED,
        Json(WebhookAcceptedResponse::accepted(ingested.webhook.id)),
    ))
}

/// `GET /zapier-hook/latest`: Most recent webhook.
///
/// # Errors
///
/// Returns [`GatewayError::PersistenceError`] on store failure.
#[utoipa::path(
    get,
    path = "/api/zapier-hook/latest",
    tag = "Webhooks",
    summary = "Latest webhook",
    responses(
        (status = 200, description = "Most recent webhook record", body = WebhookRecord),
        (status = 204, description = "No webhook received yet"),
    )
)]
pub async fn latest_webhook(State(state): State<AppState>) -> Result<Response, GatewayError> {
    Ok(match state.service.latest_webhook().await? {
        Some(record) => Json(record).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

/// `GET /zapier-hook/history`: Recent webhooks.
///
/// # Errors
///
/// Returns [`GatewayError::PersistenceError`] on store failure.
#[utoipa::path(
    get,
    path = "/api/zapier-hook/history",
    tag = "Webhooks",
    summary = "Webhook history",
    description = "Most recent webhooks first. `limit` defaults to the configured history size and is capped at 100.",
    params(HistoryParams),
    responses(
        (status = 200, description = "Webhook history", body = WebhookHistoryResponse),
    )
)]
pub async fn webhook_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, GatewayError> {
    let items = state.service.webhook_history(params.requested()).await?;
    Ok(Json(WebhookHistoryResponse::from(items)))
}

/// Webhook routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/zapier-hook", post(receive_webhook))
        .route("/zapier-hook/latest", get(latest_webhook))
        .route("/zapier-hook/history", get(webhook_history))
}
