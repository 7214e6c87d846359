//! Indicator read handlers.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{HistoryParams, IndicatorHistoryResponse};
use crate::app_state::AppState;
use crate::domain::IndicatorRecord;
use crate::error::GatewayError;

/// `GET /indicator/latest`: Most recent indicator record.
///
/// # Errors
///
/// Returns [`GatewayError::PersistenceError`] on store failure.
#[utoipa::path(
    get,
    path = "/api/indicator/latest",
    tag = "Indicators",
    summary = "Latest indicator",
    responses(
        (status = 200, description = "Most recent indicator record", body = IndicatorRecord),
        (status = 204, description = "No indicator stored yet"),
    )
)]
pub async fn latest_indicator(State(state): State<AppState>) -> Result<Response, GatewayError> {
    Ok(match state.service.latest_indicator().await? {
        Some(record) => Json(record).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

/// `GET /indicator/history`: Recent indicator records.
///
/// # Errors
///
/// Returns [`GatewayError::PersistenceError`] on store failure.
#[utoipa::path(
    get,
    path = "/api/indicator/history",
    tag = "Indicators",
    summary = "Indicator history",
    description = "Most recently received first. `limit` defaults to the configured history size and is capped at 500.",
    params(HistoryParams),
    responses(
        (status = 200, description = "Indicator history", body = IndicatorHistoryResponse),
    )
)]
pub async fn indicator_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, GatewayError> {
    let items = state.service.indicator_history(params.requested()).await?;
    Ok(Json(IndicatorHistoryResponse::from(items)))
}

/// Indicator routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/indicator/latest", get(latest_indicator))
        .route("/indicator/history", get(indicator_history))
}
