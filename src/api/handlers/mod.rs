//! REST endpoint handlers organized by resource.

pub mod indicator;
pub mod system;
pub mod webhook;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(webhook::routes())
        .merge(indicator::routes())
        .merge(system::api_routes())
}
