//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::api::auth::WebhookAuth;
use crate::service::IngestService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Ingest service for all business logic.
    pub service: Arc<IngestService>,
    /// Webhook token checker.
    pub auth: WebhookAuth,
}
