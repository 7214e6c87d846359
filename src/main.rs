//! pulse-gateway server entry point.
//!
//! Starts the Axum HTTP server with the webhook and read endpoints.

use std::sync::Arc;

use pulse_gateway::api::{self, auth::WebhookAuth};
use pulse_gateway::app_state::AppState;
use pulse_gateway::config::GatewayConfig;
use pulse_gateway::normalize::{IndicatorExtractor, KeyNormalizer, PayloadLocator};
use pulse_gateway::persistence;
use pulse_gateway::service::IngestService;
use pulse_gateway::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = GatewayConfig::from_env()?;
    telemetry::init_tracing(config.log_format)?;
    tracing::info!(addr = %config.listen_addr, "starting pulse-gateway");
    if config.webhook_secret.is_none() {
        tracing::warn!("no webhook secret configured, every webhook will be rejected");
    }

    // Build persistence and service layers
    let store = persistence::open_store(&config).await;
    let normalizer = if config.normalizer_cache {
        KeyNormalizer::new()
    } else {
        KeyNormalizer::uncached()
    };
    let extractor = IndicatorExtractor::with_parts(normalizer, PayloadLocator::default());
    let service = Arc::new(IngestService::new(
        store,
        Arc::new(extractor),
        config.retention(),
        config.storage_namespace.clone(),
    ));

    // Build application state
    let app_state = AppState {
        service,
        auth: WebhookAuth::new(config.webhook_secret.clone(), config.token_header.clone()),
    };

    // Build router
    let app = api::build_app(app_state, config.max_body_bytes, config.request_timeout);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
