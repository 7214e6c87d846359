//! Re-derives the latest indicator record from the newest stored webhook.
//!
//! The newest entry of `WEBHOOK_LOG_PATH` (a JSON array of webhook records,
//! newest first, as written by earlier deployments) is used when that file
//! exists. Otherwise the latest webhook of the configured store is used. The
//! extracted indicator is stored through the same backend.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use pulse_gateway::config::GatewayConfig;
use pulse_gateway::normalize::IndicatorExtractor;
use pulse_gateway::persistence;
use pulse_gateway::service::IngestService;
use pulse_gateway::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::from_env()?;
    telemetry::init_tracing(config.log_format)?;

    let store = persistence::open_store(&config).await;
    if !store.is_durable() {
        tracing::warn!("storage is not durable, the backfilled record will not outlive this run");
    }
    let service = IngestService::new(
        store,
        Arc::new(IndicatorExtractor::new()),
        config.retention(),
        config.storage_namespace.clone(),
    );

    let Some(latest) = latest_entry(&service, &config.webhook_log_path).await? else {
        tracing::info!(path = %config.webhook_log_path.display(), "no entries to backfill");
        return Ok(());
    };

    let Some(indicator) = service.persist_indicator(&latest).await? else {
        tracing::warn!("the latest entry does not contain indicator data");
        return Ok(());
    };

    let metadata = service.storage_metadata();
    tracing::info!(
        id = indicator.id.as_deref().unwrap_or("-"),
        backend = %metadata.backend,
        limit = metadata.indicator_history_limit,
        "stored latest indicator event"
    );
    Ok(())
}

/// Newest log entry, else the newest webhook held by the store.
async fn latest_entry(service: &IngestService, log_path: &Path) -> anyhow::Result<Option<Value>> {
    if let Some(entry) = load_log_entries(log_path).await.into_iter().next() {
        tracing::info!(path = %log_path.display(), "backfilling from webhook log file");
        return Ok(Some(entry));
    }
    let Some(webhook) = service.latest_webhook().await? else {
        return Ok(None);
    };
    Ok(Some(serde_json::to_value(webhook)?))
}

/// Missing or unreadable logs count as empty.
async fn load_log_entries(path: &Path) -> Vec<Value> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "failed to read log file");
            return Vec::new();
        }
    };
    match serde_json::from_str(&content) {
        Ok(Value::Array(entries)) => entries,
        Ok(_) => {
            tracing::warn!(path = %path.display(), "log file is not a JSON array");
            Vec::new()
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "log file is not valid JSON");
            Vec::new()
        }
    }
}
