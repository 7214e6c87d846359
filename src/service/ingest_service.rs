//! Ingest service: accepts webhooks, derives indicators, serves history.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::config::{MAX_INDICATOR_HISTORY, MAX_WEBHOOK_HISTORY};
use crate::domain::{IndicatorRecord, WebhookEnvelope, WebhookRecord};
use crate::error::GatewayError;
use crate::normalize::IndicatorExtractor;
use crate::persistence::{EventStore, RetentionLimits};

/// Result of ingesting one webhook.
#[derive(Debug, Clone)]
pub struct Ingested {
    /// The stored webhook record.
    pub webhook: WebhookRecord,
    /// The indicator derived from it, if any was found and stored.
    pub indicator: Option<IndicatorRecord>,
}

/// Description of the active storage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StorageMetadata {
    /// Backend description, e.g. `"in-memory"`.
    pub backend: String,
    /// Configured storage namespace.
    pub namespace: String,
    /// Whether records survive a restart.
    pub durable: bool,
    /// Webhook records kept.
    pub webhook_history_limit: usize,
    /// Default indicator history size.
    pub indicator_history_limit: usize,
}

/// Orchestration layer between the HTTP handlers and the store.
///
/// Ingestion never fails because of storage or extraction: both are
/// best-effort and only logged, so a valid webhook is always acknowledged.
#[derive(Debug, Clone)]
pub struct IngestService {
    store: Arc<dyn EventStore>,
    extractor: Arc<IndicatorExtractor>,
    limits: RetentionLimits,
    namespace: String,
}

impl IngestService {
    /// Creates a new `IngestService`.
    #[must_use]
    pub fn new(
        store: Arc<dyn EventStore>,
        extractor: Arc<IndicatorExtractor>,
        limits: RetentionLimits,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            store,
            extractor,
            limits,
            namespace: namespace.into(),
        }
    }

    /// Returns a reference to the underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    /// Stores a validated webhook and the indicator derived from it.
    pub async fn ingest(&self, envelope: WebhookEnvelope) -> Ingested {
        let webhook = envelope.into_record(Utc::now());

        if let Err(e) = self.store.save_webhook(&webhook).await {
            tracing::error!(id = %webhook.id, error = %e, "failed to store webhook");
        }

        let indicator = match self.extractor.extract_webhook(&webhook) {
            Some(indicator) => self.store_indicator(indicator).await,
            None => {
                tracing::debug!(id = %webhook.id, "no indicator data in webhook");
                None
            }
        };

        tracing::info!(
            id = %webhook.id,
            event = %webhook.event,
            indicator = indicator.is_some(),
            "webhook accepted"
        );
        Ingested { webhook, indicator }
    }

    /// Extracts and stores an indicator from an already stored webhook
    /// record in JSON form.
    ///
    /// Returns `Ok(None)` when the record carries no indicator data.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] if the store rejects the
    /// indicator.
    pub async fn persist_indicator(
        &self,
        record: &Value,
    ) -> Result<Option<IndicatorRecord>, GatewayError> {
        let Some(indicator) = self.extractor.extract(record) else {
            return Ok(None);
        };
        self.store.save_indicator(indicator).await.map(Some)
    }

    /// Most recent webhook record.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on store failure.
    pub async fn latest_webhook(&self) -> Result<Option<WebhookRecord>, GatewayError> {
        self.store.latest_webhook().await
    }

    /// Webhook history, most recent first.
    ///
    /// `requested` falls back to the configured limit when absent and is
    /// capped at [`MAX_WEBHOOK_HISTORY`].
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on store failure.
    pub async fn webhook_history(
        &self,
        requested: Option<usize>,
    ) -> Result<Vec<WebhookRecord>, GatewayError> {
        let limit = clamp_limit(requested, self.limits.webhook, MAX_WEBHOOK_HISTORY);
        self.store.webhook_history(limit).await
    }

    /// Most recent indicator record.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on store failure.
    pub async fn latest_indicator(&self) -> Result<Option<IndicatorRecord>, GatewayError> {
        self.store.latest_indicator().await
    }

    /// Indicator history, most recently received first.
    ///
    /// `requested` falls back to the configured limit when absent and is
    /// capped at [`MAX_INDICATOR_HISTORY`].
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on store failure.
    pub async fn indicator_history(
        &self,
        requested: Option<usize>,
    ) -> Result<Vec<IndicatorRecord>, GatewayError> {
        let limit = clamp_limit(requested, self.limits.indicator, MAX_INDICATOR_HISTORY);
        self.store.indicator_history(limit).await
    }

    /// Describes the active storage configuration.
    #[must_use]
    pub fn storage_metadata(&self) -> StorageMetadata {
        StorageMetadata {
            backend: self.store.description(),
            namespace: self.namespace.clone(),
            durable: self.store.is_durable(),
            webhook_history_limit: self.limits.webhook,
            indicator_history_limit: self.limits.indicator,
        }
    }

    async fn store_indicator(&self, indicator: IndicatorRecord) -> Option<IndicatorRecord> {
        match self.store.save_indicator(indicator).await {
            Ok(stored) => Some(stored),
            Err(e) => {
                tracing::warn!(error = %e, "failed to store indicator");
                None
            }
        }
    }
}

/// Applies the default for missing or zero limits and caps at `max`.
fn clamp_limit(requested: Option<usize>, default: usize, max: usize) -> usize {
    requested
        .filter(|limit| *limit > 0)
        .unwrap_or(default)
        .min(max)
}
