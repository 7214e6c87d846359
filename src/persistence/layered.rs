//! Durable store mirrored into an in-memory store.

use std::sync::Arc;

use async_trait::async_trait;

use super::{EventStore, MemoryStore, assign_id};
use crate::domain::{IndicatorRecord, WebhookRecord};
use crate::error::GatewayError;

/// Writes to a durable store and to memory; reads prefer the durable store.
///
/// A durable write failure is logged and does not fail the call, because the
/// in-memory copy is always written. Reads fall back to memory when the
/// durable store errors or returns nothing.
#[derive(Debug)]
pub struct LayeredStore {
    durable: Arc<dyn EventStore>,
    memory: MemoryStore,
}

impl LayeredStore {
    /// Layers `durable` over `memory`.
    #[must_use]
    pub fn new(durable: Arc<dyn EventStore>, memory: MemoryStore) -> Self {
        Self { durable, memory }
    }
}

#[async_trait]
impl EventStore for LayeredStore {
    async fn save_webhook(&self, record: &WebhookRecord) -> Result<(), GatewayError> {
        if let Err(e) = self.durable.save_webhook(record).await {
            tracing::warn!(id = %record.id, error = %e, "durable webhook write failed");
        }
        self.memory.save_webhook(record).await
    }

    async fn latest_webhook(&self) -> Result<Option<WebhookRecord>, GatewayError> {
        match self.durable.latest_webhook().await {
            Ok(Some(record)) => Ok(Some(record)),
            Ok(None) => self.memory.latest_webhook().await,
            Err(e) => {
                tracing::warn!(error = %e, "durable read failed, serving from memory");
                self.memory.latest_webhook().await
            }
        }
    }

    async fn webhook_history(&self, limit: usize) -> Result<Vec<WebhookRecord>, GatewayError> {
        match self.durable.webhook_history(limit).await {
            Ok(records) if !records.is_empty() => Ok(records),
            Ok(_) => self.memory.webhook_history(limit).await,
            Err(e) => {
                tracing::warn!(error = %e, "durable read failed, serving from memory");
                self.memory.webhook_history(limit).await
            }
        }
    }

    async fn save_indicator(
        &self,
        record: IndicatorRecord,
    ) -> Result<IndicatorRecord, GatewayError> {
        // Both layers must agree on the id.
        let record = assign_id(record);
        if let Err(e) = self.durable.save_indicator(record.clone()).await {
            tracing::warn!(
                id = record.id.as_deref().unwrap_or("-"),
                error = %e,
                "durable indicator write failed"
            );
        }
        self.memory.save_indicator(record).await
    }

    async fn latest_indicator(&self) -> Result<Option<IndicatorRecord>, GatewayError> {
        match self.durable.latest_indicator().await {
            Ok(Some(record)) => Ok(Some(record)),
            Ok(None) => self.memory.latest_indicator().await,
            Err(e) => {
                tracing::warn!(error = %e, "durable read failed, serving from memory");
                self.memory.latest_indicator().await
            }
        }
    }

    async fn indicator_history(
        &self,
        limit: usize,
    ) -> Result<Vec<IndicatorRecord>, GatewayError> {
        match self.durable.indicator_history(limit).await {
            Ok(records) if !records.is_empty() => Ok(records),
            Ok(_) => self.memory.indicator_history(limit).await,
            Err(e) => {
                tracing::warn!(error = %e, "durable read failed, serving from memory");
                self.memory.indicator_history(limit).await
            }
        }
    }

    fn description(&self) -> String {
        format!("{} with in-memory fallback", self.durable.description())
    }

    fn is_durable(&self) -> bool {
        self.durable.is_durable()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::persistence::RetentionLimits;

    /// A durable store whose every call fails.
    #[derive(Debug)]
    struct BrokenStore;

    fn broken() -> GatewayError {
        GatewayError::PersistenceError("database is locked".to_string())
    }

    #[async_trait]
    impl EventStore for BrokenStore {
        async fn save_webhook(&self, _: &WebhookRecord) -> Result<(), GatewayError> {
            Err(broken())
        }
        async fn latest_webhook(&self) -> Result<Option<WebhookRecord>, GatewayError> {
            Err(broken())
        }
        async fn webhook_history(&self, _: usize) -> Result<Vec<WebhookRecord>, GatewayError> {
            Err(broken())
        }
        async fn save_indicator(
            &self,
            _: IndicatorRecord,
        ) -> Result<IndicatorRecord, GatewayError> {
            Err(broken())
        }
        async fn latest_indicator(&self) -> Result<Option<IndicatorRecord>, GatewayError> {
            Err(broken())
        }
        async fn indicator_history(
            &self,
            _: usize,
        ) -> Result<Vec<IndicatorRecord>, GatewayError> {
            Err(broken())
        }
        fn description(&self) -> String {
            "broken".to_string()
        }
        fn is_durable(&self) -> bool {
            true
        }
    }

    fn layered(durable: Arc<dyn EventStore>) -> LayeredStore {
        LayeredStore::new(durable, MemoryStore::new(RetentionLimits::default()))
    }

    #[tokio::test]
    async fn durable_failures_fall_back_to_memory() {
        let store = layered(Arc::new(BrokenStore));
        let record = IndicatorRecord {
            ticker: Some("BTC".to_string()),
            ..IndicatorRecord::default()
        };
        let Ok(saved) = store.save_indicator(record).await else {
            panic!("memory write should succeed");
        };

        let Ok(Some(latest)) = store.latest_indicator().await else {
            panic!("expected indicator from memory");
        };
        assert_eq!(latest, saved);
        assert_eq!(store.indicator_history(5).await.unwrap_or_default().len(), 1);
        assert!(store.is_durable());
        assert_eq!(store.description(), "broken with in-memory fallback");
    }

    #[tokio::test]
    async fn both_layers_share_the_generated_id() {
        let durable = Arc::new(MemoryStore::default());
        let store = layered(Arc::<MemoryStore>::clone(&durable));
        let Ok(saved) = store.save_indicator(IndicatorRecord::default()).await else {
            panic!("save should succeed");
        };

        let Ok(Some(in_durable)) = durable.latest_indicator().await else {
            panic!("durable layer should hold the record");
        };
        assert_eq!(in_durable.id, saved.id);
    }
}
