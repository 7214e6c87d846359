//! In-process event store with bounded history.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{EventStore, RetentionLimits, assign_id};
use crate::domain::{IndicatorRecord, WebhookRecord};
use crate::error::GatewayError;

/// Bounded in-memory history of webhook and indicator records.
///
/// Both histories are kept most recent first. Appending and trimming happen
/// under a single write lock, so readers never observe a history longer than
/// its limit.
#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    limits: RetentionLimits,
}

#[derive(Debug, Default)]
struct MemoryState {
    webhooks: VecDeque<WebhookRecord>,
    indicators: VecDeque<IndicatorRecord>,
}

impl MemoryStore {
    /// Creates an empty store with the given retention limits.
    #[must_use]
    pub fn new(limits: RetentionLimits) -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            limits,
        }
    }

    /// Retention limits of this store.
    #[must_use]
    pub const fn limits(&self) -> RetentionLimits {
        self.limits
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(RetentionLimits::default())
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn save_webhook(&self, record: &WebhookRecord) -> Result<(), GatewayError> {
        let mut state = self.state.write().await;
        state.webhooks.push_front(record.clone());
        state.webhooks.truncate(self.limits.webhook);
        Ok(())
    }

    async fn latest_webhook(&self) -> Result<Option<WebhookRecord>, GatewayError> {
        Ok(self.state.read().await.webhooks.front().cloned())
    }

    async fn webhook_history(&self, limit: usize) -> Result<Vec<WebhookRecord>, GatewayError> {
        let state = self.state.read().await;
        Ok(state.webhooks.iter().take(limit).cloned().collect())
    }

    async fn save_indicator(
        &self,
        record: IndicatorRecord,
    ) -> Result<IndicatorRecord, GatewayError> {
        let record = assign_id(record);
        let mut state = self.state.write().await;
        state.indicators.retain(|existing| existing.id != record.id);
        state.indicators.push_front(record.clone());
        state.indicators.truncate(self.limits.indicator);
        Ok(record)
    }

    async fn latest_indicator(&self) -> Result<Option<IndicatorRecord>, GatewayError> {
        Ok(self.state.read().await.indicators.front().cloned())
    }

    async fn indicator_history(
        &self,
        limit: usize,
    ) -> Result<Vec<IndicatorRecord>, GatewayError> {
        let state = self.state.read().await;
        Ok(state.indicators.iter().take(limit).cloned().collect())
    }

    fn description(&self) -> String {
        "in-memory".to_string()
    }

    fn is_durable(&self) -> bool {
        false
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::WebhookEnvelope;
    use chrono::Utc;
    use serde_json::json;

    fn webhook(event: &str) -> WebhookRecord {
        let Ok(envelope) = WebhookEnvelope::from_value(json!({"event": event, "data": {}})) else {
            panic!("valid envelope");
        };
        envelope.into_record(Utc::now())
    }

    fn indicator(id: &str, ticker: &str) -> IndicatorRecord {
        IndicatorRecord {
            id: Some(id.to_string()),
            ticker: Some(ticker.to_string()),
            raw_payload: "{}".to_string(),
            ..IndicatorRecord::default()
        }
    }

    fn store(webhook: usize, indicator: usize) -> MemoryStore {
        MemoryStore::new(RetentionLimits { webhook, indicator })
    }

    #[tokio::test]
    async fn empty_store_has_nothing() {
        let store = MemoryStore::default();
        assert!(store.latest_webhook().await.unwrap_or_default().is_none());
        assert!(store.latest_indicator().await.unwrap_or_default().is_none());
        assert!(store.webhook_history(10).await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn webhook_history_is_most_recent_first_and_bounded() {
        let store = store(2, 10);
        for event in ["a", "b", "c"] {
            assert!(store.save_webhook(&webhook(event)).await.is_ok());
        }
        let history = store.webhook_history(10).await.unwrap_or_default();
        let events: Vec<&str> = history.iter().map(|r| r.event.as_str()).collect();
        assert_eq!(events, ["c", "b"]);

        let Ok(Some(latest)) = store.latest_webhook().await else {
            panic!("expected latest webhook");
        };
        assert_eq!(latest.event, "c");
    }

    #[tokio::test]
    async fn history_respects_requested_limit() {
        let store = store(10, 10);
        for event in ["a", "b", "c"] {
            assert!(store.save_webhook(&webhook(event)).await.is_ok());
        }
        assert_eq!(store.webhook_history(1).await.unwrap_or_default().len(), 1);
    }

    #[tokio::test]
    async fn indicators_upsert_by_id() {
        let store = store(10, 10);
        assert!(store.save_indicator(indicator("a", "BTC")).await.is_ok());
        assert!(store.save_indicator(indicator("b", "ETH")).await.is_ok());
        assert!(store.save_indicator(indicator("a", "SOL")).await.is_ok());

        let history = store.indicator_history(10).await.unwrap_or_default();
        assert_eq!(history.len(), 2);
        let Some(first) = history.first() else {
            panic!("expected records");
        };
        assert_eq!(first.id.as_deref(), Some("a"));
        assert_eq!(first.ticker.as_deref(), Some("SOL"));
    }

    #[tokio::test]
    async fn indicators_without_id_get_one() {
        let store = store(10, 10);
        let Ok(saved) = store.save_indicator(IndicatorRecord::default()).await else {
            panic!("save should succeed");
        };
        assert!(saved.id.is_some());
        let Ok(Some(latest)) = store.latest_indicator().await else {
            panic!("expected latest indicator");
        };
        assert_eq!(latest.id, saved.id);
    }

    #[tokio::test]
    async fn indicator_history_is_bounded() {
        let store = store(10, 2);
        for id in ["a", "b", "c"] {
            assert!(store.save_indicator(indicator(id, "X")).await.is_ok());
        }
        let ids: Vec<Option<String>> = store
            .indicator_history(10)
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, [Some("c".to_string()), Some("b".to_string())]);
    }
}
