//! Persistence layer: the event store contract and its adapters.
//!
//! Every backend implements [`EventStore`], a narrow save / latest /
//! history contract over webhook records and indicator records. Adapters:
//!
//! - [`MemoryStore`]: bounded in-process history, lost on restart.
//! - [`SqliteStore`]: durable storage in an embedded SQLite database.
//! - [`LayeredStore`]: a durable store mirrored into a [`MemoryStore`]
//!   that keeps serving reads while the durable store is failing.
//!
//! All adapters order results most recent first.

pub mod layered;
pub mod memory;
pub mod sqlite;

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

pub use layered::LayeredStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::config::{GatewayConfig, StorageBackend};
use crate::domain::{IndicatorRecord, RecordId, WebhookRecord};
use crate::error::GatewayError;

/// Storage contract shared by all backends.
#[async_trait]
pub trait EventStore: Send + Sync + Debug {
    /// Appends a webhook record and trims history to the retention limit.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] when the backend fails.
    async fn save_webhook(&self, record: &WebhookRecord) -> Result<(), GatewayError>;

    /// Most recently stored webhook record.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] when the backend fails.
    async fn latest_webhook(&self) -> Result<Option<WebhookRecord>, GatewayError>;

    /// Up to `limit` webhook records, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] when the backend fails.
    async fn webhook_history(&self, limit: usize) -> Result<Vec<WebhookRecord>, GatewayError>;

    /// Upserts an indicator record by id and returns it as stored.
    ///
    /// A record without an id is given a generated one (see [`assign_id`]).
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] when the backend fails.
    async fn save_indicator(&self, record: IndicatorRecord)
    -> Result<IndicatorRecord, GatewayError>;

    /// Most recently stored indicator record.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] when the backend fails.
    async fn latest_indicator(&self) -> Result<Option<IndicatorRecord>, GatewayError>;

    /// Up to `limit` indicator records, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] when the backend fails.
    async fn indicator_history(&self, limit: usize)
    -> Result<Vec<IndicatorRecord>, GatewayError>;

    /// Short human-readable description of the backend.
    fn description(&self) -> String;

    /// Whether records survive a process restart.
    fn is_durable(&self) -> bool;
}

/// Retention limits applied by the stores and the read endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionLimits {
    /// Number of webhook records kept.
    pub webhook: usize,
    /// Number of indicator records kept in memory and default read size.
    pub indicator: usize,
}

impl Default for RetentionLimits {
    fn default() -> Self {
        Self {
            webhook: crate::config::DEFAULT_WEBHOOK_HISTORY,
            indicator: crate::config::DEFAULT_INDICATOR_HISTORY,
        }
    }
}

/// Gives `record` a generated id when it has none.
#[must_use]
pub fn assign_id(mut record: IndicatorRecord) -> IndicatorRecord {
    if record.id.is_none() {
        record.id = Some(RecordId::generate().into());
    }
    record
}

/// Opens the store selected by `config`.
///
/// If the SQLite database cannot be opened, the error is logged and the
/// gateway continues with an in-memory store.
pub async fn open_store(config: &GatewayConfig) -> Arc<dyn EventStore> {
    let limits = config.retention();
    match config.storage_backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new(limits)),
        StorageBackend::Sqlite => match SqliteStore::open(&config.database_path, limits).await {
            Ok(durable) => Arc::new(LayeredStore::new(
                Arc::new(durable),
                MemoryStore::new(limits),
            )),
            Err(e) => {
                tracing::error!(
                    path = %config.database_path.display(),
                    error = %e,
                    "failed to open sqlite store, falling back to memory"
                );
                Arc::new(MemoryStore::new(limits))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_id_keeps_existing_ids() {
        let record = IndicatorRecord {
            id: Some("abc".to_string()),
            ..IndicatorRecord::default()
        };
        assert_eq!(assign_id(record).id.as_deref(), Some("abc"));
    }

    #[test]
    fn assign_id_generates_missing_ids() {
        let a = assign_id(IndicatorRecord::default());
        let b = assign_id(IndicatorRecord::default());
        assert!(a.id.is_some());
        assert_ne!(a.id, b.id);
    }
}
